// Export engines - sections to PDF and Excel documents

pub mod chunk;
pub mod filename;
pub mod media;
pub mod options;
pub mod pdf;
pub mod pdf_layout;
pub mod sheet_name;
pub mod xlsx;
pub mod xlsx_plan;

pub use filename::{export_filename, ExportKind};
pub use options::{ExportOptions, ExportResult};
pub use pdf::export_to_pdf;
pub use pdf_layout::{build_pdf_layout, PdfLayout};
pub use xlsx::export_to_excel;
pub use xlsx_plan::{build_workbook_plan, WorkbookPlan};
