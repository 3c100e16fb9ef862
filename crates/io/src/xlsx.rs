// Excel export (xlsx only)
//
// Writes a WorkbookPlan with rust_xlsxwriter. One-way: sections become
// worksheets of plain values and are never read back.

use std::time::Instant;

use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet};

use statdeck_core::Section;

use crate::filename::ExportKind;
use crate::options::{ExportOptions, ExportResult};
use crate::xlsx_plan::{build_workbook_plan, CellPlan, SheetPlan, WorkbookPlan, MAX_CELL_CHARS};

/// Export sections to XLSX bytes.
///
/// # Returns
/// * `Ok((bytes, ExportResult))` - File contents and export statistics
/// * `Err(String)` - Error message if the workbook could not be written
pub fn export_to_excel(sections: &[Section], opts: &ExportOptions) -> Result<(Vec<u8>, ExportResult), String> {
    let start_time = Instant::now();

    let plan = build_workbook_plan(sections, opts);
    let bytes = write_workbook(&plan)?;

    let mut result = ExportResult::new(ExportKind::Xlsx);
    result.sections_exported = sections.len();
    result.units = plan.sheets.len();
    result.tables_split = plan.tables_split;
    result.placeholders = plan.placeholders;
    result.malformed_sections = plan.malformed_sections;
    if plan.clipped_cells > 0 {
        result
            .warnings
            .push(format!("{} cell(s) clipped to {} characters", plan.clipped_cells, MAX_CELL_CHARS));
    }
    result.bytes_written = bytes.len();
    result.export_duration_ms = start_time.elapsed().as_millis();

    log::debug!("xlsx export: {}", result.summary());
    Ok((bytes, result))
}

/// Serialize a planned workbook.
pub fn write_workbook(plan: &WorkbookPlan) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold().set_border_bottom(FormatBorder::Thin);

    for sheet in &plan.sheets {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name, e))?;
        write_sheet(worksheet, sheet, &header_format)?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to save XLSX file: {}", e))
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &SheetPlan, header_format: &Format) -> Result<(), String> {
    for (row, cells) in sheet.rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let (row32, col16) = (row as u32, col as u16);
            let written = match cell {
                CellPlan::Blank => continue,
                CellPlan::Text(s) => worksheet.write_string(row32, col16, s),
                CellPlan::Number(n) => worksheet.write_number(row32, col16, *n),
                CellPlan::Header(s) => worksheet.write_string_with_format(row32, col16, s, header_format),
            };
            written.map_err(|e| format!("Failed to write cell ({}, {}) on '{}': {}", row, col, sheet.name, e))?;
        }
    }

    for (col, width) in sheet.column_widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, *width)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }

    if sheet.freeze_header && sheet.rows.len() > 1 {
        worksheet
            .set_freeze_panes(1, 0)
            .map_err(|e| format!("Failed to set freeze panes: {}", e))?;
    }

    Ok(())
}
