use chrono::{DateTime, Utc};

use statdeck_config::settings::PageSize;
use statdeck_config::Settings;
use statdeck_core::ValueFormatter;

use crate::filename::ExportKind;

/// Everything an export pass needs besides the sections.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub formatter: ValueFormatter,
    pub page_size: PageSize,
    /// Points
    pub margin: f32,
    pub pdf_max_columns: usize,
    pub pdf_max_metric_rows: usize,
    pub excel_max_columns: usize,
    pub filename_prefix: String,
    /// Stamped into the document header and default filenames
    pub now: DateTime<Utc>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), Utc::now())
    }
}

impl ExportOptions {
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>) -> Self {
        Self {
            formatter: settings.formatter(),
            page_size: settings.pdf_page_size,
            margin: settings.pdf_margin,
            pdf_max_columns: settings.pdf_max_columns.max(1),
            pdf_max_metric_rows: settings.pdf_max_metric_rows.max(1),
            excel_max_columns: settings.excel_max_columns.max(1),
            filename_prefix: settings.filename_prefix.clone(),
            now,
        }
    }
}

/// Result of an export operation
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub kind: ExportKind,
    /// Top-level sections written
    pub sections_exported: usize,
    /// Pages (PDF) or sheets (Excel)
    pub units: usize,
    /// Wide tables (or long metric lists) split into parts
    pub tables_split: usize,
    /// Placeholder blocks or sheets for unsupported and media sections
    pub placeholders: usize,
    /// Sections whose payload failed validation
    pub malformed_sections: usize,
    pub bytes_written: usize,
    pub export_duration_ms: u128,
    pub warnings: Vec<String>,
}

impl ExportResult {
    pub fn new(kind: ExportKind) -> Self {
        Self {
            kind,
            sections_exported: 0,
            units: 0,
            tables_split: 0,
            placeholders: 0,
            malformed_sections: 0,
            bytes_written: 0,
            export_duration_ms: 0,
            warnings: Vec::new(),
        }
    }

    /// Returns a summary message suitable for display
    pub fn summary(&self) -> String {
        let unit = match self.kind {
            ExportKind::Pdf => "page",
            ExportKind::Xlsx => "sheet",
        };
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        let mut parts = vec![
            format!("{} {}{}", self.units, unit, plural(self.units)),
            format!("{} section{}", self.sections_exported, plural(self.sections_exported)),
        ];
        if self.tables_split > 0 {
            parts.push(format!("{} table{} split", self.tables_split, plural(self.tables_split)));
        }
        if self.placeholders > 0 {
            parts.push(format!("{} placeholder{}", self.placeholders, plural(self.placeholders)));
        }
        parts.join(", ")
    }

    /// Returns true if there are warnings
    pub fn has_warnings(&self) -> bool {
        self.malformed_sections > 0 || !self.warnings.is_empty()
    }

    /// Single-line warning text, if any
    pub fn warning_summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.malformed_sections > 0 {
            parts.push(format!("{} section(s) had unreadable data", self.malformed_sections));
        }
        parts.extend(self.warnings.iter().cloned());
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}
