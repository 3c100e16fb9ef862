// Application settings
// Loaded from ~/.config/statdeck/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use statdeck_core::format::{DEFAULT_CURRENCY_SYMBOL, DEFAULT_EARNINGS_KEYWORDS};
use statdeck_core::ValueFormatter;

/// PDF page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// (width, height) in points
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Value formatting
    #[serde(rename = "format.currencySymbol")]
    pub currency_symbol: String,

    /// Substrings that mark a field as money (case-insensitive)
    #[serde(rename = "format.earningsKeywords")]
    pub earnings_keywords: Vec<String>,

    // PDF export
    #[serde(rename = "pdf.pageSize")]
    pub pdf_page_size: PageSize,

    #[serde(rename = "pdf.margin")]
    pub pdf_margin: f32,

    /// Wider tables are split into parts of this many columns
    #[serde(rename = "pdf.maxColumns")]
    pub pdf_max_columns: usize,

    /// Longer detailed-metric tables are split into parts of this many rows
    #[serde(rename = "pdf.maxMetricRows")]
    pub pdf_max_metric_rows: usize,

    // Excel export
    #[serde(rename = "excel.maxColumns")]
    pub excel_max_columns: usize,

    // Export files
    #[serde(rename = "export.filenamePrefix")]
    pub filename_prefix: String,

    // Display
    #[serde(rename = "display.defaultWindow")]
    pub default_window: String,

    #[serde(rename = "display.expandByDefault")]
    pub expand_by_default: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Format
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            earnings_keywords: DEFAULT_EARNINGS_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            // PDF
            pdf_page_size: PageSize::A4,
            pdf_margin: 40.0,
            pdf_max_columns: 8,
            pdf_max_metric_rows: 10,
            // Excel
            excel_max_columns: 15,
            // Files
            filename_prefix: "chat-export".to_string(),
            // Display
            default_window: "all".to_string(),
            expand_by_default: false,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("statdeck");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path)
    }

    /// Load settings from a specific file, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut settings: Settings = serde_json::from_str(&cleaned).map_err(|e| e.to_string())?;
        settings.clamp_limits();
        Ok(settings)
    }

    /// Save current settings to a file
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Chunk sizes of zero would never make progress
    fn clamp_limits(&mut self) {
        self.pdf_max_columns = self.pdf_max_columns.max(1);
        self.pdf_max_metric_rows = self.pdf_max_metric_rows.max(1);
        self.excel_max_columns = self.excel_max_columns.max(1);
        self.pdf_margin = self.pdf_margin.clamp(10.0, 120.0);
    }

    /// Value formatter configured from these settings
    pub fn formatter(&self) -> ValueFormatter {
        ValueFormatter::new(self.currency_symbol.clone(), &self.earnings_keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_match_export_limits() {
        let settings = Settings::default();
        assert_eq!(settings.pdf_max_columns, 8);
        assert_eq!(settings.pdf_max_metric_rows, 10);
        assert_eq!(settings.excel_max_columns, 15);
        assert_eq!(settings.currency_symbol, "$");
    }

    #[test]
    fn test_parse_partial_file_with_comments() {
        let contents = r#"{
    // Money formatting
    "format.currencySymbol": "€",
    "excel.maxColumns": 0
}"#;
        let settings = Settings::parse(contents).unwrap();
        assert_eq!(settings.currency_symbol, "€");
        assert_eq!(settings.excel_max_columns, 1);
        assert_eq!(settings.pdf_max_columns, 8);
    }

    #[test]
    fn test_formatter_uses_configured_vocabulary() {
        let mut settings = Settings::default();
        settings.earnings_keywords = vec!["tips".to_string()];
        let fmt = settings.formatter();
        assert_eq!(fmt.format_smart_value("tips", &json!(1500)), "$1.5K");
        assert_eq!(fmt.format_smart_value("revenue", &json!(1500)), "1.5K");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.pdf_page_size = PageSize::Letter;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.pdf_page_size, PageSize::Letter);
    }

    #[test]
    fn test_unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path).pdf_max_columns, 8);
    }
}
