use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Pdf,
    Xlsx,
}

impl ExportKind {
    pub fn parse(name: &str) -> Option<ExportKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(ExportKind::Pdf),
            "xlsx" | "excel" => Some(ExportKind::Xlsx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::Pdf => "pdf",
            ExportKind::Xlsx => "xlsx",
        }
    }
}

/// `chat-export-2024-06-15.pdf`
pub fn export_filename(prefix: &str, kind: ExportKind, date: NaiveDate) -> String {
    let prefix = prefix.trim();
    let prefix = if prefix.is_empty() { "chat-export" } else { prefix };
    format!("{}-{}.{}", prefix, date.format("%Y-%m-%d"), kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_stamped_names() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(export_filename("chat-export", ExportKind::Pdf, date), "chat-export-2024-06-05.pdf");
        assert_eq!(export_filename("  ", ExportKind::Xlsx, date), "chat-export-2024-06-05.xlsx");
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(ExportKind::parse("XLSX"), Some(ExportKind::Xlsx));
        assert_eq!(ExportKind::parse("excel"), Some(ExportKind::Xlsx));
        assert_eq!(ExportKind::parse("docx"), None);
    }
}
