//! Worksheet names.
//!
//! A name is `<base>-<index path>[-<qualifier>]`. The base keeps only ASCII
//! alphanumerics and `_`, so it never contains `-`; the suffix is unique per
//! sheet, which makes every name unique without a dedup pass. Excel limits
//! names to 31 characters: the base is truncated, never the suffix.

/// Excel's sheet-name limit
pub const MAX_SHEET_NAME: usize = 31;

fn sanitize(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let collapsed = cleaned
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if collapsed.is_empty() {
        "Sheet".to_string()
    } else {
        collapsed
    }
}

/// Build a sheet name from a title, the section's index path (`[2, 1]` for
/// the first child of the second section) and an optional qualifier (`p2`).
pub fn sheet_name(title: &str, index_path: &[usize], qualifier: Option<&str>) -> String {
    let path: Vec<String> = index_path.iter().map(|i| i.to_string()).collect();
    let mut suffix = format!("-{}", path.join("."));
    if let Some(q) = qualifier {
        suffix.push('-');
        suffix.push_str(q);
    }

    if suffix.len() >= MAX_SHEET_NAME {
        log::warn!("sheet suffix '{}' exceeds the sheet name limit; keeping its tail", suffix);
        return suffix[suffix.len() - MAX_SHEET_NAME..].to_string();
    }

    let room = MAX_SHEET_NAME - suffix.len();
    let base: String = sanitize(title).chars().take(room).collect();
    let base = base.trim_end_matches('_');
    let base = if base.is_empty() { "S" } else { base };
    format!("{}{}", base, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_basic_names() {
        assert_eq!(sheet_name("Top Tracks (2024)", &[1], None), "Top_Tracks_2024-1");
        assert_eq!(sheet_name("", &[3, 2], Some("p2")), "Sheet-3.2-p2");
        assert_eq!(sheet_name("Ünïcode?!", &[1], None), "n_code-1");
    }

    #[test]
    fn test_long_titles_keep_suffix() {
        let title = "A very long section title that goes on and on";
        let name = sheet_name(title, &[12, 4], Some("p3"));
        assert!(name.len() <= MAX_SHEET_NAME, "{}", name);
        assert!(name.ends_with("-12.4-p3"));
    }

    #[test]
    fn test_colliding_titles_stay_distinct() {
        let a = sheet_name("Revenue / Q1 report", &[1], None);
        let b = sheet_name("Revenue: Q1 report", &[2], None);
        assert_ne!(a, b);
        assert!(a.len() <= MAX_SHEET_NAME && b.len() <= MAX_SHEET_NAME);

        let long = "x".repeat(80);
        let names: HashSet<String> = (1..50).map(|i| sheet_name(&long, &[i], None)).collect();
        assert_eq!(names.len(), 49);
    }

    #[test]
    fn test_excel_forbidden_characters_removed() {
        let name = sheet_name("a[b]c:d*e?f/g\\h'", &[1], None);
        assert!(!name.contains(|c: char| "[]:*?/\\'".contains(c)));
    }
}
