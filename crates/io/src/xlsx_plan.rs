//! Workbook plan.
//!
//! Every section becomes one or more worksheets, planned as plain rows of
//! cells before anything touches the xlsx writer. Numbers stay numbers so
//! the workbook can be re-analysed; formatted strings appear only where a
//! human-readable column is useful next to the raw value.

use statdeck_core::country::country_name;
use statdeck_core::format::{format_timestamp, snake_to_title_case};
use statdeck_core::markdown::{parse_blocks, Block};
use statdeck_core::media::decode_image;
use statdeck_core::variant::{DataFrame, ForecastChart, KeyValue, MetricGrid, PlaylistReport, ViralityReport};
use statdeck_core::{Scalar, Section, SectionBody, Variant};

use crate::chunk::chunk_ranges;
use crate::options::ExportOptions;
use crate::sheet_name::sheet_name;

const MIN_COLUMN_WIDTH: f64 = 8.0;
const MAX_COLUMN_WIDTH: f64 = 60.0;

/// Excel rejects longer strings
pub const MAX_CELL_CHARS: usize = 32_767;
const CLIP_MARKER: &str = " [truncated]";

#[derive(Debug, Clone, PartialEq)]
pub enum CellPlan {
    Blank,
    Text(String),
    Number(f64),
    /// Bold header text
    Header(String),
}

impl CellPlan {
    fn text(s: impl Into<String>) -> Self {
        CellPlan::Text(s.into())
    }

    fn from_scalar(value: &Scalar) -> Self {
        match value {
            Scalar::Null => CellPlan::Blank,
            Scalar::Number(n) => CellPlan::Number(*n),
            other => CellPlan::Text(other.display()),
        }
    }

    fn optional_number(value: Option<f64>) -> Self {
        value.map(CellPlan::Number).unwrap_or(CellPlan::Blank)
    }

    /// Clip text to the cell limit, keeping a visible marker. True if clipped.
    fn clip(&mut self) -> bool {
        let (CellPlan::Text(s) | CellPlan::Header(s)) = self else {
            return false;
        };
        let keep = MAX_CELL_CHARS - CLIP_MARKER.chars().count();
        match s.char_indices().nth(MAX_CELL_CHARS) {
            Some(_) => {
                if let Some((cut, _)) = s.char_indices().nth(keep) {
                    s.truncate(cut);
                }
                s.push_str(CLIP_MARKER);
                true
            }
            None => false,
        }
    }

    fn width(&self) -> usize {
        match self {
            CellPlan::Blank => 0,
            CellPlan::Text(s) | CellPlan::Header(s) => s.chars().count(),
            CellPlan::Number(n) => n.to_string().len(),
        }
    }
}

fn header_row(names: &[&str]) -> Vec<CellPlan> {
    names.iter().map(|n| CellPlan::Header(n.to_string())).collect()
}

fn label_row(label: &str, value: CellPlan) -> Vec<CellPlan> {
    vec![CellPlan::Header(label.to_string()), value]
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetPlan {
    pub name: String,
    pub rows: Vec<Vec<CellPlan>>,
    /// Excel character units, one per column
    pub column_widths: Vec<f64>,
    /// Freeze the first row
    pub freeze_header: bool,
}

impl SheetPlan {
    fn new(name: String, rows: Vec<Vec<CellPlan>>, freeze_header: bool) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let column_widths = (0..columns)
            .map(|col| {
                let widest = rows.iter().filter_map(|row| row.get(col)).map(CellPlan::width).max().unwrap_or(0);
                (widest as f64 + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
            })
            .collect();
        Self { name, rows, column_widths, freeze_header }
    }

    /// Text of a cell, for tests and previews
    pub fn cell_text(&self, row: usize, col: usize) -> Option<String> {
        match self.rows.get(row)?.get(col)? {
            CellPlan::Blank => None,
            CellPlan::Text(s) | CellPlan::Header(s) => Some(s.clone()),
            CellPlan::Number(n) => Some(n.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookPlan {
    pub sheets: Vec<SheetPlan>,
    pub tables_split: usize,
    pub placeholders: usize,
    pub malformed_sections: usize,
    /// Text cells cut to the Excel length limit
    pub clipped_cells: usize,
}

impl WorkbookPlan {
    pub fn sheet(&self, name: &str) -> Option<&SheetPlan> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Plan worksheets for `sections`; top-level sections are numbered from 1.
pub fn build_workbook_plan(sections: &[Section], opts: &ExportOptions) -> WorkbookPlan {
    let mut builder = PlanBuilder { opts, plan: WorkbookPlan::default() };
    for (i, section) in sections.iter().enumerate() {
        builder.section(section, &[i + 1]);
    }
    if builder.plan.sheets.is_empty() {
        builder.plan.sheets.push(SheetPlan::new(
            sheet_name("Export", &[0], None),
            vec![vec![CellPlan::text("No sections to export")]],
            false,
        ));
    }
    builder.plan
}

struct PlanBuilder<'a> {
    opts: &'a ExportOptions,
    plan: WorkbookPlan,
}

impl PlanBuilder<'_> {
    fn push(
        &mut self,
        title: &str,
        path: &[usize],
        qualifier: Option<&str>,
        mut rows: Vec<Vec<CellPlan>>,
        freeze: bool,
    ) {
        let name = sheet_name(title, path, qualifier);
        let clipped = rows.iter_mut().flatten().map(CellPlan::clip).filter(|clipped| *clipped).count();
        if clipped > 0 {
            log::warn!("xlsx: clipped {} oversized cell(s) on '{}'", clipped, name);
            self.plan.clipped_cells += clipped;
        }
        log::debug!("xlsx: planned sheet '{}' ({} rows)", name, rows.len());
        self.plan.sheets.push(SheetPlan::new(name, rows, freeze));
    }

    fn section(&mut self, section: &Section, path: &[usize]) {
        let title = section.display_title();
        match section.body() {
            SectionBody::Ready(variant) => self.variant(variant, &title, path),
            SectionBody::Malformed { reason, .. } => {
                self.plan.malformed_sections += 1;
                let rows = vec![
                    label_row("Type", CellPlan::text(section.type_name())),
                    label_row("Status", CellPlan::text("No data available")),
                    label_row("Reason", CellPlan::text(reason.as_str())),
                ];
                self.push(&title, path, None, rows, false);
            }
            SectionBody::Unsupported { .. } => {
                self.plan.placeholders += 1;
                let rows = vec![
                    label_row("Type", CellPlan::text(section.type_name())),
                    label_row("Status", CellPlan::text("Data not displayed")),
                ];
                self.push(&title, path, None, rows, false);
            }
        }
    }

    fn variant(&mut self, variant: &Variant, title: &str, path: &[usize]) {
        match variant {
            Variant::Text(text) => {
                let rows = text_rows(text);
                self.push(title, path, None, rows, false);
            }
            Variant::Error(message) => {
                let rows = vec![header_row(&["Error"]), vec![CellPlan::text(message.as_str())]];
                self.push(title, path, None, rows, false);
            }
            Variant::DataFrame(frame) => self.dataframe(frame, title, path),
            Variant::KeyValue(kv) => {
                let rows = self.key_value_rows(kv);
                self.push(title, path, None, rows, true);
            }
            Variant::MetricGrid(grid) => {
                let rows = self.metric_grid_rows(grid);
                self.push(title, path, None, rows, true);
            }
            Variant::Virality(report) => self.virality(report, title, path),
            Variant::Forecast(chart) => {
                let rows = forecast_rows(chart);
                self.push(title, path, None, rows, true);
            }
            Variant::MultiForecast(set) => {
                if set.forecasts.is_empty() {
                    self.push(title, path, None, vec![vec![CellPlan::text("No data available")]], false);
                }
                for (i, child) in set.forecasts.iter().enumerate() {
                    self.section(child, &child_path(path, i));
                }
            }
            Variant::Playlist(report) => {
                let rows = playlist_rows(report);
                self.push(title, path, None, rows, false);
            }
            Variant::MultiSection(children) => {
                let mut rows = vec![header_row(&["#", "Type", "Title", "Shape"])];
                for (i, child) in children.iter().enumerate() {
                    let shape = match child.tag() {
                        Some(tag) if tag.is_tabular() => "tabular",
                        Some(_) => "scalar",
                        None => "unsupported",
                    };
                    rows.push(vec![
                        CellPlan::Number((i + 1) as f64),
                        CellPlan::text(child.type_name()),
                        CellPlan::text(child.display_title()),
                        CellPlan::text(shape),
                    ]);
                }
                self.push(title, path, None, rows, true);
                for (i, child) in children.iter().enumerate() {
                    self.section(child, &child_path(path, i));
                }
            }
            Variant::Platforms(platforms) => {
                let mut rows = vec![header_row(&["Platform", "Icon URL"])];
                rows.extend(platforms.iter().map(|p| {
                    vec![CellPlan::text(p.name.as_str()), p.icon_url.clone().map(CellPlan::Text).unwrap_or(CellPlan::Blank)]
                }));
                self.push(title, path, None, rows, true);
            }
            Variant::Countries(shares) => {
                let mut shares = shares.clone();
                shares.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
                let mut rows = vec![header_row(&["Country", "Code", "Percentage"])];
                rows.extend(shares.iter().map(|s| {
                    vec![
                        CellPlan::text(country_name(&s.country_code)),
                        CellPlan::text(s.country_code.to_ascii_uppercase()),
                        CellPlan::Number(s.percentage),
                    ]
                }));
                self.push(title, path, None, rows, true);
            }
            Variant::Image(payload) => {
                self.plan.placeholders += 1;
                let mut rows = vec![
                    label_row("Type", CellPlan::text("image_base64")),
                    label_row("Status", CellPlan::text("Image not embedded")),
                ];
                match decode_image(payload) {
                    Ok(image) => {
                        rows.push(label_row("Format", CellPlan::text(image.format.extension())));
                        rows.push(label_row("Bytes", CellPlan::Number(image.bytes.len() as f64)));
                    }
                    Err(e) => rows.push(label_row("Error", CellPlan::text(e))),
                }
                self.push(title, path, None, rows, false);
            }
            Variant::Video(url) => {
                let rows = vec![label_row("Video URL", CellPlan::text(url.as_str()))];
                self.push(title, path, None, rows, false);
            }
        }
    }

    fn dataframe(&mut self, frame: &DataFrame, title: &str, path: &[usize]) {
        let parts = chunk_ranges(frame.column_count(), self.opts.excel_max_columns);
        if parts.is_empty() {
            self.push(title, path, None, vec![vec![CellPlan::text("No data available")]], false);
            return;
        }
        if parts.len() > 1 {
            self.plan.tables_split += 1;
        }
        for (i, range) in parts.iter().enumerate() {
            let mut rows: Vec<Vec<CellPlan>> =
                vec![frame.columns[range.clone()].iter().map(|c| CellPlan::Header(c.clone())).collect()];
            rows.extend(frame.rows.iter().map(|row| row[range.clone()].iter().map(CellPlan::from_scalar).collect()));
            let qualifier = format!("p{}", i + 1);
            let qualifier = (parts.len() > 1).then_some(qualifier.as_str());
            self.push(title, path, qualifier, rows, true);
        }
    }

    fn key_value_rows(&self, kv: &KeyValue) -> Vec<Vec<CellPlan>> {
        let fmt = &self.opts.formatter;
        let mut rows = vec![header_row(&["Metric", "Value", "Raw"])];
        rows.extend(kv.entries.iter().map(|(key, value)| {
            vec![
                CellPlan::text(snake_to_title_case(key)),
                CellPlan::text(fmt.format_scalar(key, value)),
                CellPlan::from_scalar(value),
            ]
        }));
        rows
    }

    fn metric_grid_rows(&self, grid: &MetricGrid) -> Vec<Vec<CellPlan>> {
        let fmt = &self.opts.formatter;
        let mut rows = vec![header_row(&["Platform", "Metric", "Value", "Raw"])];
        for platform in &grid.platforms {
            for (key, value) in &platform.metrics {
                rows.push(vec![
                    CellPlan::text(platform.platform.as_str()),
                    CellPlan::text(snake_to_title_case(key)),
                    CellPlan::text(fmt.format_scalar(key, value)),
                    CellPlan::from_scalar(value),
                ]);
            }
            for (key, url) in &platform.links {
                rows.push(vec![
                    CellPlan::text(platform.platform.as_str()),
                    CellPlan::text(snake_to_title_case(key)),
                    CellPlan::text(url.as_str()),
                    CellPlan::Blank,
                ]);
            }
        }
        rows
    }

    fn virality(&mut self, report: &ViralityReport, title: &str, path: &[usize]) {
        let growth = |value: Option<f64>| value.map(CellPlan::Number).unwrap_or_else(|| CellPlan::text("N/A"));
        let mut rows = vec![
            label_row("Artist", CellPlan::text(report.artist_name.as_str())),
            label_row("Virality Score", CellPlan::Number(report.score)),
            label_row("Verdict", CellPlan::text(report.verdict.label())),
            label_row("Audience Growth %", growth(report.audience_growth)),
            label_row("Engagement Growth %", growth(report.engagement_growth)),
            label_row("Summary", CellPlan::text(report.summary.as_str())),
        ];
        if let Some(text) = &report.audience_analysis {
            rows.push(label_row("Audience Analysis", CellPlan::text(text.as_str())));
        }
        if let Some(text) = &report.engagement_analysis {
            rows.push(label_row("Engagement Analysis", CellPlan::text(text.as_str())));
        }
        self.push(title, path, None, rows, false);

        if report.detailed_metrics.is_empty() {
            return;
        }
        let mut rows = vec![header_row(&["Metric", "Status", "Growth %", "Baseline Avg", "Recent Avg"])];
        rows.extend(report.detailed_metrics.iter().map(|(name, detail)| {
            vec![
                CellPlan::text(snake_to_title_case(name)),
                CellPlan::text(detail.status()),
                CellPlan::optional_number(detail.growth()),
                CellPlan::optional_number(detail.baseline_avg()),
                CellPlan::optional_number(detail.recent_avg()),
            ]
        }));
        self.push(title, path, Some("metrics"), rows, true);
    }
}

fn child_path(parent: &[usize], index: usize) -> Vec<usize> {
    let mut path = parent.to_vec();
    path.push(index + 1);
    path
}

/// One row per paragraph; markdown tables keep their columns.
fn text_rows(text: &str) -> Vec<Vec<CellPlan>> {
    let mut rows = Vec::new();
    for block in parse_blocks(text) {
        if !rows.is_empty() {
            rows.push(Vec::new());
        }
        match block {
            Block::Paragraph { spans } => {
                let line: String = spans.into_iter().map(|s| s.text).collect();
                rows.push(vec![CellPlan::Text(line)]);
            }
            Block::Table { header, rows: body } => {
                rows.push(header.into_iter().map(CellPlan::Header).collect());
                rows.extend(body.into_iter().map(|row| row.into_iter().map(CellPlan::Text).collect()));
            }
        }
    }
    rows
}

fn forecast_rows(chart: &ForecastChart) -> Vec<Vec<CellPlan>> {
    let mut rows = vec![header_row(&["Series", "Date", chart.y_axis_label.as_str(), "Lower", "Upper"])];
    rows.extend(chart.historical.iter().map(|p| {
        vec![
            CellPlan::text("Historical"),
            CellPlan::text(format_timestamp(&p.timestamp)),
            CellPlan::Number(p.value),
            CellPlan::Blank,
            CellPlan::Blank,
        ]
    }));
    rows.extend(chart.forecast.iter().map(|p| {
        let (lower, upper) = p.band().map(|(l, u)| (Some(l), Some(u))).unwrap_or((None, None));
        vec![
            CellPlan::text("Forecast"),
            CellPlan::text(format_timestamp(&p.timestamp)),
            CellPlan::Number(p.value),
            CellPlan::optional_number(lower),
            CellPlan::optional_number(upper),
        ]
    }));
    rows
}

fn playlist_rows(report: &PlaylistReport) -> Vec<Vec<CellPlan>> {
    let mut rows = vec![
        label_row("Track", CellPlan::text(report.track_name.as_str())),
        label_row("Artist", CellPlan::text(report.artist_name.as_str())),
        label_row("Summary", CellPlan::text(report.summary.as_str())),
        Vec::new(),
        header_row(&["Playlist", "Curator", "Platform", "Followers", "Score", "URL", "Reasoning"]),
    ];
    rows.extend(report.recommendations.iter().map(|r| {
        let reasoning: Vec<String> =
            r.reasoning.iter().map(|(k, v)| format!("{}: {}", snake_to_title_case(k), v)).collect();
        vec![
            CellPlan::text(r.playlist_name.as_str()),
            CellPlan::text(r.curator_name.as_str()),
            CellPlan::text(r.platform.as_str()),
            CellPlan::optional_number(r.followers),
            CellPlan::Number(r.score),
            r.url.clone().map(CellPlan::Text).unwrap_or(CellPlan::Blank),
            CellPlan::Text(reasoning.join("; ")),
        ]
    }));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet_name::MAX_SHEET_NAME;
    use serde_json::json;
    use std::collections::HashSet;

    fn section(tag: &str, content: serde_json::Value, title: Option<&str>) -> Section {
        Section::from_value(tag, &content, title.map(str::to_string))
    }

    fn frame(columns: usize) -> serde_json::Value {
        let names: Vec<String> = (1..=columns).map(|i| format!("col{}", i)).collect();
        let row: Vec<usize> = (1..=columns).collect();
        json!({"columns": names, "data": [row]})
    }

    #[test]
    fn test_colliding_titles_get_distinct_short_names() {
        let long = "Monthly Listener Breakdown By Territory And Platform";
        let sections = vec![
            section("dataframe", frame(2), Some(long)),
            section("dataframe", frame(2), Some(long)),
            section("dataframe", frame(2), Some("Sales/Q1")),
            section("dataframe", frame(2), Some("Sales?Q1")),
        ];
        let plan = build_workbook_plan(&sections, &ExportOptions::default());
        let names = plan.sheet_names();
        assert_eq!(names.len(), 4);
        let unique: HashSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
        assert_eq!(unique.len(), 4);
        assert!(names.iter().all(|n| n.chars().count() <= MAX_SHEET_NAME));
        assert_eq!(names[2], "Sales_Q1-3");
    }

    #[test]
    fn test_wide_frame_splits_across_sheets() {
        let plan = build_workbook_plan(&[section("dataframe", frame(40), Some("Wide"))], &ExportOptions::default());
        assert_eq!(plan.sheet_names(), vec!["Wide-1-p1", "Wide-1-p2", "Wide-1-p3"]);
        assert_eq!(plan.tables_split, 1);
        let last = plan.sheet("Wide-1-p3").unwrap();
        assert_eq!(last.rows[0].len(), 10);
        assert_eq!(last.rows[0][0], CellPlan::Header("col31".into()));
        assert_eq!(last.rows[1][0], CellPlan::Number(31.0));
    }

    #[test]
    fn test_placeholders_and_malformed_sheets() {
        let sections = vec![
            section("hologram", json!({"x": 1}), None),
            section("key_value", json!(5), Some("Bad")),
            section("image_base64", json!("iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg=="), None),
        ];
        let plan = build_workbook_plan(&sections, &ExportOptions::default());
        assert_eq!(plan.placeholders, 2);
        assert_eq!(plan.malformed_sections, 1);
        assert_eq!(plan.sheets[0].cell_text(1, 1).as_deref(), Some("Data not displayed"));
        assert_eq!(plan.sheets[1].cell_text(1, 1).as_deref(), Some("No data available"));
        assert_eq!(plan.sheets[2].cell_text(2, 1).as_deref(), Some("png"));
    }

    #[test]
    fn test_multi_section_summary_then_children() {
        let report = section(
            "multi_section_report",
            json!({"sections": [
                {"section_type": "key_value", "title": "Totals", "content": {"data": {"total_earnings": 1500}}},
                {"section_type": "text", "content": "Notes"}
            ]}),
            Some("Report"),
        );
        let plan = build_workbook_plan(&[report], &ExportOptions::default());
        assert_eq!(plan.sheet_names(), vec!["Report-1", "Totals-1.1", "Text-1.2"]);
        let summary = &plan.sheets[0];
        assert_eq!(summary.cell_text(1, 2).as_deref(), Some("Totals"));
        assert_eq!(summary.cell_text(1, 3).as_deref(), Some("tabular"));
        assert_eq!(summary.cell_text(2, 3).as_deref(), Some("scalar"));

        let totals = &plan.sheets[1];
        assert_eq!(totals.cell_text(1, 1).as_deref(), Some("$1.5K"));
        assert_eq!(totals.rows[1][2], CellPlan::Number(1500.0));
    }

    #[test]
    fn test_virality_gets_metrics_sheet() {
        let report = section(
            "virality_report",
            json!({"artist_name": "Nova", "virality_score": 88, "verdict": "viral",
                   "detailed_metrics": {"streams": {"status": "calculated", "growth": 12.5}}}),
            None,
        );
        let plan = build_workbook_plan(&[report], &ExportOptions::default());
        assert_eq!(plan.sheet_names(), vec!["Virality_Report-1", "Virality_Report-1-metrics"]);
        assert_eq!(plan.sheets[1].rows[1][2], CellPlan::Number(12.5));
    }

    #[test]
    fn test_countries_sorted_with_numeric_share() {
        let countries = section(
            "country_listenership_data",
            json!([{"country_code": "de", "percentage": 10.0}, {"country_code": "us", "percentage": 42.5}]),
            None,
        );
        let plan = build_workbook_plan(&[countries], &ExportOptions::default());
        let sheet = &plan.sheets[0];
        assert_eq!(sheet.cell_text(1, 0).as_deref(), Some("United States"));
        assert_eq!(sheet.rows[1][2], CellPlan::Number(42.5));
    }

    #[test]
    fn test_empty_export_still_has_a_sheet() {
        let plan = build_workbook_plan(&[], &ExportOptions::default());
        assert_eq!(plan.sheets.len(), 1);
    }

    #[test]
    fn test_column_widths_are_clamped() {
        let text = "x".repeat(200);
        let plan = build_workbook_plan(&[section("text", json!(text), None)], &ExportOptions::default());
        assert_eq!(plan.sheets[0].column_widths, vec![MAX_COLUMN_WIDTH]);
    }

    #[test]
    fn test_oversized_text_is_clipped_with_marker() {
        let sections = vec![
            section("key_value", json!({"data": {"streams": 10}}), Some("Good")),
            section("text", json!("word ".repeat(8000)), None),
        ];
        let plan = build_workbook_plan(&sections, &ExportOptions::default());
        assert_eq!(plan.sheet_names(), vec!["Good-1", "Text-2"]);
        assert_eq!(plan.clipped_cells, 1);
        let clipped = plan.sheets[1].cell_text(0, 0).unwrap();
        assert_eq!(clipped.chars().count(), MAX_CELL_CHARS);
        assert!(clipped.ends_with(" [truncated]"));
    }

    #[test]
    fn test_text_at_the_limit_is_kept_whole() {
        let text = "y".repeat(MAX_CELL_CHARS);
        let plan = build_workbook_plan(&[section("text", json!(text), None)], &ExportOptions::default());
        assert_eq!(plan.clipped_cells, 0);
        assert_eq!(plan.sheets[0].cell_text(0, 0).map(|s| s.len()), Some(MAX_CELL_CHARS));
    }
}
