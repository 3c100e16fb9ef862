//! PDF layout pass.
//!
//! Walks the section tree with one vertical cursor `y` (top-down, points)
//! and a fixed margin, producing pages of draw operations. Before each block
//! `ensure_space(threshold)` starts a new page when `y > page_height -
//! threshold`. Layout never fails: malformed content becomes a short
//! "No data available" line and unsupported content a placeholder line, so
//! one bad section never stops the rest of the document.
//!
//! Text is measured with an average Helvetica glyph width, which is enough
//! for wrapping and clipping at these font sizes.

use statdeck_config::{palette, Color};
use statdeck_core::country::country_name;
use statdeck_core::format::{
    compact_number, format_growth, format_percentage, format_timestamp, format_timestamp_long, plain_number,
    snake_to_title_case,
};
use statdeck_core::markdown::{parse_blocks, Block};
use statdeck_core::variant::{
    DataFrame, ForecastChart, KeyValue, MetricGrid, PlaylistReport, ViralityReport,
};
use statdeck_core::{Section, SectionBody, Variant};

use crate::chunk::{chunk_ranges, column_part_label, metrics_part_label};
use crate::options::ExportOptions;

// Font sizes
const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const SUBHEADING_SIZE: f32 = 11.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.0;

const LINE_HEIGHT: f32 = 1.4;
const ROW_HEIGHT: f32 = 16.0;
const CELL_PADDING: f32 = 3.0;
/// Average Helvetica advance as a fraction of the font size
const GLYPH_WIDTH: f32 = 0.5;

// Space that must remain below the cursor before a block starts
const SPACE_LINE: f32 = 60.0;
const SPACE_HEADING: f32 = 80.0;
const SPACE_TABLE: f32 = 100.0;
const SPACE_CASCADE: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the baseline, measured from the top of the page
    Text { x: f32, y: f32, size: f32, style: FontStyle, color: Color, text: String },
    /// Horizontal rule
    Rule { x1: f32, x2: f32, y: f32, color: Color },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfPage {
    pub ops: Vec<DrawOp>,
}

impl PdfPage {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Rule { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfLayout {
    /// Points
    pub width: f32,
    pub height: f32,
    pub pages: Vec<PdfPage>,
    pub tables_split: usize,
    pub placeholders: usize,
    pub malformed_sections: usize,
}

impl PdfLayout {
    /// Every text run in document order
    pub fn texts(&self) -> Vec<&str> {
        self.pages.iter().flat_map(PdfPage::texts).collect()
    }
}

/// Lay out `sections` under a "Chat Export" header.
pub fn build_pdf_layout(sections: &[Section], opts: &ExportOptions) -> PdfLayout {
    let mut builder = LayoutBuilder::new(opts);
    builder.document_header();
    for section in sections {
        builder.section(section);
    }
    builder.finish()
}

/// Builtin PDF fonts only cover Latin-1; map common punctuation and replace
/// anything else.
pub fn pdf_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' | '\r' | '\t' => out.push(' '),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            c if (' '..='~').contains(&c) || ('\u{A0}'..='\u{FF}').contains(&c) => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH
}

/// Clip to `max_width`, marking the cut with `...`.
fn clip(text: &str, max_width: f32, size: f32) -> String {
    if text_width(text, size) <= max_width {
        return text.to_string();
    }
    let max_chars = (max_width / (size * GLYPH_WIDTH)).floor() as usize;
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let mut clipped: String = text.chars().take(max_chars - 3).collect();
    clipped.push_str("...");
    clipped
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * GLYPH_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct LayoutBuilder<'a> {
    opts: &'a ExportOptions,
    width: f32,
    height: f32,
    margin: f32,
    y: f32,
    pages: Vec<PdfPage>,
    tables_split: usize,
    placeholders: usize,
    malformed_sections: usize,
}

impl<'a> LayoutBuilder<'a> {
    fn new(opts: &'a ExportOptions) -> Self {
        let (width, height) = opts.page_size.dimensions();
        Self {
            opts,
            width,
            height,
            margin: opts.margin,
            y: opts.margin,
            pages: vec![PdfPage::default()],
            tables_split: 0,
            placeholders: 0,
            malformed_sections: 0,
        }
    }

    fn finish(self) -> PdfLayout {
        PdfLayout {
            width: self.width,
            height: self.height,
            pages: self.pages,
            tables_split: self.tables_split,
            placeholders: self.placeholders,
            malformed_sections: self.malformed_sections,
        }
    }

    // -------------------------------------------------------------------------
    // Cursor
    // -------------------------------------------------------------------------

    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn new_page(&mut self) {
        self.pages.push(PdfPage::default());
        self.y = self.margin;
    }

    fn ensure_space(&mut self, threshold: f32) {
        if self.y > self.height - threshold {
            self.new_page();
        }
    }

    fn push(&mut self, op: DrawOp) {
        let last = self.pages.len() - 1;
        self.pages[last].ops.push(op);
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    // -------------------------------------------------------------------------
    // Primitives
    // -------------------------------------------------------------------------

    fn text_at(&mut self, x: f32, text: &str, size: f32, style: FontStyle, color: Color) {
        let y = self.y + size;
        self.push(DrawOp::Text { x, y, size, style, color, text: pdf_safe(text) });
    }

    fn line(&mut self, text: &str, size: f32, style: FontStyle, color: Color) {
        self.ensure_space(SPACE_LINE);
        let x = self.margin;
        self.text_at(x, text, size, style, color);
        self.gap(size * LINE_HEIGHT);
    }

    fn paragraph(&mut self, text: &str, size: f32, style: FontStyle, color: Color) {
        for line in wrap(&pdf_safe(text), self.content_width(), size) {
            self.line(&line, size, style, color);
        }
        self.gap(size * 0.4);
    }

    fn rule(&mut self, color: Color) {
        let (x1, x2, y) = (self.margin, self.width - self.margin, self.y);
        self.push(DrawOp::Rule { x1, x2, y, color });
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(SPACE_HEADING);
        self.gap(4.0);
        self.line(text, HEADING_SIZE, FontStyle::Bold, palette::TEXT);
    }

    fn subheading(&mut self, text: &str) {
        self.ensure_space(SPACE_HEADING);
        self.line(text, SUBHEADING_SIZE, FontStyle::Bold, palette::TEXT);
    }

    fn no_data(&mut self) {
        self.line("No data available", BODY_SIZE, FontStyle::Italic, palette::GRAY);
    }

    fn placeholder(&mut self, type_name: &str) {
        log::debug!("pdf: placeholder for '{}'", type_name);
        self.placeholders += 1;
        self.line(&format!("[{} - data not displayed]", type_name), BODY_SIZE, FontStyle::Italic, palette::GRAY);
    }

    fn table_header(&mut self, header: &[String], column_width: f32) {
        let x0 = self.margin;
        for (i, name) in header.iter().enumerate() {
            let x = x0 + i as f32 * column_width + CELL_PADDING;
            let text = clip(&pdf_safe(name), column_width - 2.0 * CELL_PADDING, TABLE_SIZE);
            self.text_at(x, &text, TABLE_SIZE, FontStyle::Bold, palette::TEXT);
        }
        self.gap(ROW_HEIGHT - 4.0);
        self.rule(palette::MUTED);
        self.gap(4.0);
    }

    /// Equal-width columns; the header repeats after a page break.
    fn table(&mut self, header: &[String], rows: &[Vec<String>]) {
        if header.is_empty() {
            self.no_data();
            return;
        }
        self.ensure_space(SPACE_TABLE);
        let column_width = self.content_width() / header.len() as f32;
        self.table_header(header, column_width);

        for row in rows {
            if self.y > self.height - SPACE_LINE {
                self.new_page();
                self.table_header(header, column_width);
            }
            let x0 = self.margin;
            for (i, cell) in row.iter().take(header.len()).enumerate() {
                let x = x0 + i as f32 * column_width + CELL_PADDING;
                let text = clip(&pdf_safe(cell), column_width - 2.0 * CELL_PADDING, TABLE_SIZE);
                self.text_at(x, &text, TABLE_SIZE, FontStyle::Regular, palette::TEXT);
            }
            self.gap(ROW_HEIGHT);
        }
        self.gap(8.0);
    }

    // -------------------------------------------------------------------------
    // Document structure
    // -------------------------------------------------------------------------

    fn document_header(&mut self) {
        self.line("Chat Export", TITLE_SIZE, FontStyle::Bold, palette::TEXT);
        let generated = format!("Generated on {}", format_timestamp_long(&self.opts.now));
        self.line(&generated, BODY_SIZE, FontStyle::Regular, palette::MUTED);
        self.rule(palette::GRAY);
        self.gap(12.0);
    }

    fn section(&mut self, section: &Section) {
        if let Some(title) = section.title() {
            self.heading(title);
        }
        match section.body() {
            SectionBody::Ready(variant) => self.variant(variant, section.title().is_some()),
            SectionBody::Malformed { reason, .. } => {
                log::debug!("pdf: '{}' section malformed: {}", section.type_name(), reason);
                self.malformed_sections += 1;
                self.no_data();
            }
            SectionBody::Unsupported { .. } => self.placeholder(section.type_name()),
        }
        self.gap(6.0);
    }

    fn variant(&mut self, variant: &Variant, titled: bool) {
        match variant {
            Variant::Text(text) => self.markdown(text),
            Variant::Error(message) => {
                self.paragraph(&format!("Error: {}", message), BODY_SIZE, FontStyle::Bold, palette::RED)
            }
            Variant::DataFrame(frame) => self.dataframe(frame),
            Variant::KeyValue(kv) => self.key_value(kv, titled),
            Variant::MetricGrid(grid) => self.metric_grid(grid),
            Variant::Virality(report) => self.virality(report),
            Variant::Forecast(chart) => self.forecast(chart, titled),
            Variant::MultiForecast(set) => {
                if set.forecasts.is_empty() {
                    self.no_data();
                }
                for child in &set.forecasts {
                    self.section(child);
                }
            }
            Variant::Playlist(report) => self.playlist(report),
            Variant::MultiSection(children) => {
                if children.is_empty() {
                    self.no_data();
                }
                for child in children {
                    self.section(child);
                }
            }
            Variant::Platforms(platforms) => {
                if platforms.is_empty() {
                    self.no_data();
                } else {
                    let names: Vec<&str> = platforms.iter().map(|p| p.name.as_str()).collect();
                    self.paragraph(&format!("Platforms: {}", names.join(", ")), BODY_SIZE, FontStyle::Regular, palette::TEXT);
                }
            }
            Variant::Countries(shares) => {
                let mut shares = shares.clone();
                shares.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
                let rows: Vec<Vec<String>> = shares
                    .iter()
                    .map(|s| vec![country_name(&s.country_code), s.country_code.to_ascii_uppercase(), format_percentage(s.percentage)])
                    .collect();
                self.table(&["Country".into(), "Code".into(), "Share".into()], &rows);
            }
            Variant::Image(_) => self.placeholder("image_base64"),
            Variant::Video(url) => {
                self.paragraph(&format!("Video: {}", url), BODY_SIZE, FontStyle::Regular, palette::BLUE)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Per-variant blocks
    // -------------------------------------------------------------------------

    fn markdown(&mut self, text: &str) {
        for block in parse_blocks(text) {
            match block {
                Block::Paragraph { spans } => {
                    let text: String = spans.into_iter().map(|s| s.text).collect();
                    self.paragraph(&text, BODY_SIZE, FontStyle::Regular, palette::TEXT);
                }
                Block::Table { header, rows } => self.table(&header, &rows),
            }
        }
    }

    fn dataframe(&mut self, frame: &DataFrame) {
        if frame.columns.is_empty() {
            self.no_data();
            return;
        }
        let fmt = &self.opts.formatter;
        let cells: Vec<Vec<String>> = frame
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(col, cell)| match col {
                        0 => cell.display(),
                        _ => fmt.format_scalar(&frame.columns[col], cell),
                    })
                    .collect()
            })
            .collect();

        let parts = chunk_ranges(frame.column_count(), self.opts.pdf_max_columns);
        if parts.len() > 1 {
            self.tables_split += 1;
        }
        for (i, range) in parts.iter().enumerate() {
            if parts.len() > 1 {
                self.subheading(&column_part_label(i, range));
            }
            let header = frame.columns[range.clone()].to_vec();
            let rows: Vec<Vec<String>> = cells.iter().map(|row| row[range.clone()].to_vec()).collect();
            self.table(&header, &rows);
        }
    }

    fn metric_value_table(&mut self, entries: &[(String, statdeck_core::Scalar)]) {
        let fmt = &self.opts.formatter;
        let rows: Vec<Vec<String>> = entries
            .iter()
            .map(|(key, value)| vec![snake_to_title_case(key), fmt.format_scalar(key, value)])
            .collect();
        self.table(&["Metric".into(), "Value".into()], &rows);
    }

    fn key_value(&mut self, kv: &KeyValue, titled: bool) {
        if let Some(title) = kv.title.as_deref().filter(|_| !titled) {
            self.subheading(title);
        }
        self.metric_value_table(&kv.entries);
    }

    fn metric_grid(&mut self, grid: &MetricGrid) {
        if grid.platforms.is_empty() {
            self.no_data();
        }
        for platform in &grid.platforms {
            self.subheading(&platform.platform);
            if let Some(url) = platform.primary_link() {
                self.line(url, TABLE_SIZE, FontStyle::Regular, palette::BLUE);
            }
            self.metric_value_table(&platform.metrics);
        }
    }

    fn virality(&mut self, report: &ViralityReport) {
        self.ensure_space(SPACE_CASCADE);
        self.line(
            &format!("Virality Report: {}", report.artist_name),
            HEADING_SIZE,
            FontStyle::Bold,
            palette::TEXT,
        );
        self.line(
            &format!("Virality Score: {}/100", plain_number(report.score)),
            SUBHEADING_SIZE,
            FontStyle::Bold,
            palette::TEXT,
        );
        self.line(
            &format!("Verdict: {}", report.verdict.label()),
            SUBHEADING_SIZE,
            FontStyle::Bold,
            palette::verdict_color(report.verdict),
        );
        if !report.summary.trim().is_empty() {
            self.paragraph(&report.summary, BODY_SIZE, FontStyle::Regular, palette::TEXT);
        }

        let growth = |value: Option<f64>| value.map(format_growth).unwrap_or_else(|| "N/A".to_string());
        self.subheading("Growth Rates");
        self.table(
            &["Metric".into(), "Value".into()],
            &[
                vec!["Audience Growth".into(), growth(report.audience_growth)],
                vec!["Engagement Growth".into(), growth(report.engagement_growth)],
            ],
        );

        for (label, analysis) in [
            ("Audience Analysis", &report.audience_analysis),
            ("Engagement Analysis", &report.engagement_analysis),
        ] {
            if let Some(text) = analysis.as_deref().filter(|t| !t.trim().is_empty()) {
                self.subheading(label);
                self.paragraph(text, BODY_SIZE, FontStyle::Regular, palette::TEXT);
            }
        }

        if report.detailed_metrics.is_empty() {
            return;
        }
        self.subheading("Detailed Metrics");
        let header: Vec<String> = ["Metric", "Status", "Growth", "Baseline Avg", "Recent Avg"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let rows: Vec<Vec<String>> = report
            .detailed_metrics
            .iter()
            .map(|(name, detail)| {
                vec![
                    snake_to_title_case(name),
                    snake_to_title_case(detail.status()),
                    detail.growth().map(format_growth).unwrap_or_default(),
                    detail.baseline_avg().map(compact_number).unwrap_or_default(),
                    detail.recent_avg().map(compact_number).unwrap_or_default(),
                ]
            })
            .collect();

        let parts = chunk_ranges(rows.len(), self.opts.pdf_max_metric_rows);
        if parts.len() > 1 {
            self.tables_split += 1;
        }
        for (i, range) in parts.iter().enumerate() {
            if parts.len() > 1 {
                self.subheading(&metrics_part_label(i));
            }
            self.table(&header, &rows[range.clone()]);
        }
    }

    fn forecast(&mut self, chart: &ForecastChart, titled: bool) {
        if !titled {
            self.subheading(&chart.title);
        }
        self.line(&format!("Y axis: {}", chart.y_axis_label), TABLE_SIZE, FontStyle::Regular, palette::MUTED);

        self.subheading("Historical Data");
        if chart.historical.is_empty() {
            self.no_data();
        } else {
            let rows: Vec<Vec<String>> = chart
                .historical
                .iter()
                .map(|p| vec![format_timestamp(&p.timestamp), plain_number(p.value)])
                .collect();
            self.table(&["Date".into(), chart.y_axis_label.clone()], &rows);
        }

        self.subheading("Forecast");
        if chart.forecast.is_empty() {
            self.no_data();
        } else {
            let bound = |b: Option<f64>| b.map(plain_number).unwrap_or_default();
            let rows: Vec<Vec<String>> = chart
                .forecast
                .iter()
                .map(|p| {
                    let (lower, upper) = p.band().map(|(l, u)| (Some(l), Some(u))).unwrap_or((None, None));
                    vec![format_timestamp(&p.timestamp), plain_number(p.value), bound(lower), bound(upper)]
                })
                .collect();
            self.table(&["Date".into(), "Forecast".into(), "Lower".into(), "Upper".into()], &rows);
        }
    }

    fn playlist(&mut self, report: &PlaylistReport) {
        self.ensure_space(SPACE_CASCADE);
        self.line(
            &format!("Playlist Recommendations: {} by {}", report.track_name, report.artist_name),
            SUBHEADING_SIZE,
            FontStyle::Bold,
            palette::TEXT,
        );
        if !report.summary.trim().is_empty() {
            self.paragraph(&report.summary, BODY_SIZE, FontStyle::Regular, palette::TEXT);
        }
        if report.recommendations.is_empty() {
            self.no_data();
            return;
        }
        let rows: Vec<Vec<String>> = report
            .recommendations
            .iter()
            .map(|r| {
                vec![
                    r.playlist_name.clone(),
                    r.curator_name.clone(),
                    r.platform.clone(),
                    r.followers.map(compact_number).unwrap_or_default(),
                    plain_number(r.score),
                ]
            })
            .collect();
        let header = ["Playlist", "Curator", "Platform", "Followers", "Score"].map(String::from);
        self.table(&header, &rows);
    }
}
