//! Plain-text rendering of a view tree (terminal output).

use unicode_width::UnicodeWidthStr;

use statdeck_core::format::plain_number;
use statdeck_core::markdown::Block;

use crate::dispatch::score_text;
use crate::series::{ChartPoint, SeriesStats};
use crate::state::SortDirection;
use crate::table::TableView;
use crate::view::{BannerLevel, ForecastView, GridView, PlaylistView, View, ViralityView};

/// Cells wider than this are clipped in text tables
const MAX_CELL_WIDTH: usize = 40;

pub fn render_text(view: &View) -> String {
    let mut out = String::new();
    write_view(&mut out, view, 0);
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(text);
    out.push('\n');
}

fn write_view(out: &mut String, view: &View, depth: usize) {
    match view {
        View::Empty => {}
        View::Stack { children } => {
            for child in children {
                write_view(out, child, depth);
            }
        }
        View::Section { title, body, .. } => {
            line(out, depth, &format!("## {}", title));
            write_view(out, body, depth + 1);
        }
        View::Markdown { blocks } => {
            for block in blocks {
                match block {
                    Block::Paragraph { spans } => {
                        let text: String = spans.iter().map(|s| s.text.as_str()).collect();
                        for l in text.lines() {
                            line(out, depth, l);
                        }
                    }
                    Block::Table { header, rows } => write_grid(out, depth, header, rows),
                }
                out.push('\n');
            }
        }
        View::Banner { level, message } => {
            let label = match level {
                BannerLevel::Error => "ERROR",
                BannerLevel::Warning => "WARNING",
                BannerLevel::Notice => "NOTE",
            };
            line(out, depth, &format!("[{}] {}", label, message));
        }
        View::Table(table) => write_table(out, depth, table),
        View::Grid(grid) => write_key_values(out, depth, grid),
        View::Virality(virality) => write_virality(out, depth, virality),
        View::Forecast(forecast) => write_forecast(out, depth, forecast),
        View::ForecastSet(set) => {
            if set.options.len() > 1 {
                line(out, depth, &format!("Forecasts: {}", set.options.join(" | ")));
            }
            for child in &set.children {
                let marker = if child.expanded { "-" } else { "+" };
                line(out, depth, &format!("[{}] {}", marker, child.title));
                if let Some(body) = &child.body {
                    write_view(out, body, depth + 1);
                }
            }
        }
        View::Playlist(playlist) => write_playlist(out, depth, playlist),
        View::Platforms { platforms } => {
            let names: Vec<&str> = platforms.iter().map(|p| p.name.as_str()).collect();
            line(out, depth, &format!("Platforms: {}", names.join(", ")));
        }
        View::Countries { cards } => {
            let rows: Vec<Vec<String>> = cards
                .iter()
                .map(|c| vec![c.name.clone(), c.code.clone(), c.label.clone()])
                .collect();
            write_grid(out, depth, &["Country".into(), "Code".into(), "Share".into()], &rows);
        }
        View::Image(image) => match (&image.format, &image.notice) {
            (Some(format), _) if image.visible => {
                line(out, depth, &format!("[image: {}, {} bytes]", format.extension(), image.byte_len))
            }
            (_, Some(notice)) => line(out, depth, notice),
            _ => {}
        },
        View::Video(video) => match (&video.url, &video.notice) {
            (Some(url), _) if video.visible => line(out, depth, &format!("[video] {}", url)),
            (_, Some(notice)) => line(out, depth, notice),
            _ => {}
        },
        View::Malformed { context, reason, json } => {
            line(out, depth, &format!("[WARNING] {} data could not be verified: {}", context, reason));
            for l in json.lines() {
                line(out, depth + 1, l);
            }
        }
        View::Unknown { type_name, answer, json } => {
            for l in answer.lines() {
                line(out, depth, l);
            }
            line(out, depth, &format!("[WARNING] Unrecognized data type '{}'. Raw data:", type_name));
            line(out, depth + 1, json);
        }
    }
}

fn clip(text: &str) -> String {
    if text.width() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut clipped = String::new();
    for ch in text.chars() {
        if clipped.width() + 4 > MAX_CELL_WIDTH {
            break;
        }
        clipped.push(ch);
    }
    clipped.push_str("...");
    clipped
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Aligned columns with a dashed rule under the header.
fn write_grid(out: &mut String, depth: usize, header: &[String], rows: &[Vec<String>]) {
    let header: Vec<String> = header.iter().map(|h| clip(h)).collect();
    let rows: Vec<Vec<String>> = rows.iter().map(|r| r.iter().map(|c| clip(c)).collect()).collect();

    let columns = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows.iter().chain([&header]) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let format_row = |row: &[String]| {
        let cells: Vec<String> = (0..columns)
            .map(|i| pad(row.get(i).map(String::as_str).unwrap_or(""), widths[i]))
            .collect();
        cells.join("  ").trim_end().to_string()
    };

    line(out, depth, &format_row(&header));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    line(out, depth, &rule.join("  "));
    for row in &rows {
        line(out, depth, &format_row(row));
    }
}

fn write_table(out: &mut String, depth: usize, table: &TableView) {
    let mut header: Vec<String> = table
        .columns
        .iter()
        .map(|c| match c.sort {
            Some(SortDirection::Ascending) => format!("{} ^", c.name),
            Some(SortDirection::Descending) => format!("{} v", c.name),
            None => c.name.clone(),
        })
        .collect();
    let labelled = table.rows.iter().any(|r| r.label.is_some());
    if labelled {
        header.insert(0, String::new());
    }

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            let mut cells = r.cells.clone();
            if labelled {
                cells.insert(0, r.label.clone().unwrap_or_default());
            }
            cells
        })
        .collect();
    write_grid(out, depth, &header, &rows);

    if table.is_filtered() {
        line(
            out,
            depth,
            &format!("({} of {} rows match \"{}\")", table.rows.len(), table.total_rows, table.search),
        );
    }
}

fn write_key_values(out: &mut String, depth: usize, grid: &GridView) {
    if let Some(title) = &grid.title {
        line(out, depth, title);
    }
    for group in &grid.groups {
        let mut inner = depth;
        if let Some(name) = &group.name {
            let links: Vec<String> = group.links.iter().map(|l| format!("<{}>", l.url)).collect();
            line(out, depth, format!("{} {}", name, links.join(" ")).trim_end());
            inner += 1;
        }
        let label_width = group.entries.iter().map(|e| e.label.width()).max().unwrap_or(0);
        for entry in &group.entries {
            line(out, inner, &format!("{}  {}", pad(&entry.label, label_width), entry.value));
        }
    }
}

fn write_virality(out: &mut String, depth: usize, v: &ViralityView) {
    line(out, depth, &format!("Virality report: {}", v.artist_name));
    line(out, depth, &format!("Score: {}  Verdict: {}", score_text(v.score), v.verdict_label));
    if let Some(growth) = &v.audience_growth {
        line(out, depth, &format!("Audience growth: {}", growth));
    }
    if let Some(growth) = &v.engagement_growth {
        line(out, depth, &format!("Engagement growth: {}", growth));
    }
    if !v.summary.is_empty() {
        line(out, depth, &v.summary);
    }
    for text in [&v.audience_analysis, &v.engagement_analysis].into_iter().flatten() {
        line(out, depth, text);
    }
    for group in &v.groups {
        line(out, depth, &format!("{} metrics", group.group.label()));
        let rows: Vec<Vec<String>> = group
            .metrics
            .iter()
            .map(|m| {
                vec![
                    m.name.clone(),
                    m.status.to_string(),
                    m.growth.clone().unwrap_or_default(),
                    m.baseline.clone().unwrap_or_default(),
                    m.recent.clone().unwrap_or_default(),
                ]
            })
            .collect();
        let header = ["Metric", "Status", "Growth", "Baseline", "Recent"].map(String::from);
        write_grid(out, depth + 1, &header, &rows);
    }
}

fn stats_line(stats: &SeriesStats) -> String {
    format!(
        "n={}  avg={}  min={}  max={}  latest={}",
        stats.count,
        plain_number(stats.average),
        plain_number(stats.min),
        plain_number(stats.max),
        plain_number(stats.latest)
    )
}

fn point_rows(points: &[ChartPoint]) -> Vec<Vec<String>> {
    points
        .iter()
        .map(|p| {
            let band = match (p.lower, p.upper) {
                (Some(lower), Some(upper)) => format!("{} .. {}", plain_number(lower), plain_number(upper)),
                _ => String::new(),
            };
            vec![p.date.clone(), plain_number(p.value), band]
        })
        .collect()
}

fn write_forecast(out: &mut String, depth: usize, f: &ForecastView) {
    line(out, depth, &format!("{} ({})", f.title, f.y_axis_label));

    let h = &f.historical;
    line(
        out,
        depth,
        &format!("Historical [{}]: {} of {} points", h.window.as_str(), h.points.len(), h.total_points),
    );
    if let Some(stats) = &h.stats {
        line(out, depth + 1, &stats_line(stats));
    }
    let rows: Vec<Vec<String>> = h.points.iter().map(|p| vec![p.date.clone(), plain_number(p.value)]).collect();
    write_grid(out, depth + 1, &["Date".into(), "Value".into()], &rows);

    line(out, depth, &format!("Forecast: {} points", f.forecast.points.len()));
    if let Some(stats) = &f.forecast.stats {
        line(out, depth + 1, &stats_line(stats));
    }
    let mut header = vec!["Date".to_string(), "Forecast".to_string()];
    if f.forecast.has_band {
        header.push("Confidence band".to_string());
    }
    let rows: Vec<Vec<String>> = point_rows(&f.forecast.points)
        .into_iter()
        .map(|mut r| {
            r.truncate(header.len());
            r
        })
        .collect();
    write_grid(out, depth + 1, &header, &rows);
}

fn write_playlist(out: &mut String, depth: usize, p: &PlaylistView) {
    line(out, depth, &format!("Playlists for \"{}\" by {}", p.track_name, p.artist_name));
    if !p.summary.is_empty() {
        line(out, depth, &p.summary);
    }
    for card in &p.cards {
        let followers = card.followers.as_deref().map(|f| format!(", {} followers", f)).unwrap_or_default();
        line(
            out,
            depth,
            &format!(
                "- {} ({}, {}{}) score {} [{}]",
                card.playlist_name,
                card.curator_name,
                card.platform,
                followers,
                plain_number(card.score),
                card.tier.as_str()
            ),
        );
        if let Some(url) = &card.url {
            line(out, depth + 1, url);
        }
        if card.expanded {
            for (factor, why) in &card.reasoning {
                line(out, depth + 1, &format!("{}: {}", factor, why));
            }
        } else if card.reasoning_count > 0 {
            line(out, depth + 1, &format!("(+{} reasons)", card.reasoning_count));
        }
    }
}
