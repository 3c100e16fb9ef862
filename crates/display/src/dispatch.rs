//! Display dispatcher: `(data_type, display_data, answer_text)` to a view.
//!
//! Payloads are classified by `statdeck_core::payload`, the same pass the
//! exporters use. Containers and untyped arrays render per child; record
//! lists and tagged payloads render as one body.
//!
//! Nothing here fails. Malformed payloads and unknown tags become labelled
//! fallback views carrying the raw JSON.

use serde_json::Value;

use statdeck_config::palette::{status_color, verdict_color};
use statdeck_config::Settings;
use statdeck_core::format::{compact_number, format_growth, plain_number, snake_to_title_case};
use statdeck_core::markdown::parse_blocks;
use statdeck_core::media::{check_video_url, decode_image};
use statdeck_core::variant::{
    ForecastChart, MetricDetail, MultiForecast, PlaylistReport, ViralityReport, URL_KEY_SUFFIX,
};
use statdeck_core::payload::{result_title, sniff_tag};
use statdeck_core::{classify_payload, PayloadShape, Section, SectionBody, Tag, ValueFormatter, Variant};

use crate::countries::country_cards;
use crate::series::{filter_series, ChartPoint, SeriesStats};
use crate::state::{child_id, ForecastLayout, ViewState};
use crate::table::project_table;
use crate::view::{
    BannerLevel, ForecastChild, ForecastPanel, ForecastSetView, ForecastView, GridEntry, GridGroup, GridView,
    HistoricalPanel, ImageView, Link, MetricGroup, MetricGroupView, MetricRow, PlaylistCard, PlaylistView,
    ScoreTier, VideoView, View, ViralityView,
};

/// Path id of the top-level payload
pub const ROOT_ID: &str = "0";

/// Render-time collaborators that are not view state.
#[derive(Debug, Clone, Default)]
pub struct DisplayContext {
    pub formatter: ValueFormatter,
}

impl DisplayContext {
    pub fn from_settings(settings: &Settings) -> Self {
        Self { formatter: settings.formatter() }
    }
}

/// Render one assistant turn.
pub fn render(
    data_type: &str,
    display_data: &Value,
    answer_text: &str,
    state: &ViewState,
    ctx: &DisplayContext,
) -> View {
    let answer = answer_view(answer_text);
    if display_data.is_null() {
        return answer;
    }

    match classify_payload(data_type, display_data) {
        PayloadShape::Container(items) | PayloadShape::SectionList(items) => {
            log::debug!("render: multi-section container with {} section(s)", items.len());
            let children = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let section = Section::from_wire_at(item, state.now);
                    render_section(&section, &child_id(ROOT_ID, i), state, ctx)
                })
                .collect();
            return View::stack(vec![answer, View::stack(children)]);
        }
        PayloadShape::Records(tag) => {
            let section = Section::from_value_at(tag.as_str(), display_data, None, state.now);
            return View::stack(vec![answer, render_body(&section, ROOT_ID, state, ctx)]);
        }
        PayloadShape::Results(items) => {
            log::debug!("render: sniffing {} array element(s)", items.len());
            let children = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let tag = sniff_tag(item);
                    let section = Section::from_value_at(tag.as_str(), item, Some(result_title(i)), state.now);
                    render_section(&section, &child_id(ROOT_ID, i), state, ctx)
                })
                .collect();
            return View::stack(vec![answer, View::stack(children)]);
        }
        PayloadShape::Tagged => {}
    }

    // Tag switch
    let section = Section::from_value_at(data_type, display_data, None, state.now);
    match section.body() {
        SectionBody::Unsupported { raw } => {
            log::warn!("unrecognized data_type '{}'; showing raw payload", data_type);
            View::Unknown {
                type_name: section.type_name().to_string(),
                answer: answer_text.trim().to_string(),
                json: compact_json(raw),
            }
        }
        SectionBody::Ready(_) | SectionBody::Malformed { .. } => {
            View::stack(vec![answer, render_body(&section, ROOT_ID, state, ctx)])
        }
    }
}

/// A nested section under a titled wrapper.
pub fn render_section(section: &Section, id: &str, state: &ViewState, ctx: &DisplayContext) -> View {
    let body = render_body(section, id, state, ctx);
    let plain_text = matches!(section.tag(), Some(Tag::Text)) && section.title().is_none();
    if plain_text {
        return body;
    }
    View::Section {
        id: id.to_string(),
        title: section.display_title(),
        type_name: section.type_name().to_string(),
        body: Box::new(body),
    }
}

/// A section's body without the title wrapper.
pub fn render_body(section: &Section, id: &str, state: &ViewState, ctx: &DisplayContext) -> View {
    match section.body() {
        SectionBody::Ready(variant) => render_variant(variant, id, state, ctx),
        SectionBody::Malformed { raw, reason } => View::Malformed {
            context: section.type_name().to_string(),
            reason: reason.clone(),
            json: pretty_json(raw),
        },
        SectionBody::Unsupported { raw } => {
            log::warn!("unsupported section type '{}' at {}", section.type_name(), id);
            View::Unknown {
                type_name: section.type_name().to_string(),
                answer: String::new(),
                json: compact_json(raw),
            }
        }
    }
}

fn render_variant(variant: &Variant, id: &str, state: &ViewState, ctx: &DisplayContext) -> View {
    let fmt = &ctx.formatter;
    match variant {
        Variant::Text(text) => View::Markdown { blocks: parse_blocks(text) },
        Variant::Error(message) => View::Banner { level: BannerLevel::Error, message: message.clone() },
        Variant::DataFrame(frame) => {
            let table_state = state.table(id, &frame.columns);
            View::Table(project_table(id, frame, &table_state, fmt))
        }
        Variant::KeyValue(kv) => View::Grid(GridView {
            title: kv.title.clone(),
            groups: vec![GridGroup {
                name: None,
                links: Vec::new(),
                entries: kv
                    .entries
                    .iter()
                    .map(|(key, value)| GridEntry {
                        label: snake_to_title_case(key),
                        value: fmt.format_scalar(key, value),
                    })
                    .collect(),
            }],
        }),
        Variant::MetricGrid(grid) => View::Grid(GridView {
            title: None,
            groups: grid
                .platforms
                .iter()
                .map(|platform| GridGroup {
                    name: Some(platform.platform.clone()),
                    links: platform
                        .links
                        .iter()
                        .map(|(key, url)| Link { label: link_label(key), url: url.clone() })
                        .collect(),
                    entries: platform
                        .metrics
                        .iter()
                        .map(|(key, value)| GridEntry {
                            label: snake_to_title_case(key),
                            value: fmt.format_scalar(key, value),
                        })
                        .collect(),
                })
                .collect(),
        }),
        Variant::Virality(report) => View::Virality(virality_view(report)),
        Variant::Forecast(chart) => View::Forecast(forecast_view(chart, id, state)),
        Variant::MultiForecast(set) => View::ForecastSet(forecast_set_view(set, id, state, ctx)),
        Variant::Playlist(report) => View::Playlist(playlist_view(report, id, state)),
        Variant::MultiSection(children) => View::stack(
            children
                .iter()
                .enumerate()
                .map(|(i, child)| render_section(child, &child_id(id, i), state, ctx))
                .collect(),
        ),
        Variant::Platforms(platforms) => View::Platforms { platforms: platforms.clone() },
        Variant::Countries(shares) => View::Countries { cards: country_cards(shares) },
        Variant::Image(payload) => image_view(payload),
        Variant::Video(url) => video_view(url),
    }
}

// =============================================================================
// Per-variant views
// =============================================================================

fn answer_view(answer_text: &str) -> View {
    if answer_text.trim().is_empty() {
        View::Empty
    } else {
        View::Markdown { blocks: parse_blocks(answer_text) }
    }
}

/// `Spotify_URL` -> `Spotify`
fn link_label(key: &str) -> String {
    let stem = key.len().checked_sub(URL_KEY_SUFFIX.len()).map(|end| &key[..end]).unwrap_or(key);
    let stem = stem.trim_end_matches('_');
    if stem.is_empty() {
        "Link".to_string()
    } else {
        snake_to_title_case(stem)
    }
}

/// Audience: follower|subscriber|audience. Engagement:
/// like|comment|share|engagement|view. Case-insensitive.
pub fn metric_group(name: &str) -> MetricGroup {
    let name = name.to_lowercase();
    let any = |words: &[&str]| words.iter().any(|w| name.contains(w));
    if any(&["follower", "subscriber", "audience"]) {
        MetricGroup::Audience
    } else if any(&["like", "comment", "share", "engagement", "view"]) {
        MetricGroup::Engagement
    } else {
        MetricGroup::Other
    }
}

fn metric_row(name: &str, detail: &MetricDetail) -> MetricRow {
    MetricRow {
        name: snake_to_title_case(name),
        status: detail.status(),
        color: status_color(detail).to_hex_string(),
        growth: detail.growth().map(format_growth),
        baseline: detail.baseline_avg().map(compact_number),
        recent: detail.recent_avg().map(compact_number),
    }
}

fn virality_view(report: &ViralityReport) -> ViralityView {
    let mut groups: Vec<MetricGroupView> = Vec::new();
    for group in [MetricGroup::Audience, MetricGroup::Engagement, MetricGroup::Other] {
        let metrics: Vec<MetricRow> = report
            .detailed_metrics
            .iter()
            .filter(|(name, _)| metric_group(name) == group)
            .map(|(name, detail)| metric_row(name, detail))
            .collect();
        if !metrics.is_empty() {
            groups.push(MetricGroupView { group, metrics });
        }
    }

    ViralityView {
        artist_name: report.artist_name.clone(),
        score: report.score,
        verdict: report.verdict,
        verdict_label: report.verdict.label(),
        verdict_color: verdict_color(report.verdict).to_hex_string(),
        audience_growth: report.audience_growth.map(format_growth),
        engagement_growth: report.engagement_growth.map(format_growth),
        summary: report.summary.clone(),
        audience_analysis: report.audience_analysis.clone(),
        engagement_analysis: report.engagement_analysis.clone(),
        groups,
    }
}

fn forecast_view(chart: &ForecastChart, id: &str, state: &ViewState) -> ForecastView {
    let window = state.window(id);
    let shown = filter_series(&chart.historical, window, state.now);
    let historical_values: Vec<f64> = shown.iter().map(|p| p.value).collect();
    let forecast_values: Vec<f64> = chart.forecast.iter().map(|p| p.value).collect();

    ForecastView {
        id: id.to_string(),
        title: chart.title.clone(),
        y_axis_label: chart.y_axis_label.clone(),
        historical: HistoricalPanel {
            window,
            points: shown.iter().map(ChartPoint::from).collect(),
            total_points: chart.historical.len(),
            stats: SeriesStats::compute(&historical_values),
        },
        forecast: ForecastPanel {
            points: chart.forecast.iter().map(ChartPoint::from).collect(),
            has_band: chart.forecast.iter().any(|p| p.band().is_some()),
            stats: SeriesStats::compute(&forecast_values),
        },
    }
}

fn forecast_set_view(set: &MultiForecast, id: &str, state: &ViewState, ctx: &DisplayContext) -> ForecastSetView {
    let options: Vec<String> = set
        .forecasts
        .iter()
        .map(|section| match section.variant() {
            Some(Variant::Forecast(chart)) => chart.title.clone(),
            _ => section.display_title(),
        })
        .collect();

    let child = |i: usize, expanded: bool| {
        let node_id = child_id(id, i);
        let body = expanded.then(|| Box::new(render_body(&set.forecasts[i], &node_id, state, ctx)));
        ForecastChild { id: node_id, title: options[i].clone(), expanded, body }
    };

    // An out-of-range selection falls back to the last forecast
    let layout = match state.layout(id) {
        ForecastLayout::Single(i) => ForecastLayout::Single(i.min(set.forecasts.len().saturating_sub(1))),
        ForecastLayout::Grid => ForecastLayout::Grid,
    };
    let children = match layout {
        ForecastLayout::Single(i) if i < set.forecasts.len() => vec![child(i, true)],
        ForecastLayout::Single(_) => Vec::new(),
        ForecastLayout::Grid => (0..set.forecasts.len())
            .map(|i| child(i, state.is_expanded(&child_id(id, i))))
            .collect(),
    };

    ForecastSetView { id: id.to_string(), layout, options, children }
}

fn playlist_view(report: &PlaylistReport, id: &str, state: &ViewState) -> PlaylistView {
    let cards = report
        .recommendations
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let card_id = child_id(id, i);
            let expanded = state.is_expanded(&card_id);
            PlaylistCard {
                playlist_name: rec.playlist_name.clone(),
                curator_name: rec.curator_name.clone(),
                platform: rec.platform.clone(),
                followers: rec.followers.map(compact_number),
                url: rec.url.clone(),
                score: rec.score,
                tier: ScoreTier::for_score(rec.score),
                expanded,
                reasoning_count: rec.reasoning.len(),
                reasoning: if expanded {
                    rec.reasoning
                        .iter()
                        .map(|(factor, why)| (snake_to_title_case(factor), why.clone()))
                        .collect()
                } else {
                    Vec::new()
                },
                id: card_id,
            }
        })
        .collect();

    PlaylistView {
        track_name: report.track_name.clone(),
        artist_name: report.artist_name.clone(),
        summary: report.summary.clone(),
        cards,
    }
}

fn image_view(payload: &str) -> View {
    match decode_image(payload) {
        Ok(image) => View::Image(ImageView {
            visible: true,
            format: Some(image.format),
            byte_len: image.bytes.len(),
            notice: None,
        }),
        Err(e) => {
            log::warn!("image_base64: {}", e);
            View::Image(ImageView {
                visible: false,
                format: None,
                byte_len: 0,
                notice: Some("Image could not be displayed.".to_string()),
            })
        }
    }
}

fn video_view(url: &str) -> View {
    match check_video_url(url) {
        Ok(url) => View::Video(VideoView { visible: true, url: Some(url.to_string()), notice: None }),
        Err(e) => {
            log::warn!("video_url: {}", e);
            View::Video(VideoView {
                visible: false,
                url: None,
                notice: Some("Video could not be loaded.".to_string()),
            })
        }
    }
}

fn compact_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Score text shared by the plain-text renderer.
pub fn score_text(score: f64) -> String {
    format!("{}/100", plain_number(score))
}
