//! Typed payloads, one per tag family.
//!
//! Decoding is lenient about scalar types (numbers sent as strings, missing
//! optional prose) and strict about structure, which the schema has already
//! checked by the time `Variant::decode` runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::format::try_parse_timestamp;
use crate::scalar::{json_f64, Scalar};
use crate::section::Section;
use crate::tag::Tag;

/// Metric-grid keys with this suffix carry a link, not a metric
pub const URL_KEY_SUFFIX: &str = "_URL";

#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Text(String),
    Error(String),
    DataFrame(DataFrame),
    KeyValue(KeyValue),
    MetricGrid(MetricGrid),
    Virality(ViralityReport),
    Forecast(ForecastChart),
    MultiForecast(MultiForecast),
    Playlist(PlaylistReport),
    MultiSection(Vec<Section>),
    Platforms(Vec<Platform>),
    Countries(Vec<CountryShare>),
    Image(String),
    Video(String),
}

// =============================================================================
// Payload types
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    pub columns: Vec<String>,
    /// Every row has exactly `columns.len()` cells
    pub rows: Vec<Vec<Scalar>>,
    pub index: Option<Vec<Scalar>>,
    ragged_rows: usize,
}

impl DataFrame {
    /// Build a frame, padding short rows with nulls and truncating long ones.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        let width = columns.len();
        let mut ragged_rows = 0;
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() != width {
                    ragged_rows += 1;
                    row.resize(width, Scalar::Null);
                }
                row
            })
            .collect();
        Self { columns, rows, index: None, ragged_rows }
    }

    /// Number of source rows whose length did not match the header
    pub fn ragged_rows(&self) -> usize {
        self.ragged_rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub title: Option<String>,
    pub entries: Vec<(String, Scalar)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricGrid {
    pub platforms: Vec<PlatformMetrics>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformMetrics {
    pub platform: String,
    pub metrics: Vec<(String, Scalar)>,
    /// `(key, url)` pairs taken from `*_URL` keys
    pub links: Vec<(String, String)>,
}

impl PlatformMetrics {
    pub fn primary_link(&self) -> Option<&str> {
        self.links.first().map(|(_, url)| url.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Viral,
    Trending,
    Stable,
    Declining,
    Unknown,
}

impl Verdict {
    pub fn parse(text: &str) -> Verdict {
        match text.trim().to_ascii_lowercase().as_str() {
            "viral" => Verdict::Viral,
            "trending" => Verdict::Trending,
            "stable" => Verdict::Stable,
            "declining" => Verdict::Declining,
            _ => Verdict::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Viral => "viral",
            Verdict::Trending => "trending",
            Verdict::Stable => "stable",
            Verdict::Declining => "declining",
            Verdict::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Viral => "Viral",
            Verdict::Trending => "Trending",
            Verdict::Stable => "Stable",
            Verdict::Declining => "Declining",
            Verdict::Unknown => "Unknown",
        }
    }
}

/// Per-metric detail; the status decides which numbers may exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricDetail {
    Calculated {
        growth: Option<f64>,
        baseline_avg: Option<f64>,
        recent_avg: Option<f64>,
    },
    Unavailable {
        recent_avg: Option<f64>,
    },
    DataError,
}

impl MetricDetail {
    pub fn status(&self) -> &'static str {
        match self {
            MetricDetail::Calculated { .. } => "calculated",
            MetricDetail::Unavailable { .. } => "unavailable",
            MetricDetail::DataError => "data_error",
        }
    }

    pub fn growth(&self) -> Option<f64> {
        match self {
            MetricDetail::Calculated { growth, .. } => *growth,
            _ => None,
        }
    }

    pub fn baseline_avg(&self) -> Option<f64> {
        match self {
            MetricDetail::Calculated { baseline_avg, .. } => *baseline_avg,
            _ => None,
        }
    }

    pub fn recent_avg(&self) -> Option<f64> {
        match self {
            MetricDetail::Calculated { recent_avg, .. } | MetricDetail::Unavailable { recent_avg } => *recent_avg,
            MetricDetail::DataError => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViralityReport {
    pub artist_name: String,
    pub audience_growth: Option<f64>,
    pub engagement_growth: Option<f64>,
    /// 0..=100
    pub score: f64,
    pub verdict: Verdict,
    pub summary: String,
    pub audience_analysis: Option<String>,
    pub engagement_analysis: Option<String>,
    pub detailed_metrics: Vec<(String, MetricDetail)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ForecastPoint {
    /// Confidence band, only when both bounds are present.
    pub fn band(&self) -> Option<(f64, f64)> {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => Some((lower, upper)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastChart {
    pub title: String,
    pub y_axis_label: String,
    pub historical_columns: Vec<String>,
    pub forecast_columns: Vec<String>,
    pub historical: Vec<SeriesPoint>,
    pub forecast: Vec<ForecastPoint>,
    dropped_rows: usize,
}

impl ForecastChart {
    /// Rows skipped for having the wrong arity or a non-numeric value
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiForecast {
    /// Each child is a `forecast_chart` section (possibly malformed)
    pub forecasts: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistReport {
    pub track_name: String,
    pub artist_name: String,
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub playlist_name: String,
    pub curator_name: String,
    pub platform: String,
    pub followers: Option<f64>,
    pub url: Option<String>,
    pub score: f64,
    pub reasoning: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Platform {
    pub name: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryShare {
    pub country_code: String,
    pub percentage: f64,
}

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Deserialize)]
struct RawDataFrame {
    columns: Vec<Value>,
    data: Vec<Vec<Value>>,
    #[serde(default)]
    index: Option<Vec<Value>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawVirality {
    #[serde(alias = "artist")]
    artist_name: String,
    #[serde(alias = "audience_growth", alias = "audience_growth_percent")]
    audience_growth_percentage: Value,
    #[serde(alias = "engagement_growth", alias = "engagement_growth_percent")]
    engagement_growth_percentage: Value,
    virality_score: Value,
    verdict: Value,
    summary: Value,
    audience_analysis: Option<String>,
    engagement_analysis: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    detailed_metrics: Map<String, Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawSeries {
    #[serde(deserialize_with = "null_as_default")]
    columns: Vec<Value>,
    data: Vec<Vec<Value>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawForecast {
    title: Option<String>,
    y_axis_label: Option<String>,
    historical_data: RawSeries,
    forecast_data: RawSeries,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawPlaylistReport {
    #[serde(alias = "track", deserialize_with = "null_as_default")]
    track_name: String,
    #[serde(alias = "artist", deserialize_with = "null_as_default")]
    artist_name: String,
    #[serde(deserialize_with = "null_as_default")]
    summary: String,
    #[serde(deserialize_with = "null_as_default")]
    recommendations: Vec<RawRecommendation>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawRecommendation {
    #[serde(deserialize_with = "null_as_default")]
    playlist_name: String,
    #[serde(deserialize_with = "null_as_default")]
    curator_name: String,
    #[serde(deserialize_with = "null_as_default")]
    platform: String,
    followers: Value,
    url: Option<String>,
    score: Value,
    #[serde(deserialize_with = "null_as_default")]
    reasoning: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawPlatform {
    name: String,
    #[serde(default)]
    icon_url: Option<String>,
}

#[derive(Deserialize)]
struct RawCountry {
    #[serde(rename = "countryCode", alias = "country_code")]
    country_code: String,
    percentage: Value,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// =============================================================================
// Decoding
// =============================================================================

impl Variant {
    /// Decode a normalized, schema-checked payload.
    pub fn decode(tag: Tag, value: &Value, now: DateTime<Utc>) -> Result<Variant, String> {
        match tag {
            Tag::Text => text_of(value).map(Variant::Text),
            Tag::Error => text_of(value).map(Variant::Error),
            Tag::ImageBase64 => text_of(value).map(Variant::Image),
            Tag::VideoUrl => text_of(value).map(Variant::Video),
            Tag::Dataframe | Tag::Table => decode_dataframe(value).map(Variant::DataFrame),
            Tag::KeyValue => decode_key_value(value).map(Variant::KeyValue),
            Tag::MetricGrid => decode_metric_grid(value).map(Variant::MetricGrid),
            Tag::ViralityReport => decode_virality(value).map(Variant::Virality),
            Tag::ForecastChart => decode_forecast(value, now).map(Variant::Forecast),
            Tag::MultiForecastDisplay => Ok(Variant::MultiForecast(decode_multi_forecast(value, now))),
            Tag::PlaylistRecommendationReport => decode_playlist(value).map(Variant::Playlist),
            Tag::MultiSectionReport => Ok(Variant::MultiSection(decode_sections(value, now))),
            Tag::PlatformData => decode_platforms(value).map(Variant::Platforms),
            Tag::CountryListenershipData => decode_countries(value).map(Variant::Countries),
        }
    }
}

fn from_value<T: for<'de> Deserialize<'de>>(value: &Value, what: &str) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| format!("invalid {}: {}", what, e))
}

fn text_of(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| "expected a string payload".to_string())
}

/// Column headers may arrive as numbers; everything becomes a label.
fn label_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn prose_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => label_of(other),
    }
}

fn decode_dataframe(value: &Value) -> Result<DataFrame, String> {
    let raw: RawDataFrame = from_value(value, "dataframe")?;
    let columns = raw.columns.iter().map(label_of).collect();
    let rows = raw
        .data
        .iter()
        .map(|row| row.iter().map(Scalar::from_json).collect())
        .collect();

    let mut frame = DataFrame::new(columns, rows);
    if frame.ragged_rows() > 0 {
        log::debug!(
            "dataframe: {} row(s) did not match {} column(s); padded or truncated",
            frame.ragged_rows(),
            frame.column_count()
        );
    }
    frame.index = raw.index.map(|index| index.iter().map(Scalar::from_json).collect());
    Ok(frame)
}

fn entries_of(map: &Map<String, Value>) -> Vec<(String, Scalar)> {
    map.iter().map(|(k, v)| (k.clone(), Scalar::from_json(v))).collect()
}

fn decode_key_value(value: &Value) -> Result<KeyValue, String> {
    let data = value
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| "key_value data must be an object".to_string())?;
    Ok(KeyValue {
        title: value.get("title").and_then(Value::as_str).map(str::to_string),
        entries: entries_of(data),
    })
}

fn decode_metric_grid(value: &Value) -> Result<MetricGrid, String> {
    let data = value
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| "metric_grid data must be an object".to_string())?;

    let mut platforms = Vec::with_capacity(data.len());
    for (platform, metrics) in data {
        let mut entry = PlatformMetrics {
            platform: platform.clone(),
            metrics: Vec::new(),
            links: Vec::new(),
        };
        match metrics {
            Value::Object(map) => {
                for (key, value) in map {
                    if key.to_ascii_uppercase().ends_with(URL_KEY_SUFFIX) {
                        if let Some(url) = value.as_str().filter(|u| !u.trim().is_empty()) {
                            entry.links.push((key.clone(), url.trim().to_string()));
                        }
                    } else {
                        entry.metrics.push((key.clone(), Scalar::from_json(value)));
                    }
                }
            }
            // A scalar in platform position is a single unnamed metric
            other => entry.metrics.push(("value".to_string(), Scalar::from_json(other))),
        }
        platforms.push(entry);
    }
    Ok(MetricGrid { platforms })
}

fn decode_metric_detail(value: &Value) -> MetricDetail {
    let number = |field: &str| value.get(field).and_then(json_f64);
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    match status.as_str() {
        "calculated" => MetricDetail::Calculated {
            growth: number("growth"),
            baseline_avg: number("baseline_avg"),
            recent_avg: number("recent_avg"),
        },
        "unavailable" => MetricDetail::Unavailable {
            recent_avg: number("recent_avg"),
        },
        _ => MetricDetail::DataError,
    }
}

fn decode_virality(value: &Value) -> Result<ViralityReport, String> {
    let raw: RawVirality = from_value(value, "virality_report")?;
    let score = json_f64(&raw.virality_score)
        .ok_or_else(|| "virality_score must be numeric".to_string())?
        .clamp(0.0, 100.0);

    Ok(ViralityReport {
        artist_name: raw.artist_name,
        audience_growth: json_f64(&raw.audience_growth_percentage),
        engagement_growth: json_f64(&raw.engagement_growth_percentage),
        score,
        verdict: raw.verdict.as_str().map(Verdict::parse).unwrap_or(Verdict::Unknown),
        summary: prose_of(&raw.summary),
        audience_analysis: raw.audience_analysis,
        engagement_analysis: raw.engagement_analysis,
        detailed_metrics: raw
            .detailed_metrics
            .iter()
            .map(|(name, detail)| (name.clone(), decode_metric_detail(detail)))
            .collect(),
    })
}

/// Decode `[timestamp, value, lower?, upper?]` rows.
///
/// Unparsable timestamps fall back to `now` rather than dropping the point.
fn decode_forecast(value: &Value, now: DateTime<Utc>) -> Result<ForecastChart, String> {
    let raw: RawForecast = from_value(value, "forecast_chart")?;
    let mut dropped_rows = 0;

    let mut historical = Vec::with_capacity(raw.historical_data.data.len());
    for row in &raw.historical_data.data {
        match decode_row(row, now) {
            Some((timestamp, value, _, _)) => historical.push(SeriesPoint { timestamp, value }),
            None => dropped_rows += 1,
        }
    }

    let mut forecast = Vec::with_capacity(raw.forecast_data.data.len());
    for row in &raw.forecast_data.data {
        match decode_row(row, now) {
            Some((timestamp, value, lower, upper)) => forecast.push(ForecastPoint {
                timestamp,
                value,
                lower,
                upper,
            }),
            None => dropped_rows += 1,
        }
    }

    if dropped_rows > 0 {
        log::debug!("forecast_chart: dropped {} unreadable row(s)", dropped_rows);
    }

    Ok(ForecastChart {
        title: raw.title.unwrap_or_else(|| "Forecast".to_string()),
        y_axis_label: raw.y_axis_label.unwrap_or_else(|| "Value".to_string()),
        historical_columns: raw.historical_data.columns.iter().map(label_of).collect(),
        forecast_columns: raw.forecast_data.columns.iter().map(label_of).collect(),
        historical,
        forecast,
        dropped_rows,
    })
}

fn decode_row(row: &[Value], now: DateTime<Utc>) -> Option<(DateTime<Utc>, f64, Option<f64>, Option<f64>)> {
    if !(2..=4).contains(&row.len()) {
        return None;
    }
    let value = json_f64(&row[1])?;
    let timestamp = try_parse_timestamp(&row[0]).unwrap_or(now);
    let lower = row.get(2).and_then(json_f64);
    let upper = row.get(3).and_then(json_f64);
    Some((timestamp, value, lower, upper))
}

fn decode_multi_forecast(value: &Value, now: DateTime<Utc>) -> MultiForecast {
    let forecasts = value
        .get("forecasts")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let title = item.get("title").and_then(Value::as_str).map(str::to_string);
                    Section::from_value_at(Tag::ForecastChart.as_str(), item, title, now)
                })
                .collect()
        })
        .unwrap_or_default();
    MultiForecast { forecasts }
}

fn decode_playlist(value: &Value) -> Result<PlaylistReport, String> {
    let raw: RawPlaylistReport = from_value(value, "playlist_recommendation_report")?;
    let recommendations = raw
        .recommendations
        .into_iter()
        .map(|r| Recommendation {
            playlist_name: r.playlist_name,
            curator_name: r.curator_name,
            platform: r.platform,
            followers: json_f64(&r.followers),
            url: r.url.filter(|u| !u.trim().is_empty()),
            score: json_f64(&r.score).unwrap_or(0.0),
            reasoning: r.reasoning.iter().map(|(k, v)| (k.clone(), prose_of(v))).collect(),
        })
        .collect();
    Ok(PlaylistReport {
        track_name: raw.track_name,
        artist_name: raw.artist_name,
        summary: raw.summary,
        recommendations,
    })
}

fn decode_sections(value: &Value, now: DateTime<Utc>) -> Vec<Section> {
    value
        .get("sections")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|item| Section::from_wire_at(item, now)).collect())
        .unwrap_or_default()
}

fn decode_platforms(value: &Value) -> Result<Vec<Platform>, String> {
    let raw: Vec<RawPlatform> = from_value(value, "platform_data")?;
    Ok(raw
        .into_iter()
        .map(|p| Platform {
            name: p.name,
            icon_url: p.icon_url.filter(|u| !u.trim().is_empty()),
        })
        .collect())
}

fn decode_countries(value: &Value) -> Result<Vec<CountryShare>, String> {
    let raw: Vec<RawCountry> = from_value(value, "country_listenership_data")?;
    raw.into_iter()
        .map(|c| {
            let percentage = json_f64(&c.percentage)
                .ok_or_else(|| format!("percentage for '{}' must be numeric", c.country_code))?;
            Ok(CountryShare {
                country_code: c.country_code.trim().to_string(),
                percentage,
            })
        })
        .collect()
}
