//! Section: one tagged unit of assistant output.
//!
//! A section is built once from wire JSON and never mutated. Construction
//! runs normalization, validation and typed decoding in one place; a
//! payload that fails any step is kept as `SectionBody::Malformed` with the
//! raw JSON so consumers can still show a labelled fallback.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::format::snake_to_title_case;
use crate::normalize::normalize;
use crate::tag::Tag;
use crate::validate::log_malformed;
use crate::variant::Variant;

/// Section type name as received. Unknown names are preserved for labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionType {
    Known(Tag),
    Other(String),
}

impl SectionType {
    pub fn parse(name: &str) -> Self {
        match Tag::parse(name) {
            Some(tag) => SectionType::Known(tag),
            None => SectionType::Other(name.trim().to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SectionType::Known(tag) => tag.as_str(),
            SectionType::Other(name) if name.is_empty() => "unknown",
            SectionType::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    /// Payload passed validation and decoded into its typed variant
    Ready(Variant),
    /// Known tag whose payload failed validation or decoding
    Malformed { raw: Value, reason: String },
    /// Tag outside the closed set
    Unsupported { raw: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    section_type: SectionType,
    title: Option<String>,
    body: SectionBody,
}

impl Section {
    /// Build a section from a type name and raw content.
    pub fn from_value(section_type: &str, content: &Value, title: Option<String>) -> Self {
        Self::from_value_at(section_type, content, title, Utc::now())
    }

    /// Like [`Section::from_value`] with an explicit clock for timestamp fallbacks.
    pub fn from_value_at(
        section_type: &str,
        content: &Value,
        title: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let section_type = SectionType::parse(section_type);
        let title = title.filter(|t| !t.trim().is_empty());

        let body = match &section_type {
            SectionType::Other(name) => {
                log::warn!("unsupported section type '{}'", name);
                SectionBody::Unsupported { raw: content.clone() }
            }
            SectionType::Known(tag) => {
                let normalized = normalize(*tag, content);
                let decoded = tag
                    .schema()
                    .check(&normalized)
                    .and_then(|()| Variant::decode(*tag, &normalized, now));
                match decoded {
                    Ok(variant) => SectionBody::Ready(variant),
                    Err(reason) => {
                        log_malformed(tag.as_str(), content);
                        log::debug!("{}: {}", tag, reason);
                        SectionBody::Malformed { raw: content.clone(), reason }
                    }
                }
            }
        };

        Self { section_type, title, body }
    }

    /// Build a section from a wire object `{section_type, content, title?}`.
    pub fn from_wire(value: &Value) -> Self {
        Self::from_wire_at(value, Utc::now())
    }

    pub fn from_wire_at(value: &Value, now: DateTime<Utc>) -> Self {
        let section_type = value.get("section_type").and_then(Value::as_str);
        let title = value.get("title").and_then(Value::as_str).map(str::to_string);

        match section_type {
            Some(name) => {
                let content = value.get("content").unwrap_or(&Value::Null);
                Self::from_value_at(name, content, title, now)
            }
            None => {
                log_malformed("section", value);
                Self {
                    section_type: SectionType::Other(String::new()),
                    title,
                    body: SectionBody::Malformed {
                        raw: value.clone(),
                        reason: "section entry has no section_type".to_string(),
                    },
                }
            }
        }
    }

    /// True for wire objects that look like `{section_type, content}`.
    pub fn is_wire_section(value: &Value) -> bool {
        value.get("section_type").map(Value::is_string).unwrap_or(false) && value.get("content").is_some()
    }

    pub fn section_type(&self) -> &SectionType {
        &self.section_type
    }

    pub fn tag(&self) -> Option<Tag> {
        match self.section_type {
            SectionType::Known(tag) => Some(tag),
            SectionType::Other(_) => None,
        }
    }

    pub fn type_name(&self) -> &str {
        self.section_type.name()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Title, or the type name in title case.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => snake_to_title_case(self.type_name()),
        }
    }

    pub fn body(&self) -> &SectionBody {
        &self.body
    }

    pub fn variant(&self) -> Option<&Variant> {
        match &self.body {
            SectionBody::Ready(variant) => Some(variant),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.body, SectionBody::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Scalar;
    use crate::variant::{MetricDetail, Verdict};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_dataframe_section_decodes_and_pads_rows() {
        let section = Section::from_value(
            "dataframe",
            &json!({"columns": ["track", "streams"], "data": [["a", 10], ["b"], ["c", 3, "extra"]]}),
            Some("Top tracks".into()),
        );
        let Some(Variant::DataFrame(frame)) = section.variant() else {
            panic!("expected dataframe, got {:?}", section.body());
        };
        assert_eq!(frame.rows.len(), 3);
        assert!(frame.rows.iter().all(|row| row.len() == 2));
        assert_eq!(frame.rows[1][1], Scalar::Null);
        assert_eq!(frame.ragged_rows(), 2);
        assert_eq!(section.display_title(), "Top tracks");
    }

    #[test]
    fn test_malformed_payload_keeps_raw_value() {
        let raw = json!({"columns": "nope"});
        let section = Section::from_value("dataframe", &raw, None);
        match section.body() {
            SectionBody::Malformed { raw: kept, reason } => {
                assert_eq!(kept, &raw);
                assert!(reason.contains("columns"));
            }
            other => panic!("expected malformed, got {:?}", other),
        }
        assert!(!section.is_valid());
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let section = Section::from_value("sparkline", &json!({"foo": 1}), None);
        assert_eq!(section.tag(), None);
        assert_eq!(section.type_name(), "sparkline");
        assert!(matches!(section.body(), SectionBody::Unsupported { .. }));
        assert_eq!(section.display_title(), "Sparkline");
    }

    #[test]
    fn test_wire_section_without_type_is_malformed() {
        let section = Section::from_wire(&json!({"content": "x"}));
        assert_eq!(section.type_name(), "unknown");
        assert!(matches!(section.body(), SectionBody::Malformed { .. }));
    }

    #[test]
    fn test_multi_section_recurses() {
        let payload = json!({"sections": [
            {"section_type": "text", "content": "hello"},
            {"section_type": "multi_section_report", "content": {"sections": [
                {"section_type": "key_value", "content": {"data": {"streams": 5}}, "title": "Inner"}
            ]}},
            {"section_type": "dataframe", "content": {"columns": 1}}
        ]});
        let section = Section::from_value("multi_section_report", &payload, None);
        let Some(Variant::MultiSection(children)) = section.variant() else {
            panic!("expected multi section");
        };
        assert_eq!(children.len(), 3);
        assert!(children[0].is_valid());
        let Some(Variant::MultiSection(inner)) = children[1].variant() else {
            panic!("expected nested multi section");
        };
        assert_eq!(inner[0].title(), Some("Inner"));
        assert!(!children[2].is_valid());
    }

    #[test]
    fn test_metric_grid_splits_url_keys() {
        let section = Section::from_value(
            "metric_grid",
            &json!({"data": {"Spotify": {"followers": 1200, "Spotify_URL": "https://open.spotify.com/x"}}}),
            None,
        );
        let Some(Variant::MetricGrid(grid)) = section.variant() else {
            panic!("expected metric grid");
        };
        assert_eq!(grid.platforms[0].metrics.len(), 1);
        assert_eq!(grid.platforms[0].primary_link(), Some("https://open.spotify.com/x"));
    }

    #[test]
    fn test_virality_status_controls_fields() {
        let section = Section::from_value(
            "virality_report",
            &json!({
                "artist_name": "Nova",
                "virality_score": "87",
                "verdict": "Trending",
                "summary": "Strong week",
                "detailed_metrics": {
                    "spotify_followers": {"status": "calculated", "growth": 12.5, "baseline_avg": 100, "recent_avg": 112.5},
                    "tiktok_views": {"status": "unavailable", "growth": 3, "recent_avg": 40},
                    "youtube_likes": {"status": "data_error", "recent_avg": 9}
                }
            }),
            None,
        );
        let Some(Variant::Virality(report)) = section.variant() else {
            panic!("expected virality report: {:?}", section.body());
        };
        assert_eq!(report.score, 87.0);
        assert_eq!(report.verdict, Verdict::Trending);
        assert_eq!(report.detailed_metrics[0].1.growth(), Some(12.5));
        assert_eq!(report.detailed_metrics[1].1, MetricDetail::Unavailable { recent_avg: Some(40.0) });
        assert_eq!(report.detailed_metrics[1].1.growth(), None);
        assert_eq!(report.detailed_metrics[2].1, MetricDetail::DataError);
    }

    #[test]
    fn test_forecast_rows_accept_two_to_four_positions() {
        let section = Section::from_value_at(
            "forecast_chart",
            &json!({
                "title": "Streams",
                "y_axis_label": "Daily streams",
                "historical_data": {"columns": ["date", "value"], "data": [["2024-01-01", 10], ["2024-01-02", "x"], [1]]},
                "forecast_data": {"columns": ["date", "value", "lower", "upper"], "data": [
                    [1717200000, 12, 10, 14],
                    ["garbage-date", 13, 11],
                    ["2024-06-03", 14]
                ]}
            }),
            None,
            now(),
        );
        let Some(Variant::Forecast(chart)) = section.variant() else {
            panic!("expected forecast: {:?}", section.body());
        };
        assert_eq!(chart.historical.len(), 1);
        assert_eq!(chart.dropped_rows(), 2);
        assert_eq!(chart.forecast.len(), 3);
        assert_eq!(chart.forecast[0].band(), Some((10.0, 14.0)));
        assert_eq!(chart.forecast[1].band(), None);
        assert_eq!(chart.forecast[1].timestamp, now());
    }

    #[test]
    fn test_multi_forecast_children_are_sections() {
        let section = Section::from_value(
            "multi_forecast_display",
            &json!([
                {"title": "A", "historical_data": {"data": []}, "forecast_data": {"data": []}},
                {"title": "B"}
            ]),
            None,
        );
        let Some(Variant::MultiForecast(multi)) = section.variant() else {
            panic!("expected multi forecast");
        };
        assert_eq!(multi.forecasts.len(), 2);
        assert!(multi.forecasts[0].is_valid());
        assert!(!multi.forecasts[1].is_valid());
        assert_eq!(multi.forecasts[1].title(), Some("B"));
    }

    #[test]
    fn test_country_and_platform_lists() {
        let countries = Section::from_value(
            "country_listenership_data",
            &json!([{"countryCode": "us", "percentage": 40}, {"country_code": "DE", "percentage": "12.5"}]),
            None,
        );
        let Some(Variant::Countries(list)) = countries.variant() else {
            panic!("expected countries");
        };
        assert_eq!(list[1].percentage, 12.5);

        let platforms = Section::from_value("platform_data", &json!([{"name": "Spotify", "icon_url": null}]), None);
        assert!(platforms.is_valid());
    }

    #[test]
    fn test_playlist_report_decodes_reasoning() {
        let section = Section::from_value(
            "playlist_recommendation_report",
            &json!({
                "track_name": "Glow",
                "artist_name": "Nova",
                "summary": "Good fits",
                "recommendations": [{
                    "playlist_name": "Chill Hits", "curator_name": "Spotify", "platform": "Spotify",
                    "followers": 120000, "url": "https://x", "score": 92,
                    "reasoning": {"genre_match": "Lo-fi overlap", "audience_fit": "Similar listeners"}
                }]
            }),
            None,
        );
        let Some(Variant::Playlist(report)) = section.variant() else {
            panic!("expected playlist");
        };
        assert_eq!(report.recommendations[0].reasoning.len(), 2);
        assert_eq!(report.recommendations[0].followers, Some(120000.0));
    }

    #[test]
    fn test_playlist_report_tolerates_null_prose() {
        let section = Section::from_value(
            "playlist_recommendation_report",
            &json!({
                "track_name": "Glow",
                "artist_name": null,
                "summary": null,
                "recommendations": [{
                    "playlist_name": "Chill Hits", "curator_name": null, "platform": null,
                    "followers": null, "url": null, "score": 80, "reasoning": null
                }]
            }),
            None,
        );
        let Some(Variant::Playlist(report)) = section.variant() else {
            panic!("expected playlist: {:?}", section.body());
        };
        assert_eq!(report.artist_name, "");
        assert_eq!(report.summary, "");
        let rec = &report.recommendations[0];
        assert_eq!(rec.curator_name, "");
        assert!(rec.reasoning.is_empty());
        assert_eq!(rec.url, None);
    }

    #[test]
    fn test_virality_tolerates_null_metrics() {
        let section = Section::from_value(
            "virality_report",
            &json!({"artist_name": "Nova", "virality_score": 40, "summary": null, "detailed_metrics": null}),
            None,
        );
        let Some(Variant::Virality(report)) = section.variant() else {
            panic!("expected virality report: {:?}", section.body());
        };
        assert!(report.detailed_metrics.is_empty());
    }
}
