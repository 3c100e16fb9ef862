use serde::{Deserialize, Serialize};

/// Closed set of section types the assistant can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Text,
    Error,
    Dataframe,
    Table,
    KeyValue,
    MetricGrid,
    ViralityReport,
    ForecastChart,
    MultiForecastDisplay,
    PlaylistRecommendationReport,
    MultiSectionReport,
    PlatformData,
    CountryListenershipData,
    ImageBase64,
    VideoUrl,
}

impl Tag {
    pub const ALL: [Tag; 15] = [
        Tag::Text,
        Tag::Error,
        Tag::Dataframe,
        Tag::Table,
        Tag::KeyValue,
        Tag::MetricGrid,
        Tag::ViralityReport,
        Tag::ForecastChart,
        Tag::MultiForecastDisplay,
        Tag::PlaylistRecommendationReport,
        Tag::MultiSectionReport,
        Tag::PlatformData,
        Tag::CountryListenershipData,
        Tag::ImageBase64,
        Tag::VideoUrl,
    ];

    /// Wire name of the tag (`section_type` / `data_type`).
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Text => "text",
            Tag::Error => "error",
            Tag::Dataframe => "dataframe",
            Tag::Table => "table",
            Tag::KeyValue => "key_value",
            Tag::MetricGrid => "metric_grid",
            Tag::ViralityReport => "virality_report",
            Tag::ForecastChart => "forecast_chart",
            Tag::MultiForecastDisplay => "multi_forecast_display",
            Tag::PlaylistRecommendationReport => "playlist_recommendation_report",
            Tag::MultiSectionReport => "multi_section_report",
            Tag::PlatformData => "platform_data",
            Tag::CountryListenershipData => "country_listenership_data",
            Tag::ImageBase64 => "image_base64",
            Tag::VideoUrl => "video_url",
        }
    }

    /// Parse a wire name. Case and surrounding whitespace are ignored.
    pub fn parse(name: &str) -> Option<Tag> {
        let name = name.trim().to_ascii_lowercase();
        Tag::ALL.iter().copied().find(|tag| tag.as_str() == name)
    }

    /// Whether the payload is row/column shaped (used by export summaries).
    pub fn is_tabular(self) -> bool {
        matches!(
            self,
            Tag::Dataframe
                | Tag::Table
                | Tag::KeyValue
                | Tag::MetricGrid
                | Tag::ViralityReport
                | Tag::ForecastChart
                | Tag::MultiForecastDisplay
                | Tag::PlaylistRecommendationReport
                | Tag::PlatformData
                | Tag::CountryListenershipData
        )
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_tag() {
        for tag in Tag::ALL {
            assert_eq!(Tag::parse(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn test_parse_is_lenient_on_case() {
        assert_eq!(Tag::parse(" DataFrame "), Some(Tag::Dataframe));
        assert_eq!(Tag::parse("nonexistent_tag"), None);
        assert_eq!(Tag::parse(""), None);
    }
}
