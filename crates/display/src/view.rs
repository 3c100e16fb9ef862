//! The view tree produced by the dispatcher.
//!
//! Views are plain data: a front end (or `text::render_text`) draws them.
//! Every node that carries interactive state has the path id it was
//! rendered under, so a click can be written back into `ViewState`.

use serde::Serialize;

use statdeck_core::markdown::Block;
use statdeck_core::media::ImageFormat;
use statdeck_core::variant::{Platform, Verdict};

use crate::countries::CountryCard;
use crate::series::{ChartPoint, SeriesStats};
use crate::state::{ForecastLayout, TimeWindow};
use crate::table::TableView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    /// Nothing to show (no answer text and no payload)
    Empty,
    Stack { children: Vec<View> },
    /// Titled wrapper around a nested section
    Section { id: String, title: String, type_name: String, body: Box<View> },
    Markdown { blocks: Vec<Block> },
    Banner { level: BannerLevel, message: String },
    Table(TableView),
    Grid(GridView),
    Virality(ViralityView),
    Forecast(ForecastView),
    ForecastSet(ForecastSetView),
    Playlist(PlaylistView),
    Platforms { platforms: Vec<Platform> },
    Countries { cards: Vec<CountryCard> },
    Image(ImageView),
    Video(VideoView),
    /// Payload failed validation; raw JSON shown in a disclosure
    Malformed { context: String, reason: String, json: String },
    /// Type outside the closed set
    Unknown { type_name: String, answer: String, json: String },
}

impl View {
    /// Collapse a list into a single view.
    pub fn stack(mut children: Vec<View>) -> View {
        children.retain(|c| *c != View::Empty);
        match children.len() {
            0 => View::Empty,
            1 => children.remove(0),
            _ => View::Stack { children },
        }
    }

    /// Depth-first visit of this node and every descendant.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a View)) {
        visit(self);
        match self {
            View::Stack { children } => {
                for child in children {
                    child.walk(&mut *visit);
                }
            }
            View::Section { body, .. } => body.walk(visit),
            View::ForecastSet(set) => {
                for body in set.children.iter().filter_map(|c| c.body.as_deref()) {
                    body.walk(&mut *visit);
                }
            }
            View::Empty
            | View::Markdown { .. }
            | View::Banner { .. }
            | View::Table(_)
            | View::Grid(_)
            | View::Virality(_)
            | View::Forecast(_)
            | View::Playlist(_)
            | View::Platforms { .. }
            | View::Countries { .. }
            | View::Image(_)
            | View::Video(_)
            | View::Malformed { .. }
            | View::Unknown { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    Error,
    Warning,
    Notice,
}

// =============================================================================
// Grids (key_value / metric_grid)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    pub entries: Vec<GridEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub groups: Vec<GridGroup>,
}

// =============================================================================
// Virality
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricGroup {
    Audience,
    Engagement,
    Other,
}

impl MetricGroup {
    pub fn label(self) -> &'static str {
        match self {
            MetricGroup::Audience => "Audience",
            MetricGroup::Engagement => "Engagement",
            MetricGroup::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub name: String,
    pub status: &'static str,
    /// `#rrggbb`
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricGroupView {
    pub group: MetricGroup,
    pub metrics: Vec<MetricRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViralityView {
    pub artist_name: String,
    pub score: f64,
    pub verdict: Verdict,
    pub verdict_label: &'static str,
    pub verdict_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_growth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_growth: Option<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_analysis: Option<String>,
    pub groups: Vec<MetricGroupView>,
}

// =============================================================================
// Forecasts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalPanel {
    pub window: TimeWindow,
    pub points: Vec<ChartPoint>,
    /// Points before the window filter
    pub total_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SeriesStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPanel {
    pub points: Vec<ChartPoint>,
    pub has_band: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SeriesStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    pub id: String,
    pub title: String,
    pub y_axis_label: String,
    pub historical: HistoricalPanel,
    pub forecast: ForecastPanel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastChild {
    pub id: String,
    pub title: String,
    pub expanded: bool,
    /// Present when expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<View>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSetView {
    pub id: String,
    pub layout: ForecastLayout,
    /// Dropdown entries, one per forecast
    pub options: Vec<String>,
    pub children: Vec<ForecastChild>,
}

// =============================================================================
// Playlists
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTier {
    High,
    Medium,
    Low,
}

impl ScoreTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTier::High => "high",
            ScoreTier::Medium => "medium",
            ScoreTier::Low => "low",
        }
    }

    /// >= 90 high, >= 70 medium, else low
    pub fn for_score(score: f64) -> ScoreTier {
        if score >= 90.0 {
            ScoreTier::High
        } else if score >= 70.0 {
            ScoreTier::Medium
        } else {
            ScoreTier::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistCard {
    pub id: String,
    pub playlist_name: String,
    pub curator_name: String,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub score: f64,
    pub tier: ScoreTier,
    pub expanded: bool,
    pub reasoning_count: usize,
    /// `(factor, explanation)` with title-cased factors; empty when collapsed
    pub reasoning: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistView {
    pub track_name: String,
    pub artist_name: String,
    pub summary: String,
    pub cards: Vec<PlaylistCard>,
}

// =============================================================================
// Media
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    pub byte_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoView {
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}
