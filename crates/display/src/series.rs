//! Time-window filtering and summary statistics for forecast panels.

use chrono::{DateTime, Utc};
use serde::Serialize;

use statdeck_core::format::format_timestamp;
use statdeck_core::variant::{ForecastPoint, SeriesPoint};

use crate::state::TimeWindow;

/// Summary over the points currently shown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub latest: f64,
}

impl SeriesStats {
    /// `None` for an empty series
    pub fn compute(values: &[f64]) -> Option<SeriesStats> {
        let latest = *values.last()?;
        let (min, max, sum) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY, 0.0), |(min, max, sum), &v| {
                (min.min(v), max.max(v), sum + v)
            });
        Some(SeriesStats { count: values.len(), average: sum / values.len() as f64, min, max, latest })
    }
}

/// Points with `timestamp >= now - window`, in source order.
pub fn filter_series(points: &[SeriesPoint], window: TimeWindow, now: DateTime<Utc>) -> Vec<SeriesPoint> {
    match window.cutoff(now) {
        None => points.to_vec(),
        Some(cutoff) => points.iter().filter(|p| p.timestamp >= cutoff).copied().collect(),
    }
}

/// One plotted point; `lower`/`upper` are set only when both bounds exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

impl From<&SeriesPoint> for ChartPoint {
    fn from(point: &SeriesPoint) -> Self {
        Self { date: format_timestamp(&point.timestamp), value: point.value, lower: None, upper: None }
    }
}

impl From<&ForecastPoint> for ChartPoint {
    fn from(point: &ForecastPoint) -> Self {
        let band = point.band();
        Self {
            date: format_timestamp(&point.timestamp),
            value: point.value,
            lower: band.map(|(lower, _)| lower),
            upper: band.map(|(_, upper)| upper),
        }
    }
}
