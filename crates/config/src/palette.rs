// Semantic colors shared by the view tree and the PDF engine

use statdeck_core::variant::{MetricDetail, Verdict};

use crate::Color;

pub const GREEN: Color = Color::from_hex(0x16a34a);
pub const BLUE: Color = Color::from_hex(0x2563eb);
pub const PURPLE: Color = Color::from_hex(0x9333ea);
pub const RED: Color = Color::from_hex(0xdc2626);
pub const ORANGE: Color = Color::from_hex(0xea580c);
pub const GRAY: Color = Color::from_hex(0x6b7280);
pub const TEXT: Color = Color::from_hex(0x111827);
pub const MUTED: Color = Color::from_hex(0x4b5563);

pub fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Viral => GREEN,
        Verdict::Trending => BLUE,
        Verdict::Stable => PURPLE,
        Verdict::Declining => RED,
        Verdict::Unknown => GRAY,
    }
}

/// calculated = green, unavailable = orange, data_error = gray
pub fn status_color(detail: &MetricDetail) -> Color {
    match detail {
        MetricDetail::Calculated { .. } => GREEN,
        MetricDetail::Unavailable { .. } => ORANGE,
        MetricDetail::DataError => GRAY,
    }
}
