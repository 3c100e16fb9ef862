//! Country cards sorted by share.

use serde::Serialize;

use statdeck_core::country::country_name;
use statdeck_core::format::format_percentage;
use statdeck_core::variant::CountryShare;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCard {
    pub code: String,
    pub name: String,
    pub percentage: f64,
    pub label: String,
}

/// Cards sorted by descending percentage; ties keep source order.
pub fn country_cards(shares: &[CountryShare]) -> Vec<CountryCard> {
    let mut cards: Vec<CountryCard> = shares
        .iter()
        .map(|share| CountryCard {
            code: share.country_code.trim().to_ascii_uppercase(),
            name: country_name(&share.country_code),
            percentage: share.percentage,
            label: format_percentage(share.percentage),
        })
        .collect();
    cards.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    cards
}
