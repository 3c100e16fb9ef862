//! Dataframe projection: search, then stable single-column sort.
//!
//! The source frame is never reordered. A projection is a list of source row
//! indices plus the formatted cells for each, recomputed from
//! (frame, table state) whenever either changes.

use ordered_float::OrderedFloat;
use serde::Serialize;

use statdeck_core::variant::DataFrame;
use statdeck_core::{Scalar, ValueFormatter};

use crate::state::{SortDirection, TableState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnHeader {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Row index in the source frame
    pub source: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub id: String,
    pub columns: Vec<ColumnHeader>,
    /// Column rendered with key emphasis (always the first)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_column: Option<usize>,
    pub rows: Vec<TableRow>,
    pub total_rows: usize,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search: String,
}

impl TableView {
    pub fn is_filtered(&self) -> bool {
        self.rows.len() < self.total_rows
    }
}

/// Sort key with a type rank: numbers < text < bool < null.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Number(OrderedFloat<f64>),
    Text(String),
    Bool(bool),
}

impl SortKey {
    fn from_scalar(value: &Scalar) -> Option<SortKey> {
        match value {
            Scalar::Null => None,
            Scalar::Number(n) => Some(SortKey::Number(OrderedFloat(*n))),
            Scalar::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Some(SortKey::Number(OrderedFloat(n))),
                _ => Some(SortKey::Text(s.trim().to_lowercase())),
            },
            Scalar::Bool(b) => Some(SortKey::Bool(*b)),
        }
    }
}

/// Source row indices matching `search`, in display order.
pub fn row_order(frame: &DataFrame, state: &TableState) -> Vec<usize> {
    let needle = state.search.trim().to_lowercase();
    let mut order: Vec<usize> = (0..frame.rows.len())
        .filter(|&i| needle.is_empty() || row_matches(frame, i, &needle))
        .collect();

    if let Some(sort) = state.sort.filter(|s| s.column < frame.column_count()) {
        let mut keyed: Vec<(Option<SortKey>, usize)> = order
            .iter()
            .map(|&i| (SortKey::from_scalar(&frame.rows[i][sort.column]), i))
            .collect();
        // Stable; nulls stay last in both directions
        keyed.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => match sort.direction {
                SortDirection::Ascending => a.cmp(b),
                SortDirection::Descending => b.cmp(a),
            },
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        order = keyed.into_iter().map(|(_, i)| i).collect();
    }
    order
}

/// Case-insensitive substring match across every cell and the row label.
fn row_matches(frame: &DataFrame, row: usize, needle: &str) -> bool {
    let label_matches = frame
        .index
        .as_ref()
        .and_then(|index| index.get(row))
        .map(|label| label.display().to_lowercase().contains(needle))
        .unwrap_or(false);
    label_matches
        || frame.rows[row]
            .iter()
            .any(|cell| cell.display().to_lowercase().contains(needle))
}

/// Project a frame for display. The first column keeps its raw text; the
/// rest go through the value formatter keyed by column name.
pub fn project_table(id: &str, frame: &DataFrame, state: &TableState, formatter: &ValueFormatter) -> TableView {
    let columns = frame
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnHeader { name: name.clone(), sort: state.direction_for(i) })
        .collect();

    let rows = row_order(frame, state)
        .into_iter()
        .map(|source| TableRow {
            source,
            label: frame
                .index
                .as_ref()
                .and_then(|index| index.get(source))
                .map(Scalar::display),
            cells: frame.rows[source]
                .iter()
                .enumerate()
                .map(|(col, cell)| match col {
                    0 => cell.display(),
                    _ => formatter.format_scalar(&frame.columns[col], cell),
                })
                .collect(),
        })
        .collect();

    TableView {
        id: id.to_string(),
        columns,
        key_column: if frame.columns.is_empty() { None } else { Some(0) },
        rows,
        total_rows: frame.rows.len(),
        search: state.search.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SortState;
    use proptest::prelude::*;

    fn frame() -> DataFrame {
        DataFrame::new(
            vec!["track".into(), "streams".into(), "earnings".into()],
            vec![
                vec![Scalar::Text("Glow".into()), Scalar::Number(1_260_000.0), Scalar::Number(4200.0)],
                vec![Scalar::Text("Drift".into()), Scalar::Null, Scalar::Number(900.0)],
                vec![Scalar::Text("Aurora".into()), Scalar::Number(830_000.0), Scalar::Text("n/a".into())],
                vec![Scalar::Text("Echo".into()), Scalar::Text("2000000".into()), Scalar::Number(50.0)],
            ],
        )
    }

    fn sorted(column: usize, direction: SortDirection) -> TableState {
        TableState { sort: Some(SortState { column, direction }), search: String::new() }
    }

    #[test]
    fn test_unsorted_is_source_order() {
        assert_eq!(row_order(&frame(), &TableState::default()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_numeric_sort_puts_nulls_last() {
        let frame = frame();
        assert_eq!(row_order(&frame, &sorted(1, SortDirection::Ascending)), vec![2, 0, 3, 1]);
        assert_eq!(row_order(&frame, &sorted(1, SortDirection::Descending)), vec![3, 0, 2, 1]);
    }

    #[test]
    fn test_numbers_sort_before_text() {
        assert_eq!(row_order(&frame(), &sorted(2, SortDirection::Ascending)), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_text_sort_is_case_insensitive() {
        assert_eq!(row_order(&frame(), &sorted(0, SortDirection::Ascending)), vec![2, 1, 3, 0]);
    }

    #[test]
    fn test_three_clicks_restore_original_order() {
        let frame = frame();
        let mut state = TableState::default();
        for _ in 0..3 {
            state.click_header(1);
        }
        assert_eq!(row_order(&frame, &state), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_search_matches_any_cell() {
        let frame = frame();
        let state = TableState { sort: None, search: "  GLOW ".into() };
        assert_eq!(row_order(&frame, &state), vec![0]);
        let state = TableState { sort: None, search: "n/a".into() };
        assert_eq!(row_order(&frame, &state), vec![2]);
    }

    #[test]
    fn test_projection_formats_non_key_columns() {
        let view = project_table("0", &frame(), &sorted(1, SortDirection::Descending), &ValueFormatter::default());
        assert_eq!(view.key_column, Some(0));
        assert_eq!(view.columns[1].sort, Some(SortDirection::Descending));
        assert_eq!(view.columns[0].sort, None);
        assert_eq!(view.rows[1].cells, vec!["Glow", "1.3M", "$4.2K"]);
        assert_eq!(view.rows[3].cells[1], "");
        assert!(!view.is_filtered());
    }

    #[test]
    fn test_sort_column_out_of_range_is_ignored() {
        assert_eq!(row_order(&frame(), &sorted(9, SortDirection::Ascending)), vec![0, 1, 2, 3]);
    }

    proptest! {
        #[test]
        fn prop_three_clicks_cycle(values in proptest::collection::vec(proptest::option::of(-1e6f64..1e6), 0..40), column in 0usize..2) {
            let rows = values
                .iter()
                .map(|v| vec![Scalar::Text("k".into()), v.map(Scalar::Number).unwrap_or(Scalar::Null)])
                .collect();
            let frame = DataFrame::new(vec!["key".into(), "value".into()], rows);
            let mut state = TableState::default();
            let original = row_order(&frame, &state);
            state.click_header(column);
            state.click_header(column);
            state.click_header(column);
            prop_assert_eq!(row_order(&frame, &state), original);
        }

        #[test]
        fn prop_sort_is_a_permutation(values in proptest::collection::vec(-1e6f64..1e6, 0..40)) {
            let rows = values.iter().map(|v| vec![Scalar::Number(*v)]).collect();
            let frame = DataFrame::new(vec!["value".into()], rows);
            let mut order = row_order(&frame, &sorted(0, SortDirection::Descending));
            let sorted_values: Vec<f64> = order.iter().map(|&i| values[i]).collect();
            prop_assert!(sorted_values.windows(2).all(|w| w[0] >= w[1]));
            order.sort_unstable();
            prop_assert_eq!(order, (0..values.len()).collect::<Vec<_>>());
        }
    }
}
