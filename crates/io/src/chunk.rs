//! Splitting wide tables and long lists into parts. Both engines partition
//! columns the same way; only the limit differs.

use std::ops::Range;

/// Consecutive ranges of at most `max` items covering `0..total`.
pub fn chunk_ranges(total: usize, max: usize) -> Vec<Range<usize>> {
    let max = max.max(1);
    (0..total).step_by(max).map(|start| start..(start + max).min(total)).collect()
}

/// `Table Part 2 (Columns 9-16)`; part and columns are 1-based.
pub fn column_part_label(part: usize, columns: &Range<usize>) -> String {
    format!("Table Part {} (Columns {}-{})", part + 1, columns.start + 1, columns.end)
}

pub fn metrics_part_label(part: usize) -> String {
    format!("Metrics Part {}", part + 1)
}
