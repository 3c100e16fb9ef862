//! Derived view state.
//!
//! Sources are immutable; everything interactive (sort, search, time window,
//! expand/collapse, forecast layout) lives here, keyed by the node's path id
//! (`"0"`, `"0.2"`, ...). Views are recomputed from (source, state) on demand.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use statdeck_config::Settings;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Current sort state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: usize,
    pub direction: SortDirection,
}

/// Sort and search for one table node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableState {
    pub sort: Option<SortState>,
    pub search: String,
}

impl TableState {
    /// Header click: ascending -> descending -> unsorted. Clicking a
    /// different column starts over at ascending.
    pub fn click_header(&mut self, column: usize) {
        self.sort = match self.sort {
            Some(SortState { column: c, direction: SortDirection::Ascending }) if c == column => {
                Some(SortState { column, direction: SortDirection::Descending })
            }
            Some(SortState { column: c, direction: SortDirection::Descending }) if c == column => None,
            _ => Some(SortState { column, direction: SortDirection::Ascending }),
        };
    }

    pub fn direction_for(&self, column: usize) -> Option<SortDirection> {
        self.sort.filter(|s| s.column == column).map(|s| s.direction)
    }
}

/// Historical-series window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "1y")]
    Year,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "1mo")]
    Month,
    #[serde(rename = "2wk")]
    TwoWeeks,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 6] = [
        TimeWindow::All,
        TimeWindow::Year,
        TimeWindow::SixMonths,
        TimeWindow::ThreeMonths,
        TimeWindow::Month,
        TimeWindow::TwoWeeks,
    ];

    /// Parse a window name, including the long aliases (`1month`, `2weeks`, ...)
    pub fn parse(name: &str) -> Option<TimeWindow> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" => Some(TimeWindow::All),
            "1y" | "1year" => Some(TimeWindow::Year),
            "6mo" | "6months" => Some(TimeWindow::SixMonths),
            "3mo" | "3months" => Some(TimeWindow::ThreeMonths),
            "1mo" | "1month" => Some(TimeWindow::Month),
            "2wk" | "2weeks" => Some(TimeWindow::TwoWeeks),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::All => "all",
            TimeWindow::Year => "1y",
            TimeWindow::SixMonths => "6mo",
            TimeWindow::ThreeMonths => "3mo",
            TimeWindow::Month => "1mo",
            TimeWindow::TwoWeeks => "2wk",
        }
    }

    /// Earliest timestamp kept, `None` for `All`.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = match self {
            TimeWindow::All => return None,
            TimeWindow::TwoWeeks => return Some(now - Duration::days(14)),
            TimeWindow::Year => 12,
            TimeWindow::SixMonths => 6,
            TimeWindow::ThreeMonths => 3,
            TimeWindow::Month => 1,
        };
        // Out-of-range subtraction only happens near the start of chrono's calendar
        Some(now.checked_sub_months(Months::new(months)).unwrap_or(DateTime::<Utc>::MIN_UTC))
    }
}

/// Multi-forecast presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "index", rename_all = "lowercase")]
pub enum ForecastLayout {
    /// One forecast chosen from a dropdown
    Single(usize),
    Grid,
}

impl Default for ForecastLayout {
    fn default() -> Self {
        ForecastLayout::Single(0)
    }
}

/// Table defaults applied to nodes without explicit state
#[derive(Debug, Clone, Default)]
struct TableDefaults {
    search: String,
    sort_column: Option<(String, SortDirection)>,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub now: DateTime<Utc>,
    tables: HashMap<String, TableState>,
    table_defaults: TableDefaults,
    windows: HashMap<String, TimeWindow>,
    default_window: TimeWindow,
    expanded: HashSet<String>,
    collapsed: HashSet<String>,
    expand_by_default: bool,
    layouts: HashMap<String, ForecastLayout>,
    default_layout: ForecastLayout,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl ViewState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            tables: HashMap::new(),
            table_defaults: TableDefaults::default(),
            windows: HashMap::new(),
            default_window: TimeWindow::All,
            expanded: HashSet::new(),
            collapsed: HashSet::new(),
            expand_by_default: false,
            layouts: HashMap::new(),
            default_layout: ForecastLayout::default(),
        }
    }

    /// Initial state from the `display.*` settings
    pub fn from_settings(settings: &Settings, now: DateTime<Utc>) -> Self {
        let mut state = Self::new(now);
        state.default_window = TimeWindow::parse(&settings.default_window).unwrap_or_else(|| {
            log::warn!("unknown display.defaultWindow '{}', using all", settings.default_window);
            TimeWindow::All
        });
        state.expand_by_default = settings.expand_by_default;
        state
    }

    // -------------------------------------------------------------------------
    // Tables
    // -------------------------------------------------------------------------

    /// State for a table node. Nodes without explicit state get the defaults,
    /// with the default sort column resolved by name against `columns`.
    pub fn table(&self, id: &str, columns: &[String]) -> TableState {
        if let Some(state) = self.tables.get(id) {
            return state.clone();
        }
        let sort = self.table_defaults.sort_column.as_ref().and_then(|(name, direction)| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
                .map(|column| SortState { column, direction: *direction })
        });
        TableState { sort, search: self.table_defaults.search.clone() }
    }

    pub fn table_mut(&mut self, id: &str) -> &mut TableState {
        self.tables.entry(id.to_string()).or_default()
    }

    pub fn set_default_search(&mut self, search: impl Into<String>) {
        self.table_defaults.search = search.into();
    }

    pub fn set_default_sort(&mut self, column: impl Into<String>, direction: SortDirection) {
        self.table_defaults.sort_column = Some((column.into(), direction));
    }

    // -------------------------------------------------------------------------
    // Time windows
    // -------------------------------------------------------------------------

    pub fn window(&self, id: &str) -> TimeWindow {
        self.windows.get(id).copied().unwrap_or(self.default_window)
    }

    pub fn set_window(&mut self, id: &str, window: TimeWindow) {
        self.windows.insert(id.to_string(), window);
    }

    pub fn set_default_window(&mut self, window: TimeWindow) {
        self.default_window = window;
    }

    // -------------------------------------------------------------------------
    // Expand / collapse
    // -------------------------------------------------------------------------

    pub fn is_expanded(&self, id: &str) -> bool {
        if self.expanded.contains(id) {
            true
        } else if self.collapsed.contains(id) {
            false
        } else {
            self.expand_by_default
        }
    }

    pub fn set_expanded(&mut self, id: &str, expanded: bool) {
        if expanded {
            self.collapsed.remove(id);
            self.expanded.insert(id.to_string());
        } else {
            self.expanded.remove(id);
            self.collapsed.insert(id.to_string());
        }
    }

    pub fn toggle(&mut self, id: &str) {
        let expanded = self.is_expanded(id);
        self.set_expanded(id, !expanded);
    }

    /// Expand every node, discarding explicit collapses
    pub fn expand_all(&mut self) {
        self.collapsed.clear();
        self.expand_by_default = true;
    }

    // -------------------------------------------------------------------------
    // Forecast layout
    // -------------------------------------------------------------------------

    pub fn layout(&self, id: &str) -> ForecastLayout {
        self.layouts.get(id).copied().unwrap_or(self.default_layout)
    }

    pub fn set_layout(&mut self, id: &str, layout: ForecastLayout) {
        self.layouts.insert(id.to_string(), layout);
    }

    pub fn set_default_layout(&mut self, layout: ForecastLayout) {
        self.default_layout = layout;
    }
}

/// Path id of the `index`-th child of `parent`
pub fn child_id(parent: &str, index: usize) -> String {
    format!("{}.{}", parent, index)
}
