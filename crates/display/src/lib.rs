// Display dispatcher - assistant results to a view tree

pub mod countries;
pub mod dispatch;
pub mod series;
pub mod state;
pub mod table;
pub mod text;
pub mod view;

pub use dispatch::{render, render_section, DisplayContext, ROOT_ID};
pub use state::{ForecastLayout, SortDirection, SortState, TableState, TimeWindow, ViewState};
pub use text::render_text;
pub use view::View;
