//! Two-pane top-N statistics comparison panel.
//!
//! The left pane loads on start; the right pane opens on the first shift or custom
//! range aimed at it. Both panes fetch independently from the same stats endpoint.

pub mod config;
pub mod controller;
pub mod dialog;
pub mod dom;
pub mod error;
pub mod highlight;
pub mod logging;
pub mod render;
pub mod sort;
pub mod sparkline;

#[cfg(test)]
mod testing;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{PanelConfig, SparklineStyle};
pub use controller::{FetchOutcome, PaneFetch, PaneStatus, PanelController};
pub use dialog::CustomRangeDialog;
pub use dom::{Boundary, FormField, Highlight, HoverCallback, Metric, PaneRegion, PanelDom, RowHandle};
pub use error::{DomError, PanelError, ValidationError};
pub use highlight::HighlightCoordinator;
pub use logging::{init_logging, ConsoleLogger};
pub use render::{PaneRenderer, RowIndex};

pub use stats_feed::{FetchError, FetchTicket, StatsRequest, StatsResponse, StatsSource};
pub use topn_core::{Pane, RowIdentifier, ShiftRequest, ShiftToken, TimeWindow, TimeWindowStore, WindowSource};

#[cfg(target_arch = "wasm32")]
pub use web::{TopNPanel, WebDom};
