//! DOM query abstraction the controller drives.
//!
//! Elements follow the page's id conventions (`{pane}-{metric}`, `{pane}-{metric}-tr`,
//! `{pane}-{time}`, `{pane}-{time}-label`, `{pane}-loading-tr`, `{pane}-csv`,
//! `{pane}-date`, the custom-range form and its dialog). The controller never creates
//! them; implementations only look them up.

use std::fmt;
use std::rc::Rc;

use topn_core::{Pane, RowIdentifier, WindowSource};

use crate::config::SparklineStyle;
use crate::error::DomError;

/// Which top-N table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Mean,
    Usage,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Mean, Metric::Usage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Mean => "mean",
            Metric::Usage => "usage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Boundary {
    Start,
    Stop,
}

impl Boundary {
    pub const ALL: [Boundary; 2] = [Boundary::Start, Boundary::Stop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Boundary::Start => "start",
            Boundary::Stop => "stop",
        }
    }
}

/// Show/hide-able parts of a pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaneRegion {
    /// Whole pane; only the right one starts hidden.
    Container,
    Loading,
    /// CSV export links.
    Csv,
    /// Start/stop label display.
    Date,
}

/// Form inputs read or written by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    ClusterId,
    TopN,
    Shift,
    Window(WindowSource, Boundary),
}

impl FormField {
    pub fn dom_id(&self) -> String {
        match self {
            FormField::ClusterId => "cluster_id".to_string(),
            FormField::TopN => "n".to_string(),
            FormField::Shift => "shift".to_string(),
            FormField::Window(source, boundary) => {
                let prefix = match source {
                    WindowSource::Pane(pane) => pane.as_str(),
                    WindowSource::Custom => "custom",
                };
                format!("{}-{}", prefix, boundary.as_str())
            }
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dom_id())
    }
}

/// Visual state of a highlighted row's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Hover,
    Default,
}

impl Highlight {
    pub fn class(&self) -> &'static str {
        match self {
            Highlight::Hover => "hover",
            Highlight::Default => "default",
        }
    }

    pub fn opposite(&self) -> Highlight {
        match self {
            Highlight::Hover => Highlight::Default,
            Highlight::Default => Highlight::Hover,
        }
    }
}

/// View model of one inserted stats row, carrying its correlation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHandle {
    pub pane: Pane,
    pub metric: Metric,
    pub dom_id: String,
    pub row_id: Option<RowIdentifier>,
}

impl RowHandle {
    pub fn new(pane: Pane, metric: Metric, dom_id: impl Into<String>) -> Self {
        let dom_id = dom_id.into();
        let row_id = RowIdentifier::from_dom_id(&dom_id);
        Self {
            pane,
            metric,
            dom_id,
            row_id,
        }
    }

    /// Prefix shared by every stats row of a pane's table, e.g. `left-tr-mean`.
    pub fn id_prefix(pane: Pane, metric: Metric) -> String {
        format!("{}-tr-{}", pane.as_str(), metric.as_str())
    }
}

/// Invoked with `true` on mouse-enter and `false` on mouse-leave.
pub type HoverCallback = Rc<dyn Fn(&RowHandle, bool)>;

pub trait PanelDom {
    fn set_region_visible(&mut self, pane: Pane, region: PaneRegion, visible: bool) -> Result<(), DomError>;

    /// The page-level "compare to" control.
    fn set_compare_visible(&mut self, visible: bool) -> Result<(), DomError>;

    /// Remove every stats row of a table.
    fn clear_rows(&mut self, pane: Pane, metric: Metric) -> Result<(), DomError>;

    /// Insert row markup after the table's header row and return the rows now present.
    fn insert_rows(&mut self, pane: Pane, metric: Metric, markup: &str) -> Result<Vec<RowHandle>, DomError>;

    /// (Re)enable sorting on a table. Must be idempotent.
    fn apply_sorting(&mut self, pane: Pane, metric: Metric) -> Result<(), DomError>;

    fn field_value(&self, field: FormField) -> Result<String, DomError>;

    fn set_field_value(&mut self, field: FormField, value: &str) -> Result<(), DomError>;

    fn set_window_label(&mut self, pane: Pane, boundary: Boundary, text: &str) -> Result<(), DomError>;

    fn set_csv_href(&mut self, pane: Pane, metric: Metric, href: &str) -> Result<(), DomError>;

    fn render_sparklines(&mut self, pane: Pane, style: &SparklineStyle) -> Result<(), DomError>;

    /// Replace, never stack, the pane's hover listeners.
    fn bind_row_hover(&mut self, pane: Pane, rows: &[RowHandle], on_hover: HoverCallback) -> Result<(), DomError>;

    fn unbind_row_hover(&mut self, pane: Pane);

    /// Swap the cells of `row` to `highlight`, removing the opposite class.
    fn set_row_highlight(&mut self, row: &RowHandle, highlight: Highlight) -> Result<(), DomError>;

    /// Inline error affordance of a pane; `None` hides it.
    fn set_pane_error(&mut self, pane: Pane, message: Option<&str>) -> Result<(), DomError>;

    fn set_page_label(&mut self, text: &str) -> Result<(), DomError>;

    fn open_dialog(&mut self, title: &str) -> Result<(), DomError>;

    fn close_dialog(&mut self) -> Result<(), DomError>;

    /// Clear every input of the custom-range form.
    fn reset_dialog(&mut self) -> Result<(), DomError>;

    /// Inline validation message next to a field; `None` clears it.
    fn set_field_message(&mut self, field: FormField, message: Option<&str>) -> Result<(), DomError>;
}
