use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the two independent statistics views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pane {
    /// Baseline view, loaded on start.
    Left,
    /// Comparison view, hidden until the first action that targets it.
    Right,
}

impl Pane {
    pub const ALL: [Pane; 2] = [Pane::Left, Pane::Right];

    /// Wire value of the `side` field and the DOM id prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Left => "left",
            Pane::Right => "right",
        }
    }

    pub fn other(&self) -> Pane {
        match self {
            Pane::Left => Pane::Right,
            Pane::Right => Pane::Left,
        }
    }

    /// Stable slot for per-pane arrays.
    pub fn index(&self) -> usize {
        match self {
            Pane::Left => 0,
            Pane::Right => 1,
        }
    }
}

impl fmt::Display for Pane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pane: {0}")]
pub struct UnknownPane(pub String);

impl FromStr for Pane {
    type Err = UnknownPane;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Pane::Left),
            "right" => Ok(Pane::Right),
            other => Err(UnknownPane(other.to_string())),
        }
    }
}

/// Server-formatted point in time. The client never parses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Timestamp {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Timestamp {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Start/stop boundaries of a pane. start <= stop is reported by the server, not checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub stop: Timestamp,
    /// Human-readable renderings; `None` until a response supplied them.
    pub start_label: Option<String>,
    pub stop_label: Option<String>,
}

impl TimeWindow {
    pub fn new(start: impl Into<Timestamp>, stop: impl Into<Timestamp>) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
            start_label: None,
            stop_label: None,
        }
    }

    pub fn with_labels(mut self, start_label: impl Into<String>, stop_label: impl Into<String>) -> Self {
        self.start_label = Some(start_label.into());
        self.stop_label = Some(stop_label.into());
        self
    }

    /// Window as reported back by the server.
    pub fn from_response_parts(
        start: Timestamp,
        stop: Timestamp,
        start_label: String,
        stop_label: String,
    ) -> Self {
        Self {
            start,
            stop,
            start_label: Some(start_label),
            stop_label: Some(stop_label),
        }
    }
}

/// Relative move of a window, e.g. "back one day". Opaque to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShiftToken(String);

impl ShiftToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// No relative move; the stored window is used as-is.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ShiftToken {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Where the window of a shift request is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSource {
    /// The pane's own current window.
    Pane(Pane),
    /// The absolute window collected by the custom-range dialog.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRequest {
    pub pane: Pane,
    pub shift: ShiftToken,
    pub source: WindowSource,
}

impl ShiftRequest {
    /// Relative move of `pane` starting from its own window.
    pub fn relative(pane: Pane, shift: impl Into<ShiftToken>) -> Self {
        Self {
            pane,
            shift: shift.into(),
            source: WindowSource::Pane(pane),
        }
    }

    /// Absolute window for the right pane, taken from the custom slot.
    pub fn custom() -> Self {
        Self {
            pane: Pane::Right,
            shift: ShiftToken::none(),
            source: WindowSource::Custom,
        }
    }
}

/// Correlation key of a stats row across both panes. Equality is its only meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowIdentifier(String);

impl RowIdentifier {
    /// Last dash-delimited token of a row's DOM id, e.g. `left-tr-mean-42` -> `42`.
    pub fn from_dom_id(dom_id: &str) -> Option<Self> {
        let token = dom_id.rsplit('-').next()?.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latest window per pane plus the custom slot. Overwritten in place, no history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeWindowStore {
    panes: [TimeWindow; 2],
    custom: TimeWindow,
}

impl TimeWindowStore {
    pub fn new(left: TimeWindow, right: TimeWindow) -> Self {
        Self {
            panes: [left, right],
            custom: TimeWindow::default(),
        }
    }

    pub fn window(&self, pane: Pane) -> &TimeWindow {
        &self.panes[pane.index()]
    }

    pub fn set_window(&mut self, pane: Pane, window: TimeWindow) {
        self.panes[pane.index()] = window;
    }

    pub fn custom(&self) -> &TimeWindow {
        &self.custom
    }

    pub fn set_custom(&mut self, window: TimeWindow) {
        self.custom = window;
    }

    /// Window a request built from `source` should carry.
    pub fn resolve(&self, source: WindowSource) -> &TimeWindow {
        match source {
            WindowSource::Pane(pane) => self.window(pane),
            WindowSource::Custom => &self.custom,
        }
    }
}
