use log::LevelFilter;
use serde::{Deserialize, Serialize};
use stats_feed::DEFAULT_ENDPOINT;

const DIALOG_TITLE: &str = "Choose start/end dates for the right-side statistics";
const CUSTOM_PAGE_LABEL: &str = "Custom set, step one hour";
const REQUIRED_MESSAGE: &str = "This is a required field";

/// Fixed look of the per-row trend lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparklineStyle {
    pub width_px: u32,
    pub height_px: u32,
    pub line_color: String,
    /// Marker on the last point; `None` draws no marker.
    pub spot_color: Option<String>,
    /// Area under the line; `None` leaves it unfilled.
    pub fill_color: Option<String>,
}

impl SparklineStyle {
    pub fn width_css(&self) -> String {
        format!("{}px", self.width_px)
    }

    pub fn height_css(&self) -> String {
        format!("{}px", self.height_px)
    }
}

impl Default for SparklineStyle {
    fn default() -> Self {
        Self {
            width_px: 36,
            height_px: 15,
            line_color: "#555".to_string(),
            spot_color: None,
            fill_color: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub endpoint: String,
    pub sparkline: SparklineStyle,
    pub dialog_title: String,
    /// Page label shown after a custom date change on the left pane.
    pub custom_page_label: String,
    pub required_message: String,
    pub log_level: LevelFilter,
}

impl PanelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        if !endpoint.trim().is_empty() {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn with_sparkline(mut self, style: SparklineStyle) -> Self {
        self.sparkline = style;
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Accepts `error|warn|info|debug|trace|off`; anything else keeps the current level.
    pub fn with_log_level_str(self, level: &str) -> Self {
        match level.parse::<LevelFilter>() {
            Ok(level) => self.with_log_level(level),
            Err(_) => self,
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            sparkline: SparklineStyle::default(),
            dialog_title: DIALOG_TITLE.to_string(),
            custom_page_label: CUSTOM_PAGE_LABEL.to_string(),
            required_message: REQUIRED_MESSAGE.to_string(),
            log_level: LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_panel_layout() {
        let cfg = PanelConfig::default();
        assert_eq!(cfg.endpoint, "../data/");
        assert_eq!(cfg.sparkline.width_css(), "36px");
        assert_eq!(cfg.sparkline.height_css(), "15px");
        assert!(cfg.sparkline.spot_color.is_none());
        assert!(cfg.sparkline.fill_color.is_none());
    }

    #[test]
    fn builder_ignores_blank_endpoint_and_bad_level() {
        let cfg = PanelConfig::new()
            .with_endpoint("  ")
            .with_log_level_str("chatty");
        assert_eq!(cfg.endpoint, "../data/");
        assert_eq!(cfg.log_level, LevelFilter::Info);

        let cfg = cfg.with_endpoint("/stats/data/").with_log_level_str("debug");
        assert_eq!(cfg.endpoint, "/stats/data/");
        assert_eq!(cfg.log_level, LevelFilter::Debug);
    }
}
