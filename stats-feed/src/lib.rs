use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use thiserror::Error;
use topn_core::{Pane, ShiftToken, TimeWindow, Timestamp};

#[cfg(target_arch = "wasm32")]
mod http;
#[cfg(target_arch = "wasm32")]
pub use http::HttpStatsSource;

/// Relative path of the stats endpoint as served next to the panel page.
pub const DEFAULT_ENDPOINT: &str = "../data/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("stats endpoint returned HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed stats response: {0}")]
    Decode(String),
}

/// Form-encoded request for one pane. Parameter names are fixed per field kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRequest {
    pub cluster_id: u64,
    pub n: u32,
    pub pane: Pane,
    pub start: Timestamp,
    pub stop: Timestamp,
    /// `None` on the initial load, which sends no `shift` field at all.
    pub shift: Option<ShiftToken>,
}

impl StatsRequest {
    pub fn new(cluster_id: u64, n: u32, pane: Pane) -> Self {
        Self {
            cluster_id,
            n,
            pane,
            start: Timestamp::default(),
            stop: Timestamp::default(),
            shift: None,
        }
    }

    pub fn window(mut self, window: &TimeWindow) -> Self {
        self.start = window.start.clone();
        self.stop = window.stop.clone();
        self
    }

    pub fn shift(mut self, token: ShiftToken) -> Self {
        self.shift = Some(token);
        self
    }

    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("cluster_id", self.cluster_id.to_string()),
            ("start", self.start.as_str().to_string()),
            ("stop", self.stop.as_str().to_string()),
            ("n", self.n.to_string()),
            ("side", self.pane.as_str().to_string()),
        ];
        if let Some(token) = &self.shift {
            pairs.push(("shift", token.as_str().to_string()));
        }
        pairs
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn to_form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.form_pairs())
            .finish()
    }
}

/// JSON body returned by the stats endpoint. Consumed once by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatsResponse {
    /// Row markup for the mean-duration table.
    #[serde(default)]
    pub mean: String,
    /// Row markup for the usage table.
    #[serde(default)]
    pub usage: String,
    pub start: Timestamp,
    pub stop: Timestamp,
    pub start_label: String,
    pub stop_label: String,
    pub has_stats: bool,
    #[serde(default)]
    pub usage_csv_href: String,
    #[serde(default)]
    pub mean_csv_href: String,
}

impl StatsResponse {
    pub fn from_json(body: &str) -> Result<Self, FetchError> {
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Effective window the server computed; this, not the request, is authoritative.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_response_parts(
            self.start.clone(),
            self.stop.clone(),
            self.start_label.clone(),
            self.stop_label.clone(),
        )
    }
}

pub type StatsResult = Result<StatsResponse, FetchError>;

/// Single-threaded future; the browser event loop is the only executor.
pub type StatsFuture = Pin<Box<dyn Future<Output = StatsResult> + 'static>>;

/// Abstract stats endpoint: concrete implementations live behind platform gates or in tests.
pub trait StatsSource {
    /// Exactly one request per call. No retries, no timeout.
    fn fetch(&self, request: StatsRequest) -> StatsFuture;
}

/// Identifies one dispatched fetch so its response can be matched to its pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub pane: Pane,
    pub seq: u64,
}

/// Per-pane monotonically increasing request counter; only the latest ticket may render.
#[derive(Debug, Default, Clone)]
pub struct FetchSequencer {
    latest: [u64; 2],
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, pane: Pane) -> FetchTicket {
        let slot = &mut self.latest[pane.index()];
        *slot += 1;
        FetchTicket { pane, seq: *slot }
    }

    pub fn latest(&self, pane: Pane) -> Option<u64> {
        match self.latest[pane.index()] {
            0 => None,
            seq => Some(seq),
        }
    }

    pub fn is_latest(&self, ticket: &FetchTicket) -> bool {
        self.latest[ticket.pane.index()] == ticket.seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn initial_request_has_no_shift_field() {
        let req = StatsRequest::new(1, 10, Pane::Left).window(&TimeWindow::new("T0", "T1"));
        assert_eq!(
            req.to_form_body(),
            "cluster_id=1&start=T0&stop=T1&n=10&side=left"
        );
    }

    #[test]
    fn shift_request_encodes_empty_and_spaced_values() {
        let req = StatsRequest::new(7, 25, Pane::Right)
            .window(&TimeWindow::new("2012-07-30 14:00", "2012-07-30 15:00"))
            .shift(ShiftToken::none());
        let body = req.to_form_body();
        assert_eq!(
            body,
            "cluster_id=7&start=2012-07-30+14%3A00&stop=2012-07-30+15%3A00&n=25&side=right&shift="
        );
        let keys: Vec<&str> = req.form_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["cluster_id", "start", "stop", "n", "side", "shift"]);
    }

    #[test]
    fn parse_full_response() {
        let resp = StatsResponse::from_json(
            r#"{
                "mean": "<tr id=\"left-tr-mean-a\"></tr>",
                "usage": "<tr id=\"left-tr-usage-a\"></tr>",
                "start": "T0",
                "stop": "T1",
                "start_label": "Mon 00:00",
                "stop_label": "Mon 01:00",
                "has_stats": true,
                "usage_csv_href": "/csv/usage",
                "mean_csv_href": "/csv/mean"
            }"#,
        )
        .unwrap();
        assert!(resp.has_stats);
        assert_eq!(resp.mean_csv_href, "/csv/mean");
        let window = resp.window();
        assert_eq!(window.start.as_str(), "T0");
        assert_eq!(window.stop_label.as_deref(), Some("Mon 01:00"));
    }

    #[test]
    fn empty_window_response_may_omit_links() {
        let resp = StatsResponse::from_json(
            r#"{"start":"T0","stop":"T1","start_label":"a","stop_label":"b","has_stats":false}"#,
        )
        .unwrap();
        assert!(!resp.has_stats);
        assert!(resp.usage_csv_href.is_empty());
        assert!(resp.mean.is_empty());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = StatsResponse::from_json("<html>500</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        let err = StatsResponse::from_json(r#"{"start":"T0"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn sequencer_tracks_latest_per_pane() {
        let mut seq = FetchSequencer::new();
        assert_eq!(seq.latest(Pane::Right), None);
        let first = seq.issue(Pane::Right);
        let left = seq.issue(Pane::Left);
        let second = seq.issue(Pane::Right);
        assert!(!seq.is_latest(&first));
        assert!(seq.is_latest(&second));
        assert!(seq.is_latest(&left));
        assert_eq!(second.seq, first.seq + 1);
    }

    struct Canned(StatsResult);

    impl StatsSource for Canned {
        fn fetch(&self, _request: StatsRequest) -> StatsFuture {
            let result = self.0.clone();
            Box::pin(async move { result })
        }
    }

    #[test]
    fn source_trait_is_object_safe() {
        let source: Box<dyn StatsSource> = Box::new(Canned(Err(FetchError::Status(502))));
        let result = futures::executor::block_on(source.fetch(StatsRequest::new(1, 10, Pane::Left)));
        assert_eq!(result, Err(FetchError::Status(502)));
    }
}
