use gloo_net::http::Request;

use crate::{FetchError, StatsFuture, StatsRequest, StatsResponse, StatsSource, DEFAULT_ENDPOINT};

/// Browser fetch against the stats endpoint.
#[derive(Debug, Clone)]
pub struct HttpStatsSource {
    endpoint: String,
}

impl HttpStatsSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpStatsSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl StatsSource for HttpStatsSource {
    fn fetch(&self, request: StatsRequest) -> StatsFuture {
        let endpoint = self.endpoint.clone();
        Box::pin(async move {
            let resp = Request::post(&endpoint)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("X-Requested-With", "XMLHttpRequest")
                .body(request.to_form_body())
                .map_err(|e| FetchError::Transport(e.to_string()))?
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            if !resp.ok() {
                return Err(FetchError::Status(resp.status()));
            }
            let body = resp
                .text()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            StatsResponse::from_json(&body)
        })
    }
}
