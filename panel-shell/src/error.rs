use thiserror::Error;

use crate::dom::FormField;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("element not found: {0}")]
    Missing(String),
    #[error("dom operation failed: {0}")]
    Js(String),
}

/// Custom-range form rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required fields are empty: {}", join_fields(.0))]
    Required(Vec<FormField>),
}

fn join_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|f| f.dom_id())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] stats_feed::FetchError),
    #[error("invalid value {value:?} in field {field}")]
    InvalidField { field: String, value: String },
}
