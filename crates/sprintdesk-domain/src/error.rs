use crate::ids::TeamId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "this field is required")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{resource} requires a resolved `{parent_key}` scope")]
    ScopeMissing {
        resource: &'static str,
        parent_key: &'static str,
    },
    #[error("validation failed: {}", summarize_fields(.fields))]
    Validation { fields: Vec<FieldError> },
    #[error("request failed with status {status}: {body}")]
    Request { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(
        "team {team_id} was created but its creator membership failed ({}): {source}",
        rollback_label(.rolled_back)
    )]
    PartialCompoundFailure {
        team_id: TeamId,
        rolled_back: bool,
        source: Box<ClientError>,
    },
}

impl ClientError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![FieldError::new(field, message)],
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::PartialCompoundFailure { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Errors raised before any request left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::ScopeMissing { .. } | Self::Validation { .. } | Self::Configuration(_)
        )
    }
}

fn summarize_fields(fields: &[FieldError]) -> String {
    if fields.is_empty() {
        return "request rejected".to_owned();
    }
    fields
        .iter()
        .map(|entry| format!("{}: {}", entry.field, entry.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn rollback_label(rolled_back: &bool) -> &'static str {
    if *rolled_back {
        "team rolled back"
    } else {
        "team left orphaned"
    }
}
