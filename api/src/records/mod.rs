//! Token-scoped record operations. Every function takes the caller's
//! resolved `user_id` and never touches another user's rows.

use serde::Serialize;

use crate::store::{Row, StoreError};

pub mod log;
pub mod single;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl RecordError {
    pub fn missing(field: &'static str, message: &str) -> Self {
        RecordError::Validation {
            field,
            message: message.to_string(),
        }
    }
}

/// Acknowledgement of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

/// Non-blank text, or a validation error naming `field`.
pub(crate) fn required_text(
    value: Option<String>,
    field: &'static str,
    message: &str,
) -> Result<String, RecordError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(RecordError::missing(field, message)),
    }
}

/// Serialize a typed record into a store row.
pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Row, RecordError> {
    match serde_json::to_value(value).map_err(StoreError::from)? {
        serde_json::Value::Object(row) => Ok(row),
        _ => Err(RecordError::Persistence(StoreError::InvalidColumn(
            "<non-object row>".to_string(),
        ))),
    }
}
