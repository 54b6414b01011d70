//! Row storage behind the record engine.
//!
//! The engine speaks in JSON rows scoped by `user_id`; backends translate
//! those into PostgREST calls, SQL, or in-process tables. Every backend must
//! perform [`Upsert`] as one keyed write so concurrent requests for the same
//! user never produce a second row.

use async_trait::async_trait;
use merlin_core::records::{SortDirection, Table};

pub mod memory;
pub mod postgres;
pub mod rest;

pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid store endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("invalid column name '{0}'")]
    InvalidColumn(String),
    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Insert a row, or update `update_columns` of the existing row with the
/// same `user_id`. Columns present in `row` but not in `update_columns` are
/// written only when the row is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub table: Table,
    pub row: Row,
    pub update_columns: Vec<&'static str>,
}

impl Upsert {
    /// Columns written only on insert.
    pub fn insert_only_columns(&self) -> Vec<&str> {
        self.row
            .keys()
            .map(String::as_str)
            .filter(|c| *c != merlin_core::records::USER_ID && !self.updates(c))
            .collect()
    }

    fn updates(&self, column: &str) -> bool {
        self.update_columns.iter().any(|c| *c == column)
    }

    /// The subset of `row` that an update rewrites.
    pub fn update_row(&self) -> Row {
        self.row
            .iter()
            .filter(|(k, _)| self.updates(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Rows of one user, optionally projected, ordered and limited.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub table: Table,
    pub user_id: String,
    /// `None` selects every column.
    pub columns: Option<Vec<&'static str>>,
    pub order: Option<(&'static str, SortDirection)>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn all(table: Table, user_id: &str) -> Self {
        Self {
            table,
            user_id: user_id.to_string(),
            columns: None,
            order: None,
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns = Some(columns.to_vec());
        self
    }

    pub fn order_by(mut self, column: &'static str, direction: SortDirection) -> Self {
        self.order = Some((column, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert(&self, op: Upsert) -> Result<(), StoreError>;

    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError>;

    async fn select(&self, query: ListQuery) -> Result<Vec<Row>, StoreError>;

    /// Cheap reachability check for `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Column names are interpolated into SQL and query strings, so only plain
/// snake_case identifiers are accepted.
pub(crate) fn check_column(name: &str) -> Result<&str, StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidColumn(name.to_string()))
    }
}
