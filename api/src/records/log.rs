//! Append-only, many-rows-per-user records (commitments, session logs).

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use merlin_core::records::{COMMITMENT_STATUS_PENDING, CommitmentRecord, SortDirection, Table};
use serde::Serialize;
use serde_json::Value;

use super::{Ack, RecordError, required_text, to_row};
use crate::store::{ListQuery, RecordStore, Row};

const DUE_DATE: &str = "due_date";
const STARTED_AT: &str = "started_at";
const SUMMARY: &str = "summary";

#[derive(Debug, Clone, PartialEq)]
pub enum AppendWrite {
    Commitment {
        commitment_text: String,
        due_date: Option<NaiveDate>,
    },
    SessionLog {
        summary: String,
        full_log: Vec<Value>,
    },
}

#[derive(Serialize)]
struct CommitmentRow<'a> {
    user_id: &'a str,
    commitment_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<NaiveDate>,
    status: &'static str,
}

#[derive(Serialize)]
struct SessionLogRow<'a> {
    user_id: &'a str,
    summary: String,
    full_log: String,
    started_at: String,
}

impl AppendWrite {
    /// `due_date` is an ISO calendar date; blank counts as absent.
    pub fn commitment(
        commitment_text: Option<String>,
        due_date: Option<String>,
    ) -> Result<Self, RecordError> {
        let commitment_text =
            required_text(commitment_text, "commitment_text", "Missing commitment text")?;
        let due_date = match due_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                RecordError::Validation {
                    field: DUE_DATE,
                    message: format!("Invalid due_date '{raw}', expected YYYY-MM-DD"),
                }
            })?),
        };
        Ok(AppendWrite::Commitment {
            commitment_text,
            due_date,
        })
    }

    pub fn session_log(
        summary: Option<String>,
        full_log: Option<Vec<Value>>,
    ) -> Result<Self, RecordError> {
        let summary = required_text(summary, SUMMARY, "Missing summary")?;
        let full_log = match full_log {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Err(RecordError::missing("full_log", "Missing full_log")),
        };
        Ok(AppendWrite::SessionLog { summary, full_log })
    }

    pub fn table(&self) -> Table {
        match self {
            AppendWrite::Commitment { .. } => Table::Commitments,
            AppendWrite::SessionLog { .. } => Table::SessionLogs,
        }
    }

    fn into_row(self, user_id: &str, now: DateTime<Utc>) -> Result<Row, RecordError> {
        match self {
            AppendWrite::Commitment {
                commitment_text,
                due_date,
            } => to_row(&CommitmentRow {
                user_id,
                commitment_text,
                due_date,
                status: COMMITMENT_STATUS_PENDING,
            }),
            AppendWrite::SessionLog { summary, full_log } => {
                let full_log = serde_json::to_string(&full_log)
                    .map_err(|e| RecordError::Persistence(e.into()))?;
                to_row(&SessionLogRow {
                    user_id,
                    summary,
                    full_log,
                    started_at: now.to_rfc3339_opts(SecondsFormat::Micros, true),
                })
            }
        }
    }
}

/// Insert a new record. Session logs are stamped with the server clock.
pub async fn append(
    store: &dyn RecordStore,
    user_id: &str,
    write: AppendWrite,
) -> Result<Ack, RecordError> {
    append_at(store, user_id, write, Utc::now()).await
}

pub async fn append_at(
    store: &dyn RecordStore,
    user_id: &str,
    write: AppendWrite,
    now: DateTime<Utc>,
) -> Result<Ack, RecordError> {
    let table = write.table();
    let row = write.into_row(user_id, now)?;
    store.insert(table, row).await?;

    tracing::debug!(user_id = %user_id, table = %table, "record appended");
    Ok(Ack)
}

pub async fn list_ordered(
    store: &dyn RecordStore,
    user_id: &str,
    table: Table,
    order_key: &'static str,
    direction: SortDirection,
    limit: Option<u32>,
) -> Result<Vec<Row>, RecordError> {
    let mut query = ListQuery::all(table, user_id).order_by(order_key, direction);
    query.limit = limit;
    Ok(store.select(query).await?)
}

/// All commitments of a user, earliest due date first.
pub async fn list_commitments(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<CommitmentRecord>, RecordError> {
    let rows = list_ordered(
        store,
        user_id,
        Table::Commitments,
        DUE_DATE,
        SortDirection::Asc,
        None,
    )
    .await?;
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .map_err(|e| RecordError::Persistence(e.into()))
        })
        .collect()
}

/// Summary of the session with the latest `started_at`.
pub async fn latest_session_summary(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Option<String>, RecordError> {
    let query = ListQuery::all(Table::SessionLogs, user_id)
        .columns(&[SUMMARY])
        .order_by(STARTED_AT, SortDirection::Desc)
        .limit(1);
    let rows = store.select(query).await?;
    Ok(rows
        .first()
        .and_then(|row| row.get(SUMMARY))
        .and_then(Value::as_str)
        .map(str::to_string))
}
