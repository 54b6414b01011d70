//! Single-row-per-user records (preferences, goal).
//!
//! A write is one keyed upsert: the store inserts the row if the user has
//! none, otherwise rewrites only the update columns. Defaults that belong to
//! creation (a goal's `status`) sit in the insert row but outside the update
//! set, so later writes leave them alone.

use merlin_core::records::{
    GOAL_STATUS_ACTIVE, GoalRecord, PreferenceFields, PreferenceRecord, Table,
};

use super::{Ack, RecordError, required_text, to_row};
use crate::store::{ListQuery, RecordStore, Upsert};

const GOAL_TEXT: &str = "goal_text";

#[derive(Debug, Clone, PartialEq)]
pub enum SingleRowWrite {
    /// Replaces all four preference fields.
    Preferences(PreferenceFields),
    /// Replaces the goal text; status is set only when the goal is created.
    Goal { goal_text: String },
}

impl SingleRowWrite {
    pub fn goal(goal: Option<String>) -> Result<Self, RecordError> {
        let goal_text = required_text(goal, "goal", "Missing goal")?;
        Ok(SingleRowWrite::Goal { goal_text })
    }

    pub fn goal_text(&self) -> Option<&str> {
        match self {
            SingleRowWrite::Goal { goal_text } => Some(goal_text),
            SingleRowWrite::Preferences(_) => None,
        }
    }

    pub fn table(&self) -> Table {
        match self {
            SingleRowWrite::Preferences(_) => Table::Preferences,
            SingleRowWrite::Goal { .. } => Table::Goals,
        }
    }

    fn into_upsert(self, user_id: &str) -> Result<Upsert, RecordError> {
        let table = self.table();
        let user_id = user_id.to_string();
        let (row, update_columns) = match self {
            SingleRowWrite::Preferences(fields) => (
                to_row(&PreferenceRecord { user_id, fields })?,
                PreferenceFields::COLUMNS.to_vec(),
            ),
            SingleRowWrite::Goal { goal_text } => (
                to_row(&GoalRecord {
                    user_id,
                    goal_text,
                    status: GOAL_STATUS_ACTIVE.to_string(),
                })?,
                vec![GOAL_TEXT],
            ),
        };
        Ok(Upsert {
            table,
            row,
            update_columns,
        })
    }
}

pub async fn upsert_single(
    store: &dyn RecordStore,
    user_id: &str,
    write: SingleRowWrite,
) -> Result<Ack, RecordError> {
    let upsert = write.into_upsert(user_id)?;
    let table = upsert.table;
    store.upsert(upsert).await?;

    tracing::debug!(user_id = %user_id, table = %table, "single-row record written");
    Ok(Ack)
}

pub async fn fetch_preferences(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Option<PreferenceRecord>, RecordError> {
    let rows = store
        .select(ListQuery::all(Table::Preferences, user_id).limit(1))
        .await?;
    rows.into_iter()
        .next()
        .map(|row| {
            serde_json::from_value(serde_json::Value::Object(row))
                .map_err(|e| RecordError::Persistence(e.into()))
        })
        .transpose()
}

pub async fn fetch_goal_text(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Option<String>, RecordError> {
    let rows = store
        .select(
            ListQuery::all(Table::Goals, user_id)
                .columns(&[GOAL_TEXT])
                .limit(1),
        )
        .await?;
    Ok(rows
        .first()
        .and_then(|row| row.get(GOAL_TEXT))
        .and_then(|v| v.as_str())
        .map(str::to_string))
}
