use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use merlin_core::records::{SortDirection, Table, USER_ID};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ListQuery, RecordStore, Row, StoreError, Upsert, check_column};

/// In-process store for local development and tests. Data is lost on exit.
///
/// Ordering follows Postgres: nulls sort after every value, so they come
/// last ascending and first descending. Ties keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, table: Table) -> usize {
        self.tables
            .read()
            .await
            .get(&table)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn row_user_id(row: &Row) -> Option<&str> {
    row.get(USER_ID).and_then(Value::as_str)
}

fn timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::String(a), Value::String(b)) => match (timestamp(a), timestamp(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a.cmp(b),
        },
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, op: Upsert) -> Result<(), StoreError> {
        let user_id = row_user_id(&op.row)
            .ok_or_else(|| StoreError::InvalidColumn(USER_ID.to_string()))?
            .to_string();

        let mut tables = self.tables.write().await;
        let rows = tables.entry(op.table).or_default();

        match rows
            .iter_mut()
            .find(|row| row_user_id(row) == Some(user_id.as_str()))
        {
            Some(existing) => {
                for (column, value) in op.update_row() {
                    existing.insert(column, value);
                }
            }
            None => rows.push(op.row),
        }
        Ok(())
    }

    async fn insert(&self, table: Table, mut row: Row) -> Result<(), StoreError> {
        if row_user_id(&row).is_none() {
            return Err(StoreError::InvalidColumn(USER_ID.to_string()));
        }
        if !table.is_single_row() {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            row.insert("id".to_string(), Value::from(id));
        }
        self.tables.write().await.entry(table).or_default().push(row);
        Ok(())
    }

    async fn select(&self, query: ListQuery) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_user_id(row) == Some(query.user_id.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some((column, direction)) = query.order {
            let column = check_column(column)?;
            rows.sort_by(|a, b| {
                let a = a.get(column).unwrap_or(&Value::Null);
                let b = b.get(column).unwrap_or(&Value::Null);
                match direction {
                    SortDirection::Asc => compare_values(a, b),
                    SortDirection::Desc => compare_values(b, a),
                }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }

        if let Some(columns) = &query.columns {
            for column in columns {
                check_column(column)?;
            }
            rows = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .filter(|(k, _)| columns.iter().any(|c| *c == k.as_str()))
                        .collect()
                })
                .collect();
        }

        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
