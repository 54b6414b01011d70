use async_trait::async_trait;
use merlin_core::records::{Table, USER_ID};
use serde_json::Value;
use sqlx::PgPool;

use super::{ListQuery, RecordStore, Row, StoreError, Upsert, check_column};

/// Direct Postgres backend for deployments that reach the identity
/// service's database without going through its REST layer.
///
/// Rows travel as `jsonb`: writes go through `jsonb_populate_record`, reads
/// come back through `to_jsonb`, so one set of statements serves every table.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn column_list(row: &Row) -> Result<String, StoreError> {
    let columns = row
        .keys()
        .map(|k| check_column(k))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns.join(", "))
}

pub(crate) fn insert_sql(table: Table, row: &Row) -> Result<String, StoreError> {
    let columns = column_list(row)?;
    Ok(format!(
        "INSERT INTO {table} ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1)"
    ))
}

pub(crate) fn upsert_sql(op: &Upsert) -> Result<String, StoreError> {
    let insert = insert_sql(op.table, &op.row)?;
    if op.update_columns.is_empty() {
        return Ok(format!("{insert} ON CONFLICT ({USER_ID}) DO NOTHING"));
    }
    let assignments = op
        .update_columns
        .iter()
        .map(|c| check_column(c).map(|c| format!("{c} = EXCLUDED.{c}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(
        "{insert} ON CONFLICT ({USER_ID}) DO UPDATE SET {}",
        assignments.join(", ")
    ))
}

pub(crate) fn select_sql(query: &ListQuery) -> Result<String, StoreError> {
    let projection = match &query.columns {
        Some(columns) => columns
            .iter()
            .map(|c| check_column(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", "),
        None => "*".to_string(),
    };
    let mut sql = format!(
        "SELECT {projection} FROM {} WHERE {USER_ID} = $1",
        query.table
    );
    if let Some((column, direction)) = query.order {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            check_column(column)?,
            direction.as_str().to_uppercase()
        ));
    }
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(format!("SELECT to_jsonb(r) FROM ({sql}) r"))
}

#[async_trait]
impl RecordStore for PgStore {
    async fn upsert(&self, op: Upsert) -> Result<(), StoreError> {
        let sql = upsert_sql(&op)?;
        sqlx::query(&sql)
            .bind(Value::Object(op.row))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        let sql = insert_sql(table, &row)?;
        sqlx::query(&sql)
            .bind(Value::Object(row))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn select(&self, query: ListQuery) -> Result<Vec<Row>, StoreError> {
        let sql = select_sql(&query)?;
        let values = sqlx::query_scalar::<_, Value>(&sql)
            .bind(&query.user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
