use async_trait::async_trait;
use merlin_core::records::{Table, USER_ID};
use reqwest::{Method, RequestBuilder, Response};
use url::Url;

use super::{ListQuery, RecordStore, Row, StoreError, Upsert, check_column};
use crate::ids::client::{IdsClient, rejection};

const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";
const PREFER_IGNORE: &str = "resolution=ignore-duplicates,return=minimal";
const PREFER_MINIMAL: &str = "return=minimal";

/// Record store backed by the identity service's PostgREST row API.
#[derive(Clone)]
pub struct RestStore {
    client: IdsClient,
}

impl RestStore {
    pub fn new(client: IdsClient) -> Self {
        Self { client }
    }

    fn table_url(&self, table: Table) -> Result<Url, StoreError> {
        Ok(self.client.endpoint(&format!("rest/v1/{table}"))?)
    }

    fn write(
        &self,
        method: Method,
        table: Table,
        prefer: &str,
    ) -> Result<RequestBuilder, StoreError> {
        Ok(self
            .client
            .request(method, self.table_url(table)?)
            .header("Prefer", prefer))
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let (status, message) = rejection(response).await;
    Err(StoreError::Rejected { status, message })
}

fn eq_filter(user_id: &str) -> (String, String) {
    (USER_ID.to_string(), format!("eq.{user_id}"))
}

pub(crate) fn select_params(query: &ListQuery) -> Result<Vec<(String, String)>, StoreError> {
    let select = match &query.columns {
        Some(columns) => columns
            .iter()
            .map(|c| check_column(c))
            .collect::<Result<Vec<_>, _>>()?
            .join(","),
        None => "*".to_string(),
    };

    let mut params = vec![("select".to_string(), select), eq_filter(&query.user_id)];
    if let Some((column, direction)) = query.order {
        params.push((
            "order".to_string(),
            format!("{}.{}", check_column(column)?, direction.as_str()),
        ));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    Ok(params)
}

#[async_trait]
impl RecordStore for RestStore {
    async fn upsert(&self, op: Upsert) -> Result<(), StoreError> {
        let on_conflict = [("on_conflict", USER_ID)];

        // One merge covers the whole write unless some columns must only be
        // set on creation; then insert-if-absent and patch the update set.
        if op.insert_only_columns().is_empty() {
            let response = self
                .write(Method::POST, op.table, PREFER_MERGE)?
                .query(&on_conflict)
                .json(&op.row)
                .send()
                .await?;
            ensure_success(response).await?;
            return Ok(());
        }

        let response = self
            .write(Method::POST, op.table, PREFER_IGNORE)?
            .query(&on_conflict)
            .json(&op.row)
            .send()
            .await?;
        ensure_success(response).await?;

        let update = op.update_row();
        if update.is_empty() {
            return Ok(());
        }
        let user_id = op
            .row
            .get(USER_ID)
            .and_then(|v| v.as_str())
            .ok_or_else(|| StoreError::InvalidColumn(USER_ID.to_string()))?;
        let response = self
            .write(Method::PATCH, op.table, PREFER_MINIMAL)?
            .query(&[eq_filter(user_id)])
            .json(&update)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn insert(&self, table: Table, row: Row) -> Result<(), StoreError> {
        let response = self
            .write(Method::POST, table, PREFER_MINIMAL)?
            .json(&row)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn select(&self, query: ListQuery) -> Result<Vec<Row>, StoreError> {
        let params = select_params(&query)?;
        let response = self
            .client
            .request(Method::GET, self.table_url(query.table)?)
            .query(&params)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let url = self.client.endpoint("rest/v1/")?;
        let response = self.client.request(Method::GET, url).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}
