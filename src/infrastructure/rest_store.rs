// REST store - PostgREST-style access to the hosted relational store

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::RemoteStore;
use crate::models::EntityKind;

#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    /// Sends the signed-in user's token instead of the anonymous key.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/rest/v1/{}", self.base_url, kind.table())
    }

    fn request(&self, method: Method, kind: EntityKind) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, self.table_url(kind))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn send_rows(&self, request: RequestBuilder, what: &str) -> AppResult<Vec<Value>> {
        let response = request.send().await.map_err(|e| transport_error(what, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, what, &body));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| AppError::Serialization(format!("{}: {}", what, e)))
    }

    fn single(rows: Vec<Value>, what: String) -> AppResult<Value> {
        rows.into_iter().next().ok_or(AppError::NotFound(what))
    }
}

fn id_filter(id: Uuid) -> (&'static str, String) {
    ("id", format!("eq.{}", id))
}

/// Maps an HTTP failure status onto the remote error taxonomy.
pub fn status_error(status: StatusCode, what: &str, body: &str) -> AppError {
    let detail = format!("{} ({}): {}", what, status.as_u16(), body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(detail),
        StatusCode::NOT_FOUND => AppError::NotFound(detail),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::Validation(detail)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => AppError::Timeout(detail),
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
            AppError::Transient(detail)
        }
        _ => AppError::Internal(detail),
    }
}

fn transport_error(what: &str, err: reqwest::Error) -> AppError {
    warn!("{} failed before a response: {}", what, err);
    if err.is_timeout() {
        AppError::Timeout(format!("{}: {}", what, err))
    } else {
        AppError::Transient(format!("{}: {}", what, err))
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    #[instrument(skip(self))]
    async fn get(&self, kind: EntityKind, id: Uuid) -> AppResult<Value> {
        let what = format!("get {} {}", kind, id);
        let request = self
            .request(Method::GET, kind)
            .query(&[id_filter(id), ("select", "*".to_string())]);
        let rows = self.send_rows(request, &what).await?;
        Self::single(rows, what)
    }

    #[instrument(skip(self))]
    async fn list(&self, kind: EntityKind, scope: &str) -> AppResult<Vec<Value>> {
        let what = format!("list {} for {}", kind, scope);
        let order = kind.list_order();
        let direction = if order.descending { "desc" } else { "asc" };
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", format!("{}.{}.nullslast", order.column, direction)),
        ];
        if let Some(column) = kind.scope_column() {
            params.push((column, format!("eq.{}", scope)));
        }
        let rows = self
            .send_rows(self.request(Method::GET, kind).query(&params), &what)
            .await?;
        debug!("{} returned {} rows", what, rows.len());
        Ok(rows)
    }

    #[instrument(skip(self, row))]
    async fn create(&self, kind: EntityKind, row: Value) -> AppResult<Value> {
        let what = format!("create {}", kind);
        let request = self
            .request(Method::POST, kind)
            .header("Prefer", "return=representation")
            .json(&row);
        let rows = self.send_rows(request, &what).await?;
        Self::single(rows, what)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, kind: EntityKind, id: Uuid, changes: Value) -> AppResult<Value> {
        let what = format!("update {} {}", kind, id);
        let request = self
            .request(Method::PATCH, kind)
            .query(&[id_filter(id)])
            .header("Prefer", "return=representation")
            .json(&changes);
        let rows = self.send_rows(request, &what).await?;
        Self::single(rows, what)
    }

    #[instrument(skip(self))]
    async fn delete(&self, kind: EntityKind, id: Uuid) -> AppResult<()> {
        let what = format!("delete {} {}", kind, id);
        let request = self.request(Method::DELETE, kind).query(&[id_filter(id)]);
        self.send_rows(request, &what).await?;
        Ok(())
    }
}
