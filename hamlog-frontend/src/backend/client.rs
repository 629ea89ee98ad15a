use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use hamlog_common::{ApiEnvelope, HistoryEntry, Record, RecordId, RecordPage, UpdateFields};

use crate::backend::source::{RecordSource, SourceError};
use crate::config::FrontendConfig;

/// HTTP client for the log server's JSON API
#[derive(Clone)]
pub struct HttpRecordSource {
    client: Client,
    base_url: Url,
}

impl HttpRecordSource {
    /// Create a new client for the API rooted at `base_url`
    pub fn new(base_url: &str, timeout: Option<Duration>, user_agent: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API url: {}", base_url))?;
        // Url::join replaces the last path segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        tracing::info!("Log API client ready for {}", base_url);

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &FrontendConfig) -> Result<Self> {
        Self::new(&config.api_url, config.request_timeout(), &config.user_agent)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|e| SourceError::Transport(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, SourceError> {
        request
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))
    }
}

/// Decode the `{success, message, data}` envelope.
///
/// A missing or false `success` flag is a failure even on HTTP 200.
async fn read_envelope<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<ApiEnvelope<T>, SourceError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SourceError::Transport(e.to_string()))?;

    let envelope = match serde_json::from_str::<ApiEnvelope<T>>(&body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            return Err(SourceError::Decode(format!("{}: {}", context, e)));
        }
        Err(_) => {
            return Err(SourceError::Status {
                context: context.to_string(),
                status: status.as_u16(),
            });
        }
    };

    if status.is_success() && envelope.success {
        return Ok(envelope);
    }

    match envelope.message {
        Some(message) if status == StatusCode::NOT_FOUND => Err(SourceError::NotFound(message)),
        Some(message) => Err(SourceError::Rejected(message)),
        None if !status.is_success() => Err(SourceError::Status {
            context: context.to_string(),
            status: status.as_u16(),
        }),
        None => Err(SourceError::Rejected(format!("{} failed", context))),
    }
}

fn missing_data(context: &str) -> SourceError {
    SourceError::Decode(format!("{}: response has no data", context))
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn list_page(&self, page: u32, page_size: u32) -> Result<RecordPage, SourceError> {
        let mut url = self.endpoint("api/logs")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &page_size.to_string());

        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        let envelope: ApiEnvelope<Vec<Record>> = read_envelope(response, "loading logs").await?;

        let total = envelope.total.ok_or_else(|| SourceError::Decode("loading logs: response has no total".to_string()))?;
        let records = envelope.data.ok_or_else(|| missing_data("loading logs"))?;

        tracing::debug!("Page {} loaded: {} of {} records", page, records.len(), total);

        Ok(RecordPage { page, records, total })
    }

    async fn get_one(&self, id: RecordId) -> Result<Record, SourceError> {
        let url = self.endpoint(&format!("api/logs/{}", id))?;
        let context = format!("loading record {}", id);

        let response = self.send(self.client.get(url)).await?;
        let envelope: ApiEnvelope<Record> = read_envelope(response, &context).await?;

        envelope.data.ok_or_else(|| missing_data(&context))
    }

    async fn create_one(&self, fields: &UpdateFields) -> Result<(), SourceError> {
        let url = self.endpoint("log/new")?;

        let response = self
            .send(self.client.post(url).header("Accept", "application/json").json(fields))
            .await?;
        read_envelope::<serde_json::Value>(response, "creating record").await?;

        tracing::info!("Logged new contact with {}", fields.callsign);
        Ok(())
    }

    async fn update_one(&self, id: RecordId, fields: &UpdateFields) -> Result<(), SourceError> {
        let url = self.endpoint(&format!("api/logs/{}", id))?;
        let context = format!("update of record {}", id);

        let response = self
            .send(self.client.put(url).header("Accept", "application/json").json(fields))
            .await?;
        read_envelope::<serde_json::Value>(response, &context).await?;

        tracing::debug!("Record {} updated", id);
        Ok(())
    }

    async fn delete_many(&self, ids: &[RecordId]) -> Result<(), SourceError> {
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut url = self.endpoint("api/logs/del")?;
        url.query_pairs_mut().append_pair("id", &joined);

        let response = self.send(self.client.get(url)).await?;
        read_envelope::<serde_json::Value>(response, "deleting records").await?;

        tracing::info!("Deleted records [{}]", joined);
        Ok(())
    }

    async fn callsign_history(&self, callsign: &str) -> Result<Vec<HistoryEntry>, SourceError> {
        let mut url = self.endpoint("api/history")?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Transport(format!("API url cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .push(callsign);

        let context = format!("history of {}", callsign);
        let response = self.send(self.client.get(url)).await?;
        let envelope: ApiEnvelope<Vec<HistoryEntry>> = read_envelope(response, &context).await?;

        Ok(envelope.data.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query, State},
        http::StatusCode as AxumStatus,
        routing::{get, post},
        Json, Router,
    };
    use hamlog_common::QslStatus;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct ServerState {
        queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
        updates: Arc<Mutex<Vec<(i64, UpdateFields)>>>,
        created: Arc<Mutex<Vec<UpdateFields>>>,
        locked: Arc<Mutex<Vec<i64>>>,
    }

    fn sample(id: i64) -> Record {
        Record {
            callsign: Some(format!("BG5FN{}", id)),
            frequency: Some(145.5),
            mode: Some("FM".to_string()),
            ..Record::new(RecordId(id))
        }
    }

    async fn list_logs(
        State(state): State<ServerState>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        state.queries.lock().unwrap().push(query);
        Json(serde_json::json!({
            "success": true,
            "data": [sample(1), sample(2)],
            "total": 27,
            "pages": 2,
            "current_page": 1
        }))
    }

    async fn get_log(Path(id): Path<i64>) -> (AxumStatus, Json<serde_json::Value>) {
        if id == 404 {
            return (
                AxumStatus::NOT_FOUND,
                Json(serde_json::json!({"success": false, "message": "log not found"})),
            );
        }
        (AxumStatus::OK, Json(serde_json::json!({"success": true, "data": sample(id)})))
    }

    async fn put_log(
        State(state): State<ServerState>,
        Path(id): Path<i64>,
        Json(fields): Json<UpdateFields>,
    ) -> (AxumStatus, Json<serde_json::Value>) {
        if state.locked.lock().unwrap().contains(&id) {
            return (
                AxumStatus::OK,
                Json(serde_json::json!({"success": false, "message": "locked record"})),
            );
        }
        if id == 500 {
            return (AxumStatus::INTERNAL_SERVER_ERROR, Json(serde_json::json!({})));
        }
        state.updates.lock().unwrap().push((id, fields));
        (AxumStatus::OK, Json(serde_json::json!({"success": true, "data": {"id": id}})))
    }

    async fn new_log(
        State(state): State<ServerState>,
        Json(fields): Json<UpdateFields>,
    ) -> (AxumStatus, Json<serde_json::Value>) {
        if fields.callsign.is_empty() {
            return (
                AxumStatus::BAD_REQUEST,
                Json(serde_json::json!({"success": false, "message": "form validation failed", "error": "VALIDATION_ERROR"})),
            );
        }
        let reply = serde_json::json!({
            "success": true,
            "message": "log added",
            "data": {"callsign": fields.callsign, "frequency": fields.frequency, "mode": fields.mode}
        });
        state.created.lock().unwrap().push(fields);
        (AxumStatus::CREATED, Json(reply))
    }

    async fn delete_logs(
        State(state): State<ServerState>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        state.queries.lock().unwrap().push(query);
        Json(serde_json::json!({"success": true, "message": "deleted"}))
    }

    async fn history(Path(callsign): Path<String>) -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "success": true,
            "data": [{"date": "2026-10-01", "time": "08:00:00", "frequency": "7.050", "mode": callsign}]
        }))
    }

    async fn spawn_server(state: ServerState) -> String {
        let app = Router::new()
            .route("/api/logs", get(list_logs))
            .route("/api/logs/del", get(delete_logs))
            .route("/api/logs/{id}", get(get_log).put(put_log))
            .route("/api/history/{callsign}", get(history))
            .route("/log/new", post(new_log))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fields() -> UpdateFields {
        UpdateFields {
            callsign: "BG5FNA".to_string(),
            frequency: 14.074,
            mode: "FT8".to_string(),
            equipment: String::new(),
            antenna: String::new(),
            power: 0.0,
            dxcc: String::new(),
            grid: "OM89".to_string(),
            province: String::new(),
            band: "20m".to_string(),
            qslcard: QslStatus::Sent,
            notes: String::new(),
            date: "2026-10-17".to_string(),
            time: "12:30".to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_page_sends_page_and_size() {
        let state = ServerState::default();
        let url = spawn_server(state.clone()).await;
        let source = HttpRecordSource::new(&url, None, "hamlog-test").unwrap();

        let page = source.list_page(2, 25).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total, 27);
        assert_eq!(page.ids(), vec![RecordId(1), RecordId(2)]);

        let queries = state.queries.lock().unwrap();
        assert_eq!(queries[0].get("page").map(String::as_str), Some("2"));
        assert_eq!(queries[0].get("size").map(String::as_str), Some("25"));
    }

    #[tokio::test]
    async fn test_get_one_not_found_keeps_server_message() {
        let url = spawn_server(ServerState::default()).await;
        let source = HttpRecordSource::new(&url, None, "hamlog-test").unwrap();

        let record = source.get_one(RecordId(7)).await.unwrap();
        assert_eq!(record.callsign.as_deref(), Some("BG5FN7"));

        let err = source.get_one(RecordId(404)).await.unwrap_err();
        assert_eq!(err, SourceError::NotFound("log not found".to_string()));
        assert_eq!(err.to_string(), "log not found");
    }

    #[tokio::test]
    async fn test_update_one_posts_fields_and_surfaces_rejection() {
        let state = ServerState::default();
        state.locked.lock().unwrap().push(12);
        let url = spawn_server(state.clone()).await;
        let source = HttpRecordSource::new(&url, None, "hamlog-test").unwrap();

        source.update_one(RecordId(13), &fields()).await.unwrap();
        let err = source.update_one(RecordId(12), &fields()).await.unwrap_err();
        assert_eq!(err.to_string(), "locked record");

        let err = source.update_one(RecordId(500), &fields()).await.unwrap_err();
        assert_eq!(
            err,
            SourceError::Status { context: "update of record 500".to_string(), status: 500 }
        );

        let updates = state.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0], (13, fields()));
    }

    #[tokio::test]
    async fn test_create_one_posts_new_contact() {
        let state = ServerState::default();
        let url = spawn_server(state.clone()).await;
        let source = HttpRecordSource::new(&url, None, "hamlog-test").unwrap();

        source.create_one(&fields()).await.unwrap();
        assert_eq!(*state.created.lock().unwrap(), vec![fields()]);

        let mut empty = fields();
        empty.callsign.clear();
        let err = source.create_one(&empty).await.unwrap_err();
        assert_eq!(err, SourceError::Rejected("form validation failed".to_string()));
        assert_eq!(state.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_many_joins_ids_in_one_request() {
        let state = ServerState::default();
        let url = spawn_server(state.clone()).await;
        let source = HttpRecordSource::new(&url, None, "hamlog-test").unwrap();

        source.delete_many(&[RecordId(7), RecordId(9)]).await.unwrap();

        let queries = state.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].get("id").map(String::as_str), Some("7,9"));
    }

    #[tokio::test]
    async fn test_callsign_history_encodes_portable_suffix() {
        let url = spawn_server(ServerState::default()).await;
        let source = HttpRecordSource::new(&format!("{}/", url), None, "hamlog-test").unwrap();

        let entries = source.callsign_history("BG5FNA/P").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mode.as_deref(), Some("BG5FNA/P"));
        assert_eq!(entries[0].frequency, Some(7.05));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpRecordSource::new(&format!("http://{}", addr), Some(Duration::from_secs(2)), "hamlog-test").unwrap();
        let err = source.list_page(1, 25).await.unwrap_err();
        assert!(matches!(err, SourceError::Transport(_)), "unexpected error: {:?}", err);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let source = HttpRecordSource::new("http://localhost:5000/qso", None, "hamlog-test").unwrap();
        assert_eq!(source.base_url().as_str(), "http://localhost:5000/qso/");
        assert_eq!(
            source.endpoint("api/logs").unwrap().as_str(),
            "http://localhost:5000/qso/api/logs"
        );
    }
}
