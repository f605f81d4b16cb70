//! Backend request descriptions and typed response decoding.
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded;
use url::Url;

use crate::{FilterField, SearchQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A backend call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish()
    }

    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string())
        }
    }
}

/// What a channel asks the backend for on one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSpec {
    SearchAssets(SearchQuery),
    Suggestions(FilterField),
    Sessions,
    AssetSessions(String),
    SessionMetrics,
    CommandStats { context: String },
}

impl RequestSpec {
    pub fn to_api_request(&self) -> ApiRequest {
        match self {
            RequestSpec::SearchAssets(query) => {
                ApiRequest::get("/api/search/assets").with_query(query.query_pairs())
            }
            RequestSpec::Suggestions(field) => ApiRequest::get("/api/search/suggestions")
                .with_query(vec![("field".to_string(), field.param().to_string())]),
            RequestSpec::Sessions => ApiRequest::get("/api/sessions"),
            RequestSpec::AssetSessions(asset_id) => ApiRequest::get(asset_sessions_path(asset_id)),
            RequestSpec::SessionMetrics => ApiRequest::get("/api/sessions/metrics"),
            RequestSpec::CommandStats { context } => ApiRequest::get("/api/redis/stats")
                .with_query(vec![("context".to_string(), context.clone())]),
        }
    }

    /// Validates the response envelope and decodes the payload for this request.
    pub fn decode(&self, body: &ApiBody) -> Result<Payload, SyncFailure> {
        check_success(body)?;
        let json = &body.json;
        let payload = match self {
            RequestSpec::SearchAssets(_) => {
                let response: SearchResponse = parse(json)?;
                let count = response.count.unwrap_or(response.assets.len() as u64);
                Payload::Assets(SearchResults {
                    total: response.total.unwrap_or(count),
                    count,
                    assets: response.assets,
                })
            }
            RequestSpec::Suggestions(field) => {
                let response: SuggestionsResponse = parse(json)?;
                Payload::Suggestions {
                    field: *field,
                    values: response.suggestions,
                }
            }
            RequestSpec::Sessions | RequestSpec::AssetSessions(_) => {
                let response: SessionsResponse = parse(json)?;
                Payload::Sessions(response.sessions)
            }
            RequestSpec::SessionMetrics => {
                let response: MetricsResponse = parse(json)?;
                Payload::Metrics(response.metrics)
            }
            RequestSpec::CommandStats { .. } => {
                let response: StatsResponse = parse(json)?;
                Payload::Stats(response.stats)
            }
        };
        Ok(payload)
    }

    /// Backend commands a successful response implies, in execution order.
    pub fn inferred_kinds(&self, payload: &Payload) -> Vec<&'static str> {
        let session_reads = match payload {
            Payload::Sessions(sessions) => sessions.len(),
            _ => 0,
        };
        match self {
            RequestSpec::SearchAssets(_) => vec!["ft_search"],
            RequestSpec::Suggestions(_) => vec!["ft_tagvals"],
            RequestSpec::Sessions => {
                let mut kinds = vec!["zrange"];
                kinds.extend(std::iter::repeat("hgetall").take(session_reads));
                kinds
            }
            RequestSpec::AssetSessions(_) => {
                let mut kinds = vec!["zrange"];
                kinds.extend(std::iter::repeat("hgetall").take(session_reads + 1));
                kinds
            }
            RequestSpec::SessionMetrics => vec!["zrange", "hgetall"],
            RequestSpec::CommandStats { .. } => vec!["zrevrange"],
        }
    }
}

/// Request that clears the backend's own command history for a context.
pub fn clear_history_request(context: &str) -> ApiRequest {
    ApiRequest::post(
        "/api/redis/commands/clear",
        serde_json::json!({ "context": context }),
    )
}

fn asset_sessions_path(asset_id: &str) -> String {
    match Url::parse("http://localhost/") {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments
                    .pop_if_empty()
                    .extend(["api", "assets", asset_id, "sessions"]);
            }
            url.path().to_string()
        }
        Err(_) => format!("/api/assets/{asset_id}/sessions"),
    }
}

/// Raw JSON response as delivered by the transport, with its HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBody {
    pub status: u16,
    pub json: Value,
}

/// Why a fetch produced no usable data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncFailure {
    Transport(String),
    Timeout,
    Cancelled,
    HttpStatus(u16),
    /// The backend answered but did not report `success: true`.
    Application(String),
    Malformed(String),
}

impl SyncFailure {
    /// Transport-level failures, as opposed to the backend rejecting the call.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncFailure::Transport(_)
                | SyncFailure::Timeout
                | SyncFailure::Cancelled
                | SyncFailure::HttpStatus(_)
        )
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncFailure::Transport(reason) => write!(f, "network error: {reason}"),
            SyncFailure::Timeout => write!(f, "request timed out"),
            SyncFailure::Cancelled => write!(f, "request cancelled"),
            SyncFailure::HttpStatus(code) => write!(f, "http status {code}"),
            SyncFailure::Application(message) => write!(f, "backend error: {message}"),
            SyncFailure::Malformed(detail) => write!(f, "malformed response: {detail}"),
        }
    }
}

fn check_success(body: &ApiBody) -> Result<(), SyncFailure> {
    if body.json.get("success") == Some(&Value::Bool(true)) {
        return Ok(());
    }
    let message = body
        .json
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if (200..300).contains(&body.status) {
                "request was not successful".to_string()
            } else {
                format!("http status {}", body.status)
            }
        });
    Err(SyncFailure::Application(message))
}

fn parse<T: DeserializeOwned>(json: &Value) -> Result<T, SyncFailure> {
    T::deserialize(json).map_err(|err| SyncFailure::Malformed(err.to_string()))
}

/// Decoded response content.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Assets(SearchResults),
    Suggestions {
        field: FilterField,
        values: Vec<String>,
    },
    Sessions(Vec<SessionRecord>),
    Metrics(SessionMetrics),
    Stats(CommandStats),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResults {
    pub assets: Vec<AssetRecord>,
    pub total: u64,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    assets: Vec<AssetRecord>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsResponse {
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    sessions: Vec<SessionRecord>,
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    metrics: SessionMetrics,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    stats: CommandStats,
}

/// One asset row from the search index. Readings are kept as raw JSON since
/// the index may return them as strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AssetRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub status: Option<String>,
    pub zone: Option<String>,
    pub region: Option<String>,
    pub team: Option<String>,
    pub temperature: Option<Value>,
    pub pressure: Option<Value>,
    pub flow_rate: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: Option<String>,
    pub last_activity: Option<String>,
    pub status: Option<String>,
    /// JSON-encoded profile string as stored by the backend.
    pub user_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct SessionProfile {
    pub name: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub activity: Option<String>,
}

impl SessionRecord {
    /// Decodes `user_data`; an absent or unparsable profile yields `None`.
    pub fn profile(&self) -> Option<SessionProfile> {
        let raw = self.user_data.as_deref()?;
        serde_json::from_str(raw).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SessionMetrics {
    pub total_active_sessions: u64,
    pub unique_users: u64,
    #[serde(default)]
    pub avg_session_duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CommandStats {
    pub read_count: u64,
    pub write_count: u64,
    pub total_count: u64,
}

/// Renders a reading that may be a JSON string or number.
pub fn reading_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
