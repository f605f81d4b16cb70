use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Sequence number echoed back with a fetch completion.
pub type RequestSeq = u64;

/// Tags every fetch and timer tick with the page that started it.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A backend call relative to the client's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub method: Method,
    /// Path plus the already encoded query string, e.g. `/api/search/assets?q=pump`.
    pub path_and_query: String,
    pub body: Option<Value>,
}

impl RequestTarget {
    pub fn get(path_and_query: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path_and_query: path_and_query.into(),
            body: None,
        }
    }

    pub fn post(path_and_query: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path_and_query: path_and_query.into(),
            body: Some(body),
        }
    }
}

/// A response whose body parsed as JSON. Non-2xx statuses are kept so the
/// caller can surface the server's own error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub json: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A channel's polling timer fired.
    RefreshDue {
        channel: String,
        generation: Generation,
    },
    FetchCompleted {
        channel: String,
        seq: RequestSeq,
        generation: Generation,
        result: Result<ApiResponse, FetchError>,
    },
    /// Fire-and-forget requests report back only for logging.
    PostCompleted {
        path: String,
        result: Result<ApiResponse, FetchError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// Non-2xx status whose body was not JSON.
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Cancelled,
    /// 2xx status whose body was not JSON.
    Malformed,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Malformed => write!(f, "malformed body"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
