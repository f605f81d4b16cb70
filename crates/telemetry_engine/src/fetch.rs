use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use telemetry_logging::telemetry_debug;
use url::Url;

use crate::{ApiResponse, FailureKind, FetchError, Method, RequestTarget};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Upper bound for one whole call, body included.
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, target: &RequestTarget) -> Result<ApiResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    base_url: Url,
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestApiClient {
    pub fn new(base_url: &str, settings: FetchSettings) -> Result<Self, FetchError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("{base_url} cannot be used as a base url"),
            ));
        }
        // A prefix like `/backend` is a directory; without the trailing
        // slash `join` would replace its last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            base_url,
            settings,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves below the base url's path, so `/api/x` against
    /// `http://host/backend/` is `http://host/backend/api/x`.
    pub fn resolve(&self, path_and_query: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path_and_query.trim_start_matches('/'))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn execute(&self, target: &RequestTarget) -> Result<ApiResponse, FetchError> {
        let url = self.resolve(&target.path_and_query)?;
        let mut request = match target.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        }
        .header(ACCEPT, "application/json");
        if let Some(body) = &target.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(Some(content_len)));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(Some(next_len)));
            }
            bytes.extend_from_slice(&chunk);
        }

        match serde_json::from_slice(&bytes) {
            Ok(json) => Ok(ApiResponse {
                status: status.as_u16(),
                json,
            }),
            Err(_) if !status.is_success() => Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            )),
            Err(err) => Err(FetchError::new(FailureKind::Malformed, err.to_string())),
        }
    }

    fn too_large(&self, actual: Option<u64>) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual,
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl ApiClient for ReqwestApiClient {
    async fn send(&self, target: &RequestTarget) -> Result<ApiResponse, FetchError> {
        telemetry_debug!("{:?} {}", target.method, target.path_and_query);
        // The client timeout does not always cover a stalled body stream.
        match tokio::time::timeout(self.settings.request_timeout, self.execute(target)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                FailureKind::Timeout,
                format!(
                    "no response within {} ms",
                    self.settings.request_timeout.as_millis()
                ),
            )),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
