//! Dashboard configuration, loaded from a RON file.
//!
//! Every field has a default so a config file only needs the values it
//! changes. Binding tables are validated before any page is shown.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use telemetry_core::{
    BindingError, PageBindings, PageKind, PageSettings, DEFAULT_LOG_CAPACITY,
    DEFAULT_SEARCH_LIMIT,
};
use telemetry_engine::FetchSettings;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("base_url '{url}' is not an http(s) url")]
    InvalidBaseUrl { url: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("no bindings configured for page '{0}'")]
    MissingPage(PageKind),
    #[error("page '{0}' is configured more than once")]
    DuplicatePage(PageKind),
    #[error(transparent)]
    Binding(#[from] BindingError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_body_bytes: u64,
    pub log_capacity: usize,
    pub search_limit: u32,
    pub clear_remote_history: bool,
    pub pages: Vec<PageBindings>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_ms: 3_000,
            request_timeout_ms: 5_000,
            max_body_bytes: 2 * 1024 * 1024,
            log_capacity: DEFAULT_LOG_CAPACITY,
            search_limit: DEFAULT_SEARCH_LIMIT,
            clear_remote_history: false,
            pages: vec![
                PageBindings::default_for(PageKind::Search),
                PageBindings::default_for(PageKind::Dashboard),
            ],
        }
    }
}

impl DashboardConfig {
    /// Built-in defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&content).map_err(|message| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message,
                })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
            });
        }
        for (field, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("max_body_bytes", self.max_body_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }

        for (index, bindings) in self.pages.iter().enumerate() {
            if self.pages[..index].iter().any(|b| b.page == bindings.page) {
                return Err(ConfigError::DuplicatePage(bindings.page));
            }
        }
        for page in [PageKind::Search, PageKind::Dashboard] {
            self.page_settings(page)?.validate()?;
        }
        Ok(())
    }

    pub fn page_settings(&self, page: PageKind) -> Result<PageSettings, ConfigError> {
        let bindings = self
            .pages
            .iter()
            .find(|bindings| bindings.page == page)
            .cloned()
            .ok_or(ConfigError::MissingPage(page))?;
        Ok(PageSettings {
            bindings,
            log_capacity: self.log_capacity,
            search_limit: self.search_limit,
            clear_remote_history: self.clear_remote_history,
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_bytes: self.max_body_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use telemetry_core::{ChannelBinding, ChannelId, ChannelSource, FilterField};

    #[test]
    fn defaults_validate() {
        DashboardConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = DashboardConfig::parse(
            r#"(
                base_url: "http://assets.local:5001",
                log_capacity: 20,
                clear_remote_history: true,
            )"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://assets.local:5001");
        assert_eq!(config.log_capacity, 20);
        assert!(config.clear_remote_history);
        assert_eq!(config.request_timeout_ms, 5_000);
        assert_eq!(config.pages, DashboardConfig::default().pages);
        config.validate().unwrap();
    }

    #[test]
    fn page_table_is_read_from_file() {
        let config = DashboardConfig::parse(
            r#"(
                pages: [
                    (
                        page: search,
                        channels: [(channel: "search", source: SearchResults, interval_ms: 4000)],
                        filters: [manufacturer, status],
                    ),
                    (
                        page: dashboard,
                        channels: [
                            (channel: "session", source: Sessions, interval_ms: 3000),
                            (channel: "stats", source: CommandStats(context: "session"), interval_ms: 2000),
                        ],
                    ),
                ],
            )"#,
        )
        .unwrap();
        config.validate().unwrap();

        let search = config.page_settings(PageKind::Search).unwrap();
        assert_eq!(
            search.bindings.filters,
            vec![FilterField::Manufacturer, FilterField::Status]
        );
        let dashboard = config.page_settings(PageKind::Dashboard).unwrap();
        assert_eq!(
            dashboard.bindings.channels[1],
            ChannelBinding::new(
                "stats",
                ChannelSource::CommandStats {
                    context: "session".to_string()
                },
                2000
            )
        );
    }

    #[test]
    fn missing_page_fails_fast() {
        let mut config = DashboardConfig::default();
        config.pages.retain(|bindings| bindings.page != PageKind::Dashboard);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingPage(PageKind::Dashboard)));
    }

    #[test]
    fn duplicate_page_is_rejected() {
        let mut config = DashboardConfig::default();
        config.pages.push(PageBindings::default_for(PageKind::Search));

        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::DuplicatePage(PageKind::Search)
        ));
    }

    #[test]
    fn binding_errors_name_the_channel() {
        let mut config = DashboardConfig::default();
        config.pages[1].channels[0].interval_ms = 0;

        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "page 'dashboard' channel 'session' has a zero refresh interval"
        );
        assert!(matches!(
            err,
            ConfigError::Binding(BindingError::ZeroInterval { channel, .. })
                if channel == ChannelId::session()
        ));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let config = DashboardConfig {
            base_url: "ftp://assets.local".to_string(),
            ..DashboardConfig::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidBaseUrl { .. }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = DashboardConfig {
            request_timeout_ms: 0,
            ..DashboardConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "request_timeout_ms must be greater than zero"
        );
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.ron");
        fs::write(&path, "(base_url: 42)").unwrap();

        let err = DashboardConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("dashboard.ron"));
    }
}
