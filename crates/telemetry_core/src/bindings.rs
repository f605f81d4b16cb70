//! Declarative table of what each page polls and which controls it exposes.
//!
//! Validated once when a page loads so a missing or inconsistent binding is
//! reported up front instead of surfacing mid-refresh.
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command_log::DEFAULT_LOG_CAPACITY;
use crate::query::DEFAULT_SEARCH_LIMIT;
use crate::{ChannelId, FilterField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Search,
    Dashboard,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Search => f.write_str("search"),
            PageKind::Dashboard => f.write_str("dashboard"),
        }
    }
}

/// Backend data a channel refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSource {
    SearchResults,
    /// All active sessions, or those of the selected asset.
    Sessions,
    SessionMetrics,
    CommandStats { context: String },
}

impl ChannelSource {
    fn name(&self) -> &'static str {
        match self {
            ChannelSource::SearchResults => "search_results",
            ChannelSource::Sessions => "sessions",
            ChannelSource::SessionMetrics => "session_metrics",
            ChannelSource::CommandStats { .. } => "command_stats",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelBinding {
    pub channel: ChannelId,
    pub source: ChannelSource,
    pub interval_ms: u64,
}

impl ChannelBinding {
    pub fn new(channel: impl Into<ChannelId>, source: ChannelSource, interval_ms: u64) -> Self {
        Self {
            channel: channel.into(),
            source,
            interval_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBindings {
    pub page: PageKind,
    pub channels: Vec<ChannelBinding>,
    #[serde(default)]
    pub filters: Vec<FilterField>,
}

impl PageBindings {
    pub fn default_for(page: PageKind) -> Self {
        match page {
            PageKind::Search => Self {
                page,
                channels: vec![
                    ChannelBinding::new(ChannelId::SEARCH, ChannelSource::SearchResults, 5_000),
                    ChannelBinding::new(
                        ChannelId::STATS,
                        ChannelSource::CommandStats {
                            context: "search".to_string(),
                        },
                        3_000,
                    ),
                ],
                filters: FilterField::ALL.to_vec(),
            },
            PageKind::Dashboard => Self {
                page,
                channels: vec![
                    ChannelBinding::new(ChannelId::SESSION, ChannelSource::Sessions, 3_000),
                    ChannelBinding::new(ChannelId::METRICS, ChannelSource::SessionMetrics, 5_000),
                ],
                filters: Vec::new(),
            },
        }
    }

    pub fn binding(&self, channel: &ChannelId) -> Option<&ChannelBinding> {
        self.channels.iter().find(|b| &b.channel == channel)
    }

    /// First channel fed by `source`, compared by variant.
    pub fn channel_for(&self, source: &ChannelSource) -> Option<&ChannelId> {
        self.channels
            .iter()
            .find(|b| std::mem::discriminant(&b.source) == std::mem::discriminant(source))
            .map(|b| &b.channel)
    }

    pub fn validate(&self) -> Result<(), BindingError> {
        if self.channels.is_empty() {
            return Err(BindingError::MissingChannel { page: self.page });
        }

        let mut seen = BTreeSet::new();
        for binding in &self.channels {
            if binding.channel.as_str().trim().is_empty() {
                return Err(BindingError::BlankChannel { page: self.page });
            }
            if !seen.insert(binding.channel.clone()) {
                return Err(BindingError::DuplicateChannel {
                    page: self.page,
                    channel: binding.channel.clone(),
                });
            }
            if binding.interval_ms == 0 {
                return Err(BindingError::ZeroInterval {
                    page: self.page,
                    channel: binding.channel.clone(),
                });
            }
        }

        let required = match self.page {
            PageKind::Search => ChannelSource::SearchResults,
            PageKind::Dashboard => ChannelSource::Sessions,
        };
        if self.channel_for(&required).is_none() {
            return Err(BindingError::MissingSource {
                page: self.page,
                required: required.name(),
            });
        }

        match self.page {
            PageKind::Search => {
                let mut fields = BTreeSet::new();
                for field in &self.filters {
                    if !fields.insert(*field) {
                        return Err(BindingError::DuplicateFilter {
                            page: self.page,
                            field: *field,
                        });
                    }
                }
            }
            PageKind::Dashboard if !self.filters.is_empty() => {
                return Err(BindingError::UnexpectedFilters { page: self.page });
            }
            PageKind::Dashboard => {}
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("page '{page}' binds no channels")]
    MissingChannel { page: PageKind },
    #[error("page '{page}' has a channel with a blank name")]
    BlankChannel { page: PageKind },
    #[error("page '{page}' binds channel '{channel}' more than once")]
    DuplicateChannel { page: PageKind, channel: ChannelId },
    #[error("page '{page}' channel '{channel}' has a zero refresh interval")]
    ZeroInterval { page: PageKind, channel: ChannelId },
    #[error("page '{page}' needs a channel bound to '{required}'")]
    MissingSource {
        page: PageKind,
        required: &'static str,
    },
    #[error("page '{page}' lists filter '{field}' more than once")]
    DuplicateFilter { page: PageKind, field: FilterField },
    #[error("page '{page}' has no search box, filters cannot be bound")]
    UnexpectedFilters { page: PageKind },
    #[error("command log capacity must be at least 1")]
    ZeroCapacity,
    #[error("search result limit must be at least 1")]
    ZeroSearchLimit,
}

/// Everything a page needs at load time, built from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub bindings: PageBindings,
    pub log_capacity: usize,
    pub search_limit: u32,
    /// Also clear the backend's own history when a log is cleared.
    pub clear_remote_history: bool,
}

impl PageSettings {
    pub fn default_for(page: PageKind) -> Self {
        Self {
            bindings: PageBindings::default_for(page),
            log_capacity: DEFAULT_LOG_CAPACITY,
            search_limit: DEFAULT_SEARCH_LIMIT,
            clear_remote_history: false,
        }
    }

    pub fn page(&self) -> PageKind {
        self.bindings.page
    }

    pub fn validate(&self) -> Result<(), BindingError> {
        if self.log_capacity == 0 {
            return Err(BindingError::ZeroCapacity);
        }
        if self.search_limit == 0 {
            return Err(BindingError::ZeroSearchLimit);
        }
        self.bindings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        for page in [PageKind::Search, PageKind::Dashboard] {
            PageSettings::default_for(page).validate().unwrap();
        }
    }

    #[test]
    fn missing_required_source_fails_fast() {
        let mut bindings = PageBindings::default_for(PageKind::Search);
        bindings
            .channels
            .retain(|b| b.source != ChannelSource::SearchResults);

        let err = bindings.validate().unwrap_err();
        assert_eq!(
            err,
            BindingError::MissingSource {
                page: PageKind::Search,
                required: "search_results"
            }
        );
        assert_eq!(
            err.to_string(),
            "page 'search' needs a channel bound to 'search_results'"
        );
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let mut bindings = PageBindings::default_for(PageKind::Dashboard);
        bindings.channels.push(ChannelBinding::new(
            ChannelId::SESSION,
            ChannelSource::SessionMetrics,
            1_000,
        ));
        assert!(matches!(
            bindings.validate(),
            Err(BindingError::DuplicateChannel { .. })
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut bindings = PageBindings::default_for(PageKind::Dashboard);
        bindings.channels[1].interval_ms = 0;
        assert_eq!(
            bindings.validate(),
            Err(BindingError::ZeroInterval {
                page: PageKind::Dashboard,
                channel: ChannelId::new(ChannelId::METRICS),
            })
        );
    }

    #[test]
    fn filters_on_dashboard_are_rejected() {
        let mut bindings = PageBindings::default_for(PageKind::Dashboard);
        bindings.filters.push(FilterField::Region);
        assert_eq!(
            bindings.validate(),
            Err(BindingError::UnexpectedFilters {
                page: PageKind::Dashboard
            })
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut settings = PageSettings::default_for(PageKind::Search);
        settings.log_capacity = 0;
        assert_eq!(settings.validate(), Err(BindingError::ZeroCapacity));
    }
}
