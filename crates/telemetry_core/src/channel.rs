use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FilterField;

/// Name of a logical data view with its own polling cadence and command log.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub const SEARCH: &'static str = "search";
    pub const SESSION: &'static str = "session";
    pub const METRICS: &'static str = "metrics";
    pub const STATS: &'static str = "stats";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn search() -> Self {
        Self::new(Self::SEARCH)
    }

    pub fn session() -> Self {
        Self::new(Self::SESSION)
    }

    /// One-shot channel used to load the option list of a search filter.
    pub fn suggestions(field: FilterField) -> Self {
        Self(format!("suggestions.{}", field.param()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
