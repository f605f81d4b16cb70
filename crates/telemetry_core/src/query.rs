use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AssetRecord;

pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Categorical search filters, in the order they appear in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Type,
    Manufacturer,
    Status,
    Region,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        FilterField::Type,
        FilterField::Manufacturer,
        FilterField::Status,
        FilterField::Region,
    ];

    /// Query parameter (and suggestion field) name understood by the backend.
    pub fn param(self) -> &'static str {
        match self {
            FilterField::Type => "type",
            FilterField::Manufacturer => "manufacturer",
            FilterField::Status => "status",
            FilterField::Region => "region",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.param().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}

/// Client-side ordering of search results. `Relevance` keeps backend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Relevance,
    Name,
    Type,
    Status,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(SortOrder::Relevance),
            "name" => Some(SortOrder::Name),
            "type" => Some(SortOrder::Type),
            "status" => Some(SortOrder::Status),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::Name => "name",
            SortOrder::Type => "type",
            SortOrder::Status => "status",
        }
    }

    pub fn sort(self, assets: &mut [AssetRecord]) {
        let key: fn(&AssetRecord) -> Option<&str> = match self {
            SortOrder::Relevance => return,
            SortOrder::Name => name_key,
            SortOrder::Type => type_key,
            SortOrder::Status => status_key,
        };
        // Stable sort: ties keep backend relevance order; missing values go last.
        assets.sort_by(|a, b| match (key(a), key(b)) {
            (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }
}

fn name_key(asset: &AssetRecord) -> Option<&str> {
    asset.name.as_deref()
}

fn type_key(asset: &AssetRecord) -> Option<&str> {
    asset.asset_type.as_deref()
}

fn status_key(asset: &AssetRecord) -> Option<&str> {
    asset.status.as_deref()
}

/// Search input rebuilt from the current controls on every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub filters: BTreeMap<FilterField, String>,
    pub sort: SortOrder,
    pub limit: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_LIMIT)
    }
}

impl SearchQuery {
    pub fn new(limit: u32) -> Self {
        Self {
            term: String::new(),
            filters: BTreeMap::new(),
            sort: SortOrder::default(),
            limit,
        }
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn with_filter(mut self, field: FilterField, value: &str) -> Self {
        self.set_filter(field, value);
        self
    }

    /// Sets a filter value; a blank value removes the filter.
    pub fn set_filter(&mut self, field: FilterField, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.filters.remove(&field);
        } else {
            self.filters.insert(field, value.to_string());
        }
    }

    pub fn filter(&self, field: FilterField) -> Option<&str> {
        self.filters.get(&field).map(String::as_str)
    }

    /// Query parameters for `/api/search/assets`. Blank term and empty
    /// filters are omitted.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 2);
        let term = self.term.trim();
        if !term.is_empty() {
            pairs.push(("q".to_string(), term.to_string()));
        }
        for (field, value) in &self.filters {
            pairs.push((field.param().to_string(), value.clone()));
        }
        pairs.push(("limit".to_string(), self.limit.to_string()));
        pairs
    }
}
