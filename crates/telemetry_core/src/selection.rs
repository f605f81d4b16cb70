//! Cross-page selection handle.
//!
//! One page writes the selected asset id; the next page reads it once at
//! initialization. Reading goes through [`SelectionBridge::consume_selection`],
//! which clears the slot so a manual reload does not resurrect the selection.
use std::collections::BTreeMap;

use thiserror::Error;

pub const SELECTION_KEY: &str = "selectedAssetId";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection store unavailable: {0}")]
    Store(String),
}

/// Minimal key-value storage shared by the pages of one session.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, SelectionError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SelectionError>;
    /// Removes the entry and returns its previous value.
    fn remove(&mut self, key: &str) -> Result<Option<String>, SelectionError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SelectionError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SelectionError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<Option<String>, SelectionError> {
        Ok(self.entries.remove(key))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionBridge<S> {
    store: S,
}

impl<S: KeyValueStore> SelectionBridge<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Overwrites any prior selection. A blank id clears it.
    pub fn set_selection(&mut self, asset_id: &str) -> Result<(), SelectionError> {
        let asset_id = asset_id.trim();
        if asset_id.is_empty() {
            self.store.remove(SELECTION_KEY)?;
            return Ok(());
        }
        self.store.set(SELECTION_KEY, asset_id)
    }

    /// Reads and clears the selection.
    pub fn consume_selection(&mut self) -> Result<Option<String>, SelectionError> {
        let value = self.store.remove(SELECTION_KEY)?;
        Ok(value.filter(|id| !id.trim().is_empty()))
    }

    /// Reads without clearing.
    pub fn peek_selection(&self) -> Result<Option<String>, SelectionError> {
        Ok(self
            .store
            .get(SELECTION_KEY)?
            .filter(|id| !id.trim().is_empty()))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}
