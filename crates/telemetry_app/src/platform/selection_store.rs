use std::collections::BTreeMap;
use std::path::PathBuf;

use telemetry_core::{KeyValueStore, SelectionError};
use telemetry_engine::AtomicFileWriter;
use telemetry_logging::{telemetry_debug, telemetry_warn};

pub const DEFAULT_SESSION_KEY: &str = "default";
const STORE_DIR: &str = "telemetry_dashboard";

/// Key-value file shared by every page opened with the same session key.
/// Kept under the system temp directory.
#[derive(Debug, Clone)]
pub struct SessionFileStore {
    writer: AtomicFileWriter,
    filename: String,
}

impl SessionFileStore {
    pub fn new(dir: PathBuf, session_key: &str) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            filename: format!("{}.ron", sanitize_key(session_key)),
        }
    }

    pub fn for_session(session_key: &str) -> Self {
        Self::new(std::env::temp_dir().join(STORE_DIR), session_key)
    }

    pub fn path(&self) -> PathBuf {
        self.writer.path_for(&self.filename)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SelectionError> {
        let content = match self.writer.read(&self.filename) {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(BTreeMap::new()),
            Err(err) => return Err(SelectionError::Store(err.to_string())),
        };
        match ron::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                // A damaged file only loses the pending hand-over.
                telemetry_warn!("ignoring unreadable session store {:?}: {}", self.path(), err);
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), SelectionError> {
        if entries.is_empty() {
            self.writer
                .remove(&self.filename)
                .map_err(|err| SelectionError::Store(err.to_string()))?;
            return Ok(());
        }
        let content = ron::ser::to_string_pretty(entries, ron::ser::PrettyConfig::new())
            .map_err(|err| SelectionError::Store(err.to_string()))?;
        self.writer
            .write(&self.filename, &content)
            .map_err(|err| SelectionError::Store(err.to_string()))?;
        telemetry_debug!("session store written to {:?}", self.path());
        Ok(())
    }
}

impl KeyValueStore for SessionFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SelectionError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SelectionError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<Option<String>, SelectionError> {
        let mut entries = self.load()?;
        let previous = entries.remove(key);
        if previous.is_some() {
            self.save(&entries)?;
        }
        Ok(previous)
    }
}

fn sanitize_key(session_key: &str) -> String {
    let key: String = session_key
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if key.is_empty() {
        DEFAULT_SESSION_KEY.to_string()
    } else {
        key
    }
}
