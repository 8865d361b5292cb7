//! Mapping from local conversation threads to upstream agent sessions.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Remembers which upstream session belongs to a thread, so later turns resume it.
pub trait SessionStore: Send + Sync {
    /// Looks up the session id recorded for a thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn session_id(&self, thread_id: &str, resource_id: &str) -> Result<Option<String>>;

    /// Records the session id for a thread, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save_session_id(&self, thread_id: &str, resource_id: &str, session_id: &str) -> Result<()>;
}

/// A session store that lives for the duration of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<(String, String), String>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn session_id(&self, thread_id: &str, resource_id: &str) -> Result<Option<String>> {
        let sessions = self.sessions.lock().map_err(|_| Error::StorePoisoned)?;
        Ok(sessions
            .get(&(thread_id.to_string(), resource_id.to_string()))
            .cloned())
    }

    fn save_session_id(&self, thread_id: &str, resource_id: &str, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(|_| Error::StorePoisoned)?;
        sessions.insert(
            (thread_id.to_string(), resource_id.to_string()),
            session_id.to_string(),
        );
        Ok(())
    }
}

/// Session ids per thread, grouped by the resource that owns the thread.
type SessionsByResource = BTreeMap<String, BTreeMap<String, String>>;

/// A session store persisted as a JSON file.
///
/// The file holds one object per resource, each mapping thread ids to
/// session ids, so ids containing any character cannot collide.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    /// Uses the JSON file at `path`; it is created on the first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionsByResource> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Error::io(format!("reading {}", self.path.display()), e)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| Error::json(format!("decoding {}", self.path.display()), e))
    }
}

impl SessionStore for FileSessionStore {
    fn session_id(&self, thread_id: &str, resource_id: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| Error::StorePoisoned)?;
        Ok(self
            .load()?
            .remove(resource_id)
            .and_then(|mut threads| threads.remove(thread_id)))
    }

    fn save_session_id(&self, thread_id: &str, resource_id: &str, session_id: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| Error::StorePoisoned)?;
        let mut sessions = self.load()?;
        sessions
            .entry(resource_id.to_string())
            .or_default()
            .insert(thread_id.to_string(), session_id.to_string());
        let json = serde_json::to_string_pretty(&sessions)
            .map_err(|e| Error::json("encoding session store", e))?;
        fs::write(&self.path, json)
            .map_err(|e| Error::io(format!("writing {}", self.path.display()), e))
    }
}
