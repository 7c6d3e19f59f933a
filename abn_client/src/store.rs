use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Mutex;

use abn::{CardInstance, Hand};
use serde::{Deserialize, Serialize};

use crate::{Health, Phase, RoundReport, Score};

/// What a session remembers across reloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: Phase,
    pub score: Score,
    pub health: Health,
    pub rounds_played: u32,
    /// The local hand as it was when the snapshot was taken.
    /// It is only kept for inspection; the service is the source of truth for cards.
    pub hand: Hand,
    /// The card of a round that was committed but not yet resolved.
    #[serde(default)]
    pub committed: Option<CardInstance>,
    #[serde(default)]
    pub last_report: Option<RoundReport>,
}

/// A key-value store for [`SessionSnapshot`]s, keyed by session id.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> anyhow::Result<Option<SessionSnapshot>>;
    fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()>;
    fn remove(&self, session_id: &str) -> anyhow::Result<()>;
}

impl<K: SessionStore> SessionStore for std::sync::Arc<K> {
    fn load(&self, session_id: &str) -> anyhow::Result<Option<SessionSnapshot>> {
        (**self).load(session_id)
    }

    fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        (**self).save(snapshot)
    }

    fn remove(&self, session_id: &str) -> anyhow::Result<()> {
        (**self).remove(session_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, SessionSnapshot>>,
}

impl MemoryStore {
    fn sessions(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, SessionSnapshot>>> {
        self.sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("The session store lock is poisoned"))
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, session_id: &str) -> anyhow::Result<Option<SessionSnapshot>> {
        Ok(self.sessions()?.get(session_id).cloned())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        self.sessions()?
            .insert(snapshot.session_id.clone(), snapshot.clone());
        Ok(())
    }

    fn remove(&self, session_id: &str) -> anyhow::Result<()> {
        self.sessions()?.remove(session_id);
        Ok(())
    }
}

/// Keeps one pretty-printed JSON file per session in a directory.
pub struct JsonFileStore {
    directory: PathBuf,
}

impl JsonFileStore {
    pub fn new(directory: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let directory = directory.into();
        if !directory.is_dir() {
            anyhow::bail!("Directory '{}' does not exist", directory.display());
        }
        Ok(Self { directory })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        let file_stem: String = session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("session_{}.json", file_stem))
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self, session_id: &str) -> anyhow::Result<Option<SessionSnapshot>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let snapshot: SessionSnapshot = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        // Two ids can map to the same file name
        Ok(Some(snapshot).filter(|snapshot| snapshot.session_id == session_id))
    }

    fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        let writer = BufWriter::new(File::create(self.path_for(&snapshot.session_id))?);
        serde_json::to_writer_pretty(writer, snapshot)?;
        Ok(())
    }

    fn remove(&self, session_id: &str) -> anyhow::Result<()> {
        let path = self.path_for(session_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
