//! The canonical shared store behind the HTTP surface.
//!
//! One mutex serializes every call, so terminals observe arrival order
//! and reads never see a half-applied merge. State lives in three JSON
//! blobs under the data directory (transactions, audits, sessions),
//! each rewritten in full after the mutation that touched it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use baler_engine::{merge_by_id, AuditLog, MergeStats, SessionInfo, Timestamp, Transaction};

const TRANSACTIONS_FILE: &str = "transactions.json";
const AUDITS_FILE: &str = "audits.json";
const SESSIONS_FILE: &str = "sessions.json";

/// Failures writing the store's blob files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Default)]
struct State {
    transactions: Vec<Transaction>,
    audits: Vec<AuditLog>,
    sessions: BTreeMap<String, SessionInfo>,
}

/// The shared server-side store.
pub struct Controller {
    state: Mutex<State>,
    data_dir: PathBuf,
}

impl Controller {
    /// Open the store under `data_dir`, loading any persisted blobs.
    /// Missing files start empty; unreadable ones are dropped with a
    /// warning rather than refusing to start.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let state = State {
            transactions: load_blob(&data_dir.join(TRANSACTIONS_FILE)),
            audits: load_blob(&data_dir.join(AUDITS_FILE)),
            sessions: load_blob(&data_dir.join(SESSIONS_FILE)),
        };
        debug!(
            "store opened with {} transactions, {} audits, {} sessions",
            state.transactions.len(),
            state.audits.len(),
            state.sessions.len()
        );

        Ok(Self {
            state: Mutex::new(state),
            data_dir,
        })
    }

    /// The full transaction set, soft-deleted rows included.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.clone()
    }

    /// Merge pushed transactions by id and persist the result.
    pub async fn push_transactions(
        &self,
        documents: Vec<Transaction>,
    ) -> Result<MergeStats, StoreError> {
        let mut state = self.state.lock().await;
        let stats = merge_by_id(&mut state.transactions, documents);
        save_blob(&self.data_dir.join(TRANSACTIONS_FILE), &state.transactions)?;
        Ok(stats)
    }

    /// The full audit set.
    pub async fn audits(&self) -> Vec<AuditLog> {
        self.state.lock().await.audits.clone()
    }

    /// Merge pushed audit rows by id and persist the result.
    pub async fn push_audits(&self, documents: Vec<AuditLog>) -> Result<MergeStats, StoreError> {
        let mut state = self.state.lock().await;
        let stats = merge_by_id(&mut state.audits, documents);
        save_blob(&self.data_dir.join(AUDITS_FILE), &state.audits)?;
        Ok(stats)
    }

    /// Register a session, replacing any existing entry with the same id.
    /// An omitted title defaults to a dated "Chat" label.
    pub async fn add_session(
        &self,
        session_id: &str,
        title: Option<String>,
        now: Timestamp,
    ) -> Result<SessionInfo, StoreError> {
        let info = SessionInfo {
            id: session_id.to_string(),
            title: title.unwrap_or_else(|| default_title(now)),
            created_at: now,
            last_active: now,
        };
        let mut state = self.state.lock().await;
        state.sessions.insert(session_id.to_string(), info.clone());
        self.persist_sessions(&state)?;
        Ok(info)
    }

    /// Drop a session. Returns false when the id was unknown.
    pub async fn remove_session(&self, session_id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let removed = state.sessions.remove(session_id).is_some();
        if removed {
            self.persist_sessions(&state)?;
        }
        Ok(removed)
    }

    // The maintenance operations below have no HTTP route yet; the chat
    // agent drives them directly once it lands.

    /// Bump a session's last-active time, a no-op for unknown ids.
    #[allow(dead_code)]
    pub async fn touch_session(&self, session_id: &str, now: Timestamp) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(session_id) else {
            return Ok(());
        };
        session.last_active = now;
        self.persist_sessions(&state)
    }

    /// Retitle a session. Returns false when the id was unknown.
    #[allow(dead_code)]
    pub async fn rename_session(&self, session_id: &str, title: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(session_id) else {
            return Ok(false);
        };
        session.title = title.to_string();
        self.persist_sessions(&state)?;
        Ok(true)
    }

    /// Sessions ordered by most recent activity.
    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let state = self.state.lock().await;
        let mut sessions: Vec<SessionInfo> = state.sessions.values().cloned().collect();
        sessions.sort_by_key(|session| std::cmp::Reverse(session.last_active));
        sessions
    }

    #[allow(dead_code)]
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    #[allow(dead_code)]
    pub async fn session(&self, session_id: &str) -> Option<SessionInfo> {
        self.state.lock().await.sessions.get(session_id).cloned()
    }

    /// Empty the registry, returning how many sessions were dropped.
    #[allow(dead_code)]
    pub async fn clear_sessions(&self) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let count = state.sessions.len();
        state.sessions.clear();
        self.persist_sessions(&state)?;
        Ok(count)
    }

    fn persist_sessions(&self, state: &State) -> Result<(), StoreError> {
        save_blob(&self.data_dir.join(SESSIONS_FILE), &state.sessions)
    }
}

fn default_title(now: Timestamp) -> String {
    match DateTime::from_timestamp_millis(now) {
        Some(stamp) => format!("Chat {}", stamp.format("%Y-%m-%d")),
        None => "Chat".to_string(),
    }
}

fn load_blob<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(err) => {
            warn!("failed to read {}: {err}", path.display());
            return T::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("discarding malformed blob {}: {err}", path.display());
            T::default()
        }
    }
}

fn save_blob<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    // Write-then-rename so a crash mid-write cannot corrupt the blob.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
