//! SQLite-backed result store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{RiftError, RiftResult};
use crate::orchestrator::AnalysisStatus;

use super::{ResultStore, StoredAnalysis, StoredRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS analyses (
    match_id    TEXT PRIMARY KEY,
    status      TEXT NOT NULL,
    status_json TEXT NOT NULL,
    payload     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_analyses_status ON analyses(status);
"#;

#[derive(Clone)]
pub struct SqliteResultStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteResultStore").finish_non_exhaustive()
    }
}

impl SqliteResultStore {
    /// Open a file-backed store.
    pub fn open(path: &Path) -> RiftResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory store (for testing).
    pub fn memory() -> RiftResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> RiftResult<Self> {
        // WAL for file-backed DBs (no-op in memory)
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> RiftResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> RiftResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn);
            f(&mut guard)
        })
        .await
        .map_err(|e| RiftError::storage(format!("store task failed: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn upsert(
        &self,
        match_id: &str,
        analysis: &StoredAnalysis,
        status: &AnalysisStatus,
    ) -> RiftResult<bool> {
        let match_id = match_id.to_string();
        let payload = serde_json::to_string(analysis)
            .map_err(|e| RiftError::storage(format!("failed to serialize analysis: {e}")))?;
        let status_json = serde_json::to_string(status)
            .map_err(|e| RiftError::storage(format!("failed to serialize status: {e}")))?;
        let label = status.label();

        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            let existed: bool = tx
                .query_row(
                    "SELECT 1 FROM analyses WHERE match_id = ?1",
                    params![match_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            tx.execute(
                r#"
                INSERT INTO analyses (match_id, status, status_json, payload, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                ON CONFLICT(match_id) DO UPDATE SET
                    status = excluded.status,
                    status_json = excluded.status_json,
                    payload = excluded.payload,
                    updated_at = excluded.updated_at
                "#,
                params![match_id, label, status_json, payload, now],
            )?;
            tx.commit()?;
            Ok(!existed)
        })
        .await
    }

    async fn get(&self, match_id: &str) -> RiftResult<Option<StoredRecord>> {
        let match_id = match_id.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT status_json, payload, updated_at FROM analyses WHERE match_id = ?1",
                        params![match_id],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row.map(|r| (match_id, r)))
            })
            .await?;

        let Some((match_id, (status_json, payload, updated_at))) = row else {
            return Ok(None);
        };
        let status: AnalysisStatus = serde_json::from_str(&status_json)
            .map_err(|e| RiftError::storage(format!("corrupt status for {match_id}: {e}")))?;
        let analysis: StoredAnalysis = serde_json::from_str(&payload)
            .map_err(|e| RiftError::storage(format!("corrupt payload for {match_id}: {e}")))?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| RiftError::storage(format!("corrupt timestamp for {match_id}: {e}")))?;

        Ok(Some(StoredRecord {
            match_id,
            analysis,
            status,
            updated_at,
        }))
    }
}
