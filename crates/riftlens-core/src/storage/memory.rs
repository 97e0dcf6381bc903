use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::RiftResult;
use crate::orchestrator::AnalysisStatus;

use super::{ResultStore, StoredAnalysis, StoredRecord};

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    rows: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn upsert(
        &self,
        match_id: &str,
        analysis: &StoredAnalysis,
        status: &AnalysisStatus,
    ) -> RiftResult<bool> {
        let record = StoredRecord {
            match_id: match_id.to_string(),
            analysis: analysis.clone(),
            status: status.clone(),
            updated_at: Utc::now(),
        };
        let previous = self.rows.write().await.insert(match_id.to_string(), record);
        Ok(previous.is_none())
    }

    async fn get(&self, match_id: &str) -> RiftResult<Option<StoredRecord>> {
        Ok(self.rows.read().await.get(match_id).cloned())
    }
}
