use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::debug;

use crate::error::{RiftError, RiftResult};
use crate::timeline::{MatchDetails, MatchTimeline};

use super::TelemetryClient;

/// Reads `{dir}/{match_id}.timeline.json` and `{dir}/{match_id}.details.json`.
#[derive(Debug, Clone)]
pub struct FixtureTelemetryClient {
    dir: PathBuf,
}

impl FixtureTelemetryClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, match_id: &str, kind: &str) -> RiftResult<PathBuf> {
        let safe = !match_id.is_empty()
            && match_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !safe {
            return Err(RiftError::validation(format!(
                "invalid match id: {match_id:?}"
            )));
        }
        Ok(self.dir.join(format!("{match_id}.{kind}.json")))
    }

    async fn load<T: DeserializeOwned>(&self, match_id: &str, kind: &str) -> RiftResult<T> {
        let path = self.path_for(match_id, kind)?;
        debug!(path = %path.display(), "reading fixture");
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RiftError::not_found(format!("{kind} for {match_id}")));
            }
            Err(e) => {
                return Err(RiftError::network(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl TelemetryClient for FixtureTelemetryClient {
    async fn get_timeline(&self, match_id: &str) -> RiftResult<MatchTimeline> {
        self.load(match_id, "timeline").await
    }

    async fn get_match_details(&self, match_id: &str) -> RiftResult<MatchDetails> {
        self.load(match_id, "details").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_fixture_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("EUW1_7.timeline.json"),
            r#"{"metadata":{"matchId":"EUW1_7"},"info":{"frameInterval":60000,"frames":[]}}"#,
        )
        .unwrap();
        let client = FixtureTelemetryClient::new(dir.path());

        let timeline = client.get_timeline("EUW1_7").await.unwrap();
        assert_eq!(timeline.match_id(), "EUW1_7");

        let details = client.get_match_details("EUW1_7").await;
        assert!(matches!(details, Err(RiftError::NotFound { .. })));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let client = FixtureTelemetryClient::new("/tmp");
        assert!(matches!(
            client.get_timeline("../etc/passwd").await,
            Err(RiftError::ValidationFailure { .. })
        ));
    }
}
