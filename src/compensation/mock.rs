//! Mock compensator for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CompensationEntry, CompensationError, Compensator, Result};

/// A recorded compensation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationCall {
    pub queue_arn: String,
    pub entries: Vec<CompensationEntry>,
}

/// Records every compensation call; optionally fails them.
#[derive(Default)]
pub struct MockCompensator {
    calls: RwLock<Vec<CompensationCall>>,
    fail_on_compensate: RwLock<bool>,
}

impl MockCompensator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_compensate(&self, fail: bool) {
        *self.fail_on_compensate.write().await = fail;
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn calls(&self) -> Vec<CompensationCall> {
        self.calls.read().await.clone()
    }

    /// Message ids acknowledged across all calls, in call order.
    pub async fn compensated_ids(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .flat_map(|call| call.entries.iter().map(|e| e.id.clone()))
            .collect()
    }
}

#[async_trait]
impl Compensator for MockCompensator {
    async fn compensate(&self, queue_arn: &str, entries: &[CompensationEntry]) -> Result<()> {
        // Recorded even when failing
        self.calls.write().await.push(CompensationCall {
            queue_arn: queue_arn.to_string(),
            entries: entries.to_vec(),
        });
        if *self.fail_on_compensate.read().await {
            return Err(CompensationError::Mock);
        }
        Ok(())
    }
}
