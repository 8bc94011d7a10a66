use crate::error::ExecutionError;
use crate::models::{RebalanceAction, TransactionReceipt};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The boundary where a proposed action leaves the engine. Implementations
/// submit the action and report exactly one outcome; callers own retries.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute_action(&self, action: &RebalanceAction) -> Result<TransactionReceipt, ExecutionError>;

    fn name(&self) -> &'static str;
}

/// Dry-run executor standing in for a wallet adapter.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    latency: Duration,
    failure: Option<String>,
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self {
            latency: Duration::from_secs(2),
            failure: None,
        }
    }
}

impl SimulatedExecutor {
    pub fn new(latency: Duration) -> Self {
        Self { latency, failure: None }
    }

    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Every execution fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            latency: Duration::ZERO,
            failure: Some(reason.into()),
        }
    }
}

#[async_trait]
impl ActionExecutor for SimulatedExecutor {
    async fn execute_action(&self, action: &RebalanceAction) -> Result<TransactionReceipt, ExecutionError> {
        debug!("Simulating {} ({})", action.describe(), action.id);

        if action.amount <= BigDecimal::zero() {
            return Err(ExecutionError::new(format!("action {} has no amount", action.id)));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(reason) = &self.failure {
            warn!("Simulated execution of {} failed: {}", action.id, reason);
            return Err(ExecutionError::new(reason.clone()));
        }

        let receipt = TransactionReceipt {
            action_id: action.id.clone(),
            tx_hash: format!("0x{}", hex::encode(Uuid::new_v4().as_bytes())),
            amount: action.amount.clone(),
            executed_at: Utc::now(),
        };
        info!("Executed {} in {}", action.describe(), receipt.tx_hash);
        Ok(receipt)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
