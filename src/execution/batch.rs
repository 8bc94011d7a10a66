use super::executor::ActionExecutor;
use crate::error::ExecutionError;
use crate::models::{Alert, Priority, RebalanceAction, TransactionReceipt};
use crate::services::alert_generator::confirmation_alert;
use serde::Serialize;
use tracing::{info, warn};

/// Result of one action in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    pub action_id: String,
    #[serde(flatten)]
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionStatus {
    Confirmed { receipt: TransactionReceipt, alert: Alert },
    Failed { error: ExecutionError },
}

impl ExecutionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, ExecutionStatus::Confirmed { .. })
    }
}

/// Execute one action and turn its receipt into a `success` alert.
pub async fn execute_and_confirm(
    executor: &dyn ActionExecutor,
    action: &RebalanceAction,
) -> Result<(TransactionReceipt, Alert), ExecutionError> {
    let receipt = executor.execute_action(action).await?;
    let alert = confirmation_alert(action, &receipt);
    Ok((receipt, alert))
}

/// Run every high-priority action, one after another. A failure is recorded
/// and the batch moves on; nothing is retried.
pub async fn execute_high_priority(
    executor: &dyn ActionExecutor,
    actions: &[RebalanceAction],
) -> Vec<ExecutionOutcome> {
    let batch: Vec<&RebalanceAction> = actions.iter().filter(|a| a.priority == Priority::High).collect();
    info!(
        "Executing {} high priority actions with the {} executor",
        batch.len(),
        executor.name()
    );

    let mut outcomes = Vec::with_capacity(batch.len());
    for action in batch {
        let status = match execute_and_confirm(executor, action).await {
            Ok((receipt, alert)) => ExecutionStatus::Confirmed { receipt, alert },
            Err(error) => {
                warn!("Action {} failed: {}", action.id, error);
                ExecutionStatus::Failed { error }
            }
        };
        outcomes.push(ExecutionOutcome {
            action_id: action.id.clone(),
            status,
        });
    }

    let confirmed = outcomes.iter().filter(|o| o.is_confirmed()).count();
    info!("High priority batch done: {}/{} confirmed", confirmed, outcomes.len());
    outcomes
}
