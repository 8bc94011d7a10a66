use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Move,
    Add,
    Remove,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Move => f.write_str("move"),
            ActionKind::Add => f.write_str("add"),
            ActionKind::Remove => f.write_str("remove"),
        }
    }
}

/// Declared from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Pools an action touches. A move always names both ends; add and remove
/// name the single pool they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionTarget {
    Transfer { from_pool_id: String, to_pool_id: String },
    Pool { pool_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub id: String,
    pub kind: ActionKind,
    #[serde(flatten)]
    pub target: ActionTarget,
    pub amount: BigDecimal,
    pub asset: String,
    pub reason: String,
    /// Projected change of the value-weighted portfolio APY, in percentage points.
    pub apy_impact: f64,
    /// Projected change in portfolio risk; negative means risk improved.
    pub risk_impact: f64,
    pub priority: Priority,
}

impl RebalanceAction {
    pub fn from_pool_id(&self) -> Option<&str> {
        match &self.target {
            ActionTarget::Transfer { from_pool_id, .. } => Some(from_pool_id),
            ActionTarget::Pool { .. } => None,
        }
    }

    pub fn to_pool_id(&self) -> Option<&str> {
        match &self.target {
            ActionTarget::Transfer { to_pool_id, .. } => Some(to_pool_id),
            ActionTarget::Pool { .. } => None,
        }
    }

    /// The pool whose condition motivated the action.
    pub fn subject_pool_id(&self) -> &str {
        match &self.target {
            ActionTarget::Transfer { from_pool_id, .. } => from_pool_id,
            ActionTarget::Pool { pool_id } => pool_id,
        }
    }

    pub fn describe(&self) -> String {
        match &self.target {
            ActionTarget::Transfer { from_pool_id, to_pool_id } => format!(
                "Move {} {} from {} to {}",
                self.amount, self.asset, from_pool_id, to_pool_id
            ),
            ActionTarget::Pool { pool_id } => match self.kind {
                ActionKind::Remove => format!("Remove {} {} from {}", self.amount, self.asset, pool_id),
                _ => format!("Add {} {} to {}", self.amount, self.asset, pool_id),
            },
        }
    }
}

/// Confirmation returned by an executor for a completed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub action_id: String,
    pub tx_hash: String,
    pub amount: BigDecimal,
    pub executed_at: DateTime<Utc>,
}
