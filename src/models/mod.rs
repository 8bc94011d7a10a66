pub mod alert;
pub mod portfolio;
pub mod position;
pub mod rebalance;
pub mod risk_config;

pub use alert::*;
pub use portfolio::*;
pub use position::*;
pub use rebalance::*;
pub use risk_config::*;
