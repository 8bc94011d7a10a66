pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod services;
pub mod utils;

pub use error::types::*;
pub use services::risk_engine::{RiskEngine, ScoringReport};
