pub mod alert_generator;
pub mod monitoring_service;
pub mod portfolio_aggregator;
pub mod rebalance_recommender;
pub mod risk_classifier;
pub mod risk_engine;

pub use alert_generator::*;
pub use monitoring_service::*;
pub use portfolio_aggregator::*;
pub use rebalance_recommender::*;
pub use risk_classifier::*;
pub use risk_engine::*;
