use crate::models::Position;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("low"),
            RiskLevel::Medium => f.write_str("medium"),
            RiskLevel::High => f.write_str("high"),
        }
    }
}

/// Portfolio letter grade, declared from worst to best so that `Ord`
/// follows health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "D")]
    D,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    /// Step function over the health score; each band includes its lower bound.
    pub fn from_health_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Grade::APlus,
            s if s >= 80.0 => Grade::A,
            s if s >= 70.0 => Grade::BPlus,
            s if s >= 60.0 => Grade::B,
            s if s >= 50.0 => Grade::CPlus,
            s if s >= 40.0 => Grade::C,
            _ => Grade::D,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthLabel {
    pub fn from_health_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => HealthLabel::Excellent,
            s if s >= 60.0 => HealthLabel::Good,
            s if s >= 40.0 => HealthLabel::Fair,
            _ => HealthLabel::Poor,
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthLabel::Excellent => "Excellent",
            HealthLabel::Good => "Good",
            HealthLabel::Fair => "Fair",
            HealthLabel::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// A position together with its derived risk classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPosition {
    pub position: Position,
    pub risk_level: RiskLevel,
    pub health_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub position_count: usize,
    pub total_value: BigDecimal,
    pub total_lent: BigDecimal,
    pub total_borrowed: BigDecimal,
    pub avg_apy: f64,
    /// APY weighted by net value; `None` when no position has positive net value.
    pub net_weighted_apy: Option<f64>,
    pub overall_health_score: f64,
    pub overall_risk_level: RiskLevel,
    pub grade: Grade,
    pub health_label: HealthLabel,
    pub high_risk_positions: usize,
    pub avg_insurance_coverage: f64,
}

/// Portfolio aggregate. An empty snapshot is its own state and never a
/// zeroed set of metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "metrics", rename_all = "lowercase")]
pub enum PortfolioSummary {
    Empty,
    Populated(PortfolioMetrics),
}

impl PortfolioSummary {
    pub fn is_empty(&self) -> bool {
        matches!(self, PortfolioSummary::Empty)
    }

    pub fn metrics(&self) -> Option<&PortfolioMetrics> {
        match self {
            PortfolioSummary::Empty => None,
            PortfolioSummary::Populated(metrics) => Some(metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_band_boundaries() {
        assert_eq!(Grade::from_health_score(90.0), Grade::APlus);
        assert_eq!(Grade::from_health_score(89.99), Grade::A);
        assert_eq!(Grade::from_health_score(80.0), Grade::A);
        assert_eq!(Grade::from_health_score(70.0), Grade::BPlus);
        assert_eq!(Grade::from_health_score(60.0), Grade::B);
        assert_eq!(Grade::from_health_score(50.0), Grade::CPlus);
        assert_eq!(Grade::from_health_score(40.0), Grade::C);
        assert_eq!(Grade::from_health_score(39.9), Grade::D);
        assert_eq!(Grade::from_health_score(0.0), Grade::D);
    }

    #[test]
    fn test_grade_display() {
        assert_eq!(Grade::BPlus.to_string(), "B+");
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
    }

    #[test]
    fn test_health_label() {
        assert_eq!(HealthLabel::from_health_score(85.0), HealthLabel::Excellent);
        assert_eq!(HealthLabel::from_health_score(60.0), HealthLabel::Good);
        assert_eq!(HealthLabel::from_health_score(45.0), HealthLabel::Fair);
        assert_eq!(HealthLabel::from_health_score(10.0), HealthLabel::Poor);
    }

    #[test]
    fn test_empty_summary_serializes_distinctly() {
        let json = serde_json::to_value(PortfolioSummary::Empty).unwrap();
        assert_eq!(json["status"], "empty");
        assert!(PortfolioSummary::Empty.metrics().is_none());
    }
}
