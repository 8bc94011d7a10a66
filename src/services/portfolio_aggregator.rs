use crate::models::{
    ClassifiedPosition, Grade, HealthLabel, PortfolioMetrics, PortfolioSummary, Position, RiskLevel,
    RiskThresholds,
};
use crate::services::risk_classifier::RiskClassifier;
use crate::utils::math::{clamp_percent, mean, to_f64, weighted_mean};
use bigdecimal::BigDecimal;
use num_traits::Zero;
use tracing::info;

/// Aggregate already-classified positions. Order of the input does not matter.
pub fn summarize(classified: &[ClassifiedPosition], classifier: &RiskClassifier) -> PortfolioSummary {
    let health_scores: Vec<f64> = classified.iter().map(|c| c.health_score).collect();
    let apys: Vec<f64> = classified.iter().map(|c| c.position.apy).collect();
    let coverages: Vec<f64> = classified.iter().map(|c| c.position.insurance_coverage).collect();

    let (Some(overall_health_score), Some(avg_apy), Some(avg_insurance_coverage)) =
        (mean(&health_scores), mean(&apys), mean(&coverages))
    else {
        return PortfolioSummary::Empty;
    };
    let overall_health_score = clamp_percent(overall_health_score);

    let total_lent: BigDecimal = classified.iter().map(|c| c.position.lent.clone()).sum();
    let total_borrowed: BigDecimal = classified.iter().map(|c| c.position.borrowed.clone()).sum();
    let total_value = &total_lent - &total_borrowed;

    let net_values: Vec<BigDecimal> = classified.iter().map(|c| c.position.net_value()).collect();
    let net_weighted_apy = net_weighted_apy(
        classified
            .iter()
            .zip(&net_values)
            .map(|(c, net)| (c.position.apy, net)),
    );

    let overall_risk_level = classifier.risk_level(overall_health_score);
    let grade = Grade::from_health_score(overall_health_score);
    let high_risk_positions = classified
        .iter()
        .filter(|c| c.risk_level == RiskLevel::High)
        .count();

    info!(
        "Aggregated {} positions: health {:.1} ({}), grade {}, total value {}",
        classified.len(),
        overall_health_score,
        overall_risk_level,
        grade,
        total_value
    );

    PortfolioSummary::Populated(PortfolioMetrics {
        position_count: classified.len(),
        total_value,
        total_lent,
        total_borrowed,
        avg_apy,
        net_weighted_apy,
        overall_health_score,
        overall_risk_level,
        grade,
        health_label: HealthLabel::from_health_score(overall_health_score),
        high_risk_positions,
        avg_insurance_coverage,
    })
}

/// Portfolio-level totals, health and grade for a snapshot.
pub fn aggregate_portfolio(positions: &[Position], thresholds: &RiskThresholds) -> PortfolioSummary {
    let classifier = RiskClassifier::new(thresholds.clone());
    summarize(&classifier.classify_all(positions), &classifier)
}

/// APY weighted by each position's net value (`lent - borrowed`). Positions
/// with non-positive net value carry no weight; `None` when nothing does.
pub fn net_weighted_apy<'a, I>(positions: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, &'a BigDecimal)>,
{
    let (apys, weights): (Vec<f64>, Vec<f64>) = positions
        .into_iter()
        .map(|(apy, net)| {
            let weight = if net > &BigDecimal::zero() { to_f64(net) } else { 0.0 };
            (apy, weight)
        })
        .unzip();
    weighted_mean(&apys, &weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(id: &str, apy: f64, borrowed: i64, lent: i64, ratio: f64, threshold: f64) -> Position {
        Position {
            id: id.to_string(),
            name: format!("Pool {}", id),
            asset: "USDC".to_string(),
            apy,
            borrowed: BigDecimal::from(borrowed),
            lent: BigDecimal::from(lent),
            collateral_ratio: if borrowed == 0 { None } else { Some(ratio) },
            liquidation_threshold: threshold,
            insurance_coverage: 80.0,
        }
    }

    #[test]
    fn test_empty_portfolio_is_distinguished() {
        let summary = aggregate_portfolio(&[], &RiskThresholds::default());
        assert_eq!(summary, PortfolioSummary::Empty);
        assert!(summary.is_empty());
    }

    #[test]
    fn test_zero_yield_portfolio_is_not_empty() {
        let summary = aggregate_portfolio(&[position("1", 0.0, 0, 0, 0.0, 0.0)], &RiskThresholds::default());
        let metrics = summary.metrics().expect("populated");
        assert_eq!(metrics.avg_apy, 0.0);
        assert_eq!(metrics.total_value, BigDecimal::zero());
        assert_eq!(metrics.overall_health_score, 100.0);
    }

    #[test]
    fn test_dashboard_portfolio_totals() {
        let positions = vec![
            position("1", 12.5, 5_000, 8_000, 180.0, 150.0),
            position("2", 18.2, 2_000, 12_000, 250.0, 130.0),
            position("3", 8.7, 15_000, 18_000, 160.0, 140.0),
        ];
        let summary = aggregate_portfolio(&positions, &RiskThresholds::default());
        let metrics = summary.metrics().unwrap();

        assert_eq!(metrics.position_count, 3);
        assert_eq!(metrics.total_value, BigDecimal::from(16_000));
        assert!((metrics.avg_apy - 13.133333).abs() < 1e-5);
        // (12.5 * 3_000 + 18.2 * 10_000 + 8.7 * 3_000) / 16_000
        assert!((metrics.net_weighted_apy.unwrap() - 15.35).abs() < 1e-6);
        // (30 + 100 + 20) / 3
        assert!((metrics.overall_health_score - 50.0).abs() < 1e-9);
        assert_eq!(metrics.overall_risk_level, RiskLevel::Medium);
        assert_eq!(metrics.grade, Grade::CPlus);
        assert_eq!(metrics.health_label, HealthLabel::Fair);
        assert_eq!(metrics.high_risk_positions, 1);
    }

    #[test]
    fn test_order_does_not_change_summary() {
        let a = position("1", 5.0, 1_000, 3_000, 300.0, 150.0);
        let b = position("2", 9.0, 4_000, 5_000, 125.0, 120.0);
        let forward = aggregate_portfolio(&[a.clone(), b.clone()], &RiskThresholds::default());
        let backward = aggregate_portfolio(&[b, a], &RiskThresholds::default());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_net_weighted_apy_ignores_negative_net() {
        let positive = BigDecimal::from(1_000);
        let negative = BigDecimal::from(-500);
        assert_eq!(net_weighted_apy(vec![(10.0, &positive), (50.0, &negative)]), Some(10.0));
        assert_eq!(net_weighted_apy(vec![(50.0, &negative)]), None);
    }
}
