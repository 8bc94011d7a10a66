use crate::models::{
    ActionKind, ActionTarget, ClassifiedPosition, DistressFallback, EngineConfig, PortfolioSummary, Position,
    Priority, RebalanceAction, RiskLevel,
};
use crate::services::portfolio_aggregator::summarize;
use crate::services::risk_classifier::RiskClassifier;
use crate::utils::math::{amount_floor_from_f64, mean, to_f64, weighted_mean};
use bigdecimal::BigDecimal;
use num_traits::Zero;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Proposes at most one action per distressed position per pass, plus at
/// most one yield-only move. Each action is projected against the current
/// snapshot on its own; impacts do not compound.
pub struct RebalanceRecommender {
    config: EngineConfig,
    classifier: RiskClassifier,
}

/// Position state used for what-if projections.
#[derive(Debug, Clone)]
struct Exposure {
    apy: f64,
    liquidation_threshold: f64,
    collateral: f64,
    borrowed: f64,
    net: f64,
}

type Exposures<'a> = HashMap<&'a str, Exposure>;

#[derive(Debug, Clone, Copy)]
enum Adjustment<'a> {
    /// Shift borrowed exposure from one pool to another.
    MigrateDebt { from: &'a str, to: &'a str, amount: f64 },
    /// Shift supplied liquidity from one pool to another.
    MoveSupply { from: &'a str, to: &'a str, amount: f64 },
    AddCollateral { pool: &'a str, amount: f64 },
    /// Repay debt with the position's own supply.
    Deleverage { pool: &'a str, amount: f64 },
}

#[derive(Debug, Clone, Copy)]
struct Impact {
    apy: f64,
    risk: f64,
}

struct Proposal {
    kind: ActionKind,
    target: ActionTarget,
    amount: BigDecimal,
    reason: String,
    priority: Priority,
}

impl RebalanceRecommender {
    pub fn new(config: EngineConfig) -> Self {
        let classifier = RiskClassifier::new(config.risk.clone());
        Self { config, classifier }
    }

    pub fn recommend(&self, classified: &[ClassifiedPosition], summary: &PortfolioSummary) -> Vec<RebalanceAction> {
        let Some(metrics) = summary.metrics() else {
            debug!("Empty portfolio, nothing to rebalance");
            return Vec::new();
        };

        let baseline: Exposures = classified
            .iter()
            .map(|c| (c.position.id.as_str(), Exposure::from_position(&c.position)))
            .collect();

        let mut actions = Vec::new();
        let mut acted: HashSet<&str> = HashSet::new();
        let mut absorbed: HashMap<&str, f64> = HashMap::new();

        for source in self.distressed(classified) {
            let needed = self.debt_reduction_to_reach(&source.position, self.config.rebalance.target_health_score);
            if needed <= 0.0 {
                debug!(
                    "{} already meets target health {:.0}, no action",
                    source.position.id, self.config.rebalance.target_health_score
                );
                continue;
            }

            let action = match self.destination_for(classified, source, needed, &absorbed) {
                Some((destination, amount)) => {
                    *absorbed.entry(destination.position.id.as_str()).or_insert(0.0) += to_f64(&amount);
                    self.debt_migration(&baseline, source, destination, amount)
                }
                None => self.fallback(&baseline, source),
            };

            if let Some(action) = action {
                acted.insert(source.position.id.as_str());
                actions.push(action);
            }
        }

        // Pools that took on debt this pass keep their supply as collateral.
        acted.extend(absorbed.keys().copied());
        if let Some(action) = self.yield_move(&baseline, classified, &acted) {
            actions.push(action);
        }

        actions.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.risk_impact.total_cmp(&b.risk_impact))
                .then_with(|| a.id.cmp(&b.id))
        });

        info!(
            "Recommended {} rebalance actions (portfolio health {:.1}, grade {})",
            actions.len(),
            metrics.overall_health_score,
            metrics.grade
        );
        actions
    }

    /// Critical, warning and high-risk positions, worst first.
    fn distressed<'a>(&self, classified: &'a [ClassifiedPosition]) -> Vec<&'a ClassifiedPosition> {
        let alert_threshold = self.config.alerts.alert_threshold;
        let mut distressed: Vec<&ClassifiedPosition> = classified
            .iter()
            .filter(|c| {
                c.risk_level == RiskLevel::High || matches!(c.position.margin(), Some(m) if m <= alert_threshold)
            })
            .collect();

        distressed.sort_by(|a, b| {
            a.health_score
                .total_cmp(&b.health_score)
                .then_with(|| margin_cmp(&a.position, &b.position))
                .then_with(|| a.position.id.cmp(&b.position.id))
        });
        distressed
    }

    /// Best low-risk pool that can still take debt from `source`, and how much.
    fn destination_for<'a>(
        &self,
        classified: &'a [ClassifiedPosition],
        source: &ClassifiedPosition,
        needed: f64,
        absorbed: &HashMap<&str, f64>,
    ) -> Option<(&'a ClassifiedPosition, BigDecimal)> {
        let cap = needed.min(self.config.rebalance.max_rebalance_amount);

        classified
            .iter()
            .filter(|c| c.risk_level == RiskLevel::Low && c.position.id != source.position.id)
            .filter_map(|c| {
                let already = absorbed.get(c.position.id.as_str()).copied().unwrap_or(0.0);
                let amount = amount_floor_from_f64(cap.min(self.debt_headroom(&c.position) - already));
                (!amount.is_zero()).then_some((c, amount))
            })
            .min_by(|(a, _), (b, _)| {
                b.health_score
                    .total_cmp(&a.health_score)
                    .then_with(|| b.position.apy.total_cmp(&a.position.apy))
                    .then_with(|| a.position.id.cmp(&b.position.id))
            })
    }

    fn debt_migration(
        &self,
        baseline: &Exposures,
        source: &ClassifiedPosition,
        destination: &ClassifiedPosition,
        amount: BigDecimal,
    ) -> Option<RebalanceAction> {
        let from = source.position.id.as_str();
        let to = destination.position.id.as_str();
        let impact = self.project(
            baseline,
            Adjustment::MigrateDebt {
                from,
                to,
                amount: to_f64(&amount),
            },
        );

        let proposal = Proposal {
            kind: ActionKind::Move,
            target: ActionTarget::Transfer {
                from_pool_id: from.to_string(),
                to_pool_id: to.to_string(),
            },
            amount,
            reason: format!(
                "Reduce liquidation risk in {} by shifting debt to {} (health {:.0} vs {:.0})",
                source.position.name, destination.position.name, source.health_score, destination.health_score
            ),
            priority: self.distress_priority(source),
        };
        self.build_action(&source.position, proposal, impact)
    }

    /// No destination qualifies: inject collateral, or deleverage when
    /// configured and the ratio allows it.
    fn fallback(&self, baseline: &Exposures, source: &ClassifiedPosition) -> Option<RebalanceAction> {
        let position = &source.position;
        let pool = position.id.as_str();
        let max_amount = self.config.rebalance.max_rebalance_amount;
        let priority = self.distress_priority(source);

        if self.config.rebalance.distress_fallback == DistressFallback::Deleverage {
            if let Some(repay) = self.deleverage_to_safe_margin(position) {
                let amount = amount_floor_from_f64(repay.min(max_amount));
                let impact = self.project(
                    baseline,
                    Adjustment::Deleverage {
                        pool,
                        amount: to_f64(&amount),
                    },
                );
                let proposal = Proposal {
                    kind: ActionKind::Remove,
                    target: ActionTarget::Pool { pool_id: pool.to_string() },
                    amount,
                    reason: format!(
                        "Repay debt in {} from its own supply to restore a safe collateral margin",
                        position.name
                    ),
                    priority,
                };
                return self.build_action(position, proposal, impact);
            }
            debug!("Deleverage not possible for {}, falling back to added collateral", pool);
        }

        let amount = amount_floor_from_f64(self.collateral_to_safe_margin(position).min(max_amount));
        let impact = self.project(
            baseline,
            Adjustment::AddCollateral {
                pool,
                amount: to_f64(&amount),
            },
        );
        let proposal = Proposal {
            kind: ActionKind::Add,
            target: ActionTarget::Pool { pool_id: pool.to_string() },
            amount,
            reason: format!("Add collateral to {} to improve its health ratio", position.name),
            priority,
        };
        self.build_action(position, proposal, impact)
    }

    /// Pure yield optimization between low-risk pools.
    fn yield_move(
        &self,
        baseline: &Exposures,
        classified: &[ClassifiedPosition],
        acted: &HashSet<&str>,
    ) -> Option<RebalanceAction> {
        let low_risk: Vec<&ClassifiedPosition> = classified
            .iter()
            .filter(|c| c.risk_level == RiskLevel::Low && !acted.contains(c.position.id.as_str()))
            .collect();

        let best = low_risk.iter().max_by(|a, b| {
            a.position
                .apy
                .total_cmp(&b.position.apy)
                .then_with(|| b.position.id.cmp(&a.position.id))
        })?;
        let source = low_risk.iter().min_by(|a, b| {
            a.position
                .apy
                .total_cmp(&b.position.apy)
                .then_with(|| a.position.id.cmp(&b.position.id))
        })?;

        let apy_gain = best.position.apy - source.position.apy;
        if source.position.id == best.position.id || apy_gain < self.config.rebalance.min_apy_improvement {
            return None;
        }

        let amount = amount_floor_from_f64(
            self.supply_headroom(&source.position)
                .min(self.config.rebalance.max_rebalance_amount),
        );
        let from = source.position.id.as_str();
        let to = best.position.id.as_str();
        let impact = self.project(
            baseline,
            Adjustment::MoveSupply {
                from,
                to,
                amount: to_f64(&amount),
            },
        );

        let proposal = Proposal {
            kind: ActionKind::Move,
            target: ActionTarget::Transfer {
                from_pool_id: from.to_string(),
                to_pool_id: to.to_string(),
            },
            amount,
            reason: format!(
                "Move liquidity from {} to {} for {:.2} points more APY",
                source.position.name, best.position.name, apy_gain
            ),
            priority: Priority::Low,
        };
        self.build_action(&source.position, proposal, impact)
    }

    fn build_action(&self, subject: &Position, proposal: Proposal, impact: Impact) -> Option<RebalanceAction> {
        if proposal.amount.is_zero() {
            debug!("Skipping zero-amount {} for {}", proposal.kind, subject.id);
            return None;
        }

        let action = RebalanceAction {
            id: format!("{}-{}", proposal.kind, subject.id),
            kind: proposal.kind,
            target: proposal.target,
            amount: proposal.amount,
            asset: subject.asset.clone(),
            reason: proposal.reason,
            apy_impact: impact.apy,
            risk_impact: impact.risk,
            priority: proposal.priority,
        };
        debug!(
            "Proposed {} (priority {:?}, apy {:+.2}, risk {:+.2})",
            action.describe(),
            action.priority,
            action.apy_impact,
            action.risk_impact
        );
        Some(action)
    }

    fn distress_priority(&self, source: &ClassifiedPosition) -> Priority {
        if source.position.is_liquidatable() || source.risk_level == RiskLevel::High {
            Priority::High
        } else {
            Priority::Medium
        }
    }

    fn target_ratio(&self, position: &Position, health_score: f64) -> f64 {
        position.liquidation_threshold + self.classifier.margin_for_health(health_score)
    }

    fn full_health_ratio(&self, position: &Position) -> f64 {
        position.liquidation_threshold + self.config.risk.safe_margin
    }

    /// Debt to move out so the position reaches `health_score`.
    fn debt_reduction_to_reach(&self, position: &Position, health_score: f64) -> f64 {
        let target = self.target_ratio(position, health_score);
        if target <= 0.0 {
            return 0.0;
        }
        (to_f64(&position.borrowed) - position.collateral_value() * 100.0 / target).max(0.0)
    }

    /// Extra debt the position can carry without losing health.
    fn debt_headroom(&self, position: &Position) -> f64 {
        let floor = self.full_health_ratio(position);
        if floor <= 0.0 {
            return 0.0;
        }
        (position.collateral_value() * 100.0 / floor - to_f64(&position.borrowed)).max(0.0)
    }

    /// Supply the position can release without losing health.
    fn supply_headroom(&self, position: &Position) -> f64 {
        let lent = to_f64(&position.lent);
        if !position.has_debt() {
            return lent;
        }
        let locked = self.full_health_ratio(position) * to_f64(&position.borrowed) / 100.0;
        (position.collateral_value() - locked).min(lent).max(0.0)
    }

    fn collateral_to_safe_margin(&self, position: &Position) -> f64 {
        let target = self.full_health_ratio(position);
        (target * to_f64(&position.borrowed) / 100.0 - position.collateral_value()).max(0.0)
    }

    /// Debt repaid from supply that restores the safe margin. `None` when
    /// selling collateral cannot raise the ratio (ratio at or below 100%).
    fn deleverage_to_safe_margin(&self, position: &Position) -> Option<f64> {
        let target = self.full_health_ratio(position);
        let borrowed = to_f64(&position.borrowed);
        let collateral = position.collateral_value();

        if target <= 100.0 || collateral <= borrowed {
            return None;
        }
        let repay = (target * borrowed - 100.0 * collateral) / (target - 100.0);
        (repay > 0.0).then(|| repay.min(borrowed))
    }

    fn project(&self, baseline: &Exposures, adjustment: Adjustment<'_>) -> Impact {
        let mut projected = baseline.clone();

        match adjustment {
            Adjustment::MigrateDebt { from, to, amount } => {
                adjust(&mut projected, from, |e| {
                    e.borrowed = (e.borrowed - amount).max(0.0);
                    e.net += amount;
                });
                adjust(&mut projected, to, |e| {
                    e.borrowed += amount;
                    e.net -= amount;
                });
            }
            Adjustment::MoveSupply { from, to, amount } => {
                adjust(&mut projected, from, |e| {
                    e.collateral -= amount;
                    e.net -= amount;
                });
                adjust(&mut projected, to, |e| {
                    e.collateral += amount;
                    e.net += amount;
                });
            }
            Adjustment::AddCollateral { pool, amount } => adjust(&mut projected, pool, |e| {
                e.collateral += amount;
                e.net += amount;
            }),
            Adjustment::Deleverage { pool, amount } => adjust(&mut projected, pool, |e| {
                e.collateral -= amount;
                e.borrowed = (e.borrowed - amount).max(0.0);
            }),
        }

        let apy = match (weighted_apy(baseline), weighted_apy(&projected)) {
            (Some(before), Some(after)) => after - before,
            _ => 0.0,
        };
        let risk = -(self.overall_health(&projected) - self.overall_health(baseline));
        Impact { apy, risk }
    }

    fn overall_health(&self, exposures: &Exposures) -> f64 {
        let scores: Vec<f64> = sorted(exposures)
            .into_iter()
            .map(|e| self.exposure_health(e))
            .collect();
        mean(&scores).unwrap_or(0.0)
    }

    fn exposure_health(&self, exposure: &Exposure) -> f64 {
        if exposure.borrowed <= 0.0 {
            return 100.0;
        }
        let ratio = exposure.collateral.max(0.0) * 100.0 / exposure.borrowed;
        self.classifier
            .health_for_margin(ratio - exposure.liquidation_threshold)
    }
}

impl Exposure {
    fn from_position(position: &Position) -> Self {
        Self {
            apy: position.apy,
            liquidation_threshold: position.liquidation_threshold,
            collateral: position.collateral_value(),
            borrowed: to_f64(&position.borrowed),
            net: to_f64(&position.net_value()),
        }
    }
}

fn adjust(exposures: &mut Exposures, pool: &str, f: impl FnOnce(&mut Exposure)) {
    if let Some(exposure) = exposures.get_mut(pool) {
        f(exposure);
    }
}

// Summation order fixed by id so projections are reproducible.
fn sorted<'m>(exposures: &'m Exposures) -> Vec<&'m Exposure> {
    let mut entries: Vec<(&&str, &Exposure)> = exposures.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().map(|(_, e)| e).collect()
}

fn weighted_apy(exposures: &Exposures) -> Option<f64> {
    let entries = sorted(exposures);
    let apys: Vec<f64> = entries.iter().map(|e| e.apy).collect();
    let weights: Vec<f64> = entries.iter().map(|e| e.net.max(0.0)).collect();
    weighted_mean(&apys, &weights)
}

fn margin_cmp(a: &Position, b: &Position) -> Ordering {
    match (a.margin(), b.margin()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Prioritized rebalance actions for a snapshot.
pub fn recommend_rebalance(positions: &[Position], config: &EngineConfig) -> Vec<RebalanceAction> {
    let classifier = RiskClassifier::new(config.risk.clone());
    let classified = classifier.classify_all(positions);
    let summary = summarize(&classified, &classifier);
    RebalanceRecommender::new(config.clone()).recommend(&classified, &summary)
}
