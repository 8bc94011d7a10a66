use crate::error::ValidationError;
use crate::utils::math::to_f64;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Margins are compared at 1e-9 percentage points.
const MARGIN_PRECISION: f64 = 1e9;

/// A validated lending-pool position from one snapshot.
///
/// `collateral_ratio` is `None` when the position has no debt; the ratio is
/// undefined there and the position counts as maximally healthy. A position
/// with debt but no ratio uses `lent / borrowed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub name: String,
    pub asset: String,
    pub apy: f64,
    pub borrowed: BigDecimal,
    pub lent: BigDecimal,
    pub collateral_ratio: Option<f64>,
    pub liquidation_threshold: f64,
    pub insurance_coverage: f64,
}

/// Raw position as supplied by a snapshot provider. Every field is optional
/// here so that missing data surfaces as a `ValidationError` instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePosition {
    pub id: Option<String>,
    pub name: Option<String>,
    pub asset: Option<String>,
    pub apy: Option<f64>,
    pub borrowed: Option<BigDecimal>,
    pub lent: Option<BigDecimal>,
    #[serde(alias = "collateralRatio")]
    pub collateral_ratio: Option<f64>,
    #[serde(alias = "liquidationThreshold")]
    pub liquidation_threshold: Option<f64>,
    #[serde(alias = "insuranceCoverage")]
    pub insurance_coverage: Option<f64>,
}

impl Position {
    pub fn from_input(input: CreatePosition, default_asset: &str) -> Result<Self, ValidationError> {
        let id = match input.id {
            Some(id) if id.trim().is_empty() => {
                return Err(ValidationError::EmptyField {
                    position: "<unknown>".to_string(),
                    field: "id",
                })
            }
            Some(id) => id,
            None => {
                return Err(ValidationError::MissingField {
                    position: "<unknown>".to_string(),
                    field: "id",
                })
            }
        };

        let name = required(&id, "name", input.name)?;
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField { position: id, field: "name" });
        }

        let apy = non_negative_percentage(&id, "apy", required(&id, "apy", input.apy)?)?;
        let borrowed = non_negative_amount(&id, "borrowed", required(&id, "borrowed", input.borrowed)?)?;
        let lent = non_negative_amount(&id, "lent", required(&id, "lent", input.lent)?)?;
        let liquidation_threshold = non_negative_percentage(
            &id,
            "liquidation_threshold",
            required(&id, "liquidation_threshold", input.liquidation_threshold)?,
        )?;

        let insurance_coverage = required(&id, "insurance_coverage", input.insurance_coverage)?;
        if !insurance_coverage.is_finite() || !(0.0..=100.0).contains(&insurance_coverage) {
            return Err(ValidationError::InvalidPercentage {
                position: id,
                field: "insurance_coverage",
                value: insurance_coverage,
            });
        }

        let supplied_ratio = input
            .collateral_ratio
            .map(|ratio| non_negative_percentage(&id, "collateral_ratio", ratio))
            .transpose()?;

        let collateral_ratio = if borrowed.is_zero() {
            None
        } else {
            Some(supplied_ratio.unwrap_or_else(|| to_f64(&lent) / to_f64(&borrowed) * 100.0))
        };

        let asset = input
            .asset
            .filter(|asset| !asset.trim().is_empty())
            .unwrap_or_else(|| default_asset.to_string());

        Ok(Self {
            id,
            name,
            asset,
            apy,
            borrowed,
            lent,
            collateral_ratio,
            liquidation_threshold,
            insurance_coverage,
        })
    }

    pub fn has_debt(&self) -> bool {
        !self.borrowed.is_zero()
    }

    /// Collateral ratio in percent, derived from `lent / borrowed` when the
    /// snapshot did not report one. `None` when the position has no debt.
    pub fn effective_ratio(&self) -> Option<f64> {
        if !self.has_debt() {
            return None;
        }
        Some(
            self.collateral_ratio
                .unwrap_or_else(|| to_f64(&self.lent) / to_f64(&self.borrowed) * 100.0),
        )
    }

    /// Percentage points between the collateral ratio and the liquidation
    /// threshold, rounded to `MARGIN_PRECISION` so that band checks are exact.
    /// `None` when the position has no debt.
    pub fn margin(&self) -> Option<f64> {
        self.effective_ratio()
            .map(|ratio| (ratio - self.liquidation_threshold) * MARGIN_PRECISION)
            .map(|scaled| scaled.round() / MARGIN_PRECISION)
    }

    pub fn is_liquidatable(&self) -> bool {
        matches!(self.margin(), Some(m) if m <= 0.0)
    }

    /// Value of the collateral backing the debt, implied by the reported ratio.
    /// Falls back to the lent amount for debt-free positions.
    pub fn collateral_value(&self) -> f64 {
        match self.effective_ratio() {
            Some(ratio) => ratio * to_f64(&self.borrowed) / 100.0,
            None => to_f64(&self.lent),
        }
    }

    pub fn net_value(&self) -> BigDecimal {
        &self.lent - &self.borrowed
    }
}

/// Validate a full snapshot, rejecting the first malformed entry and duplicate ids.
pub fn validate_snapshot(
    inputs: Vec<CreatePosition>,
    default_asset: &str,
) -> Result<Vec<Position>, ValidationError> {
    let mut seen = HashSet::with_capacity(inputs.len());
    let mut positions = Vec::with_capacity(inputs.len());

    for input in inputs {
        let position = Position::from_input(input, default_asset)?;
        if !seen.insert(position.id.clone()) {
            return Err(ValidationError::DuplicateId { id: position.id });
        }
        positions.push(position);
    }

    Ok(positions)
}

fn required<T>(position: &str, field: &'static str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::MissingField {
        position: position.to_string(),
        field,
    })
}

fn non_negative_amount(
    position: &str,
    field: &'static str,
    value: BigDecimal,
) -> Result<BigDecimal, ValidationError> {
    if value < BigDecimal::zero() {
        return Err(ValidationError::NegativeAmount {
            position: position.to_string(),
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn non_negative_percentage(position: &str, field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidPercentage {
            position: position.to_string(),
            field,
            value,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, borrowed: i64, lent: i64) -> CreatePosition {
        CreatePosition {
            id: Some(id.to_string()),
            name: Some(format!("Pool {}", id)),
            asset: None,
            apy: Some(12.5),
            borrowed: Some(BigDecimal::from(borrowed)),
            lent: Some(BigDecimal::from(lent)),
            collateral_ratio: Some(180.0),
            liquidation_threshold: Some(150.0),
            insurance_coverage: Some(85.0),
        }
    }

    #[test]
    fn test_position_from_valid_input() {
        let position = Position::from_input(input("1", 5000, 8000), "USDC").unwrap();
        assert_eq!(position.asset, "USDC");
        assert_eq!(position.collateral_ratio, Some(180.0));
        assert_eq!(position.margin(), Some(30.0));
        assert_eq!(position.net_value(), BigDecimal::from(3000));
        assert!(!position.is_liquidatable());
    }

    #[test]
    fn test_ratio_undefined_without_debt() {
        let position = Position::from_input(input("1", 0, 8000), "USDC").unwrap();
        assert_eq!(position.collateral_ratio, None);
        assert_eq!(position.margin(), None);
        assert_eq!(position.collateral_value(), 8000.0);
    }

    #[test]
    fn test_ratio_derived_when_missing() {
        let mut raw = input("1", 4000, 8000);
        raw.collateral_ratio = None;
        let position = Position::from_input(raw, "USDC").unwrap();
        assert_eq!(position.collateral_ratio, Some(200.0));
    }

    #[test]
    fn test_hand_built_debt_without_ratio_uses_lent() {
        let position = Position {
            id: "1".to_string(),
            name: "Pool 1".to_string(),
            asset: "USDC".to_string(),
            apy: 5.0,
            borrowed: BigDecimal::from(10_000),
            lent: BigDecimal::from(10_000),
            collateral_ratio: None,
            liquidation_threshold: 140.0,
            insurance_coverage: 80.0,
        };
        assert_eq!(position.effective_ratio(), Some(100.0));
        assert_eq!(position.margin(), Some(-40.0));
        assert!(position.is_liquidatable());
        assert_eq!(position.collateral_value(), 10_000.0);
    }

    #[test]
    fn test_margin_rounding_absorbs_float_noise() {
        let mut raw = input("1", 1000, 2000);
        raw.collateral_ratio = Some(150.3);
        raw.liquidation_threshold = Some(130.3);
        let position = Position::from_input(raw, "USDC").unwrap();
        assert_eq!(position.margin(), Some(20.0));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = Position::from_input(input("1", -1, 8000), "USDC");
        assert!(matches!(
            result,
            Err(ValidationError::NegativeAmount { field: "borrowed", .. })
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut raw = input("1", 100, 200);
        raw.liquidation_threshold = None;
        assert_eq!(
            Position::from_input(raw, "USDC"),
            Err(ValidationError::MissingField {
                position: "1".to_string(),
                field: "liquidation_threshold"
            })
        );
    }

    #[test]
    fn test_insurance_coverage_out_of_range() {
        let mut raw = input("1", 100, 200);
        raw.insurance_coverage = Some(120.0);
        assert!(matches!(
            Position::from_input(raw, "USDC"),
            Err(ValidationError::InvalidPercentage { field: "insurance_coverage", .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = validate_snapshot(vec![input("1", 1, 2), input("1", 3, 4)], "USDC");
        assert_eq!(result, Err(ValidationError::DuplicateId { id: "1".to_string() }));
    }

    #[test]
    fn test_camel_case_snapshot_fields() {
        let raw: CreatePosition = serde_json::from_str(
            r#"{"id":"3","name":"USDC-BTC Pool","apy":8.7,"borrowed":15000,"lent":18000,
                "collateralRatio":160,"liquidationThreshold":140,"insuranceCoverage":78}"#,
        )
        .unwrap();
        let position = Position::from_input(raw, "USDC").unwrap();
        assert_eq!(position.margin(), Some(20.0));
    }
}
