//! Group and turnover constraints for factor weight optimization.
//!
//! Constraints are injected into a solve as quadratic penalty terms and
//! verified against the final weights; a breach beyond tolerance after
//! optimization is a [`CadizError::RiskConstraintViolation`].

use cadiz_traits::{AssetId, CadizError, Result, Weights};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Penalty scale applied to squared constraint violations.
const PENALTY_SCALE: f64 = 100.0;

/// Residual violation tolerated after a penalized solve.
pub const CONSTRAINT_TOLERANCE: f64 = 1e-3;

/// Caps or floors the summed weight of a named subset of factors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConstraint {
    /// Group label, used in violation messages.
    pub name: String,
    /// Factor identifiers belonging to the group.
    pub members: Vec<AssetId>,
    /// Minimum summed weight of the group.
    pub min_total: f64,
    /// Maximum summed weight of the group.
    pub max_total: f64,
}

/// Bounds the total weight change relative to a previous allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnoverConstraint {
    /// The previous weight vector.
    pub previous: Weights,
    /// Maximum allowed `sum(|w - w_prev|)`.
    pub max_turnover: f64,
}

/// The full constraint set for a factor weight solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightConstraints {
    /// Group constraints.
    pub groups: Vec<GroupConstraint>,
    /// Optional turnover constraint.
    pub turnover: Option<TurnoverConstraint>,
}

impl WeightConstraints {
    /// Returns whether no constraints are configured.
    pub const fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.turnover.is_none()
    }

    /// Resolves constraint identifiers against the solve's name order.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::Validation`] when a group member or a
    /// previous-weight identifier is not among the names being optimized.
    pub fn resolve(&self, names: &[AssetId]) -> Result<ResolvedConstraints> {
        let mut groups = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let mut indices = Vec::with_capacity(group.members.len());
            for member in &group.members {
                let idx = names.iter().position(|n| n == member).ok_or_else(|| {
                    CadizError::Validation(format!(
                        "group '{}' references unknown factor: {member}",
                        group.name
                    ))
                })?;
                indices.push(idx);
            }
            groups.push((group.clone(), indices));
        }

        let turnover = match &self.turnover {
            None => None,
            Some(t) => {
                let mut previous = vec![0.0; names.len()];
                for (name, value) in t.previous.iter() {
                    let idx = names.iter().position(|n| n == name).ok_or_else(|| {
                        CadizError::Validation(format!(
                            "turnover constraint references unknown factor: {name}"
                        ))
                    })?;
                    previous[idx] = value;
                }
                Some((t.max_turnover, previous))
            }
        };

        Ok(ResolvedConstraints { groups, turnover })
    }
}

/// Constraints resolved to positional indices for a specific solve.
#[derive(Debug, Clone)]
pub struct ResolvedConstraints {
    groups: Vec<(GroupConstraint, Vec<usize>)>,
    turnover: Option<(f64, Vec<f64>)>,
}

impl ResolvedConstraints {
    /// Total constraint violation at the given weights.
    pub fn violation(&self, weights: &Array1<f64>) -> f64 {
        let mut total = 0.0;
        for (group, indices) in &self.groups {
            let sum: f64 = indices.iter().map(|&i| weights[i]).sum();
            total += (sum - group.max_total).max(0.0);
            total += (group.min_total - sum).max(0.0);
        }
        if let Some((max_turnover, previous)) = &self.turnover {
            let turnover: f64 = weights
                .iter()
                .zip(previous.iter())
                .map(|(w, p)| (w - p).abs())
                .sum();
            total += (turnover - max_turnover).max(0.0);
        }
        total
    }

    /// Quadratic penalty added to the solver objective.
    pub fn penalty(&self, weights: &Array1<f64>) -> f64 {
        let v = self.violation(weights);
        PENALTY_SCALE * v * v
    }

    /// Verifies the final weights against the constraint set.
    ///
    /// # Errors
    ///
    /// Returns [`CadizError::RiskConstraintViolation`] when the residual
    /// violation exceeds [`CONSTRAINT_TOLERANCE`].
    pub fn verify(&self, weights: &Weights) -> Result<()> {
        let w = Array1::from_vec(weights.values().to_vec());
        let violation = self.violation(&w);
        if violation > CONSTRAINT_TOLERANCE {
            return Err(CadizError::RiskConstraintViolation(format!(
                "constraint violation {violation:.6} exceeds tolerance {CONSTRAINT_TOLERANCE}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names() -> Vec<AssetId> {
        vec!["mom".to_string(), "val".to_string(), "qual".to_string()]
    }

    #[test]
    fn test_group_violation() {
        let constraints = WeightConstraints {
            groups: vec![GroupConstraint {
                name: "price".to_string(),
                members: vec!["mom".to_string(), "val".to_string()],
                min_total: 0.0,
                max_total: 0.5,
            }],
            turnover: None,
        };
        let resolved = constraints.resolve(&names()).unwrap();

        assert_eq!(resolved.violation(&array![0.2, 0.2, 0.6]), 0.0);
        assert!((resolved.violation(&array![0.5, 0.2, 0.3]) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_turnover_violation() {
        let previous = Weights::new(names(), vec![0.4, 0.3, 0.3]).unwrap();
        let constraints = WeightConstraints {
            groups: Vec::new(),
            turnover: Some(TurnoverConstraint {
                previous,
                max_turnover: 0.2,
            }),
        };
        let resolved = constraints.resolve(&names()).unwrap();

        assert_eq!(resolved.violation(&array![0.4, 0.3, 0.3]), 0.0);
        // Total change = 0.4, exceeding the cap by 0.2
        assert!((resolved.violation(&array![0.6, 0.1, 0.3]) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_member_is_invalid() {
        let constraints = WeightConstraints {
            groups: vec![GroupConstraint {
                name: "bad".to_string(),
                members: vec!["missing".to_string()],
                min_total: 0.0,
                max_total: 1.0,
            }],
            turnover: None,
        };
        assert!(constraints.resolve(&names()).is_err());
    }

    #[test]
    fn test_verify_flags_breach() {
        let constraints = WeightConstraints {
            groups: vec![GroupConstraint {
                name: "tight".to_string(),
                members: vec!["mom".to_string()],
                min_total: 0.0,
                max_total: 0.1,
            }],
            turnover: None,
        };
        let resolved = constraints.resolve(&names()).unwrap();
        let breached = Weights::new(names(), vec![0.5, 0.25, 0.25]).unwrap();
        assert!(matches!(
            resolved.verify(&breached),
            Err(CadizError::RiskConstraintViolation(_))
        ));
    }
}
