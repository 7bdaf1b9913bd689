//! Baseline / upgrade performance estimation and improvement calculation
//!
//! Scores are on a 0-100 relative scale per category. The upgrade vector is
//! the baseline plus the plan's aggregate gain distributed with
//! [`GainWeights`]; nothing is re-derived independently, so every "after"
//! value traces back to its "before" value.

use serde::{Deserialize, Serialize};

use crate::catalog::PartCatalog;
use crate::config::GainWeights;
use crate::error::{Result, SimError};
use crate::model::{ComponentCategory, ComponentSlot, ConfigurationSnapshot, UpgradePlan};
use crate::pipeline::Stage;

/// Per-category score vector. `overall` is the mean of the four categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub compute: f64,
    pub graphics: f64,
    pub memory: f64,
    pub storage: f64,
    pub overall: f64,
}

impl CategoryScores {
    pub fn new(compute: f64, graphics: f64, memory: f64, storage: f64) -> Self {
        Self {
            compute,
            graphics,
            memory,
            storage,
            overall: (compute + graphics + memory + storage) / 4.0,
        }
    }

    pub fn uniform(score: f64) -> Self {
        Self::new(score, score, score, score)
    }

    /// `(name, value)` pairs for the four categories
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("compute", self.compute),
            ("graphics", self.graphics),
            ("memory", self.memory),
            ("storage", self.storage),
        ]
    }
}

/// Scores the current build.
pub struct BaselineEstimator<'a> {
    catalog: &'a dyn PartCatalog,
    default_score: f64,
}

impl<'a> BaselineEstimator<'a> {
    pub fn new(catalog: &'a dyn PartCatalog, default_score: f64) -> Self {
        Self {
            catalog,
            default_score,
        }
    }

    pub fn estimate(&self, snapshot: &ConfigurationSnapshot) -> Result<CategoryScores> {
        let scores = CategoryScores::new(
            self.slot_score(snapshot.slot(ComponentCategory::Cpu))?,
            self.slot_score(snapshot.slot(ComponentCategory::Gpu))?,
            self.slot_score(snapshot.slot(ComponentCategory::Memory))?,
            self.slot_score(snapshot.slot(ComponentCategory::Storage))?,
        );
        if !scores.overall.is_finite() {
            return Err(SimError::stage(
                Stage::Baseline,
                format!("baseline scores of {} overflow", snapshot.id),
            ));
        }
        Ok(scores)
    }

    /// Explicit score, then catalog estimate, then the default.
    /// Placeholders and empty slots always score the default.
    fn slot_score(&self, slot: &ComponentSlot) -> Result<f64> {
        let part = match slot {
            ComponentSlot::Installed(part) => part,
            ComponentSlot::Placeholder(_) | ComponentSlot::Empty => return Ok(self.default_score),
        };
        let score = part
            .performance_score
            .or_else(|| self.catalog.performance_score(part))
            .unwrap_or(self.default_score);
        if !score.is_finite() || score < 0.0 {
            return Err(SimError::malformed(
                &part.name,
                format!("performance score {} is not a finite non-negative number", score),
            ));
        }
        Ok(score)
    }
}

/// Applies a plan's aggregate gain on top of a baseline.
pub struct UpgradeEstimator {
    weights: GainWeights,
}

impl UpgradeEstimator {
    pub fn new(weights: GainWeights) -> Self {
        Self { weights }
    }

    pub fn estimate(&self, baseline: &CategoryScores, plan: &UpgradePlan) -> CategoryScores {
        let gain = plan.expected_improvement.performance_gain;
        CategoryScores::new(
            baseline.compute + gain * self.weights.compute,
            baseline.graphics + gain * self.weights.graphics,
            baseline.memory + gain * self.weights.memory,
            baseline.storage + gain * self.weights.storage,
        )
    }
}

/// Output of the improvement calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub overall: f64,
    pub per_category: CategoryScores,
    /// 0-100
    pub confidence: f64,
    /// 0-100
    pub satisfaction: f64,
}

/// Deltas between two score vectors plus confidence and predicted satisfaction.
pub fn calculate_improvement(
    baseline: &CategoryScores,
    upgraded: &CategoryScores,
    plan_confidence: f64,
) -> Improvement {
    let overall = upgraded.overall - baseline.overall;
    let per_category = CategoryScores {
        compute: upgraded.compute - baseline.compute,
        graphics: upgraded.graphics - baseline.graphics,
        memory: upgraded.memory - baseline.memory,
        storage: upgraded.storage - baseline.storage,
        overall,
    };
    Improvement {
        overall,
        per_category,
        confidence: clamp_percent(plan_confidence * 100.0),
        satisfaction: clamp_percent((overall * 2.0).min(100.0)),
    }
}

/// Clamp to [0, 100]; NaN becomes 0.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
