//! Before/after build comparison
//!
//! Combines category scores, power and thermal estimates of two builds into a
//! single side-by-side view with a 0-10 rating per build.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::PartCatalog;
use crate::config::SimulatorConfig;
use crate::error::Result;
use crate::estimator::{BaselineEstimator, CategoryScores};
use crate::model::ConfigurationSnapshot;
use crate::pipeline::{SnapshotAnalyzer, Stage};
use crate::power::{BeforeAfter, PowerAnalyzer};
use crate::thermal::ThermalAnalyzer;

/// Score gain that counts as an improvement area (points)
const IMPROVEMENT_AREA_POINTS: f64 = 5.0;

/// Power increase that triggers a warning (%)
const POWER_WARNING_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    pub before: CategoryScores,
    pub after: CategoryScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyComparison {
    /// Whole-day average wall draw (W)
    pub power_watts: BeforeAfter,
    /// Hottest component (°C)
    pub thermal_max_c: BeforeAfter,
    pub noise_db: BeforeAfter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Scores of the two builds as installed. The "after" side scores the
    /// projected parts one by one, so it differs from the simulation's
    /// upgraded vector, which spreads the plan's aggregate gain over the
    /// categories.
    pub performance: ScorePair,
    pub efficiency: EfficiencyComparison,
    /// 0-10
    pub overall_rating: BeforeAfter,
    pub improvement_areas: Vec<String>,
    pub warnings: Vec<String>,
}

impl ComparisonResult {
    /// Value substituted when the comparison stage fails
    pub fn fallback(default_score: f64) -> Self {
        let scores = CategoryScores::uniform(default_score);
        let rating = (default_score / 10.0).clamp(0.0, 10.0);
        Self {
            performance: ScorePair {
                before: scores,
                after: scores,
            },
            efficiency: EfficiencyComparison {
                power_watts: BeforeAfter::new(0.0, 0.0),
                thermal_max_c: BeforeAfter::new(0.0, 0.0),
                noise_db: BeforeAfter::new(0.0, 0.0),
            },
            overall_rating: BeforeAfter::new(rating, rating),
            improvement_areas: Vec::new(),
            warnings: vec!["Comparison unavailable; neutral values assumed".into()],
        }
    }
}

/// Side-by-side performance comparator
pub struct PerformanceComparator {
    catalog: Arc<dyn PartCatalog>,
    config: SimulatorConfig,
    power: PowerAnalyzer,
    thermal: ThermalAnalyzer,
}

impl PerformanceComparator {
    pub fn new(catalog: Arc<dyn PartCatalog>, config: SimulatorConfig) -> Self {
        Self {
            power: PowerAnalyzer::new(catalog.clone(), config.pricing.clone()),
            thermal: ThermalAnalyzer::new(catalog.clone(), config.thermal.clone()),
            catalog,
            config,
        }
    }

    fn rating(&self, scores: &CategoryScores, max_temp: f64) -> f64 {
        let thermal_penalty = if max_temp > self.config.thermal.high_risk_c {
            1.0
        } else if max_temp > self.config.thermal.medium_risk_c {
            0.5
        } else {
            0.0
        };
        (scores.overall / 10.0 - thermal_penalty).clamp(0.0, 10.0)
    }

    pub fn compare(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<ComparisonResult> {
        let estimator = BaselineEstimator::new(
            self.catalog.as_ref(),
            self.config.scoring.default_category_score,
        );
        let scores_before = estimator.estimate(before)?;
        let scores_after = estimator.estimate(after)?;
        let power = self.power.analyze(before, after)?;
        let thermal = self.thermal.analyze(before, after)?;

        let thermal_max = BeforeAfter::new(thermal.before.max(), thermal.after.max());

        let improvement_areas = scores_before
            .entries()
            .iter()
            .zip(scores_after.entries().iter())
            .filter(|((_, b), (_, a))| a - b >= IMPROVEMENT_AREA_POINTS)
            .map(|((name, b), (_, a))| format!("{}: {:.0} → {:.0}", name, b, a))
            .collect();

        let mut warnings = power.warnings.clone();
        if power.average_watts.before > 0.0 {
            let increase = power.average_watts.delta() / power.average_watts.before * 100.0;
            if increase > POWER_WARNING_PERCENT {
                warnings.push(format!("Average power draw rises by {:.0}%", increase));
            }
        }
        if thermal_max.after > self.config.thermal.medium_risk_c {
            warnings.push(format!(
                "Hottest component reaches {:.0} °C after the upgrade",
                thermal_max.after
            ));
        }
        for category in ["compute", "graphics", "memory", "storage"] {
            let b = scores_before.entries().iter().find(|(n, _)| *n == category).map(|(_, v)| *v);
            let a = scores_after.entries().iter().find(|(n, _)| *n == category).map(|(_, v)| *v);
            if let (Some(b), Some(a)) = (b, a) {
                if a < b {
                    warnings.push(format!("{} score drops from {:.0} to {:.0}", category, b, a));
                }
            }
        }

        Ok(ComparisonResult {
            performance: ScorePair {
                before: scores_before,
                after: scores_after,
            },
            efficiency: EfficiencyComparison {
                power_watts: power.average_watts,
                thermal_max_c: thermal_max,
                noise_db: thermal.noise_db,
            },
            overall_rating: BeforeAfter::new(
                self.rating(&scores_before, thermal_max.before),
                self.rating(&scores_after, thermal_max.after),
            ),
            improvement_areas,
            warnings,
        })
    }
}

#[async_trait]
impl SnapshotAnalyzer<ComparisonResult> for PerformanceComparator {
    fn stage(&self) -> Stage {
        Stage::Comparison
    }

    async fn analyze(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<ComparisonResult> {
        self.compare(before, after)
    }

    fn fallback(&self) -> ComparisonResult {
        ComparisonResult::fallback(self.config.scoring.default_category_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuiltinCatalog;
    use crate::model::fixtures::{gaming_build, gpu_plan};
    use crate::normalizer::Normalizer;

    fn comparator() -> PerformanceComparator {
        PerformanceComparator::new(Arc::new(BuiltinCatalog), SimulatorConfig::default())
    }

    #[test]
    fn test_gpu_upgrade_is_improvement_area() {
        let before = gaming_build();
        let after = Normalizer::default().project(&before, &gpu_plan(), 50.0).unwrap();
        let result = comparator().compare(&before, &after).unwrap();
        assert!(result.performance.after.graphics > result.performance.before.graphics);
        assert_eq!(result.improvement_areas.len(), 1);
        assert!(result.improvement_areas[0].starts_with("graphics"));
        assert!(result.overall_rating.after > result.overall_rating.before);
    }

    #[test]
    fn test_identical_builds_have_no_areas() {
        let build = gaming_build();
        let result = comparator().compare(&build, &build).unwrap();
        assert!(result.improvement_areas.is_empty());
        assert_eq!(result.overall_rating.before, result.overall_rating.after);
    }

    #[test]
    fn test_rating_bounded() {
        let result = ComparisonResult::fallback(250.0);
        assert_eq!(result.overall_rating.before, 10.0);
    }
}
