//! Power efficiency analyzer
//!
//! Estimates idle and load draw of a build before and after an upgrade, the
//! resulting energy cost, and PSU headroom.
//!
//! Cost model:
//!
//! - `annual_cost = average_kw × 24 × 365 × rate`
//! - `monthly_cost_difference = (after_kw − before_kw) × 24 × 30 × rate`
//!
//! where the average is taken over the whole day, so a build used six hours a
//! day spends the remaining eighteen in standby.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{PartCatalog, PowerSpec};
use crate::config::PricingConfig;
use crate::error::{Result, SimError};
use crate::model::{ComponentCategory, ComponentSlot, ConfigurationSnapshot};
use crate::pipeline::{SnapshotAnalyzer, Stage};

/// Draw of a powered-off build (W)
const STANDBY_WATTS: f64 = 2.0;

/// PSU headroom below this is reported as a warning (%)
const MIN_HEALTHY_HEADROOM: f64 = 20.0;

/// Changes smaller than this are reported as unchanged (W)
const UNCHANGED_TOLERANCE_WATTS: f64 = 1.0;

/// Before/after pair of one quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeforeAfter {
    pub before: f64,
    pub after: f64,
}

impl BeforeAfter {
    pub fn new(before: f64, after: f64) -> Self {
        Self { before, after }
    }

    pub fn delta(&self) -> f64 {
        self.after - self.before
    }

    pub fn max(&self) -> f64 {
        self.before.max(self.after)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EfficiencyChange {
    Improved,
    Increased,
    Unchanged,
}

impl std::fmt::Display for EfficiencyChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Improved => write!(f, "improved"),
            Self::Increased => write!(f, "increased"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Power analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerAnalysis {
    /// Wall draw at idle (W)
    pub idle_watts: BeforeAfter,
    /// Wall draw under sustained load (W)
    pub load_watts: BeforeAfter,
    /// Whole-day average wall draw (W)
    pub average_watts: BeforeAfter,
    pub annual_cost: BeforeAfter,
    pub monthly_cost_difference: f64,
    pub efficiency: EfficiencyChange,
    /// PSU headroom under load (%); `None` when no PSU rating is known
    pub psu_headroom_before: Option<f64>,
    pub psu_headroom_after: Option<f64>,
    pub warnings: Vec<String>,
}

impl PowerAnalysis {
    /// Value substituted when the power stage fails
    pub fn fallback() -> Self {
        Self {
            idle_watts: BeforeAfter::new(0.0, 0.0),
            load_watts: BeforeAfter::new(0.0, 0.0),
            average_watts: BeforeAfter::new(0.0, 0.0),
            annual_cost: BeforeAfter::new(0.0, 0.0),
            monthly_cost_difference: 0.0,
            efficiency: EfficiencyChange::Unchanged,
            psu_headroom_before: None,
            psu_headroom_after: None,
            warnings: vec!["Power analysis unavailable; values defaulted".into()],
        }
    }

    /// Monthly saving (positive when the upgrade lowers the bill)
    pub fn monthly_savings(&self) -> f64 {
        -self.monthly_cost_difference
    }
}

/// DC-side draw of one build
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildDraw {
    pub idle_watts: f64,
    pub load_watts: f64,
}

/// Draw of a single slot. Placeholders, empty required slots and the
/// board/peripheral slot use the catalog default; empty optional slots draw
/// nothing.
pub fn slot_power(
    catalog: &dyn PartCatalog,
    category: ComponentCategory,
    slot: &ComponentSlot,
) -> Result<PowerSpec> {
    let part = match slot {
        ComponentSlot::Installed(part) => part,
        ComponentSlot::Placeholder(_) => return Ok(catalog.default_power(category)),
        ComponentSlot::Empty => {
            return Ok(if category.is_required() || category == ComponentCategory::Other {
                catalog.default_power(category)
            } else {
                PowerSpec {
                    idle_watts: 0.0,
                    load_watts: 0.0,
                }
            })
        }
    };
    if category == ComponentCategory::Psu {
        return Ok(PowerSpec {
            idle_watts: 0.0,
            load_watts: 0.0,
        });
    }

    let looked_up = catalog
        .power_spec(part)
        .unwrap_or_else(|| catalog.default_power(category));
    let load = part.load_watts.unwrap_or(looked_up.load_watts);
    let idle = part
        .idle_watts
        .unwrap_or_else(|| (looked_up.idle_watts).min(load));

    for (label, value) in [("load", load), ("idle", idle)] {
        if !value.is_finite() || value < 0.0 {
            return Err(SimError::malformed(
                &part.name,
                format!("{} draw {} W is not a finite non-negative number", label, value),
            ));
        }
    }
    Ok(PowerSpec {
        idle_watts: idle,
        load_watts: load,
    })
}

/// Sum of all slot draws (DC side).
pub fn build_draw(catalog: &dyn PartCatalog, snapshot: &ConfigurationSnapshot) -> Result<BuildDraw> {
    let mut draw = BuildDraw {
        idle_watts: 0.0,
        load_watts: 0.0,
    };
    for category in ComponentCategory::ALL {
        let spec = slot_power(catalog, category, snapshot.slot(category))?;
        draw.idle_watts += spec.idle_watts;
        draw.load_watts += spec.load_watts;
    }
    Ok(draw)
}

/// Headroom between PSU rating and DC load; `None` without a usable rating.
pub fn psu_headroom(snapshot: &ConfigurationSnapshot, load_watts: f64) -> Option<f64> {
    let capacity = snapshot
        .slot(ComponentCategory::Psu)
        .installed()
        .and_then(|p| p.capacity_watts)
        .filter(|c| c.is_finite() && *c > 0.0)?;
    Some((capacity - load_watts) / capacity * 100.0)
}

/// Power efficiency analyzer
pub struct PowerAnalyzer {
    catalog: Arc<dyn PartCatalog>,
    pricing: PricingConfig,
}

impl PowerAnalyzer {
    pub fn new(catalog: Arc<dyn PartCatalog>, pricing: PricingConfig) -> Self {
        Self { catalog, pricing }
    }

    /// Whole-day average wall draw of a build (W)
    fn average_wall_watts(&self, snapshot: &ConfigurationSnapshot, draw: &BuildDraw) -> f64 {
        let f = snapshot.usage.primary_workload.load_fraction();
        let active = draw.idle_watts * (1.0 - f) + draw.load_watts * f;
        let on_share = (snapshot.usage.daily_hours / 24.0).clamp(0.0, 1.0);
        let wall = active / self.pricing.psu_efficiency;
        wall * on_share + STANDBY_WATTS * (1.0 - on_share)
    }

    fn annual_cost(&self, average_watts: f64) -> f64 {
        average_watts / 1000.0 * 24.0 * 365.0 * self.pricing.electricity_rate_per_kwh
    }

    pub fn analyze(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<PowerAnalysis> {
        let draw_before = build_draw(self.catalog.as_ref(), before)?;
        let draw_after = build_draw(self.catalog.as_ref(), after)?;
        let efficiency = self.pricing.psu_efficiency;

        let average = BeforeAfter::new(
            self.average_wall_watts(before, &draw_before),
            self.average_wall_watts(after, &draw_after),
        );
        let monthly_cost_difference = average.delta() / 1000.0
            * 24.0
            * 30.0
            * self.pricing.electricity_rate_per_kwh;

        let classification = if average.delta() < -UNCHANGED_TOLERANCE_WATTS {
            EfficiencyChange::Improved
        } else if average.delta() > UNCHANGED_TOLERANCE_WATTS {
            EfficiencyChange::Increased
        } else {
            EfficiencyChange::Unchanged
        };

        let psu_headroom_before = psu_headroom(before, draw_before.load_watts);
        let psu_headroom_after = psu_headroom(after, draw_after.load_watts);

        let mut warnings = Vec::new();
        match psu_headroom_after {
            Some(h) if h < 0.0 => warnings.push(format!(
                "Load draw exceeds PSU rating by {:.0}% after the upgrade",
                -h
            )),
            Some(h) if h < MIN_HEALTHY_HEADROOM => warnings.push(format!(
                "PSU headroom only {:.0}% after the upgrade",
                h
            )),
            None => warnings.push("PSU rating unknown; headroom not assessed".into()),
            _ => {}
        }
        for (label, snapshot) in [("current", before), ("upgraded", after)] {
            let placeholders = snapshot.placeholders();
            if !placeholders.is_empty() {
                warnings.push(format!(
                    "{} build uses default draw for placeholder slot(s): {}",
                    label,
                    placeholders
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }

        Ok(PowerAnalysis {
            idle_watts: BeforeAfter::new(
                draw_before.idle_watts / efficiency,
                draw_after.idle_watts / efficiency,
            ),
            load_watts: BeforeAfter::new(
                draw_before.load_watts / efficiency,
                draw_after.load_watts / efficiency,
            ),
            annual_cost: BeforeAfter::new(
                self.annual_cost(average.before),
                self.annual_cost(average.after),
            ),
            average_watts: average,
            monthly_cost_difference,
            efficiency: classification,
            psu_headroom_before,
            psu_headroom_after,
            warnings,
        })
    }
}

#[async_trait]
impl SnapshotAnalyzer<PowerAnalysis> for PowerAnalyzer {
    fn stage(&self) -> Stage {
        Stage::Power
    }

    async fn analyze(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<PowerAnalysis> {
        PowerAnalyzer::analyze(self, before, after)
    }

    fn fallback(&self) -> PowerAnalysis {
        PowerAnalysis::fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuiltinCatalog;
    use crate::model::fixtures::{gaming_build, gpu_plan};
    use crate::model::Part;
    use crate::normalizer::Normalizer;

    fn analyzer() -> PowerAnalyzer {
        PowerAnalyzer::new(Arc::new(BuiltinCatalog), PricingConfig::default())
    }

    #[test]
    fn test_identical_builds_unchanged() {
        let build = gaming_build();
        let result = analyzer().analyze(&build, &build).unwrap();
        assert_eq!(result.efficiency, EfficiencyChange::Unchanged);
        assert_eq!(result.monthly_cost_difference, 0.0);
        assert_eq!(result.annual_cost.before, result.annual_cost.after);
    }

    #[test]
    fn test_hungrier_gpu_increases_draw() {
        let before = gaming_build();
        let after = Normalizer::default().project(&before, &gpu_plan(), 50.0).unwrap();
        let result = analyzer().analyze(&before, &after).unwrap();
        assert_eq!(result.efficiency, EfficiencyChange::Increased);
        assert!(result.load_watts.after > result.load_watts.before);
        assert!(result.monthly_cost_difference > 0.0);
        assert!(result.monthly_savings() < 0.0);
    }

    #[test]
    fn test_annual_cost_formula() {
        let a = analyzer();
        let build = gaming_build();
        let result = a.analyze(&build, &build).unwrap();
        let expected = result.average_watts.before / 1000.0 * 24.0 * 365.0 * 0.15;
        assert!((result.annual_cost.before - expected).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_difference_formula() {
        let before = gaming_build();
        let after = Normalizer::default().project(&before, &gpu_plan(), 50.0).unwrap();
        let result = analyzer().analyze(&before, &after).unwrap();
        let expected = result.average_watts.delta() / 1000.0 * 24.0 * 30.0 * 0.15;
        assert!((result.monthly_cost_difference - expected).abs() < 1e-12);
    }

    #[test]
    fn test_headroom_reported() {
        let build = gaming_build();
        let result = analyzer().analyze(&build, &build).unwrap();
        let headroom = result.psu_headroom_before.unwrap();
        assert!(headroom > 0.0 && headroom < 100.0);
    }

    #[test]
    fn test_zero_wattage_psu_has_no_headroom() {
        let mut build = gaming_build();
        build.components.insert(
            ComponentCategory::Psu,
            ComponentSlot::Installed(
                Part::new("psu", "Unrated PSU", ComponentCategory::Psu).with_capacity(0.0),
            ),
        );
        let result = analyzer().analyze(&build, &build).unwrap();
        assert!(result.psu_headroom_after.is_none());
        assert!(result.warnings.iter().any(|w| w.contains("unknown")));
    }

    #[test]
    fn test_placeholder_uses_default_draw() {
        let mut build = gaming_build();
        build.components.insert(
            ComponentCategory::Gpu,
            ComponentSlot::Placeholder(Part::new("p", "Unspecified gpu", ComponentCategory::Gpu)),
        );
        let result = analyzer().analyze(&build, &build).unwrap();
        assert!(result.load_watts.before > 0.0);
        assert!(result.warnings.iter().any(|w| w.contains("placeholder")));
    }

    #[test]
    fn test_negative_draw_is_malformed() {
        let mut build = gaming_build();
        build.components.insert(
            ComponentCategory::Gpu,
            ComponentSlot::Installed(
                Part::new("g", "Broken GPU", ComponentCategory::Gpu).with_power(10.0, -50.0),
            ),
        );
        let err = analyzer().analyze(&build, &build).unwrap_err();
        assert!(matches!(err, SimError::MalformedComponent { .. }));
    }

    #[test]
    fn test_fallback_has_efficiency() {
        let fallback = PowerAnalysis::fallback();
        assert_eq!(fallback.efficiency, EfficiencyChange::Unchanged);
        assert!(!fallback.warnings.is_empty());
    }
}
