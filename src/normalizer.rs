//! Configuration normalizer
//!
//! Converts the loosely shaped records produced by the configuration builder
//! into a [`ConfigurationSnapshot`] where every slot is present, and projects a
//! snapshot through an [`UpgradePlan`] to obtain the post-upgrade build.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SimError};
use crate::model::{
    BottleneckAnalysis, ComponentCategory, ComponentSlot, ConfigurationSnapshot, Constraints,
    Part, UpgradePlan, UsageProfile, UsageScenario, Workload,
};

/// Largest performance gain (percent) a plan may claim, per plan or per part.
pub const MAX_PERFORMANCE_GAIN: f64 = 1000.0;

/// A part as it may arrive from upstream: every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPart {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    #[serde(alias = "score")]
    pub performance_score: Option<f64>,
    #[serde(alias = "tdp", alias = "tdp_watts")]
    pub load_watts: Option<f64>,
    pub idle_watts: Option<f64>,
    #[serde(alias = "wattage")]
    pub capacity_watts: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUsage {
    pub daily_hours: Option<f64>,
    pub primary_workload: Option<String>,
}

/// A possibly partial configuration record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfiguration {
    pub id: Option<String>,
    /// Keyed by category label; aliases such as `processor` or `ram` are accepted
    #[serde(alias = "parts")]
    pub components: BTreeMap<String, Option<RawPart>>,
    pub usage: Option<RawUsage>,
    pub constraints: Option<Constraints>,
    #[serde(alias = "bottleneck_analysis")]
    pub diagnosis: Option<BottleneckAnalysis>,
}

impl RawConfiguration {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Normalizer options
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Fill missing required slots with placeholders instead of failing
    pub substitute_placeholders: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            substitute_placeholders: true,
        }
    }
}

impl Normalizer {
    /// Fail on missing required components instead of substituting placeholders
    pub fn strict() -> Self {
        Self {
            substitute_placeholders: false,
        }
    }

    /// Build a canonical snapshot from a raw record.
    pub fn normalize(&self, raw: &RawConfiguration) -> Result<ConfigurationSnapshot> {
        let mut components: BTreeMap<ComponentCategory, ComponentSlot> = ComponentCategory::ALL
            .iter()
            .map(|c| (*c, ComponentSlot::Empty))
            .collect();

        for (label, raw_part) in &raw.components {
            let category = ComponentCategory::from_label(label).unwrap_or_else(|| {
                warn!("Unknown component label '{}', filing it under 'other'", label);
                ComponentCategory::Other
            });
            let Some(part) = raw_part.as_ref().and_then(|p| convert_part(p, category)) else {
                continue;
            };
            if let Some(ComponentSlot::Installed(existing)) = components.get(&category) {
                warn!(
                    "Duplicate {} entry '{}' replaces '{}'",
                    category, part.name, existing.name
                );
            }
            components.insert(category, ComponentSlot::Installed(part));
        }

        for category in ComponentCategory::REQUIRED {
            if !components.get(&category).map_or(true, ComponentSlot::is_empty) {
                continue;
            }
            if !self.substitute_placeholders {
                return Err(SimError::MissingComponent(category.to_string()));
            }
            warn!(
                "No {} in configuration {}, substituting placeholder",
                category,
                raw.id.as_deref().unwrap_or("<unnamed>")
            );
            components.insert(category, ComponentSlot::Placeholder(placeholder_part(category)));
        }

        let usage = raw
            .usage
            .as_ref()
            .map(|u| UsageProfile {
                daily_hours: u
                    .daily_hours
                    .filter(|h| h.is_finite())
                    .map(|h| h.clamp(0.0, 24.0))
                    .unwrap_or(UsageProfile::default().daily_hours),
                primary_workload: u
                    .primary_workload
                    .as_deref()
                    .map(Workload::from_label)
                    .unwrap_or(Workload::General),
            })
            .unwrap_or_default();

        let mut snapshot = ConfigurationSnapshot {
            id: String::new(),
            components,
            usage,
            constraints: raw.constraints.clone().unwrap_or_default(),
            diagnosis: raw.diagnosis.clone(),
        };
        snapshot.id = match raw.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => snapshot.fingerprint(),
        };
        validate_snapshot(&snapshot)?;
        debug!(
            "Normalized configuration {} ({} placeholder slot(s))",
            snapshot.id,
            snapshot.placeholders().len()
        );
        Ok(snapshot)
    }

    /// Apply every substitution of `plan` to `current`, phase by phase.
    ///
    /// A recommended part without a score inherits the replaced part's score
    /// raised by the substitution's gain.
    pub fn project(
        &self,
        current: &ConfigurationSnapshot,
        plan: &UpgradePlan,
        default_score: f64,
    ) -> Result<ConfigurationSnapshot> {
        let mut projected = current.clone();
        for substitution in plan.substitutions() {
            let previous_score = projected
                .part(substitution.category)
                .and_then(|p| p.performance_score)
                .unwrap_or(default_score);
            let mut part = substitution.recommended.clone();
            part.category = substitution.category;
            if part.performance_score.is_none() {
                part.performance_score =
                    Some(previous_score * (1.0 + substitution.performance_gain / 100.0));
            }
            projected
                .components
                .insert(substitution.category, ComponentSlot::Installed(part));
        }
        projected.id = format!("{}+{}", current.id, plan.id);
        validate_snapshot(&projected)?;
        Ok(projected)
    }
}

/// Required slots must hold something after normalization.
pub fn validate_snapshot(snapshot: &ConfigurationSnapshot) -> Result<()> {
    if snapshot.id.trim().is_empty() {
        return Err(SimError::InvalidInput("configuration id is empty".into()));
    }
    for category in ComponentCategory::REQUIRED {
        if snapshot.slot(category).is_empty() {
            return Err(SimError::MissingComponent(format!(
                "{} in configuration {}",
                category, snapshot.id
            )));
        }
    }
    if snapshot.constraints.timeframe_months == Some(0) {
        return Err(SimError::InvalidInput(format!(
            "configuration {} has a zero-month timeframe",
            snapshot.id
        )));
    }
    Ok(())
}

/// Plans must carry an identity, a usable cost and a confidence.
pub fn validate_plan(plan: &UpgradePlan) -> Result<()> {
    if plan.id.trim().is_empty() {
        return Err(SimError::InvalidInput("plan id is empty".into()));
    }
    if !plan.total_cost.is_finite() || plan.total_cost < 0.0 {
        return Err(SimError::InvalidInput(format!(
            "plan {} has invalid total cost {}",
            plan.id, plan.total_cost
        )));
    }
    if !plan.confidence.is_finite() {
        return Err(SimError::InvalidInput(format!(
            "plan {} has non-finite confidence",
            plan.id
        )));
    }
    check_gain(&plan.id, "plan", plan.expected_improvement.performance_gain)?;
    for sub in plan.substitutions() {
        check_gain(&plan.id, &sub.recommended.name, sub.performance_gain)?;
    }
    Ok(())
}

fn check_gain(plan_id: &str, subject: &str, gain: f64) -> Result<()> {
    if !(-100.0..=MAX_PERFORMANCE_GAIN).contains(&gain) {
        return Err(SimError::InvalidInput(format!(
            "plan {}: performance gain {} of {} is outside [-100, {}]",
            plan_id, gain, subject, MAX_PERFORMANCE_GAIN
        )));
    }
    Ok(())
}

/// Scenario weights are importances in [0, 100].
pub fn validate_scenarios(scenarios: &[UsageScenario]) -> Result<()> {
    for scenario in scenarios {
        if !(0.0..=100.0).contains(&scenario.weight) {
            return Err(SimError::InvalidInput(format!(
                "scenario '{}' has weight {} outside [0, 100]",
                scenario.name, scenario.weight
            )));
        }
    }
    Ok(())
}

fn convert_part(raw: &RawPart, category: ComponentCategory) -> Option<Part> {
    let name = raw
        .name
        .clone()
        .or_else(|| raw.id.clone())
        .filter(|n| !n.trim().is_empty())?;
    Some(Part {
        id: raw.id.clone().unwrap_or_else(|| name.clone()),
        name,
        category,
        price: raw.price.unwrap_or(0.0),
        performance_score: raw.performance_score,
        load_watts: raw.load_watts,
        idle_watts: raw.idle_watts,
        capacity_watts: raw.capacity_watts,
    })
}

fn placeholder_part(category: ComponentCategory) -> Part {
    Part::new(
        format!("placeholder-{}", category),
        format!("Unspecified {}", category),
        category,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{gaming_build, gpu_plan};

    fn raw(json: &str) -> RawConfiguration {
        RawConfiguration::from_json(json).unwrap()
    }

    #[test]
    fn test_every_slot_present() {
        let snapshot = Normalizer::default()
            .normalize(&raw(r#"{"components": {"processor": {"name": "Intel Core i5-12400"}}}"#))
            .unwrap();
        assert_eq!(snapshot.components.len(), ComponentCategory::ALL.len());
        assert!(matches!(
            snapshot.slot(ComponentCategory::Cpu),
            ComponentSlot::Installed(_)
        ));
        assert!(snapshot.slot(ComponentCategory::Case).is_empty());
    }

    #[test]
    fn test_missing_required_becomes_placeholder() {
        let snapshot = Normalizer::default()
            .normalize(&raw(r#"{"components": {"cpu": {"name": "Ryzen 5 5600"}}}"#))
            .unwrap();
        let gpu = snapshot.slot(ComponentCategory::Gpu);
        assert!(gpu.is_placeholder());
        assert!(gpu.label().contains("placeholder"));
        assert_eq!(
            snapshot.placeholders(),
            vec![
                ComponentCategory::Gpu,
                ComponentCategory::Memory,
                ComponentCategory::Storage
            ]
        );
    }

    #[test]
    fn test_strict_mode_rejects_missing_required() {
        let err = Normalizer::strict()
            .normalize(&raw(r#"{"components": {"cpu": {"name": "Ryzen 5 5600"}}}"#))
            .unwrap_err();
        assert!(matches!(err, SimError::MissingComponent(_)));
    }

    #[test]
    fn test_null_part_is_empty() {
        let snapshot = Normalizer::default()
            .normalize(&raw(r#"{"components": {"case": null, "cooler": {}}}"#))
            .unwrap();
        assert!(snapshot.slot(ComponentCategory::Case).is_empty());
        assert!(snapshot.slot(ComponentCategory::Cooler).is_empty());
    }

    #[test]
    fn test_id_defaults_to_fingerprint() {
        let a = Normalizer::default()
            .normalize(&raw(r#"{"components": {"gpu": {"name": "RTX 3060"}}}"#))
            .unwrap();
        let b = Normalizer::default()
            .normalize(&raw(r#"{"components": {"gpu": {"name": "RTX 3060"}}}"#))
            .unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("cfg-"));
    }

    #[test]
    fn test_usage_parsing() {
        let snapshot = Normalizer::default()
            .normalize(&raw(
                r#"{"id": "rig-1", "usage": {"daily_hours": 30, "primary_workload": "gaming"}}"#,
            ))
            .unwrap();
        assert_eq!(snapshot.id, "rig-1");
        assert_eq!(snapshot.usage.daily_hours, 24.0);
        assert_eq!(snapshot.usage.primary_workload, Workload::Gaming);
    }

    #[test]
    fn test_project_applies_substitutions() {
        let before = gaming_build();
        let plan = gpu_plan();
        let after = Normalizer::default().project(&before, &plan, 50.0).unwrap();
        let gpu = after.part(ComponentCategory::Gpu).unwrap();
        assert_eq!(gpu.id, "gpu-4070");
        // 45 × (1 + 60/100)
        assert!((gpu.performance_score.unwrap() - 72.0).abs() < 1e-9);
        assert_eq!(
            after.part(ComponentCategory::Cpu),
            before.part(ComponentCategory::Cpu)
        );
        assert_ne!(after.id, before.id);
    }

    #[test]
    fn test_validate_plan_rejects_empty_id() {
        let mut plan = gpu_plan();
        plan.id = "  ".into();
        assert!(validate_plan(&plan).unwrap_err().is_input_error());
    }

    #[test]
    fn test_validate_plan_rejects_negative_cost() {
        let mut plan = gpu_plan();
        plan.total_cost = -5.0;
        assert!(matches!(validate_plan(&plan), Err(SimError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_plan_bounds_gain() {
        let mut plan = gpu_plan();
        plan.expected_improvement.performance_gain = 1e308;
        assert!(matches!(validate_plan(&plan), Err(SimError::InvalidInput(_))));

        let mut plan = gpu_plan();
        plan.phases[0].substitutions[0].performance_gain = f64::NAN;
        assert!(matches!(validate_plan(&plan), Err(SimError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_timeframe_rejected() {
        let mut snapshot = gaming_build();
        snapshot.constraints.timeframe_months = Some(0);
        assert!(matches!(validate_snapshot(&snapshot), Err(SimError::InvalidInput(_))));
    }

    #[test]
    fn test_scenario_weight_range() {
        let mut scenarios = UsageScenario::defaults();
        assert!(validate_scenarios(&scenarios).is_ok());
        scenarios[0].weight = 120.0;
        assert!(validate_scenarios(&scenarios).unwrap_err().is_input_error());
        scenarios[0].weight = f64::NAN;
        assert!(validate_scenarios(&scenarios).is_err());
    }
}
