// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Simulator settings
//!
//! Every tunable constant of the analyzers lives here so that a deployment can
//! adjust electricity prices, weighting coefficients or risk thresholds from a
//! TOML file without recompiling.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self { LogLevel::Info }
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Electricity pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Price of one kWh in the plan's currency
    pub electricity_rate_per_kwh: f64,
    /// Wall-to-DC efficiency assumed for every power supply
    pub psu_efficiency: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            electricity_rate_per_kwh: 0.15,
            psu_efficiency: 0.87,
        }
    }
}

/// Share of a plan's aggregate performance gain absorbed by each category.
///
/// The coefficients are applied independently and do not need to sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GainWeights {
    pub compute: f64,
    pub graphics: f64,
    pub memory: f64,
    pub storage: f64,
}

impl Default for GainWeights {
    fn default() -> Self {
        Self {
            compute: 0.4,
            graphics: 0.6,
            memory: 0.3,
            storage: 0.5,
        }
    }
}

impl GainWeights {
    pub fn mean(&self) -> f64 {
        (self.compute + self.graphics + self.memory + self.storage) / 4.0
    }
}

/// Baseline scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score given to placeholder slots and parts without any score source
    pub default_category_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_category_score: 50.0,
        }
    }
}

/// Synthetic benchmark generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Base seed; every stage derives its own generator from it
    pub seed: u64,
    /// Half-open range of reference "before" scores
    pub before_range: [f64; 2],
    /// Half-open range of reference "after" scores
    pub after_range: [f64; 2],
    /// Half-open range of per-result confidence
    pub confidence_range: [f64; 2],
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_0F_B1_7E,
            before_range: [1000.0, 1500.0],
            after_range: [1200.0, 2000.0],
            confidence_range: [85.0, 95.0],
        }
    }
}

/// Thermal model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Room temperature (°C)
    pub ambient_c: f64,
    /// Above this the throttling risk is high (°C)
    pub high_risk_c: f64,
    /// Above this the throttling risk is medium (°C)
    pub medium_risk_c: f64,
    /// CPU temperature used when the thermal stage is defaulted
    pub fallback_cpu_c: f64,
    /// GPU temperature used when the thermal stage is defaulted
    pub fallback_gpu_c: f64,
    /// Storage temperature used when the thermal stage is defaulted
    pub fallback_storage_c: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            high_risk_c: 85.0,
            medium_risk_c: 75.0,
            fallback_cpu_c: 65.0,
            fallback_gpu_c: 70.0,
            fallback_storage_c: 40.0,
        }
    }
}

/// Return-on-investment model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub annual_discount_rate: f64,
    /// Multiplier applied to ROI to get the risk-adjusted ROI
    pub risk_haircut: f64,
    pub uncertainty_low: f64,
    pub uncertainty_high: f64,
    /// Confidence level attached to the uncertainty range (0-1)
    pub confidence_level: f64,
    /// Monthly value of one percent of performance gain at 8 hours/day
    pub value_per_gain_point: f64,
    /// Expected service life of a build, used to value longevity extensions
    pub reference_lifespan_months: f64,
    pub default_timeframe_months: u32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            annual_discount_rate: 0.05,
            risk_haircut: 0.8,
            uncertainty_low: 0.6,
            uncertainty_high: 1.4,
            confidence_level: 0.8,
            value_per_gain_point: 1.0,
            reference_lifespan_months: 48.0,
            default_timeframe_months: 24,
        }
    }
}

/// Scenario cost-benefit model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostBenefitConfig {
    /// recommendation score = cost effectiveness × multiplier (capped at 100)
    pub score_multiplier: f64,
    /// Monthly cost of one missing score point at 100% utilization
    pub cost_per_deficit_point: f64,
    /// Relative swing used by the sensitivity analysis
    pub sensitivity_swing: f64,
}

impl Default for CostBenefitConfig {
    fn default() -> Self {
        Self {
            score_multiplier: 50.0,
            cost_per_deficit_point: 0.5,
            sensitivity_swing: 0.2,
        }
    }
}

/// Simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub log_level: LogLevel,
    /// Overall confidence multiplier applied once per defaulted stage
    pub defaulted_stage_penalty: f64,
    pub pricing: PricingConfig,
    pub weights: GainWeights,
    pub scoring: ScoringConfig,
    pub benchmark: BenchmarkConfig,
    pub thermal: ThermalConfig,
    pub roi: RoiConfig,
    pub cost_benefit: CostBenefitConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            defaulted_stage_penalty: 0.85,
            pricing: PricingConfig::default(),
            weights: GainWeights::default(),
            scoring: ScoringConfig::default(),
            benchmark: BenchmarkConfig::default(),
            thermal: ThermalConfig::default(),
            roi: RoiConfig::default(),
            cost_benefit: CostBenefitConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Load from TOML file
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::Configuration(format!("Cannot read {}: {}", path, e)))?;
        Self::from_toml(&content)
    }

    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SimError::Configuration(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the analyzers produce NaN or nonsense
    pub fn validate(&self) -> Result<()> {
        let finite_non_negative = [
            ("pricing.electricity_rate_per_kwh", self.pricing.electricity_rate_per_kwh),
            ("weights.compute", self.weights.compute),
            ("weights.graphics", self.weights.graphics),
            ("weights.memory", self.weights.memory),
            ("weights.storage", self.weights.storage),
            ("scoring.default_category_score", self.scoring.default_category_score),
            ("roi.annual_discount_rate", self.roi.annual_discount_rate),
            ("roi.value_per_gain_point", self.roi.value_per_gain_point),
            ("cost_benefit.score_multiplier", self.cost_benefit.score_multiplier),
            ("cost_benefit.cost_per_deficit_point", self.cost_benefit.cost_per_deficit_point),
            ("cost_benefit.sensitivity_swing", self.cost_benefit.sensitivity_swing),
            ("roi.risk_haircut", self.roi.risk_haircut),
            ("roi.uncertainty_low", self.roi.uncertainty_low),
            ("roi.uncertainty_high", self.roi.uncertainty_high),
        ];
        for (name, value) in finite_non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::Configuration(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !(self.pricing.psu_efficiency > 0.0 && self.pricing.psu_efficiency <= 1.0) {
            return Err(SimError::Configuration(
                "pricing.psu_efficiency must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.defaulted_stage_penalty) {
            return Err(SimError::Configuration(
                "defaulted_stage_penalty must be in [0, 1]".into(),
            ));
        }
        if self.roi.uncertainty_low > self.roi.uncertainty_high {
            return Err(SimError::Configuration(
                "roi.uncertainty_low must not exceed roi.uncertainty_high".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.roi.confidence_level) {
            return Err(SimError::Configuration(
                "roi.confidence_level must be in [0, 1]".into(),
            ));
        }
        if !(self.roi.reference_lifespan_months > 0.0 && self.roi.reference_lifespan_months.is_finite()) {
            return Err(SimError::Configuration(
                "roi.reference_lifespan_months must be positive".into(),
            ));
        }
        let temperatures = [
            ("thermal.ambient_c", self.thermal.ambient_c),
            ("thermal.high_risk_c", self.thermal.high_risk_c),
            ("thermal.medium_risk_c", self.thermal.medium_risk_c),
            ("thermal.fallback_cpu_c", self.thermal.fallback_cpu_c),
            ("thermal.fallback_gpu_c", self.thermal.fallback_gpu_c),
            ("thermal.fallback_storage_c", self.thermal.fallback_storage_c),
        ];
        for (name, value) in temperatures {
            if !value.is_finite() {
                return Err(SimError::Configuration(format!(
                    "{} must be a finite temperature, got {}",
                    name, value
                )));
            }
        }
        if self.thermal.medium_risk_c > self.thermal.high_risk_c {
            return Err(SimError::Configuration(
                "thermal.medium_risk_c must not exceed thermal.high_risk_c".into(),
            ));
        }

        let ranges = [
            ("benchmark.before_range", self.benchmark.before_range),
            ("benchmark.after_range", self.benchmark.after_range),
            ("benchmark.confidence_range", self.benchmark.confidence_range),
        ];
        for (name, [low, high]) in ranges {
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(SimError::Configuration(format!(
                    "{} must be an increasing pair, got [{}, {}]",
                    name, low, high
                )));
            }
        }
        Ok(())
    }

    /// Generate sample config
    pub fn sample_toml() -> String {
        r#"# Upgrade Simulator Configuration
log_level = "Info"
# Overall confidence is multiplied by this once per defaulted stage
defaulted_stage_penalty = 0.85

[pricing]
electricity_rate_per_kwh = 0.15
psu_efficiency = 0.87

# Share of the plan's performance gain absorbed by each category
[weights]
compute = 0.4
graphics = 0.6
memory = 0.3
storage = 0.5

[scoring]
default_category_score = 50.0

[benchmark]
seed = 407704154494
before_range = [1000.0, 1500.0]
after_range = [1200.0, 2000.0]
confidence_range = [85.0, 95.0]

[thermal]
ambient_c = 25.0
high_risk_c = 85.0
medium_risk_c = 75.0

[roi]
annual_discount_rate = 0.05
risk_haircut = 0.8
uncertainty_low = 0.6
uncertainty_high = 1.4
confidence_level = 0.8
value_per_gain_point = 1.0
reference_lifespan_months = 48.0
default_timeframe_months = 24

[cost_benefit]
score_multiplier = 50.0
cost_per_deficit_point = 0.5
sensitivity_swing = 0.2
"#.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_sample_toml_parses() {
        let config = SimulatorConfig::from_toml(&SimulatorConfig::sample_toml()).unwrap();
        assert_eq!(config.weights, GainWeights::default());
        assert_eq!(config.roi.default_timeframe_months, 24);
        assert!((config.pricing.electricity_rate_per_kwh - 0.15).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulatorConfig::from_toml("[pricing]\nelectricity_rate_per_kwh = 0.30\n").unwrap();
        assert!((config.pricing.electricity_rate_per_kwh - 0.30).abs() < f64::EPSILON);
        assert!((config.pricing.psu_efficiency - 0.87).abs() < f64::EPSILON);
        assert_eq!(config.thermal.high_risk_c, 85.0);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = SimulatorConfig::from_toml("[weights]\ngraphics = -1.0\n").unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = SimulatorConfig::from_toml("[benchmark]\nbefore_range = [1500.0, 1000.0]\n")
            .unwrap_err();
        assert!(err.to_string().contains("before_range"));
    }

    #[test]
    fn test_roi_and_thermal_settings_checked() {
        let mut config = SimulatorConfig::default();
        config.roi.risk_haircut = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulatorConfig::default();
        config.roi.uncertainty_low = 1.5;
        assert!(config.validate().unwrap_err().to_string().contains("uncertainty_low"));

        let mut config = SimulatorConfig::default();
        config.thermal.fallback_gpu_c = f64::INFINITY;
        assert!(config.validate().unwrap_err().to_string().contains("fallback_gpu_c"));

        let mut config = SimulatorConfig::default();
        config.pricing.psu_efficiency = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gain_weight_mean() {
        assert!((GainWeights::default().mean() - 0.45).abs() < 1e-12);
    }
}
