// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Return-on-investment calculator
//!
//! Itemizes the monthly value of an upgrade into performance-value and
//! cost-saving components, then derives payback, ROI, NPV and an uncertainty
//! band from the sum:
//!
//! - `payback = investment / monthly_benefit`
//! - `roi = (monthly_benefit × timeframe − investment) / investment × 100`
//! - `risk_adjusted = roi × haircut`
//!
//! Degenerate inputs never yield NaN or infinity; they are clamped to a
//! finite sentinel and recorded in [`RoiAnalysis::flags`].

use serde::{Deserialize, Serialize};

use crate::config::{PricingConfig, RoiConfig};
use crate::error::{Result, SimError};
use crate::model::{UpgradePlan, UsageProfile};
use crate::pipeline::Stage;
use crate::power::PowerAnalysis;

/// Hours per day at which `value_per_gain_point` is quoted
const REFERENCE_DAILY_HOURS: f64 = 8.0;

/// Average wall draw assumed when no power analysis is available (W)
const REFERENCE_AVERAGE_WATTS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    PerformanceValue,
    CostSaving,
}

/// One itemized monthly value line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueComponent {
    pub name: String,
    pub kind: ValueKind,
    /// Currency per month; negative for a monthly cost
    pub monthly_value: f64,
}

impl ValueComponent {
    pub fn performance(name: impl Into<String>, monthly_value: f64) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::PerformanceValue,
            monthly_value,
        }
    }

    pub fn saving(name: impl Into<String>, monthly_value: f64) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::CostSaving,
            monthly_value,
        }
    }
}

/// Degenerate-input markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiFlag {
    /// Monthly benefit is zero or negative; the upgrade never pays back
    NonPositiveBenefit,
    /// Zero investment; ROI is reported as 0
    ZeroInvestment,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRange {
    pub low: f64,
    pub high: f64,
    /// Confidence that the true ROI lies in `[low, high]`
    pub confidence_level: f64,
}

/// ROI analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiAnalysis {
    pub investment_cost: f64,
    pub timeframe_months: u32,
    pub performance_value: Vec<ValueComponent>,
    pub cost_savings: Vec<ValueComponent>,
    pub monthly_benefit: f64,
    pub total_benefit: f64,
    pub net_present_value: f64,
    /// `None` when the upgrade never pays back
    pub payback_months: Option<f64>,
    pub roi_percent: f64,
    pub risk_adjusted_roi: f64,
    pub uncertainty: UncertaintyRange,
    pub flags: Vec<RoiFlag>,
}

impl RoiAnalysis {
    pub fn pays_back_within(&self, months: u32) -> bool {
        self.payback_months.map_or(false, |p| p <= months as f64)
    }
}

/// ROI calculator
pub struct RoiCalculator {
    config: RoiConfig,
    pricing: PricingConfig,
}

impl RoiCalculator {
    pub fn new(config: RoiConfig, pricing: PricingConfig) -> Self {
        Self { config, pricing }
    }

    /// ROI of `plan` over `timeframe_months`.
    ///
    /// `usage` scales the performance value by daily hours (8 h when absent);
    /// `power` supplies the measured energy saving, otherwise the plan's
    /// stated power-efficiency gain is applied to a reference build.
    pub fn calculate(
        &self,
        plan: &UpgradePlan,
        timeframe_months: u32,
        usage: Option<&UsageProfile>,
        power: Option<&PowerAnalysis>,
    ) -> Result<RoiAnalysis> {
        if timeframe_months == 0 {
            return Err(SimError::Validation(
                "ROI timeframe must be at least one month".into(),
            ));
        }
        let hours = usage.map_or(REFERENCE_DAILY_HOURS, |u| u.daily_hours);
        let usage_factor = hours / REFERENCE_DAILY_HOURS;

        let mut components = Vec::new();
        let substitutions: Vec<_> = plan.substitutions().collect();
        if substitutions.is_empty() {
            components.push(ValueComponent::performance(
                "Overall performance",
                plan.expected_improvement.performance_gain
                    * self.config.value_per_gain_point
                    * usage_factor,
            ));
        } else {
            for sub in substitutions {
                components.push(ValueComponent::performance(
                    format!("{} upgrade: {}", sub.category, sub.recommended.name),
                    sub.performance_gain * self.config.value_per_gain_point * usage_factor,
                ));
            }
        }

        let energy = match power {
            Some(p) => p.monthly_savings(),
            None => {
                let reference_monthly = REFERENCE_AVERAGE_WATTS / 1000.0
                    * 24.0
                    * 30.0
                    * self.pricing.electricity_rate_per_kwh;
                reference_monthly * plan.expected_improvement.power_efficiency_gain / 100.0
            }
        };
        components.push(ValueComponent::saving("Energy", energy));

        let longevity = plan.expected_improvement.longevity_extension_months;
        if longevity > 0.0 && self.config.reference_lifespan_months > 0.0 {
            let deferred = plan.total_cost * (longevity / self.config.reference_lifespan_months)
                / timeframe_months as f64;
            components.push(ValueComponent::saving("Deferred replacement", deferred));
        }

        let analysis = self.from_components(plan.total_cost, timeframe_months, components)?;
        log::debug!(
            "plan={} stage={} monthly_benefit={:.2} roi={:.1}%",
            plan.id,
            Stage::Roi,
            analysis.monthly_benefit,
            analysis.roi_percent
        );
        Ok(analysis)
    }

    /// ROI from an explicit component list.
    pub fn from_components(
        &self,
        investment_cost: f64,
        timeframe_months: u32,
        components: Vec<ValueComponent>,
    ) -> Result<RoiAnalysis> {
        if !investment_cost.is_finite() || investment_cost < 0.0 {
            return Err(SimError::InvalidInput(format!(
                "investment cost {} is not a finite non-negative number",
                investment_cost
            )));
        }
        if components.iter().any(|c| !c.monthly_value.is_finite()) {
            return Err(SimError::stage(
                Stage::Roi,
                "value component is not a finite number",
            ));
        }

        let (performance_value, cost_savings): (Vec<_>, Vec<_>) = components
            .into_iter()
            .partition(|c| c.kind == ValueKind::PerformanceValue);
        let monthly_benefit: f64 = performance_value
            .iter()
            .chain(cost_savings.iter())
            .map(|c| c.monthly_value)
            .sum();
        let months = timeframe_months as f64;
        let total_benefit = monthly_benefit * months;

        let mut flags = Vec::new();
        let payback_months = if monthly_benefit > 0.0 {
            Some(investment_cost / monthly_benefit)
        } else {
            flags.push(RoiFlag::NonPositiveBenefit);
            None
        };
        let roi_percent = if investment_cost > 0.0 {
            (total_benefit - investment_cost) / investment_cost * 100.0
        } else {
            flags.push(RoiFlag::ZeroInvestment);
            0.0
        };

        let monthly_rate = self.config.annual_discount_rate / 12.0;
        let discounted: f64 = (1..=timeframe_months)
            .map(|m| monthly_benefit / (1.0 + monthly_rate).powi(m as i32))
            .sum();

        let a = roi_percent * self.config.uncertainty_low;
        let b = roi_percent * self.config.uncertainty_high;

        Ok(RoiAnalysis {
            investment_cost,
            timeframe_months,
            performance_value,
            cost_savings,
            monthly_benefit,
            total_benefit,
            net_present_value: discounted - investment_cost,
            payback_months,
            roi_percent,
            risk_adjusted_roi: roi_percent * self.config.risk_haircut,
            uncertainty: UncertaintyRange {
                low: a.min(b),
                high: a.max(b),
                confidence_level: self.config.confidence_level,
            },
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::gpu_plan;

    fn calculator() -> RoiCalculator {
        RoiCalculator::new(RoiConfig::default(), PricingConfig::default())
    }

    #[test]
    fn test_reference_case() {
        let roi = calculator()
            .from_components(
                100_000.0,
                24,
                vec![ValueComponent::performance("throughput", 10_000.0)],
            )
            .unwrap();
        assert!((roi.payback_months.unwrap() - 10.0).abs() < 1e-9);
        assert!((roi.roi_percent - 140.0).abs() < 1e-9);
        assert!((roi.risk_adjusted_roi - 112.0).abs() < 1e-9);
        assert!((roi.uncertainty.low - 84.0).abs() < 1e-9);
        assert!((roi.uncertainty.high - 196.0).abs() < 1e-9);
        assert!(roi.flags.is_empty());
    }

    #[test]
    fn test_npv_below_undiscounted_total() {
        let roi = calculator()
            .from_components(1000.0, 12, vec![ValueComponent::saving("energy", 100.0)])
            .unwrap();
        assert!(roi.net_present_value < roi.total_benefit - 1000.0);
        assert!(roi.net_present_value > 0.0);
    }

    #[test]
    fn test_non_positive_benefit_is_flagged() {
        let roi = calculator()
            .from_components(500.0, 24, vec![ValueComponent::saving("energy", -20.0)])
            .unwrap();
        assert_eq!(roi.payback_months, None);
        assert!(roi.flags.contains(&RoiFlag::NonPositiveBenefit));
        assert!(roi.roi_percent.is_finite());
        assert!(roi.uncertainty.low <= roi.uncertainty.high);
    }

    #[test]
    fn test_zero_investment_is_flagged() {
        let roi = calculator()
            .from_components(0.0, 24, vec![ValueComponent::saving("energy", 5.0)])
            .unwrap();
        assert_eq!(roi.roi_percent, 0.0);
        assert_eq!(roi.payback_months, Some(0.0));
        assert!(roi.flags.contains(&RoiFlag::ZeroInvestment));
    }

    #[test]
    fn test_plan_roi_itemizes_components() {
        let roi = calculator().calculate(&gpu_plan(), 24, None, None).unwrap();
        assert_eq!(roi.performance_value.len(), 1);
        assert!((roi.performance_value[0].monthly_value - 60.0).abs() < 1e-9);
        assert_eq!(roi.cost_savings.len(), 2);
        assert!(roi.pays_back_within(24));
        assert!(roi.roi_percent > 0.0);
    }

    #[test]
    fn test_usage_scales_performance_value() {
        let light = UsageProfile {
            daily_hours: 2.0,
            ..UsageProfile::default()
        };
        let roi = calculator()
            .calculate(&gpu_plan(), 24, Some(&light), None)
            .unwrap();
        assert!((roi.performance_value[0].monthly_value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_timeframe_rejected() {
        let err = calculator().calculate(&gpu_plan(), 0, None, None).unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[test]
    fn test_non_finite_component_is_stage_error() {
        let err = calculator()
            .from_components(100.0, 12, vec![ValueComponent::saving("energy", f64::NAN)])
            .unwrap_err();
        assert!(matches!(err, SimError::Stage { stage: Stage::Roi, .. }));
    }
}
