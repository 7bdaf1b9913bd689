//! Scenario-weighted cost-benefit analysis
//!
//! Each usage scenario prices the score deficit of a build: every missing
//! point below 100 in a category costs `cost_per_deficit_point` per month at
//! full utilization. The benefit of a plan in a scenario is the drop in that
//! cost over the evaluation timeframe.

use serde::{Deserialize, Serialize};

use crate::config::{CostBenefitConfig, GainWeights};
use crate::error::{Result, SimError};
use crate::estimator::{clamp_percent, CategoryScores, UpgradeEstimator};
use crate::model::{Constraints, UpgradePlan, UsageScenario};
use crate::pipeline::Stage;
use crate::roi::RoiAnalysis;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    /// Deficit cost of the current build over the timeframe
    pub cost_before: f64,
    pub cost_after: f64,
    pub benefit: f64,
    /// 0-100
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityParameter {
    PlanCost,
    Benefit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityEntry {
    pub parameter: SensitivityParameter,
    /// Signed variation applied to the parameter (%)
    pub variation_percent: f64,
    pub recommendation_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Strong,
    Recommended,
    Conditional,
    Cautious,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s > 80.0 => Recommendation::Strong,
            s if s > 60.0 => Recommendation::Recommended,
            s if s > 40.0 => Recommendation::Conditional,
            _ => Recommendation::Cautious,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::Strong => "Strongly recommended: excellent value for your usage",
            Recommendation::Recommended => "Recommended: good value for your usage",
            Recommendation::Conditional => {
                "Conditionally recommended: worthwhile if the targeted workloads matter to you"
            }
            Recommendation::Cautious => {
                "Proceed with caution: limited benefit for the cost; consider alternatives"
            }
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Recommended => write!(f, "recommended"),
            Self::Conditional => write!(f, "conditional"),
            Self::Cautious => write!(f, "cautious"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBenefitFlag {
    /// Plan cost is zero; cost-effectiveness reported as 0
    ZeroPlanCost,
    /// Weighted benefit is zero or negative
    NoBenefit,
}

/// Cost-benefit analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBenefitAnalysis {
    pub scenarios: Vec<ScenarioOutcome>,
    pub total_benefit: f64,
    pub cost_effectiveness: f64,
    /// 0-100
    pub recommendation_score: f64,
    pub recommendation: Recommendation,
    pub sensitivity: Vec<SensitivityEntry>,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub flags: Vec<CostBenefitFlag>,
}

/// Everything the analyzer reads for one plan.
pub struct CostBenefitInput<'a> {
    pub plan: &'a UpgradePlan,
    pub scenarios: &'a [UsageScenario],
    pub baseline: CategoryScores,
    pub timeframe_months: u32,
    pub constraints: Option<&'a Constraints>,
    pub roi: Option<&'a RoiAnalysis>,
}

pub struct CostBenefitAnalyzer {
    config: CostBenefitConfig,
    weights: GainWeights,
}

impl CostBenefitAnalyzer {
    pub fn new(config: CostBenefitConfig, weights: GainWeights) -> Self {
        Self { config, weights }
    }

    /// Monthly deficit cost of a score vector in one scenario
    fn monthly_cost(&self, scenario: &UsageScenario, scores: &CategoryScores) -> f64 {
        let u = &scenario.utilization;
        [
            (u.compute, scores.compute),
            (u.graphics, scores.graphics),
            (u.memory, scores.memory),
            (u.storage, scores.storage),
        ]
        .iter()
        .map(|(util, score)| util / 100.0 * (100.0 - score).max(0.0) * self.config.cost_per_deficit_point)
        .sum()
    }

    fn score(&self, total_benefit: f64, plan_cost: f64) -> f64 {
        if plan_cost <= 0.0 {
            return 0.0;
        }
        clamp_percent(total_benefit / plan_cost * self.config.score_multiplier)
    }

    pub fn analyze(&self, input: &CostBenefitInput<'_>) -> Result<CostBenefitAnalysis> {
        let plan = input.plan;
        if input.timeframe_months == 0 {
            return Err(SimError::Validation(
                "cost-benefit timeframe must be at least one month".into(),
            ));
        }
        let upgraded = UpgradeEstimator::new(self.weights).estimate(&input.baseline, plan);
        let months = input.timeframe_months as f64;

        let mut scenarios = Vec::with_capacity(input.scenarios.len());
        let mut total_benefit = 0.0;
        for scenario in input.scenarios {
            if !scenario.weight.is_finite() || !(0.0..=100.0).contains(&scenario.weight) {
                return Err(SimError::stage(
                    Stage::CostBenefit,
                    format!(
                        "scenario '{}' weight {} is outside 0-100",
                        scenario.name, scenario.weight
                    ),
                ));
            }
            let cost_before = self.monthly_cost(scenario, &input.baseline) * months;
            let cost_after = self.monthly_cost(scenario, &upgraded) * months;
            let benefit = cost_before - cost_after;
            if !benefit.is_finite() {
                return Err(SimError::stage(
                    Stage::CostBenefit,
                    format!("scenario '{}' produced a non-finite benefit", scenario.name),
                ));
            }
            total_benefit += benefit * scenario.weight / 100.0;
            scenarios.push(ScenarioOutcome {
                name: scenario.name.clone(),
                cost_before,
                cost_after,
                benefit,
                weight: scenario.weight,
            });
        }

        let mut flags = Vec::new();
        let cost = plan.total_cost;
        let cost_effectiveness = if cost > 0.0 {
            total_benefit / cost
        } else {
            flags.push(CostBenefitFlag::ZeroPlanCost);
            0.0
        };
        if total_benefit <= 0.0 {
            flags.push(CostBenefitFlag::NoBenefit);
        }
        let recommendation_score = self.score(total_benefit, cost);
        let recommendation = Recommendation::from_score(recommendation_score);

        let swing = self.config.sensitivity_swing;
        let mut sensitivity = Vec::with_capacity(4);
        for sign in [-1.0, 1.0] {
            sensitivity.push(SensitivityEntry {
                parameter: SensitivityParameter::PlanCost,
                variation_percent: sign * swing * 100.0,
                recommendation_score: self.score(total_benefit, cost * (1.0 + sign * swing)),
            });
        }
        for sign in [-1.0, 1.0] {
            sensitivity.push(SensitivityEntry {
                parameter: SensitivityParameter::Benefit,
                variation_percent: sign * swing * 100.0,
                recommendation_score: self.score(total_benefit * (1.0 + sign * swing), cost),
            });
        }

        let mut recommendations = vec![recommendation.message().to_string()];
        if let Some(best) = scenarios
            .iter()
            .filter(|s| s.benefit > 0.0)
            .max_by(|a, b| a.benefit.total_cmp(&b.benefit))
        {
            recommendations.push(format!("Largest gains expected in {} workloads", best.name));
        }
        let fragile = sensitivity
            .iter()
            .any(|s| Recommendation::from_score(s.recommendation_score) != recommendation);
        if fragile {
            recommendations.push(format!(
                "Recommendation changes within ±{:.0}% of cost or benefit; compare prices first",
                swing * 100.0
            ));
        }

        let risk_factors = risk_factors(plan, input.constraints, input.roi, input.timeframe_months);

        log::debug!(
            "plan={} stage={} total_benefit={:.2} score={:.1}",
            plan.id,
            Stage::CostBenefit,
            total_benefit,
            recommendation_score
        );

        Ok(CostBenefitAnalysis {
            scenarios,
            total_benefit,
            cost_effectiveness,
            recommendation_score,
            recommendation,
            sensitivity,
            recommendations,
            risk_factors,
            flags,
        })
    }
}

fn risk_factors(
    plan: &UpgradePlan,
    constraints: Option<&Constraints>,
    roi: Option<&RoiAnalysis>,
    timeframe_months: u32,
) -> Vec<String> {
    let mut risks = Vec::new();
    if let Some(c) = constraints {
        if let Some(budget) = c.budget_ceiling {
            if plan.total_cost > budget {
                risks.push(format!(
                    "Plan cost {:.2} exceeds budget ceiling {:.2}",
                    plan.total_cost, budget
                ));
            }
        }
        for category in plan.replaced_categories() {
            if c.must_keep.contains(&category) {
                risks.push(format!("Plan replaces {} which must be kept", category));
            }
        }
    }
    if let Some(r) = roi {
        match r.payback_months {
            Some(p) if p > timeframe_months as f64 => risks.push(format!(
                "Payback of {:.1} months exceeds the {}-month timeframe",
                p, timeframe_months
            )),
            None => risks.push("Upgrade does not pay back financially".into()),
            _ => {}
        }
    }
    for phase in plan.phases.iter().filter(|p| p.data_loss_risk) {
        risks.push(format!("Phase '{}' carries a data-loss risk; back up first", phase.name));
    }
    risks.extend(plan.risks.iter().map(|r| r.description.clone()));
    risks
}
