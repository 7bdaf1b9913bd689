//! Pipeline result bundles

use serde::{Deserialize, Serialize};

use super::Stage;
use crate::benchmark::{BenchmarkComparison, BenchmarkResult};
use crate::comparison::ComparisonResult;
use crate::cost_benefit::CostBenefitAnalysis;
use crate::estimator::CategoryScores;
use crate::power::PowerAnalysis;
use crate::roi::RoiAnalysis;
use crate::thermal::ThermalResult;

/// Output of the basic pipeline for one (plan, configuration) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub plan_id: String,
    pub configuration_id: String,
    pub baseline: CategoryScores,
    pub upgraded: CategoryScores,
    pub overall_improvement: f64,
    pub category_improvements: CategoryScores,
    /// Ids of diagnosed bottlenecks whose category the plan replaces
    pub resolved_bottlenecks: Vec<String>,
    pub roi_percent: f64,
    pub payback_months: f64,
    pub monthly_gain: f64,
    pub annual_gain: f64,
    /// 0-100
    pub confidence: f64,
    pub risk_factors: Vec<String>,
    /// 0-100
    pub satisfaction: f64,
}

/// A stage that returned its fallback instead of a computed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultedStage {
    pub stage: Stage,
    pub cause: String,
}

/// Composite result of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullSimulationResult {
    pub simulation: SimulationResult,
    pub benchmarks: Vec<BenchmarkResult>,
    pub benchmark_comparison: BenchmarkComparison,
    pub power: PowerAnalysis,
    pub thermal: ThermalResult,
    pub comparison: ComparisonResult,
    pub roi: RoiAnalysis,
    pub cost_benefit: CostBenefitAnalysis,
    pub execution_time_ms: u64,
    /// 0-100, lowered for each defaulted stage
    pub overall_confidence: f64,
    /// Share of stages that returned a value, genuine or defaulted (%)
    pub completeness: f64,
    /// Share of stages that returned a computed value (%)
    pub genuine_stage_percent: f64,
    pub defaulted_stages: Vec<DefaultedStage>,
    /// RFC 3339 timestamp
    pub generated_at: String,
}

impl FullSimulationResult {
    pub fn plan_id(&self) -> &str {
        &self.simulation.plan_id
    }

    pub fn configuration_id(&self) -> &str {
        &self.simulation.configuration_id
    }

    pub fn is_partially_defaulted(&self) -> bool {
        !self.defaulted_stages.is_empty()
    }

    pub fn is_defaulted(&self, stage: Stage) -> bool {
        self.defaulted_stages.iter().any(|d| d.stage == stage)
    }
}
