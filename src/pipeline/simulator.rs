//! Upgrade simulation orchestrator

use log::{debug, error, info, warn};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::result::{DefaultedStage, FullSimulationResult, SimulationResult};
use super::state::{ListenerId, PipelineStatus, ProgressCallback, RunGuard, StatusTracker};
use super::{SnapshotAnalyzer, Stage, StageOutcome};
use crate::benchmark::{compare_results, stage_rng, BenchmarkCategory, BenchmarkResult, BenchmarkSimulator};
use crate::cache::{CacheKey, CacheStats, SimulationCache};
use crate::catalog::{BuiltinCatalog, PartCatalog};
use crate::comparison::{ComparisonResult, PerformanceComparator};
use crate::config::SimulatorConfig;
use crate::cost_benefit::{CostBenefitAnalysis, CostBenefitAnalyzer, CostBenefitInput};
use crate::error::{Result, SimError};
use crate::estimator::{calculate_improvement, clamp_percent, BaselineEstimator, CategoryScores, UpgradeEstimator};
use crate::export::{self, ExportFormat};
use crate::model::{ConfigurationSnapshot, UpgradePlan, UsageScenario, Workload};
use crate::normalizer::{validate_plan, validate_scenarios, validate_snapshot, Normalizer};
use crate::power::{PowerAnalysis, PowerAnalyzer};
use crate::roi::{RoiAnalysis, RoiCalculator};
use crate::thermal::{ThermalAnalyzer, ThermalResult};

/// A fatal stage failure
type StageFailure = (Stage, SimError);

/// Upgrade simulation engine
///
/// Owns its caches and run state; independent instances share nothing.
pub struct UpgradeSimulator {
    config: SimulatorConfig,
    catalog: Arc<dyn PartCatalog>,
    normalizer: Normalizer,
    power: Arc<dyn SnapshotAnalyzer<PowerAnalysis>>,
    thermal: Arc<dyn SnapshotAnalyzer<ThermalResult>>,
    comparison: Arc<dyn SnapshotAnalyzer<ComparisonResult>>,
    benchmarks: BenchmarkSimulator,
    roi: RoiCalculator,
    cost_benefit: CostBenefitAnalyzer,
    simulations: SimulationCache<SimulationResult>,
    full_results: SimulationCache<FullSimulationResult>,
    tracker: StatusTracker,
    last_full: RwLock<Option<FullSimulationResult>>,
}

impl Default for UpgradeSimulator {
    fn default() -> Self {
        Self::build(SimulatorConfig::default(), Arc::new(BuiltinCatalog))
    }
}

impl UpgradeSimulator {
    /// Create a simulator after validating `config`.
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        Self::with_catalog(config, Arc::new(BuiltinCatalog))
    }

    pub fn with_catalog(config: SimulatorConfig, catalog: Arc<dyn PartCatalog>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, catalog))
    }

    fn build(config: SimulatorConfig, catalog: Arc<dyn PartCatalog>) -> Self {
        Self {
            power: Arc::new(PowerAnalyzer::new(catalog.clone(), config.pricing.clone())),
            thermal: Arc::new(ThermalAnalyzer::new(catalog.clone(), config.thermal.clone())),
            comparison: Arc::new(PerformanceComparator::new(catalog.clone(), config.clone())),
            benchmarks: BenchmarkSimulator::new(config.benchmark.clone()),
            roi: RoiCalculator::new(config.roi.clone(), config.pricing.clone()),
            cost_benefit: CostBenefitAnalyzer::new(config.cost_benefit.clone(), config.weights),
            normalizer: Normalizer::default(),
            simulations: SimulationCache::new(),
            full_results: SimulationCache::new(),
            tracker: StatusTracker::new(),
            last_full: RwLock::new(None),
            catalog,
            config,
        }
    }

    pub fn with_power_analyzer(mut self, analyzer: Arc<dyn SnapshotAnalyzer<PowerAnalysis>>) -> Self {
        self.power = analyzer;
        self
    }

    pub fn with_thermal_analyzer(
        mut self,
        analyzer: Arc<dyn SnapshotAnalyzer<ThermalResult>>,
    ) -> Self {
        self.thermal = analyzer;
        self
    }

    pub fn with_comparison_analyzer(
        mut self,
        analyzer: Arc<dyn SnapshotAnalyzer<ComparisonResult>>,
    ) -> Self {
        self.comparison = analyzer;
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    // ────────────────────────────────────────────────────────────────
    // Basic pipeline
    // ────────────────────────────────────────────────────────────────

    /// Baseline, upgrade and improvement for one (plan, configuration) pair.
    ///
    /// Results are cached per pair and returned verbatim on repeat calls.
    pub async fn run_simulation(
        &self,
        plan: &UpgradePlan,
        configuration: &ConfigurationSnapshot,
    ) -> Result<SimulationResult> {
        validate_plan(plan)?;
        validate_snapshot(configuration)?;
        let mut run = self.tracker.begin(&plan.id, &configuration.id)?;

        let key = CacheKey::new(&plan.id, &configuration.id);
        if let Some(cached) = self.simulations.get(&key) {
            info!("plan={} config={} simulation served from cache", plan.id, configuration.id);
            run.complete(&cached);
            return Ok(cached);
        }

        match self.basic_simulation(plan, configuration, &mut run) {
            Ok(result) => {
                self.simulations.put(key, result.clone());
                run.complete(&result);
                Ok(result)
            }
            Err((stage, err)) => {
                error!(
                    "plan={} config={} stage={} simulation failed: {}",
                    plan.id, configuration.id, stage, err
                );
                run.fail(Some(stage), &err);
                Err(err)
            }
        }
    }

    fn basic_simulation(
        &self,
        plan: &UpgradePlan,
        configuration: &ConfigurationSnapshot,
        run: &mut RunGuard<'_>,
    ) -> std::result::Result<SimulationResult, StageFailure> {
        run.enter(Stage::Baseline);
        let baseline = BaselineEstimator::new(
            self.catalog.as_ref(),
            self.config.scoring.default_category_score,
        )
        .estimate(configuration)
        .map_err(|e| (Stage::Baseline, e))?;
        debug!(
            "plan={} config={} stage={} overall={:.1}",
            plan.id,
            configuration.id,
            Stage::Baseline,
            baseline.overall
        );

        run.enter(Stage::Upgrade);
        let upgraded = UpgradeEstimator::new(self.config.weights).estimate(&baseline, plan);

        run.enter(Stage::Improvement);
        let improvement = calculate_improvement(&baseline, &upgraded, plan.confidence);
        let replaced = plan.replaced_categories();
        let resolved_bottlenecks = configuration
            .diagnosis
            .iter()
            .flat_map(|d| d.bottlenecks.iter())
            .filter(|b| replaced.contains(&b.category))
            .map(|b| b.id.clone())
            .collect();
        let monthly_gain = finite_or_zero(plan.roi.monthly_benefit);
        run.reached(Stage::Improvement);

        Ok(SimulationResult {
            plan_id: plan.id.clone(),
            configuration_id: configuration.id.clone(),
            baseline,
            upgraded,
            overall_improvement: improvement.overall,
            category_improvements: improvement.per_category,
            resolved_bottlenecks,
            roi_percent: finite_or_zero(plan.roi.roi_percent),
            payback_months: finite_or_zero(plan.roi.payback_months),
            monthly_gain,
            annual_gain: monthly_gain * 12.0,
            confidence: improvement.confidence,
            risk_factors: plan.risks.iter().map(|r| r.description.clone()).collect(),
            satisfaction: improvement.satisfaction,
        })
    }

    // ────────────────────────────────────────────────────────────────
    // Full pipeline
    // ────────────────────────────────────────────────────────────────

    /// Every stage for one (plan, configuration, scenarios) triple.
    ///
    /// `None` or an empty slice selects the built-in gaming and productivity
    /// scenarios.
    pub async fn run_full_simulation(
        &self,
        plan: &UpgradePlan,
        configuration: &ConfigurationSnapshot,
        scenarios: Option<&[UsageScenario]>,
    ) -> Result<FullSimulationResult> {
        validate_plan(plan)?;
        validate_snapshot(configuration)?;
        let scenarios = match scenarios {
            Some(s) if !s.is_empty() => s.to_vec(),
            _ => UsageScenario::defaults(),
        };
        validate_scenarios(&scenarios)?;
        let mut run = self.tracker.begin(&plan.id, &configuration.id)?;

        let key = CacheKey::new(&plan.id, &configuration.id)
            .with_scenarios(UsageScenario::set_hash(&scenarios));
        if let Some(cached) = self.full_results.get(&key) {
            info!(
                "plan={} config={} full simulation served from cache",
                plan.id, configuration.id
            );
            self.store_last(&cached);
            run.complete(&cached.simulation);
            return Ok(cached);
        }

        info!("plan={} config={} full simulation started", plan.id, configuration.id);
        let started = Instant::now();
        match self.execute(plan, configuration, &scenarios, &mut run).await {
            Ok(mut result) => {
                result.execution_time_ms = started.elapsed().as_millis() as u64;
                info!(
                    "plan={} config={} full simulation completed in {} ms ({} defaulted stage(s))",
                    plan.id,
                    configuration.id,
                    result.execution_time_ms,
                    result.defaulted_stages.len()
                );
                self.simulations.put(
                    CacheKey::new(&plan.id, &configuration.id),
                    result.simulation.clone(),
                );
                self.full_results.put(key, result.clone());
                self.store_last(&result);
                run.complete(&result.simulation);
                Ok(result)
            }
            Err((stage, err)) => {
                error!(
                    "plan={} config={} stage={} full simulation failed: {}",
                    plan.id, configuration.id, stage, err
                );
                run.fail(Some(stage), &err);
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        plan: &UpgradePlan,
        configuration: &ConfigurationSnapshot,
        scenarios: &[UsageScenario],
        run: &mut RunGuard<'_>,
    ) -> std::result::Result<FullSimulationResult, StageFailure> {
        let simulation = match self.simulations.get(&CacheKey::new(&plan.id, &configuration.id)) {
            Some(cached) => {
                run.reached(Stage::Improvement);
                cached
            }
            None => self.basic_simulation(plan, configuration, run)?,
        };
        let projected = self
            .normalizer
            .project(configuration, plan, self.config.scoring.default_category_score)
            .map_err(|e| (Stage::Upgrade, e))?;

        run.enter(Stage::Benchmark);
        let categories = benchmark_categories(scenarios);
        let mut rng = stage_rng(
            self.config.benchmark.seed,
            "benchmark",
            run_discriminator(plan, configuration),
        );
        let benchmarks: Vec<BenchmarkResult> =
            self.benchmarks
                .simulate_for_plan(&mut rng, plan, &self.config.weights, &categories);
        let benchmark_comparison = compare_results(&benchmarks);
        run.reached(Stage::Benchmark);

        let mut defaulted = Vec::new();
        let outcome = self
            .guarded(self.power.as_ref(), plan, configuration, &projected, run)
            .await;
        let power_genuine = !outcome.is_defaulted();
        let power = settle(Stage::Power, outcome, &mut defaulted)?;
        let outcome = self
            .guarded(self.thermal.as_ref(), plan, configuration, &projected, run)
            .await;
        let thermal = settle(Stage::Thermal, outcome, &mut defaulted)?;
        let outcome = self
            .guarded(self.comparison.as_ref(), plan, configuration, &projected, run)
            .await;
        let comparison = settle(Stage::Comparison, outcome, &mut defaulted)?;

        run.enter(Stage::Roi);
        let timeframe = configuration
            .constraints
            .timeframe_months
            .unwrap_or(self.config.roi.default_timeframe_months);
        let roi = self
            .roi
            .calculate(
                plan,
                timeframe,
                Some(&configuration.usage),
                power_genuine.then_some(&power),
            )
            .map_err(|e| (Stage::Roi, e))?;
        run.reached(Stage::Roi);

        run.enter(Stage::CostBenefit);
        let cost_benefit = self
            .cost_benefit
            .analyze(&CostBenefitInput {
                plan,
                scenarios,
                baseline: simulation.baseline,
                timeframe_months: timeframe,
                constraints: Some(&configuration.constraints),
                roi: Some(&roi),
            })
            .map_err(|e| (Stage::CostBenefit, e))?;
        run.reached(Stage::CostBenefit);

        run.enter(Stage::Assembly);
        let stage_count = Stage::ANALYSES.len() as f64;
        let genuine_stage_percent = (stage_count - defaulted.len() as f64) / stage_count * 100.0;
        let base_confidence = (simulation.confidence + benchmark_comparison.confidence) / 2.0;
        let overall_confidence = clamp_percent(
            base_confidence * self.config.defaulted_stage_penalty.powi(defaulted.len() as i32),
        );

        Ok(FullSimulationResult {
            simulation,
            benchmarks,
            benchmark_comparison,
            power,
            thermal,
            comparison,
            roi,
            cost_benefit,
            execution_time_ms: 0,
            overall_confidence,
            completeness: 100.0,
            genuine_stage_percent,
            defaulted_stages: defaulted,
            generated_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Run one isolated analyzer, substituting its fallback on failure.
    async fn guarded<T>(
        &self,
        analyzer: &dyn SnapshotAnalyzer<T>,
        plan: &UpgradePlan,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
        run: &mut RunGuard<'_>,
    ) -> StageOutcome<T> {
        let stage = analyzer.stage();
        run.enter(stage);
        let outcome = match analyzer.analyze(before, after).await {
            Ok(value) => {
                debug!("plan={} config={} stage={} ok", plan.id, before.id, stage);
                StageOutcome::Success(value)
            }
            Err(err) if stage.has_fallback() => {
                warn!(
                    "plan={} config={} stage={} defaulted: {}",
                    plan.id, before.id, stage, err
                );
                StageOutcome::Defaulted {
                    value: analyzer.fallback(),
                    cause: err.to_string(),
                }
            }
            Err(err) => StageOutcome::Fatal(err),
        };
        if !matches!(outcome, StageOutcome::Fatal(_)) {
            run.reached(stage);
        }
        outcome
    }

    fn store_last(&self, result: &FullSimulationResult) {
        if let Ok(mut last) = self.last_full.write() {
            *last = Some(result.clone());
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Stand-alone analyses
    // ────────────────────────────────────────────────────────────────

    /// Reference synthetic benchmarks, independent of any plan.
    pub fn run_benchmark_simulation(&self, categories: &[BenchmarkCategory]) -> Vec<BenchmarkResult> {
        self.benchmarks.simulate(categories)
    }

    pub async fn analyze_power_efficiency(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<PowerAnalysis> {
        self.power.analyze(before, after).await
    }

    pub async fn analyze_thermal_profile(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<ThermalResult> {
        self.thermal.analyze(before, after).await
    }

    pub async fn analyze_performance(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<ComparisonResult> {
        self.comparison.analyze(before, after).await
    }

    /// ROI from the plan alone; energy savings come from the plan's stated
    /// power-efficiency gain.
    pub fn calculate_roi(&self, plan: &UpgradePlan, timeframe_months: u32) -> Result<RoiAnalysis> {
        validate_plan(plan)?;
        self.roi.calculate(plan, timeframe_months, None, None)
    }

    /// Cost-benefit of a plan against a neutral baseline build.
    ///
    /// An empty `scenarios` slice selects the built-in scenarios.
    pub fn perform_cost_benefit_analysis(
        &self,
        plan: &UpgradePlan,
        scenarios: &[UsageScenario],
    ) -> Result<CostBenefitAnalysis> {
        validate_plan(plan)?;
        validate_scenarios(scenarios)?;
        let defaults;
        let scenarios = if scenarios.is_empty() {
            defaults = UsageScenario::defaults();
            &defaults[..]
        } else {
            scenarios
        };
        let timeframe = self.config.roi.default_timeframe_months;
        let roi = self.roi.calculate(plan, timeframe, None, None)?;
        self.cost_benefit.analyze(&CostBenefitInput {
            plan,
            scenarios,
            baseline: CategoryScores::uniform(self.config.scoring.default_category_score),
            timeframe_months: timeframe,
            constraints: None,
            roi: Some(&roi),
        })
    }

    /// Serialize the latest full result.
    pub fn export_results(&self, format: ExportFormat) -> Result<String> {
        let last = self
            .last_full
            .read()
            .map_err(|_| SimError::Validation("result store unavailable".into()))?;
        match last.as_ref() {
            Some(result) => export::export(result, format),
            None => Err(SimError::Validation(
                "no simulation results to export; run a full simulation first".into(),
            )),
        }
    }

    // ────────────────────────────────────────────────────────────────
    // State
    // ────────────────────────────────────────────────────────────────

    pub fn status(&self) -> PipelineStatus {
        self.tracker.snapshot()
    }

    pub fn last_result(&self) -> Option<FullSimulationResult> {
        self.last_full.read().ok().and_then(|r| r.clone())
    }

    pub fn subscribe(&self, callback: ProgressCallback) -> ListenerId {
        self.tracker.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.tracker.unsubscribe(id)
    }

    /// Combined counters of the basic and full result caches
    pub fn cache_stats(&self) -> CacheStats {
        self.simulations.stats().merge(self.full_results.stats())
    }

    /// Clear both caches, the stored results and the status.
    pub fn reset(&self) {
        self.simulations.clear();
        self.full_results.clear();
        if let Ok(mut last) = self.last_full.write() {
            *last = None;
        }
        self.tracker.reset();
        info!("simulator reset");
    }
}

fn settle<T>(
    stage: Stage,
    outcome: StageOutcome<T>,
    defaulted: &mut Vec<DefaultedStage>,
) -> std::result::Result<T, StageFailure> {
    match outcome {
        StageOutcome::Success(value) => Ok(value),
        StageOutcome::Defaulted { value, cause } => {
            defaulted.push(DefaultedStage { stage, cause });
            Ok(value)
        }
        StageOutcome::Fatal(err) => Err((stage, err)),
    }
}

/// Benchmark suites matching the scenario workloads
fn benchmark_categories(scenarios: &[UsageScenario]) -> Vec<BenchmarkCategory> {
    let mut categories = Vec::new();
    for scenario in scenarios {
        let category = match scenario.scenario_type {
            Workload::Gaming => BenchmarkCategory::Gaming,
            Workload::ContentCreation => BenchmarkCategory::ContentCreation,
            Workload::Development => BenchmarkCategory::Compute,
            Workload::Productivity | Workload::General => BenchmarkCategory::Productivity,
        };
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}

fn run_discriminator(plan: &UpgradePlan, configuration: &ConfigurationSnapshot) -> u64 {
    let mut hasher = DefaultHasher::new();
    plan.id.hash(&mut hasher);
    configuration.id.hash(&mut hasher);
    hasher.finish()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{gaming_build, gpu_plan};
    use crate::model::{ComponentCategory, ComponentSlot, Part};
    use crate::pipeline::RunState;
    use crate::power::EfficiencyChange;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FailingPower;

    #[async_trait]
    impl SnapshotAnalyzer<PowerAnalysis> for FailingPower {
        fn stage(&self) -> Stage {
            Stage::Power
        }

        async fn analyze(
            &self,
            _before: &ConfigurationSnapshot,
            _after: &ConfigurationSnapshot,
        ) -> Result<PowerAnalysis> {
            Err(SimError::malformed("PSU", "rated wattage is zero"))
        }

        fn fallback(&self) -> PowerAnalysis {
            PowerAnalysis::fallback()
        }
    }

    struct FailingThermal;

    #[async_trait]
    impl SnapshotAnalyzer<ThermalResult> for FailingThermal {
        fn stage(&self) -> Stage {
            Stage::Thermal
        }

        async fn analyze(
            &self,
            _before: &ConfigurationSnapshot,
            _after: &ConfigurationSnapshot,
        ) -> Result<ThermalResult> {
            Err(SimError::malformed("Cooler", "no thermal rating"))
        }

        fn fallback(&self) -> ThermalResult {
            ThermalResult::fallback(&SimulatorConfig::default().thermal)
        }
    }

    struct FailingComparison;

    #[async_trait]
    impl SnapshotAnalyzer<ComparisonResult> for FailingComparison {
        fn stage(&self) -> Stage {
            Stage::Comparison
        }

        async fn analyze(
            &self,
            _before: &ConfigurationSnapshot,
            _after: &ConfigurationSnapshot,
        ) -> Result<ComparisonResult> {
            Err(SimError::stage(Stage::Comparison, "scores unavailable"))
        }

        fn fallback(&self) -> ComparisonResult {
            ComparisonResult::fallback(50.0)
        }
    }

    struct SlowPower(PowerAnalyzer);

    #[async_trait]
    impl SnapshotAnalyzer<PowerAnalysis> for SlowPower {
        fn stage(&self) -> Stage {
            Stage::Power
        }

        async fn analyze(
            &self,
            before: &ConfigurationSnapshot,
            after: &ConfigurationSnapshot,
        ) -> Result<PowerAnalysis> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.0.analyze(before, after)
        }

        fn fallback(&self) -> PowerAnalysis {
            PowerAnalysis::fallback()
        }
    }

    #[tokio::test]
    async fn test_simulation_is_cached_verbatim() {
        let sim = UpgradeSimulator::default();
        let (plan, cfg) = (gpu_plan(), gaming_build());
        let first = sim.run_simulation(&plan, &cfg).await.unwrap();
        let second = sim.run_simulation(&plan, &cfg).await.unwrap();
        assert_eq!(first, second);
        let stats = sim.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_simulation_fields() {
        let sim = UpgradeSimulator::default();
        let result = sim.run_simulation(&gpu_plan(), &gaming_build()).await.unwrap();
        assert_eq!(result.resolved_bottlenecks, vec!["bn-gpu".to_string()]);
        assert!((result.confidence - 82.0).abs() < 1e-9);
        assert!((result.annual_gain - 32.0 * 12.0).abs() < 1e-9);
        assert!(result.overall_improvement > 0.0);
        assert_eq!(sim.status().state, RunState::Completed);
    }

    #[tokio::test]
    async fn test_full_run_progress_is_monotonic() {
        let sim = UpgradeSimulator::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        sim.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.progress)));

        let result = sim
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        let progress = seen.lock().unwrap().clone();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));
        assert!(progress.contains(&15) && progress.contains(&95));
        assert_eq!(result.completeness, 100.0);
        assert_eq!(result.genuine_stage_percent, 100.0);
        assert!(result.defaulted_stages.is_empty());
        assert_eq!(sim.status().progress, 100);
    }

    #[tokio::test]
    async fn test_power_failure_is_defaulted() {
        let genuine = UpgradeSimulator::default()
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();

        let sim = UpgradeSimulator::default().with_power_analyzer(Arc::new(FailingPower));
        let result = sim
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        assert_eq!(result.completeness, 100.0);
        assert_eq!(result.power.efficiency, EfficiencyChange::Unchanged);
        assert!(result.is_defaulted(Stage::Power));
        assert!(result.genuine_stage_percent < 100.0);
        assert!(result.overall_confidence < genuine.overall_confidence);
        assert_eq!(sim.status().state, RunState::Completed);
    }

    #[tokio::test]
    async fn test_comparison_scores_projected_parts() {
        let result = UpgradeSimulator::default()
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        let performance = result.comparison.performance;
        assert_eq!(performance.before, result.simulation.baseline);
        // RTX 4070 inherits 45 × (1 + 60%)
        assert!((performance.after.graphics - 72.0).abs() < 1e-9);
        // aggregate 40% × graphics 0.6 on top of 45
        assert!((result.simulation.upgraded.graphics - 69.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_thermal_failure_is_defaulted() {
        let sim = UpgradeSimulator::default().with_thermal_analyzer(Arc::new(FailingThermal));
        let result = sim
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        assert_eq!(result.completeness, 100.0);
        assert!(result.is_defaulted(Stage::Thermal));
        assert!(!result.is_defaulted(Stage::Power));
        assert_eq!(result.thermal, ThermalResult::fallback(&sim.config().thermal));
        assert_eq!(sim.status().state, RunState::Completed);
    }

    #[tokio::test]
    async fn test_comparison_failure_is_defaulted() {
        let sim = UpgradeSimulator::default().with_comparison_analyzer(Arc::new(FailingComparison));
        let result = sim
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        assert_eq!(result.completeness, 100.0);
        assert!(result.is_defaulted(Stage::Comparison));
        assert_eq!(result.defaulted_stages.len(), 1);
        assert_eq!(sim.status().progress, 100);
    }

    #[tokio::test]
    async fn test_baseline_failure_is_fatal() {
        let sim = UpgradeSimulator::default();
        let mut cfg = gaming_build();
        cfg.components.insert(
            ComponentCategory::Cpu,
            ComponentSlot::Installed(
                Part::new("c", "Broken", ComponentCategory::Cpu).with_score(f64::NAN),
            ),
        );
        let err = sim.run_full_simulation(&gpu_plan(), &cfg, None).await.unwrap_err();
        assert!(matches!(err, SimError::MalformedComponent { .. }));
        let status = sim.status();
        assert_eq!(status.state, RunState::Error);
        assert_eq!(status.progress, 0);
        assert_eq!(status.current_stage, Some(Stage::Baseline));
        assert!(status.last_error.is_some());
        assert!(!status.running);
    }

    #[tokio::test]
    async fn test_roi_failure_keeps_last_checkpoint() {
        let sim = UpgradeSimulator::default();
        let mut plan = gpu_plan();
        // deferred-replacement saving becomes infinite
        plan.expected_improvement.longevity_extension_months = f64::INFINITY;
        let err = sim.run_full_simulation(&plan, &gaming_build(), None).await.unwrap_err();
        assert!(matches!(err, SimError::Stage { stage: Stage::Roi, .. }));
        let status = sim.status();
        assert_eq!(status.state, RunState::Error);
        assert_eq!(status.progress, 80);
        assert_eq!(status.current_stage, Some(Stage::Roi));
    }

    #[tokio::test]
    async fn test_second_run_for_plan_in_flight_rejected() {
        let slow = SlowPower(PowerAnalyzer::new(
            Arc::new(BuiltinCatalog),
            SimulatorConfig::default().pricing,
        ));
        let sim = UpgradeSimulator::default().with_power_analyzer(Arc::new(slow));
        let (plan, cfg) = (gpu_plan(), gaming_build());
        let (first, second) = tokio::join!(
            sim.run_full_simulation(&plan, &cfg, None),
            sim.run_full_simulation(&plan, &cfg, None)
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(SimError::AlreadyRunning(ref id)) if id == "plan-gpu"));
        // released once the first run finished
        assert!(sim.run_full_simulation(&plan, &cfg, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_full_result_cached_per_scenario_set() {
        let sim = UpgradeSimulator::default();
        let (plan, cfg) = (gpu_plan(), gaming_build());
        let first = sim.run_full_simulation(&plan, &cfg, None).await.unwrap();
        let again = sim.run_full_simulation(&plan, &cfg, Some(&[][..])).await.unwrap();
        assert_eq!(first, again);

        let mut scenarios = UsageScenario::defaults();
        scenarios.truncate(1);
        let gaming_only = sim
            .run_full_simulation(&plan, &cfg, Some(scenarios.as_slice()))
            .await
            .unwrap();
        assert_eq!(gaming_only.cost_benefit.scenarios.len(), 1);
        assert_eq!(gaming_only.benchmarks.len(), 1);
    }

    #[tokio::test]
    async fn test_input_errors_raised_before_stages() {
        let sim = UpgradeSimulator::default();
        let mut plan = gpu_plan();
        plan.id = String::new();
        let err = sim.run_full_simulation(&plan, &gaming_build(), None).await.unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(sim.status().state, RunState::Idle);
    }

    #[tokio::test]
    async fn test_zero_timeframe_rejected_before_stages() {
        let sim = UpgradeSimulator::default();
        let mut cfg = gaming_build();
        cfg.constraints.timeframe_months = Some(0);
        let err = sim.run_full_simulation(&gpu_plan(), &cfg, None).await.unwrap_err();
        assert!(matches!(err, SimError::InvalidInput(_)));
        let status = sim.status();
        assert_eq!(status.state, RunState::Idle);
        assert_eq!(status.progress, 0);
    }

    #[tokio::test]
    async fn test_scenario_weight_rejected_before_stages() {
        let sim = UpgradeSimulator::default();
        let mut scenarios = UsageScenario::defaults();
        scenarios[1].weight = 150.0;
        let err = sim
            .run_full_simulation(&gpu_plan(), &gaming_build(), Some(scenarios.as_slice()))
            .await
            .unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(sim.status().state, RunState::Idle);
        assert!(sim.perform_cost_benefit_analysis(&gpu_plan(), &scenarios).is_err());
    }

    #[tokio::test]
    async fn test_huge_gain_rejected_before_stages() {
        let sim = UpgradeSimulator::default();
        let mut plan = gpu_plan();
        plan.expected_improvement.performance_gain = 1e308;
        let err = sim.run_simulation(&plan, &gaming_build()).await.unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(sim.status().state, RunState::Idle);
    }

    #[tokio::test]
    async fn test_benchmark_confidence_within_configured_range() {
        let sim = UpgradeSimulator::default();
        let mut plan = gpu_plan();
        plan.confidence = 0.3;
        let result = sim
            .run_full_simulation(&plan, &gaming_build(), None)
            .await
            .unwrap();
        let [lo, hi] = sim.config().benchmark.confidence_range;
        assert!(!result.benchmarks.is_empty());
        for b in &result.benchmarks {
            assert!((lo..hi).contains(&b.confidence), "{} {}", b.category, b.confidence);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimulatorConfig::default();
        config.benchmark.confidence_range = [95.0, 85.0];
        assert!(matches!(
            UpgradeSimulator::new(config),
            Err(SimError::Configuration(_))
        ));

        let mut config = SimulatorConfig::default();
        config.pricing.psu_efficiency = 0.0;
        assert!(UpgradeSimulator::with_catalog(config, Arc::new(BuiltinCatalog)).is_err());

        assert!(UpgradeSimulator::new(SimulatorConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_export_and_reset() {
        let sim = UpgradeSimulator::default();
        assert!(matches!(
            sim.export_results(ExportFormat::Json),
            Err(SimError::Validation(_))
        ));
        sim.run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        let json = sim.export_results(ExportFormat::Json).unwrap();
        assert!(json.contains("plan-gpu"));

        sim.reset();
        assert_eq!(sim.cache_stats(), CacheStats::default());
        assert!(sim.last_result().is_none());
        assert_eq!(sim.status().state, RunState::Idle);
    }

    #[test]
    fn test_stand_alone_analyses() {
        let sim = UpgradeSimulator::default();
        let roi = sim.calculate_roi(&gpu_plan(), 24).unwrap();
        assert!(roi.roi_percent.is_finite());
        let cb = sim.perform_cost_benefit_analysis(&gpu_plan(), &[]).unwrap();
        assert!((0.0..=100.0).contains(&cb.recommendation_score));
        let bench = sim.run_benchmark_simulation(&[BenchmarkCategory::Gaming]);
        assert_eq!(bench.len(), 1);
    }

    #[test]
    fn test_benchmark_categories_follow_scenarios() {
        let categories = benchmark_categories(&UsageScenario::defaults());
        assert_eq!(
            categories,
            vec![BenchmarkCategory::Gaming, BenchmarkCategory::Productivity]
        );
    }
}
