//! Synthetic benchmark simulator
//!
//! Produces before/after benchmark records per requested category and
//! aggregates them into a [`BenchmarkComparison`] with a five-level
//! significance scale.
//!
//! All randomness comes from a seeded [`ChaCha8Rng`], so identical seeds give
//! identical records. The synthetic draws are a stand-in: a production
//! deployment should feed measured benchmark or telemetry data instead.
//!
//! # Examples
//!
//! ```
//! use upsimlib::benchmark::{BenchmarkCategory, BenchmarkSimulator};
//! use upsimlib::config::BenchmarkConfig;
//!
//! let sim = BenchmarkSimulator::new(BenchmarkConfig::default());
//! let results = sim.simulate(&[BenchmarkCategory::Gaming, BenchmarkCategory::Storage]);
//! let comparison = sim.compare(&results);
//! println!("overall: {:+.1}%", comparison.overall_improvement);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::{BenchmarkConfig, GainWeights};
use crate::model::UpgradePlan;

/// Benchmark suite category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkCategory {
    Gaming,
    Productivity,
    ContentCreation,
    Compute,
    Memory,
    Storage,
    Custom(String),
}

impl BenchmarkCategory {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "gaming" => Self::Gaming,
            "productivity" => Self::Productivity,
            "content_creation" | "rendering" => Self::ContentCreation,
            "compute" | "cpu" => Self::Compute,
            "memory" | "ram" => Self::Memory,
            "storage" | "disk" => Self::Storage,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Share of the plan's aggregate gain visible in this suite
    pub fn gain_coefficient(&self, weights: &GainWeights) -> f64 {
        match self {
            Self::Gaming => weights.graphics,
            Self::Productivity => weights.compute,
            Self::ContentCreation => (weights.compute + weights.graphics) / 2.0,
            Self::Compute => weights.compute,
            Self::Memory => weights.memory,
            Self::Storage => weights.storage,
            Self::Custom(_) => weights.mean(),
        }
    }
}

impl std::fmt::Display for BenchmarkCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gaming => write!(f, "gaming"),
            Self::Productivity => write!(f, "productivity"),
            Self::ContentCreation => write!(f, "content_creation"),
            Self::Compute => write!(f, "compute"),
            Self::Memory => write!(f, "memory"),
            Self::Storage => write!(f, "storage"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// How a record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Methodology {
    /// Independent before/after draws from the reference ranges
    SyntheticReference,
    /// Seeded before draw, after derived from the plan's gain
    PlanProjected,
}

/// One before/after benchmark record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub category: BenchmarkCategory,
    pub before_score: f64,
    pub after_score: f64,
    /// 0-100
    pub confidence: f64,
    pub methodology: Methodology,
}

/// Five-level significance scale for an improvement percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    Negligible,
    Minor,
    Moderate,
    Major,
    Dramatic,
}

impl Significance {
    /// `<2` negligible, `2..=8` minor, `8..=20` moderate, `20..=40` major, `>40` dramatic
    pub fn classify(improvement_percent: f64) -> Self {
        match improvement_percent {
            x if x.is_nan() || x < 2.0 => Significance::Negligible,
            x if x <= 8.0 => Significance::Minor,
            x if x <= 20.0 => Significance::Moderate,
            x if x <= 40.0 => Significance::Major,
            _ => Significance::Dramatic,
        }
    }
}

impl std::fmt::Display for Significance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Negligible => write!(f, "negligible"),
            Self::Minor => write!(f, "minor"),
            Self::Moderate => write!(f, "moderate"),
            Self::Major => write!(f, "major"),
            Self::Dramatic => write!(f, "dramatic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub category: BenchmarkCategory,
    pub before_score: f64,
    pub after_score: f64,
    pub improvement_percent: f64,
    pub significance: Significance,
}

/// Aggregate of several benchmark records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub categories: Vec<CategoryComparison>,
    /// Simple mean of the per-category improvements (%)
    pub overall_improvement: f64,
    /// Mean confidence, 0 when there is nothing to compare
    pub confidence: f64,
}

/// Improvement of `after` over `before` in percent; 0 for a non-positive baseline.
pub fn improvement_percent(before: f64, after: f64) -> f64 {
    if before <= 0.0 || !before.is_finite() || !after.is_finite() {
        return 0.0;
    }
    (after - before) * 100.0 / before
}

/// Deterministic generator for one pipeline stage.
///
/// Each stage salts the base seed with its own name and a caller supplied
/// discriminator, so stages never share a random stream.
pub fn stage_rng(seed: u64, stage: &str, discriminator: u64) -> ChaCha8Rng {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    stage.hash(&mut hasher);
    discriminator.hash(&mut hasher);
    ChaCha8Rng::seed_from_u64(hasher.finish())
}

/// Synthetic benchmark generator
#[derive(Debug, Clone)]
pub struct BenchmarkSimulator {
    config: BenchmarkConfig,
}

impl BenchmarkSimulator {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Reference model: independent before/after draws per category.
    pub fn simulate(&self, categories: &[BenchmarkCategory]) -> Vec<BenchmarkResult> {
        let mut rng = stage_rng(self.config.seed, "benchmark", category_discriminator(categories));
        self.simulate_with(&mut rng, categories)
    }

    pub fn simulate_with<R: Rng>(
        &self,
        rng: &mut R,
        categories: &[BenchmarkCategory],
    ) -> Vec<BenchmarkResult> {
        let [before_lo, before_hi] = self.config.before_range;
        let [after_lo, after_hi] = self.config.after_range;
        categories
            .iter()
            .map(|category| BenchmarkResult {
                category: category.clone(),
                before_score: rng.gen_range(before_lo..before_hi),
                after_score: rng.gen_range(after_lo..after_hi),
                confidence: self.draw_confidence(rng),
                methodology: Methodology::SyntheticReference,
            })
            .collect()
    }

    /// Plan-aware model: `after = before × (1 + gain × coefficient / 100)`.
    pub fn simulate_for_plan<R: Rng>(
        &self,
        rng: &mut R,
        plan: &UpgradePlan,
        weights: &GainWeights,
        categories: &[BenchmarkCategory],
    ) -> Vec<BenchmarkResult> {
        let [before_lo, before_hi] = self.config.before_range;
        let gain = plan.expected_improvement.performance_gain;
        categories
            .iter()
            .map(|category| {
                let before = rng.gen_range(before_lo..before_hi);
                let after = before * (1.0 + gain * category.gain_coefficient(weights) / 100.0);
                BenchmarkResult {
                    category: category.clone(),
                    before_score: before,
                    after_score: after,
                    confidence: self.draw_confidence(rng),
                    methodology: Methodology::PlanProjected,
                }
            })
            .collect()
    }

    fn draw_confidence<R: Rng>(&self, rng: &mut R) -> f64 {
        let [lo, hi] = self.config.confidence_range;
        rng.gen_range(lo..hi).clamp(0.0, 100.0)
    }

    /// Aggregate records into a comparison.
    pub fn compare(&self, results: &[BenchmarkResult]) -> BenchmarkComparison {
        compare_results(results)
    }
}

pub fn compare_results(results: &[BenchmarkResult]) -> BenchmarkComparison {
    let categories: Vec<CategoryComparison> = results
        .iter()
        .map(|r| {
            let improvement = improvement_percent(r.before_score, r.after_score);
            CategoryComparison {
                category: r.category.clone(),
                before_score: r.before_score,
                after_score: r.after_score,
                improvement_percent: improvement,
                significance: Significance::classify(improvement),
            }
        })
        .collect();

    if categories.is_empty() {
        return BenchmarkComparison {
            categories,
            overall_improvement: 0.0,
            confidence: 0.0,
        };
    }
    let n = categories.len() as f64;
    let overall = categories.iter().map(|c| c.improvement_percent).sum::<f64>() / n;
    let confidence = results.iter().map(|r| r.confidence).sum::<f64>() / n;
    BenchmarkComparison {
        categories,
        overall_improvement: overall,
        confidence: confidence.clamp(0.0, 100.0),
    }
}

fn category_discriminator(categories: &[BenchmarkCategory]) -> u64 {
    let mut hasher = DefaultHasher::new();
    categories.hash(&mut hasher);
    hasher.finish()
}
