//! Simulation pipeline
//!
//! The [`UpgradeSimulator`] runs the stages below in a fixed order for one
//! (plan, configuration) pair. Power, thermal and comparison stages have a
//! safe default and are isolated: a failure there is logged and replaced by
//! the analyzer's fallback. Baseline, ROI and cost-benefit failures end the
//! run in the error state.
//!
//! | Stage        | Progress after completion |
//! |--------------|---------------------------|
//! | improvement  | 15                        |
//! | benchmark    | 30                        |
//! | power        | 50                        |
//! | thermal      | 65                        |
//! | comparison   | 80                        |
//! | roi          | 90                        |
//! | cost-benefit | 95                        |
//! | assembly     | 100                       |

mod result;
mod simulator;
pub mod state;

pub use result::{DefaultedStage, FullSimulationResult, SimulationResult};
pub use simulator::UpgradeSimulator;
pub use state::{ListenerId, PipelineStatus, ProgressEvent, RunState};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::model::ConfigurationSnapshot;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Baseline,
    Upgrade,
    Improvement,
    Benchmark,
    Power,
    Thermal,
    Comparison,
    Roi,
    CostBenefit,
    Assembly,
}

impl Stage {
    /// Analysis stages of a full run, in execution order
    pub const ANALYSES: [Stage; 9] = [
        Stage::Baseline,
        Stage::Upgrade,
        Stage::Improvement,
        Stage::Benchmark,
        Stage::Power,
        Stage::Thermal,
        Stage::Comparison,
        Stage::Roi,
        Stage::CostBenefit,
    ];

    /// Progress reported once this stage has returned
    pub fn checkpoint(&self) -> Option<u8> {
        match self {
            Stage::Baseline | Stage::Upgrade => None,
            Stage::Improvement => Some(15),
            Stage::Benchmark => Some(30),
            Stage::Power => Some(50),
            Stage::Thermal => Some(65),
            Stage::Comparison => Some(80),
            Stage::Roi => Some(90),
            Stage::CostBenefit => Some(95),
            Stage::Assembly => Some(100),
        }
    }

    /// Whether a failure can be replaced by a default result
    pub fn has_fallback(&self) -> bool {
        matches!(self, Stage::Power | Stage::Thermal | Stage::Comparison)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Improvement => write!(f, "improvement"),
            Self::Benchmark => write!(f, "benchmark"),
            Self::Power => write!(f, "power"),
            Self::Thermal => write!(f, "thermal"),
            Self::Comparison => write!(f, "comparison"),
            Self::Roi => write!(f, "roi"),
            Self::CostBenefit => write!(f, "cost-benefit"),
            Self::Assembly => write!(f, "assembly"),
        }
    }
}

/// A before/after analyzer that can stand in for itself with a default.
#[async_trait]
pub trait SnapshotAnalyzer<T>: Send + Sync {
    fn stage(&self) -> Stage;

    async fn analyze(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<T>;

    /// Result substituted when `analyze` fails
    fn fallback(&self) -> T;
}

/// Tagged stage result
#[derive(Debug)]
pub enum StageOutcome<T> {
    Success(T),
    Defaulted { value: T, cause: String },
    Fatal(SimError),
}

impl<T> StageOutcome<T> {
    pub fn is_defaulted(&self) -> bool {
        matches!(self, StageOutcome::Defaulted { .. })
    }

    /// Value of a success or defaulted outcome; the error of a fatal one
    pub fn into_result(self) -> Result<T> {
        match self {
            StageOutcome::Success(value) | StageOutcome::Defaulted { value, .. } => Ok(value),
            StageOutcome::Fatal(err) => Err(err),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            StageOutcome::Success(value) | StageOutcome::Defaulted { value, .. } => Some(value),
            StageOutcome::Fatal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoints_increase() {
        let points: Vec<u8> = Stage::ANALYSES
            .iter()
            .chain(std::iter::once(&Stage::Assembly))
            .filter_map(|s| s.checkpoint())
            .collect();
        assert_eq!(points, vec![15, 30, 50, 65, 80, 90, 95, 100]);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Power.to_string(), "power");
        assert_eq!(Stage::CostBenefit.to_string(), "cost-benefit");
    }

    #[test]
    fn test_only_side_analyses_have_fallbacks() {
        let with_fallback: Vec<Stage> = Stage::ANALYSES
            .iter()
            .copied()
            .filter(Stage::has_fallback)
            .collect();
        assert_eq!(with_fallback, vec![Stage::Power, Stage::Thermal, Stage::Comparison]);
    }

    #[test]
    fn test_outcome_into_result() {
        let ok: StageOutcome<u8> = StageOutcome::Defaulted {
            value: 3,
            cause: "boom".into(),
        };
        assert!(ok.is_defaulted());
        assert_eq!(ok.into_result().unwrap(), 3);
        let fatal: StageOutcome<u8> = StageOutcome::Fatal(SimError::Validation("x".into()));
        assert!(fatal.value().is_none());
        assert!(fatal.into_result().is_err());
    }
}
