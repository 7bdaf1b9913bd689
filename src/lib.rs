// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Upgrade Simulator
//!
//! Predicts what a proposed hardware upgrade does to an existing PC build
//! before any money is spent: performance deltas per category, synthetic
//! benchmark deltas, power draw and energy cost, component temperatures,
//! ROI and a scenario-weighted cost-benefit recommendation.
//!
//! Every figure is an estimate carrying an explicit confidence value, not a
//! measurement.
//!
//! # Examples
//!
//! ```no_run
//! use upsimlib::normalizer::{Normalizer, RawConfiguration};
//! use upsimlib::model::UpgradePlan;
//! use upsimlib::UpgradeSimulator;
//!
//! # async fn run(build_json: &str, plan_json: &str) -> upsimlib::Result<()> {
//! let raw = RawConfiguration::from_json(build_json)?;
//! let build = Normalizer::default().normalize(&raw)?;
//! let plan: UpgradePlan = serde_json::from_str(plan_json)?;
//!
//! let simulator = UpgradeSimulator::default();
//! let result = simulator.run_full_simulation(&plan, &build, None).await?;
//! println!(
//!     "{:+.1} points, ROI {:.0}%, recommendation {}",
//!     result.simulation.overall_improvement,
//!     result.roi.roi_percent,
//!     result.cost_benefit.recommendation
//! );
//! # Ok(())
//! # }
//! ```

pub mod benchmark;
pub mod cache;
pub mod catalog;
pub mod comparison;
pub mod config;
pub mod cost_benefit;
pub mod error;
pub mod estimator;
pub mod export;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod power;
pub mod roi;
pub mod thermal;

pub use config::SimulatorConfig;
pub use error::{Result, SimError};
pub use export::ExportFormat;
pub use model::{ConfigurationSnapshot, UpgradePlan, UsageScenario};
pub use pipeline::{FullSimulationResult, PipelineStatus, RunState, SimulationResult, Stage, UpgradeSimulator};
