//! Thermal profile analyzer
//!
//! Steady-state temperature model: each hot component sits at ambient plus
//! its load draw times a thermal resistance. A CPU cooler with a known
//! dissipation rating lowers the CPU resistance; a stock cooler is assumed
//! otherwise.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::PartCatalog;
use crate::config::ThermalConfig;
use crate::error::Result;
use crate::model::{ComponentCategory, ConfigurationSnapshot};
use crate::pipeline::{SnapshotAnalyzer, Stage};
use crate::power::{build_draw, slot_power, BeforeAfter};

/// °C per W for a stock CPU cooler
const STOCK_CPU_RESISTANCE: f64 = 0.35;
/// °C per W for an open-air GPU cooler
const GPU_RESISTANCE: f64 = 0.16;
/// °C per W for an M.2/SATA drive
const STORAGE_RESISTANCE: f64 = 1.5;
/// Drives idle this far above ambient
const STORAGE_OFFSET_C: f64 = 8.0;
/// Silicon never reports above this
const MAX_REPORTED_C: f64 = 110.0;

/// Temperatures of the hot components (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentTemps {
    pub cpu: f64,
    pub gpu: f64,
    pub storage: f64,
}

impl ComponentTemps {
    pub fn max(&self) -> f64 {
        self.cpu.max(self.gpu).max(self.storage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottlingRisk {
    Low,
    Medium,
    High,
}

impl ThrottlingRisk {
    pub fn classify(max_temp_c: f64, config: &ThermalConfig) -> Self {
        if max_temp_c > config.high_risk_c {
            ThrottlingRisk::High
        } else if max_temp_c > config.medium_risk_c {
            ThrottlingRisk::Medium
        } else {
            ThrottlingRisk::Low
        }
    }

    /// Risk from the hottest component across both builds
    pub fn assess(before: &ComponentTemps, after: &ComponentTemps, config: &ThermalConfig) -> Self {
        Self::classify(before.max().max(after.max()), config)
    }
}

impl std::fmt::Display for ThrottlingRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Thermal analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalResult {
    pub before: ComponentTemps,
    pub after: ComponentTemps,
    /// Reduction of the hottest component temperature (%); negative when hotter
    pub cooling_efficiency: f64,
    /// Estimated acoustic output under load (dBA)
    pub noise_db: BeforeAfter,
    pub thermal_throttling_risk: ThrottlingRisk,
    pub recommendations: Vec<String>,
}

impl ThermalResult {
    pub fn from_temps(before: ComponentTemps, after: ComponentTemps, config: &ThermalConfig) -> Self {
        let cooling_efficiency = if before.max() > 0.0 {
            (before.max() - after.max()) / before.max() * 100.0
        } else {
            0.0
        };
        let risk = ThrottlingRisk::assess(&before, &after, config);
        let mut recommendations = Vec::new();
        if risk >= ThrottlingRisk::Medium {
            recommendations.push(
                "Consider improving cooling (higher-rated CPU cooler, more case airflow)".into(),
            );
        }
        if after.gpu > config.medium_risk_c {
            recommendations.push("Check GPU clearance and intake airflow in the case".into());
        }
        Self {
            before,
            after,
            cooling_efficiency,
            noise_db: BeforeAfter::new(0.0, 0.0),
            thermal_throttling_risk: risk,
            recommendations,
        }
    }

    /// Value substituted when the thermal stage fails
    pub fn fallback(config: &ThermalConfig) -> Self {
        let temps = ComponentTemps {
            cpu: config.fallback_cpu_c,
            gpu: config.fallback_gpu_c,
            storage: config.fallback_storage_c,
        };
        let mut result = Self::from_temps(temps, temps, config);
        result.noise_db = BeforeAfter::new(35.0, 35.0);
        result
            .recommendations
            .push("Thermal analysis unavailable; typical temperatures assumed".into());
        result
    }
}

/// Thermal profile analyzer
pub struct ThermalAnalyzer {
    catalog: Arc<dyn PartCatalog>,
    config: ThermalConfig,
}

impl ThermalAnalyzer {
    pub fn new(catalog: Arc<dyn PartCatalog>, config: ThermalConfig) -> Self {
        Self { catalog, config }
    }

    fn temps(&self, snapshot: &ConfigurationSnapshot) -> Result<ComponentTemps> {
        let catalog = self.catalog.as_ref();
        let cpu_load = slot_power(catalog, ComponentCategory::Cpu, snapshot.slot(ComponentCategory::Cpu))?
            .load_watts;
        let gpu_load = slot_power(catalog, ComponentCategory::Gpu, snapshot.slot(ComponentCategory::Gpu))?
            .load_watts;
        let storage_load = slot_power(
            catalog,
            ComponentCategory::Storage,
            snapshot.slot(ComponentCategory::Storage),
        )?
        .load_watts;

        // A cooler rated for X W holds the CPU 45 °C over ambient at X W.
        let cpu_resistance = snapshot
            .slot(ComponentCategory::Cooler)
            .installed()
            .and_then(|c| c.capacity_watts)
            .filter(|w| w.is_finite() && *w > 0.0)
            .map(|w| 45.0 / w)
            .unwrap_or(STOCK_CPU_RESISTANCE);

        let ambient = self.config.ambient_c;
        let clamp = |t: f64| t.clamp(ambient, MAX_REPORTED_C);
        Ok(ComponentTemps {
            cpu: clamp(ambient + cpu_load * cpu_resistance),
            gpu: clamp(ambient + gpu_load * GPU_RESISTANCE),
            storage: clamp(ambient + STORAGE_OFFSET_C + storage_load * STORAGE_RESISTANCE),
        })
    }

    /// Fan noise grows with total heat to move.
    fn noise(&self, snapshot: &ConfigurationSnapshot) -> Result<f64> {
        let draw = build_draw(self.catalog.as_ref(), snapshot)?;
        let heat = draw.load_watts.max(10.0);
        Ok((20.0 + 10.0 * (heat / 10.0).log10()).clamp(20.0, 60.0))
    }

    pub fn analyze(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<ThermalResult> {
        let mut result =
            ThermalResult::from_temps(self.temps(before)?, self.temps(after)?, &self.config);
        result.noise_db = BeforeAfter::new(self.noise(before)?, self.noise(after)?);
        if result.noise_db.delta() > 3.0 {
            result
                .recommendations
                .push(format!("Expect about {:.0} dBA more fan noise under load", result.noise_db.delta()));
        }
        Ok(result)
    }
}

#[async_trait]
impl SnapshotAnalyzer<ThermalResult> for ThermalAnalyzer {
    fn stage(&self) -> Stage {
        Stage::Thermal
    }

    async fn analyze(
        &self,
        before: &ConfigurationSnapshot,
        after: &ConfigurationSnapshot,
    ) -> Result<ThermalResult> {
        ThermalAnalyzer::analyze(self, before, after)
    }

    fn fallback(&self) -> ThermalResult {
        ThermalResult::fallback(&self.config)
    }
}
