//! Read-only part lookup tables
//!
//! The engine never owns catalog data. It asks a [`PartCatalog`] for the
//! electrical and performance characteristics of a part when the part record
//! itself does not carry them. [`BuiltinCatalog`] answers from model-name
//! tables so the engine works without an external catalog service.

use crate::model::{ComponentCategory, Part};

/// Idle and sustained-load draw of one part (W, DC side)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSpec {
    pub idle_watts: f64,
    pub load_watts: f64,
}

/// Lookup interface owned by the catalog subsystem.
pub trait PartCatalog: Send + Sync {
    /// Draw for a part; `None` when the catalog knows nothing about it
    fn power_spec(&self, part: &Part) -> Option<PowerSpec>;

    /// Relative performance score (0-100) for a part without an explicit score
    fn performance_score(&self, part: &Part) -> Option<f64>;

    /// Draw assumed for a category when the slot is empty or a placeholder
    fn default_power(&self, category: ComponentCategory) -> PowerSpec;
}

/// Model-name heuristics for common desktop parts.
#[derive(Debug, Clone, Default)]
pub struct BuiltinCatalog;

/// (substring, load W) for CPUs; first match wins
const CPU_LOAD_TABLE: &[(&str, f64)] = &[
    ("threadripper", 280.0),
    ("epyc", 225.0),
    ("xeon", 150.0),
    ("i9-14", 253.0),
    ("i9-13", 253.0),
    ("i9", 125.0),
    ("i7-14", 253.0),
    ("i7", 125.0),
    ("i5", 65.0),
    ("i3", 60.0),
    ("ryzen 9", 170.0),
    ("ryzen 7", 105.0),
    ("ryzen 5", 76.0),
    ("ryzen 3", 65.0),
    ("celeron", 35.0),
    ("pentium", 46.0),
    ("atom", 10.0),
];

const GPU_LOAD_TABLE: &[(&str, f64)] = &[
    ("4090", 450.0),
    ("4080", 320.0),
    ("4070 ti", 285.0),
    ("4070", 200.0),
    ("4060 ti", 160.0),
    ("4060", 115.0),
    ("3090", 350.0),
    ("3080", 320.0),
    ("3070", 220.0),
    ("3060", 170.0),
    ("2080", 215.0),
    ("2070", 175.0),
    ("2060", 160.0),
    ("1660", 120.0),
    ("1060", 120.0),
    ("rx 7900", 355.0),
    ("rx 7800", 263.0),
    ("rx 7700", 245.0),
    ("rx 7600", 165.0),
    ("rx 6800", 250.0),
    ("rx 6700", 230.0),
    ("rx 6600", 132.0),
    ("arc a7", 225.0),
    ("arc a5", 175.0),
];

/// (substring, score) for CPUs and GPUs without a published score
const CPU_SCORE_TABLE: &[(&str, f64)] = &[
    ("threadripper", 95.0),
    ("i9", 88.0),
    ("ryzen 9", 88.0),
    ("i7", 78.0),
    ("ryzen 7", 78.0),
    ("i5", 65.0),
    ("ryzen 5", 65.0),
    ("i3", 45.0),
    ("ryzen 3", 45.0),
    ("pentium", 25.0),
    ("celeron", 20.0),
];

const GPU_SCORE_TABLE: &[(&str, f64)] = &[
    ("4090", 100.0),
    ("4080", 88.0),
    ("7900", 85.0),
    ("4070 ti", 78.0),
    ("3090", 75.0),
    ("4070", 72.0),
    ("3080", 70.0),
    ("7800", 70.0),
    ("3070", 60.0),
    ("4060", 55.0),
    ("3060", 48.0),
    ("2060", 42.0),
    ("1660", 33.0),
    ("1060", 28.0),
];

fn lookup(table: &[(&str, f64)], name: &str) -> Option<f64> {
    let lower = name.to_ascii_lowercase();
    table
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, value)| *value)
}

impl PartCatalog for BuiltinCatalog {
    fn power_spec(&self, part: &Part) -> Option<PowerSpec> {
        let load = match part.category {
            ComponentCategory::Cpu => lookup(CPU_LOAD_TABLE, &part.name)?,
            ComponentCategory::Gpu => lookup(GPU_LOAD_TABLE, &part.name)?,
            ComponentCategory::Storage => {
                let lower = part.name.to_ascii_lowercase();
                if lower.contains("nvme") || lower.contains("m.2") {
                    7.0
                } else if lower.contains("hdd") || lower.contains("rpm") {
                    9.0
                } else {
                    4.0
                }
            }
            _ => return Some(self.default_power(part.category)),
        };
        let idle_fraction = match part.category {
            ComponentCategory::Cpu => 0.15,
            ComponentCategory::Gpu => 0.08,
            _ => 0.4,
        };
        Some(PowerSpec {
            idle_watts: load * idle_fraction,
            load_watts: load,
        })
    }

    fn performance_score(&self, part: &Part) -> Option<f64> {
        match part.category {
            ComponentCategory::Cpu => lookup(CPU_SCORE_TABLE, &part.name),
            ComponentCategory::Gpu => lookup(GPU_SCORE_TABLE, &part.name),
            ComponentCategory::Memory => {
                let lower = part.name.to_ascii_lowercase();
                let capacity = ["64gb", "32gb", "16gb", "8gb", "4gb"]
                    .iter()
                    .zip([90.0, 75.0, 55.0, 35.0, 15.0])
                    .find(|(tag, _)| lower.contains(*tag))
                    .map(|(_, score)| score)?;
                Some(if lower.contains("ddr5") { capacity + 10.0 } else { capacity })
            }
            ComponentCategory::Storage => {
                let lower = part.name.to_ascii_lowercase();
                if lower.contains("gen5") {
                    Some(90.0)
                } else if lower.contains("gen4") {
                    Some(80.0)
                } else if lower.contains("nvme") {
                    Some(65.0)
                } else if lower.contains("ssd") {
                    Some(45.0)
                } else if lower.contains("hdd") {
                    Some(15.0)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn default_power(&self, category: ComponentCategory) -> PowerSpec {
        let (idle_watts, load_watts) = match category {
            ComponentCategory::Cpu => (15.0, 95.0),
            ComponentCategory::Gpu => (12.0, 180.0),
            ComponentCategory::Memory => (3.0, 6.0),
            ComponentCategory::Storage => (2.0, 6.0),
            ComponentCategory::Cooler => (2.0, 5.0),
            ComponentCategory::Case => (3.0, 6.0),
            // motherboard, fans, peripherals
            ComponentCategory::Other => (25.0, 40.0),
            ComponentCategory::Psu => (0.0, 0.0),
        };
        PowerSpec { idle_watts, load_watts }
    }
}
