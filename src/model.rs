//! Core data model: parts, configuration snapshots, upgrade plans and usage
//! scenarios.
//!
//! Snapshots and plans are produced upstream (configuration builder and
//! recommendation generator) and are treated as read-only by the engine.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

// ────────────────────────────────────────────────────────────────────
// Components
// ────────────────────────────────────────────────────────────────────

/// Component slot in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Cpu,
    Gpu,
    Memory,
    Storage,
    Psu,
    Case,
    Cooler,
    Other,
}

impl ComponentCategory {
    pub const ALL: [ComponentCategory; 8] = [
        ComponentCategory::Cpu,
        ComponentCategory::Gpu,
        ComponentCategory::Memory,
        ComponentCategory::Storage,
        ComponentCategory::Psu,
        ComponentCategory::Case,
        ComponentCategory::Cooler,
        ComponentCategory::Other,
    ];

    /// Slots every scorer needs a value for
    pub const REQUIRED: [ComponentCategory; 4] = [
        ComponentCategory::Cpu,
        ComponentCategory::Gpu,
        ComponentCategory::Memory,
        ComponentCategory::Storage,
    ];

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    /// Parse an upstream label, accepting the usual aliases.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let category = match normalized.as_str() {
            "cpu" | "processor" | "compute" => Self::Cpu,
            "gpu" | "graphics" | "graphics_card" | "video_card" => Self::Gpu,
            "memory" | "ram" | "dram" => Self::Memory,
            "storage" | "ssd" | "hdd" | "nvme" | "disk" | "drive" => Self::Storage,
            "psu" | "power_supply" | "power" => Self::Psu,
            "case" | "chassis" | "enclosure" => Self::Case,
            "cooler" | "cooling" | "cpu_cooler" => Self::Cooler,
            "other" | "misc" | "motherboard" | "mainboard" => Self::Other,
            _ => return None,
        };
        Some(category)
    }
}

impl std::fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
            Self::Memory => write!(f, "memory"),
            Self::Storage => write!(f, "storage"),
            Self::Psu => write!(f, "psu"),
            Self::Case => write!(f, "case"),
            Self::Cooler => write!(f, "cooler"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A single hardware part as described by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: String,
    pub category: ComponentCategory,
    /// Street price
    #[serde(default)]
    pub price: f64,
    /// Relative performance score (0-100 scale), if known
    #[serde(default)]
    pub performance_score: Option<f64>,
    /// Draw under sustained load (W)
    #[serde(default)]
    pub load_watts: Option<f64>,
    /// Draw at idle (W)
    #[serde(default)]
    pub idle_watts: Option<f64>,
    /// Rated output for PSUs, heat dissipation for coolers (W)
    #[serde(default)]
    pub capacity_watts: Option<f64>,
}

impl Part {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: ComponentCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            price: 0.0,
            performance_score: None,
            load_watts: None,
            idle_watts: None,
            capacity_watts: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.performance_score = Some(score);
        self
    }

    pub fn with_power(mut self, idle_watts: f64, load_watts: f64) -> Self {
        self.idle_watts = Some(idle_watts);
        self.load_watts = Some(load_watts);
        self
    }

    pub fn with_capacity(mut self, watts: f64) -> Self {
        self.capacity_watts = Some(watts);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }
}

/// State of one slot after normalization. Never missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "part", rename_all = "snake_case")]
pub enum ComponentSlot {
    /// A real part
    Installed(Part),
    /// Stand-in injected for a missing required component
    Placeholder(Part),
    /// Nothing installed (optional slots only)
    Empty,
}

impl ComponentSlot {
    /// The part occupying the slot, real or placeholder
    pub fn part(&self) -> Option<&Part> {
        match self {
            ComponentSlot::Installed(p) | ComponentSlot::Placeholder(p) => Some(p),
            ComponentSlot::Empty => None,
        }
    }

    /// Only real parts
    pub fn installed(&self) -> Option<&Part> {
        match self {
            ComponentSlot::Installed(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ComponentSlot::Placeholder(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ComponentSlot::Empty)
    }

    pub fn label(&self) -> String {
        match self {
            ComponentSlot::Installed(p) => p.name.clone(),
            ComponentSlot::Placeholder(p) => format!("{} (placeholder)", p.name),
            ComponentSlot::Empty => "empty".into(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────
// Usage, constraints, upstream diagnosis
// ────────────────────────────────────────────────────────────────────

/// Primary workload of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    Gaming,
    Productivity,
    ContentCreation,
    Development,
    General,
}

impl Workload {
    /// Fraction of powered-on time spent under sustained load
    pub fn load_fraction(&self) -> f64 {
        match self {
            Workload::Gaming => 0.6,
            Workload::Productivity => 0.3,
            Workload::ContentCreation => 0.7,
            Workload::Development => 0.4,
            Workload::General => 0.25,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "gaming" | "games" => Workload::Gaming,
            "productivity" | "office" => Workload::Productivity,
            "content_creation" | "content-creation" | "creation" | "video" | "rendering" => {
                Workload::ContentCreation
            }
            "development" | "dev" | "programming" => Workload::Development,
            _ => Workload::General,
        }
    }
}

/// How the build is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageProfile {
    /// Powered-on hours per day
    pub daily_hours: f64,
    pub primary_workload: Workload,
}

impl Default for UsageProfile {
    fn default() -> Self {
        Self {
            daily_hours: 8.0,
            primary_workload: Workload::General,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl Default for RiskTolerance {
    fn default() -> Self { RiskTolerance::Medium }
}

/// Owner constraints on an upgrade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub budget_ceiling: Option<f64>,
    pub timeframe_months: Option<u32>,
    pub risk_tolerance: RiskTolerance,
    pub must_keep: Vec<ComponentCategory>,
    pub must_replace: Vec<ComponentCategory>,
}

/// A component judged to limit overall performance, from the upstream diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub id: String,
    pub category: ComponentCategory,
    /// Severity 0-100
    pub severity: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BottleneckAnalysis {
    pub bottlenecks: Vec<Bottleneck>,
}

// ────────────────────────────────────────────────────────────────────
// Configuration snapshot
// ────────────────────────────────────────────────────────────────────

/// Canonical, fully populated build record consumed by every analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    /// Stable identity used for cache keys
    pub id: String,
    pub components: BTreeMap<ComponentCategory, ComponentSlot>,
    pub usage: UsageProfile,
    pub constraints: Constraints,
    pub diagnosis: Option<BottleneckAnalysis>,
}

impl ConfigurationSnapshot {
    /// Slot for a category. Normalized snapshots always contain every key;
    /// a hand-built snapshot missing one reads as empty.
    pub fn slot(&self, category: ComponentCategory) -> &ComponentSlot {
        static EMPTY: ComponentSlot = ComponentSlot::Empty;
        self.components.get(&category).unwrap_or(&EMPTY)
    }

    pub fn part(&self, category: ComponentCategory) -> Option<&Part> {
        self.slot(category).part()
    }

    /// Categories filled by a placeholder
    pub fn placeholders(&self) -> Vec<ComponentCategory> {
        self.components
            .iter()
            .filter(|(_, slot)| slot.is_placeholder())
            .map(|(c, _)| *c)
            .collect()
    }

    /// Hash of the installed parts; identical builds get identical fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = DefaultHasher::new();
        for category in ComponentCategory::ALL {
            category.hash(&mut hasher);
            match self.slot(category) {
                ComponentSlot::Installed(p) => {
                    0u8.hash(&mut hasher);
                    hash_part(p, &mut hasher);
                }
                ComponentSlot::Placeholder(_) => 1u8.hash(&mut hasher),
                ComponentSlot::Empty => 2u8.hash(&mut hasher),
            }
        }
        self.usage.primary_workload.hash(&mut hasher);
        self.usage.daily_hours.to_bits().hash(&mut hasher);
        format!("cfg-{:016x}", hasher.finish())
    }
}

fn hash_part<H: Hasher>(part: &Part, hasher: &mut H) {
    part.id.hash(hasher);
    part.name.hash(hasher);
    part.price.to_bits().hash(hasher);
    for value in [
        part.performance_score,
        part.load_watts,
        part.idle_watts,
        part.capacity_watts,
    ] {
        value.map(f64::to_bits).hash(hasher);
    }
}

// ────────────────────────────────────────────────────────────────────
// Upgrade plan
// ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Advanced,
    Expert,
}

/// Replace one part by another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSubstitution {
    pub category: ComponentCategory,
    pub current: Option<Part>,
    pub recommended: Part,
    pub urgency: Urgency,
    /// Expected gain from this part alone (%)
    pub performance_gain: f64,
    /// Price after resale of the old part
    pub net_cost: f64,
}

/// One ordered step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub substitutions: Vec<PartSubstitution>,
    #[serde(default)]
    pub required_tools: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub requires_backup: bool,
    #[serde(default)]
    pub data_loss_risk: bool,
}

/// Aggregate expected improvement of a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedImprovement {
    /// Aggregate performance gain (%)
    pub performance_gain: f64,
    pub value_gain: f64,
    pub longevity_extension_months: f64,
    /// Reduction of energy use (%)
    pub power_efficiency_gain: f64,
}

/// ROI summary computed upstream by the recommendation generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRoi {
    pub roi_percent: f64,
    pub payback_months: f64,
    pub monthly_benefit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDescriptor {
    pub category: String,
    pub description: String,
    pub level: RiskLevel,
}

/// A proposed upgrade, read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradePlan {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub phases: Vec<Phase>,
    pub total_cost: f64,
    #[serde(default)]
    pub expected_improvement: ExpectedImprovement,
    #[serde(default)]
    pub roi: PlanRoi,
    #[serde(default)]
    pub risks: Vec<RiskDescriptor>,
    /// 0-1
    pub confidence: f64,
    /// 0-100
    #[serde(default)]
    pub priority: f64,
}

impl UpgradePlan {
    /// All substitutions in phase order
    pub fn substitutions(&self) -> impl Iterator<Item = &PartSubstitution> {
        self.phases.iter().flat_map(|p| p.substitutions.iter())
    }

    /// Categories touched by the plan
    pub fn replaced_categories(&self) -> Vec<ComponentCategory> {
        let mut categories: Vec<_> = self.substitutions().map(|s| s.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

// ────────────────────────────────────────────────────────────────────
// Usage scenarios
// ────────────────────────────────────────────────────────────────────

/// Utilization of each scored category in a scenario (0-100 %).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryUtilization {
    pub compute: f64,
    pub graphics: f64,
    pub memory: f64,
    pub storage: f64,
}

/// A weighted usage pattern used when aggregating cost-benefit results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageScenario {
    pub name: String,
    pub scenario_type: Workload,
    #[serde(default)]
    pub applications: Vec<String>,
    pub utilization: CategoryUtilization,
    /// Importance 0-100
    pub weight: f64,
}

impl UsageScenario {
    /// Built-in scenarios used when the caller supplies none
    pub fn defaults() -> Vec<UsageScenario> {
        vec![
            UsageScenario {
                name: "gaming".into(),
                scenario_type: Workload::Gaming,
                applications: vec!["AAA games".into(), "esports titles".into()],
                utilization: CategoryUtilization {
                    compute: 60.0,
                    graphics: 90.0,
                    memory: 50.0,
                    storage: 30.0,
                },
                weight: 80.0,
            },
            UsageScenario {
                name: "productivity".into(),
                scenario_type: Workload::Productivity,
                applications: vec!["office suite".into(), "browser".into()],
                utilization: CategoryUtilization {
                    compute: 70.0,
                    graphics: 20.0,
                    memory: 60.0,
                    storage: 50.0,
                },
                weight: 60.0,
            },
        ]
    }

    /// Order-independent hash of a scenario set, used in cache keys
    pub fn set_hash(scenarios: &[UsageScenario]) -> u64 {
        let mut entries: Vec<u64> = scenarios
            .iter()
            .map(|s| {
                let mut hasher = DefaultHasher::new();
                s.name.hash(&mut hasher);
                s.scenario_type.hash(&mut hasher);
                s.applications.hash(&mut hasher);
                for v in [
                    s.utilization.compute,
                    s.utilization.graphics,
                    s.utilization.memory,
                    s.utilization.storage,
                    s.weight,
                ] {
                    v.to_bits().hash(&mut hasher);
                }
                hasher.finish()
            })
            .collect();
        entries.sort_unstable();
        let mut hasher = DefaultHasher::new();
        entries.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Builders shared by the analyzer tests.

    use super::*;

    pub fn gaming_build() -> ConfigurationSnapshot {
        let mut components = BTreeMap::new();
        components.insert(
            ComponentCategory::Cpu,
            ComponentSlot::Installed(
                Part::new("cpu-5600x", "AMD Ryzen 5 5600X", ComponentCategory::Cpu)
                    .with_score(60.0)
                    .with_power(20.0, 76.0),
            ),
        );
        components.insert(
            ComponentCategory::Gpu,
            ComponentSlot::Installed(
                Part::new("gpu-2060", "NVIDIA GeForce RTX 2060", ComponentCategory::Gpu)
                    .with_score(45.0)
                    .with_power(15.0, 160.0),
            ),
        );
        components.insert(
            ComponentCategory::Memory,
            ComponentSlot::Installed(
                Part::new("ram-16", "16GB DDR4-3200", ComponentCategory::Memory).with_score(55.0),
            ),
        );
        components.insert(
            ComponentCategory::Storage,
            ComponentSlot::Installed(
                Part::new("ssd-sata", "1TB SATA SSD", ComponentCategory::Storage).with_score(50.0),
            ),
        );
        components.insert(
            ComponentCategory::Psu,
            ComponentSlot::Installed(
                Part::new("psu-550", "550W Bronze", ComponentCategory::Psu).with_capacity(550.0),
            ),
        );
        components.insert(ComponentCategory::Case, ComponentSlot::Empty);
        components.insert(ComponentCategory::Cooler, ComponentSlot::Empty);
        components.insert(ComponentCategory::Other, ComponentSlot::Empty);

        let mut snapshot = ConfigurationSnapshot {
            id: String::new(),
            components,
            usage: UsageProfile {
                daily_hours: 6.0,
                primary_workload: Workload::Gaming,
            },
            constraints: Constraints {
                budget_ceiling: Some(1000.0),
                timeframe_months: Some(24),
                ..Constraints::default()
            },
            diagnosis: Some(BottleneckAnalysis {
                bottlenecks: vec![Bottleneck {
                    id: "bn-gpu".into(),
                    category: ComponentCategory::Gpu,
                    severity: 70.0,
                    description: "GPU-bound at 1440p".into(),
                }],
            }),
        };
        snapshot.id = snapshot.fingerprint();
        snapshot
    }

    pub fn gpu_plan() -> UpgradePlan {
        UpgradePlan {
            id: "plan-gpu".into(),
            name: "GPU refresh".into(),
            description: "Swap the RTX 2060 for an RTX 4070".into(),
            phases: vec![Phase {
                name: "Replace GPU".into(),
                description: String::new(),
                difficulty: Difficulty::Easy,
                substitutions: vec![PartSubstitution {
                    category: ComponentCategory::Gpu,
                    current: None,
                    recommended: Part::new("gpu-4070", "NVIDIA GeForce RTX 4070", ComponentCategory::Gpu)
                        .with_power(12.0, 200.0)
                        .with_price(549.0),
                    urgency: Urgency::High,
                    performance_gain: 60.0,
                    net_cost: 449.0,
                }],
                required_tools: vec!["screwdriver".into()],
                steps: vec!["Remove old card".into(), "Install new card".into()],
                estimated_minutes: 30,
                requires_backup: false,
                data_loss_risk: false,
            }],
            total_cost: 449.0,
            expected_improvement: ExpectedImprovement {
                performance_gain: 40.0,
                value_gain: 20.0,
                longevity_extension_months: 18.0,
                power_efficiency_gain: 5.0,
            },
            roi: PlanRoi {
                roi_percent: 35.0,
                payback_months: 14.0,
                monthly_benefit: 32.0,
            },
            risks: vec![RiskDescriptor {
                category: "compatibility".into(),
                description: "Card length must fit the case".into(),
                level: RiskLevel::Low,
            }],
            confidence: 0.82,
            priority: 75.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_category_aliases() {
        assert_eq!(ComponentCategory::from_label("Processor"), Some(ComponentCategory::Cpu));
        assert_eq!(ComponentCategory::from_label("graphics-card"), Some(ComponentCategory::Gpu));
        assert_eq!(ComponentCategory::from_label("power supply"), Some(ComponentCategory::Psu));
        assert_eq!(ComponentCategory::from_label("flux capacitor"), None);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = gaming_build();
        let b = gaming_build();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.fingerprint().starts_with("cfg-"));
    }

    #[test]
    fn test_fingerprint_changes_with_parts() {
        let a = gaming_build();
        let mut b = gaming_build();
        b.components.insert(
            ComponentCategory::Gpu,
            ComponentSlot::Installed(Part::new("gpu-x", "Other GPU", ComponentCategory::Gpu)),
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_scenario_set_hash_is_order_independent() {
        let scenarios = UsageScenario::defaults();
        let mut reversed = scenarios.clone();
        reversed.reverse();
        assert_eq!(UsageScenario::set_hash(&scenarios), UsageScenario::set_hash(&reversed));
    }

    #[test]
    fn test_default_scenarios() {
        let scenarios = UsageScenario::defaults();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "gaming");
        assert_eq!(scenarios[0].weight, 80.0);
        assert_eq!(scenarios[1].name, "productivity");
        assert_eq!(scenarios[1].weight, 60.0);
    }

    #[test]
    fn test_replaced_categories() {
        assert_eq!(gpu_plan().replaced_categories(), vec![ComponentCategory::Gpu]);
    }

    #[test]
    fn test_slot_serialization_roundtrip() {
        let snapshot = gaming_build();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: ConfigurationSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
