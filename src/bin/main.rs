//! CLI tool for the Upgrade Simulator (upsim)

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use upsimlib::benchmark::{BenchmarkCategory, BenchmarkComparison, BenchmarkResult, Significance};
#[cfg(feature = "cli")]
use upsimlib::cost_benefit::{CostBenefitAnalysis, Recommendation};
#[cfg(feature = "cli")]
use upsimlib::normalizer::{Normalizer, RawConfiguration};
#[cfg(feature = "cli")]
use upsimlib::roi::RoiAnalysis;
#[cfg(feature = "cli")]
use upsimlib::thermal::ThrottlingRisk;
#[cfg(feature = "cli")]
use upsimlib::{
    ConfigurationSnapshot, ExportFormat, FullSimulationResult, SimError, SimulatorConfig,
    UpgradePlan, UpgradeSimulator, UsageScenario,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "upsim")]
#[command(about = "Upgrade Simulator: predicts performance, power, thermal and financial impact of a PC upgrade plan", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Simulator settings file (TOML)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Output format (text, json or csv)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Run the full simulation of a plan against a build
    Simulate {
        /// Current build (JSON)
        #[arg(short, long)]
        build: PathBuf,
        /// Upgrade plan (JSON)
        #[arg(short, long)]
        plan: PathBuf,
        /// Usage scenarios (JSON array); built-in gaming/productivity if omitted
        #[arg(long)]
        scenarios: Option<PathBuf>,
        /// Fail on missing required components instead of substituting placeholders
        #[arg(long)]
        strict: bool,
        /// Write the output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate reference synthetic benchmark records
    Benchmark {
        /// Categories (gaming, productivity, content_creation, compute, memory, storage)
        #[arg(default_values_t = vec!["gaming".to_string(), "productivity".to_string()])]
        categories: Vec<String>,
    },
    /// Return on investment of a plan
    Roi {
        /// Upgrade plan (JSON)
        #[arg(short, long)]
        plan: PathBuf,
        /// Evaluation timeframe in months
        #[arg(short, long)]
        months: Option<u32>,
    },
    /// Scenario-weighted cost-benefit analysis of a plan
    CostBenefit {
        /// Upgrade plan (JSON)
        #[arg(short, long)]
        plan: PathBuf,
        /// Usage scenarios (JSON array)
        #[arg(long)]
        scenarios: Option<PathBuf>,
    },
    /// Print a commented settings template
    SampleConfig,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.settings {
        Some(path) => SimulatorConfig::from_toml_file(&path.to_string_lossy())?,
        None => SimulatorConfig::default(),
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_filter()),
    )
    .init();

    let text = cli.format.eq_ignore_ascii_case("text");
    let format = if text {
        None
    } else {
        Some(cli.format.parse::<ExportFormat>()?)
    };

    match &cli.command {
        Commands::SampleConfig => {
            print!("{}", SimulatorConfig::sample_toml());
        }

        Commands::Simulate {
            build,
            plan,
            scenarios,
            strict,
            output,
        } => {
            let normalizer = if *strict {
                Normalizer::strict()
            } else {
                Normalizer::default()
            };
            let snapshot = load_build(build, &normalizer)?;
            let plan = load_plan(plan)?;
            let scenarios = scenarios.as_deref().map(load_scenarios).transpose()?;

            let simulator = UpgradeSimulator::new(config)?;
            let result = simulator
                .run_full_simulation(&plan, &snapshot, scenarios.as_deref())
                .await?;

            let rendered = match format {
                Some(f) => simulator.export_results(f)?,
                None => render_full(&plan, &snapshot, &result),
            };
            match output {
                Some(path) => {
                    std::fs::write(path, rendered)?;
                    println!("{} {}", "Results written to".green(), path.display());
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Benchmark { categories } => {
            let categories: Vec<BenchmarkCategory> = categories
                .iter()
                .map(|c| BenchmarkCategory::from_label(c))
                .collect();
            let simulator = UpgradeSimulator::new(config)?;
            let results = simulator.run_benchmark_simulation(&categories);
            let comparison = upsimlib::benchmark::compare_results(&results);
            match format {
                Some(_) => println!("{}", serde_json::to_string_pretty(&results)?),
                None => print_benchmarks(&results, &comparison),
            }
        }

        Commands::Roi { plan, months } => {
            let plan = load_plan(plan)?;
            let months = months.unwrap_or(config.roi.default_timeframe_months);
            let simulator = UpgradeSimulator::new(config)?;
            let roi = simulator.calculate_roi(&plan, months)?;
            match format {
                Some(_) => println!("{}", serde_json::to_string_pretty(&roi)?),
                None => print_roi(&roi),
            }
        }

        Commands::CostBenefit { plan, scenarios } => {
            let plan = load_plan(plan)?;
            let scenarios = match scenarios {
                Some(path) => load_scenarios(path)?,
                None => Vec::new(),
            };
            let simulator = UpgradeSimulator::new(config)?;
            let analysis = simulator.perform_cost_benefit_analysis(&plan, &scenarios)?;
            match format {
                Some(_) => println!("{}", serde_json::to_string_pretty(&analysis)?),
                None => print_cost_benefit(&analysis),
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn read(path: &Path) -> Result<String, SimError> {
    std::fs::read_to_string(path).map_err(|e| {
        SimError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })
}

#[cfg(feature = "cli")]
fn load_build(path: &Path, normalizer: &Normalizer) -> Result<ConfigurationSnapshot, SimError> {
    let raw = RawConfiguration::from_json(&read(path)?)?;
    normalizer.normalize(&raw)
}

#[cfg(feature = "cli")]
fn load_plan(path: &Path) -> Result<UpgradePlan, SimError> {
    Ok(serde_json::from_str(&read(path)?)?)
}

#[cfg(feature = "cli")]
fn load_scenarios(path: &Path) -> Result<Vec<UsageScenario>, SimError> {
    Ok(serde_json::from_str(&read(path)?)?)
}

#[cfg(feature = "cli")]
fn signed(value: f64, unit: &str) -> colored::ColoredString {
    let text = format!("{:+.1}{}", value, unit);
    if value > 0.0 {
        text.green()
    } else if value < 0.0 {
        text.red()
    } else {
        text.normal()
    }
}

#[cfg(feature = "cli")]
fn render_full(
    plan: &UpgradePlan,
    snapshot: &ConfigurationSnapshot,
    result: &FullSimulationResult,
) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let sim = &result.simulation;
    let _ = writeln!(out, "{}", "═══ Upgrade Simulation ═══".cyan().bold());
    let _ = writeln!(out, "  {} {} ({})", "Plan:".white().bold(), plan.name, plan.id);
    let _ = writeln!(out, "  {} {}", "Build:".white().bold(), snapshot.id);
    for category in snapshot.placeholders() {
        let _ = writeln!(
            out,
            "  {} {} slot scored with defaults (placeholder)",
            "!".yellow().bold(),
            category
        );
    }

    let _ = writeln!(out, "\n{}", "═══ Performance ═══".cyan().bold());
    for ((name, before), (_, delta)) in sim
        .baseline
        .entries()
        .iter()
        .zip(sim.category_improvements.entries().iter())
    {
        let _ = writeln!(out, "  {:<10} {:>6.1} {}", name, before, signed(*delta, ""));
    }
    let _ = writeln!(
        out,
        "  {:<10} {:>6.1} {}",
        "overall",
        sim.baseline.overall,
        signed(sim.overall_improvement, "")
    );
    if !sim.resolved_bottlenecks.is_empty() {
        let _ = writeln!(
            out,
            "  {} {}",
            "Resolves:".white().bold(),
            sim.resolved_bottlenecks.join(", ")
        );
    }
    let _ = writeln!(
        out,
        "  {} {:.0}%   {} {:.0}%",
        "Confidence:".white().bold(),
        sim.confidence,
        "Satisfaction:".white().bold(),
        sim.satisfaction
    );

    let _ = writeln!(out, "\n{}", "═══ Benchmarks ═══".cyan().bold());
    for c in &result.benchmark_comparison.categories {
        let _ = writeln!(
            out,
            "  {:<18} {:>7.0} → {:>7.0}  {} ({})",
            c.category.to_string(),
            c.before_score,
            c.after_score,
            signed(c.improvement_percent, "%"),
            significance_label(c.significance)
        );
    }

    let p = &result.power;
    let _ = writeln!(out, "\n{}", "═══ Power ═══".cyan().bold());
    let _ = writeln!(
        out,
        "  {} {:.0} W → {:.0} W   {} {:.0} W → {:.0} W",
        "Idle:".white().bold(),
        p.idle_watts.before,
        p.idle_watts.after,
        "Load:".white().bold(),
        p.load_watts.before,
        p.load_watts.after
    );
    let _ = writeln!(
        out,
        "  {} {:.2} → {:.2} per year ({}/month, {})",
        "Energy cost:".white().bold(),
        p.annual_cost.before,
        p.annual_cost.after,
        signed(p.monthly_cost_difference, ""),
        p.efficiency
    );
    if let Some(h) = p.psu_headroom_after {
        let _ = writeln!(out, "  {} {:.0}%", "PSU headroom:".white().bold(), h);
    }
    for w in &p.warnings {
        let _ = writeln!(out, "  {} {}", "!".yellow().bold(), w);
    }

    let t = &result.thermal;
    let risk = match t.thermal_throttling_risk {
        ThrottlingRisk::High => "high".red().bold(),
        ThrottlingRisk::Medium => "medium".yellow(),
        ThrottlingRisk::Low => "low".green(),
    };
    let _ = writeln!(out, "\n{}", "═══ Thermal ═══".cyan().bold());
    let _ = writeln!(
        out,
        "  CPU {:.0} → {:.0} °C   GPU {:.0} → {:.0} °C   Storage {:.0} → {:.0} °C",
        t.before.cpu, t.after.cpu, t.before.gpu, t.after.gpu, t.before.storage, t.after.storage
    );
    let _ = writeln!(
        out,
        "  {} {}   {} {:.0} → {:.0} dBA",
        "Throttling risk:".white().bold(),
        risk,
        "Noise:".white().bold(),
        t.noise_db.before,
        t.noise_db.after
    );
    for r in &t.recommendations {
        let _ = writeln!(out, "  • {}", r);
    }

    let c = &result.comparison;
    let _ = writeln!(out, "\n{}", "═══ Comparison ═══".cyan().bold());
    let _ = writeln!(
        out,
        "  {} {:.1} → {:.1} / 10",
        "Rating:".white().bold(),
        c.overall_rating.before,
        c.overall_rating.after
    );
    for area in &c.improvement_areas {
        let _ = writeln!(out, "  {} {}", "▲".green(), area);
    }
    for w in &c.warnings {
        let _ = writeln!(out, "  {} {}", "!".yellow().bold(), w);
    }

    let _ = writeln!(out, "\n{}", render_roi(&result.roi));
    let _ = writeln!(out, "{}", render_cost_benefit(&result.cost_benefit));

    let _ = writeln!(out, "{}", "═══ Summary ═══".cyan().bold());
    let _ = writeln!(
        out,
        "  {} {:.0}%   {} {:.0}% ({:.0}% computed)   {} {} ms",
        "Confidence:".white().bold(),
        result.overall_confidence,
        "Completeness:".white().bold(),
        result.completeness,
        result.genuine_stage_percent,
        "Time:".white().bold(),
        result.execution_time_ms
    );
    for d in &result.defaulted_stages {
        let _ = writeln!(
            out,
            "  {} {} stage defaulted: {}",
            "!".yellow().bold(),
            d.stage,
            d.cause
        );
    }
    out
}

#[cfg(feature = "cli")]
fn significance_label(s: Significance) -> colored::ColoredString {
    match s {
        Significance::Dramatic | Significance::Major => s.to_string().green().bold(),
        Significance::Moderate => s.to_string().green(),
        Significance::Minor => s.to_string().normal(),
        Significance::Negligible => s.to_string().dimmed(),
    }
}

#[cfg(feature = "cli")]
fn render_roi(roi: &RoiAnalysis) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{}", "═══ Return on Investment ═══".cyan().bold());
    let _ = writeln!(
        out,
        "  {} {:.2} over {} months",
        "Investment:".white().bold(),
        roi.investment_cost,
        roi.timeframe_months
    );
    for c in roi.performance_value.iter().chain(roi.cost_savings.iter()) {
        let _ = writeln!(out, "    {:<40} {}", c.name, signed(c.monthly_value, "/mo"));
    }
    let _ = writeln!(
        out,
        "  {} {:.2}/month   {} {:.2}",
        "Benefit:".white().bold(),
        roi.monthly_benefit,
        "NPV:".white().bold(),
        roi.net_present_value
    );
    let payback = match roi.payback_months {
        Some(p) => format!("{:.1} months", p).normal(),
        None => "never".red(),
    };
    let _ = writeln!(out, "  {} {}", "Payback:".white().bold(), payback);
    let _ = writeln!(
        out,
        "  {} {}  (risk-adjusted {:.0}%, {:.0}% range {:.0}% .. {:.0}%)",
        "ROI:".white().bold(),
        signed(roi.roi_percent, "%"),
        roi.risk_adjusted_roi,
        roi.uncertainty.confidence_level * 100.0,
        roi.uncertainty.low,
        roi.uncertainty.high
    );
    out
}

#[cfg(feature = "cli")]
fn print_roi(roi: &RoiAnalysis) {
    print!("{}", render_roi(roi));
}

#[cfg(feature = "cli")]
fn render_cost_benefit(analysis: &CostBenefitAnalysis) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{}", "═══ Cost-Benefit ═══".cyan().bold());
    for s in &analysis.scenarios {
        let _ = writeln!(
            out,
            "  {:<14} weight {:>3.0}  cost {:>8.2} → {:>8.2}  benefit {}",
            s.name,
            s.weight,
            s.cost_before,
            s.cost_after,
            signed(s.benefit, "")
        );
    }
    let score = format!("{:.0}/100", analysis.recommendation_score);
    let score = match analysis.recommendation {
        Recommendation::Strong | Recommendation::Recommended => score.green().bold(),
        Recommendation::Conditional => score.yellow().bold(),
        Recommendation::Cautious => score.red().bold(),
    };
    let _ = writeln!(
        out,
        "  {} {} ({})",
        "Score:".white().bold(),
        score,
        analysis.recommendation
    );
    for s in &analysis.sensitivity {
        let _ = writeln!(
            out,
            "    {:?} {:+.0}% → {:.0}",
            s.parameter, s.variation_percent, s.recommendation_score
        );
    }
    for r in &analysis.recommendations {
        let _ = writeln!(out, "  • {}", r);
    }
    for r in &analysis.risk_factors {
        let _ = writeln!(out, "  {} {}", "!".yellow().bold(), r);
    }
    out
}

#[cfg(feature = "cli")]
fn print_cost_benefit(analysis: &CostBenefitAnalysis) {
    print!("{}", render_cost_benefit(analysis));
}

#[cfg(feature = "cli")]
fn print_benchmarks(results: &[BenchmarkResult], comparison: &BenchmarkComparison) {
    println!("{}", "═══ Synthetic Benchmarks ═══".cyan().bold());
    for (r, c) in results.iter().zip(comparison.categories.iter()) {
        println!(
            "  {:<18} {:>7.0} → {:>7.0}  {} ({})  confidence {:.0}%",
            r.category.to_string(),
            r.before_score,
            r.after_score,
            signed(c.improvement_percent, "%"),
            significance_label(c.significance),
            r.confidence
        );
    }
    println!(
        "  {} {}   {} {:.0}%",
        "Overall:".white().bold(),
        signed(comparison.overall_improvement, "%"),
        "Confidence:".white().bold(),
        comparison.confidence
    );
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features not enabled. Please compile with --features cli");
    std::process::exit(1);
}
