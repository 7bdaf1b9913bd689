//! Result export (JSON, CSV)

use serde::Serialize;
use std::str::FromStr;

use crate::error::{Result, SimError};
use crate::pipeline::FullSimulationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(SimError::Validation(format!(
                "unsupported export format '{}' (expected json or csv)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// One CSV row
#[derive(Debug, Serialize)]
struct MetricRow<'a> {
    section: &'a str,
    metric: String,
    before: Option<f64>,
    after: Option<f64>,
    delta: Option<f64>,
}

impl<'a> MetricRow<'a> {
    fn pair(section: &'a str, metric: impl Into<String>, before: f64, after: f64) -> Self {
        Self {
            section,
            metric: metric.into(),
            before: Some(before),
            after: Some(after),
            delta: Some(after - before),
        }
    }

    fn value(section: &'a str, metric: impl Into<String>, value: f64) -> Self {
        Self {
            section,
            metric: metric.into(),
            before: None,
            after: Some(value),
            delta: None,
        }
    }
}

pub fn export(result: &FullSimulationResult, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        ExportFormat::Csv => to_csv(result),
    }
}

fn rows(result: &FullSimulationResult) -> Vec<MetricRow<'static>> {
    let sim = &result.simulation;
    let mut rows = Vec::new();

    for ((name, before), (_, after)) in sim.baseline.entries().iter().zip(sim.upgraded.entries().iter()) {
        rows.push(MetricRow::pair("performance", *name, *before, *after));
    }
    rows.push(MetricRow::pair("performance", "overall", sim.baseline.overall, sim.upgraded.overall));
    rows.push(MetricRow::value("performance", "confidence", sim.confidence));
    rows.push(MetricRow::value("performance", "satisfaction", sim.satisfaction));

    for b in &result.benchmarks {
        rows.push(MetricRow::pair("benchmark", b.category.to_string(), b.before_score, b.after_score));
    }
    rows.push(MetricRow::value(
        "benchmark",
        "overall_improvement_percent",
        result.benchmark_comparison.overall_improvement,
    ));

    let p = &result.power;
    rows.push(MetricRow::pair("power", "idle_watts", p.idle_watts.before, p.idle_watts.after));
    rows.push(MetricRow::pair("power", "load_watts", p.load_watts.before, p.load_watts.after));
    rows.push(MetricRow::pair("power", "average_watts", p.average_watts.before, p.average_watts.after));
    rows.push(MetricRow::pair("power", "annual_cost", p.annual_cost.before, p.annual_cost.after));
    rows.push(MetricRow::value("power", "monthly_cost_difference", p.monthly_cost_difference));

    let t = &result.thermal;
    rows.push(MetricRow::pair("thermal", "cpu_c", t.before.cpu, t.after.cpu));
    rows.push(MetricRow::pair("thermal", "gpu_c", t.before.gpu, t.after.gpu));
    rows.push(MetricRow::pair("thermal", "storage_c", t.before.storage, t.after.storage));
    rows.push(MetricRow::pair("thermal", "noise_db", t.noise_db.before, t.noise_db.after));

    let c = &result.comparison;
    rows.push(MetricRow::pair("comparison", "rating", c.overall_rating.before, c.overall_rating.after));

    let r = &result.roi;
    rows.push(MetricRow::value("roi", "investment_cost", r.investment_cost));
    rows.push(MetricRow::value("roi", "monthly_benefit", r.monthly_benefit));
    rows.push(MetricRow::value("roi", "net_present_value", r.net_present_value));
    if let Some(payback) = r.payback_months {
        rows.push(MetricRow::value("roi", "payback_months", payback));
    }
    rows.push(MetricRow::value("roi", "roi_percent", r.roi_percent));
    rows.push(MetricRow::value("roi", "risk_adjusted_roi", r.risk_adjusted_roi));

    let cb = &result.cost_benefit;
    for s in &cb.scenarios {
        rows.push(MetricRow::pair("cost_benefit", format!("{}_cost", s.name), s.cost_before, s.cost_after));
    }
    rows.push(MetricRow::value("cost_benefit", "total_benefit", cb.total_benefit));
    rows.push(MetricRow::value("cost_benefit", "recommendation_score", cb.recommendation_score));

    rows.push(MetricRow::value("summary", "overall_confidence", result.overall_confidence));
    rows.push(MetricRow::value("summary", "completeness", result.completeness));
    rows.push(MetricRow::value("summary", "genuine_stage_percent", result.genuine_stage_percent));
    rows.push(MetricRow::value("summary", "execution_time_ms", result.execution_time_ms as f64));
    rows
}

fn to_csv(result: &FullSimulationResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows(result) {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SimError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SimError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{gaming_build, gpu_plan};
    use crate::pipeline::UpgradeSimulator;

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(" csv ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_csv_layout() {
        let sim = UpgradeSimulator::default();
        let result = sim
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        let csv = export(&result, ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("section,metric,before,after,delta"));
        assert!(csv.contains("performance,graphics,45.0,"));
        assert!(csv.contains("summary,completeness,,100.0,"));
    }

    #[tokio::test]
    async fn test_json_roundtrip() {
        let sim = UpgradeSimulator::default();
        let result = sim
            .run_full_simulation(&gpu_plan(), &gaming_build(), None)
            .await
            .unwrap();
        let json = export(&result, ExportFormat::Json).unwrap();
        let back: FullSimulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.simulation, result.simulation);
        assert_eq!(back.defaulted_stages, result.defaulted_stages);
    }
}
