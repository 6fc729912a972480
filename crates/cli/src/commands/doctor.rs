use std::path::Path;

use aimana_core::config::{AppConfig, LoadOptions};
use aimana_core::{HistoryDataset, RegressionModel};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_DATA, EXIT_MODEL, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
    #[serde(skip)]
    exit_code: u8,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into(), exit_code: EXIT_OK }
    }

    fn fail(name: &'static str, details: impl Into<String>, exit_code: u8) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into(), exit_code }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
            exit_code: EXIT_CONFIG,
        }
    }
}

/// Exit code is that of the first failing check.
pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = report
        .checks
        .iter()
        .find(|check| check.status != CheckStatus::Pass)
        .map_or(EXIT_OK, |check| check.exit_code);

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_candidate_space(&config));
            checks.push(check_history(&config.data.history_path));
            checks.push(check_model("conversion_model", &config.models.conversion_path));
            checks.push(check_model("margin_model", &config.models.margin_path));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string(), EXIT_CONFIG));
            checks.push(DoctorCheck::skipped("candidate_space"));
            checks.push(DoctorCheck::skipped("history_dataset"));
            checks.push(DoctorCheck::skipped("conversion_model"));
            checks.push(DoctorCheck::skipped("margin_model"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_candidate_space(config: &AppConfig) -> DoctorCheck {
    match config.candidate_space() {
        Ok(space) => DoctorCheck::pass(
            "candidate_space",
            format!("{} candidates from {} by {}", space.len(), space.start(), space.step()),
        ),
        Err(error) => DoctorCheck::fail("candidate_space", error.to_string(), EXIT_CONFIG),
    }
}

fn check_history(path: &Path) -> DoctorCheck {
    match HistoryDataset::load(path) {
        Ok(history) if history.is_empty() => DoctorCheck::fail(
            "history_dataset",
            format!("`{}` has no rows", path.display()),
            EXIT_DATA,
        ),
        Ok(history) => DoctorCheck::pass(
            "history_dataset",
            format!(
                "`{}` holds {} rows for {} products",
                path.display(),
                history.len(),
                history.product_count()
            ),
        ),
        Err(error) => DoctorCheck::fail("history_dataset", error.to_string(), EXIT_DATA),
    }
}

fn check_model(name: &'static str, path: &Path) -> DoctorCheck {
    let model = match RegressionModel::load(path) {
        Ok(model) => model,
        Err(error) => return DoctorCheck::fail(name, error.to_string(), EXIT_MODEL),
    };

    match model.check_schema() {
        Ok(()) => DoctorCheck::pass(
            name,
            format!(
                "`{}` version {} trained {}",
                model.name,
                model.version,
                model.trained_at.format("%Y-%m-%d")
            ),
        ),
        Err(error) => DoctorCheck::fail(name, error.to_string(), EXIT_MODEL),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
