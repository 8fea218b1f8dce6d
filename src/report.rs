use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use config_patcher::{Outcome, SetupReport};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// 带告警完成时的退出码
const EXIT_WARNINGS: u8 = 2;

pub fn summarize(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Success(report) => {
            info!(
                "Integration test environment ready, {} patches applied",
                report.applied.len()
            );
            ExitCode::SUCCESS
        }
        Outcome::SuccessWithWarnings(report) => {
            warn!(
                "Integration test environment ready with {} failed patches",
                report.failures.len()
            );
            for failure in &report.failures {
                match &failure.rule {
                    Some(rule) => {
                        warn!("  {} [{}]: {}", failure.file.display(), rule, failure.error)
                    }
                    None => warn!("  {}: {}", failure.file.display(), failure.error),
                }
            }
            ExitCode::from(EXIT_WARNINGS)
        }
        Outcome::Fatal(e) => {
            error!("Setup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

pub fn to_json(outcome: &Outcome, started: DateTime<Local>, finished: DateTime<Local>) -> Value {
    let (status, body) = match outcome {
        Outcome::Success(report) => ("success", report_json(report)),
        Outcome::SuccessWithWarnings(report) => ("success_with_warnings", report_json(report)),
        Outcome::Fatal(e) => ("fatal", json!({ "error": e.to_string() })),
    };
    json!({
        "status": status,
        "started_at": started.to_rfc3339(),
        "finished_at": finished.to_rfc3339(),
        "result": body,
    })
}

fn report_json(report: &SetupReport) -> Value {
    let failures: Vec<Value> = report
        .failures
        .iter()
        .map(|f| {
            json!({
                "file": f.file,
                "rule": f.rule,
                "error": f.error.to_string(),
            })
        })
        .collect();
    json!({
        "applied": report.applied,
        "failures": failures,
        "license": report.license_path,
    })
}

pub fn write_report(path: &Path, report: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).with_context(|| format!("Failed to write report {}", path.display()))?;
    info!("Wrote run report to {}", path.display());
    Ok(())
}
