mod config;
mod report;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use config_patcher::{Catalog, LicenseMode, Outcome, SetupContext, setup_test_environment};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error};

#[derive(Parser)]
#[command(about = "Prepare config files, folders and license for integration tests")]
struct Cli {
    /// 项目根目录
    #[arg(long)]
    project_root: PathBuf,
    /// 默认为项目根目录的上一级
    #[arg(long)]
    workspace_root: Option<PathBuf>,
    /// 取值文件 (TOML)
    #[arg(long)]
    values: Option<PathBuf>,
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = config::parse_key_value)]
    set: Vec<(String, String)>,
    #[arg(long, conflicts_with = "license_file")]
    license_key: Option<String>,
    #[arg(long)]
    license_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = LicenseModeArg::Append)]
    license_mode: LicenseModeArg,
    /// 替换内置规则目录
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// 运行结果写入 JSON
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LicenseModeArg {
    Append,
    Truncate,
}

impl From<LicenseModeArg> for LicenseMode {
    fn from(arg: LicenseModeArg) -> Self {
        match arg {
            LicenseModeArg::Append => LicenseMode::Append,
            LicenseModeArg::Truncate => LicenseMode::Truncate,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let values = config::load_values(cli.values.as_deref(), &cli.set)?;
    let payload = config::license_payload(cli.license_key.as_deref(), cli.license_file.as_deref())?;
    let catalog = match &cli.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin()?,
    };

    let project_root = std::fs::canonicalize(&cli.project_root)
        .with_context(|| format!("Project root {} not found", cli.project_root.display()))?;
    let mut ctx =
        SetupContext::new(project_root, catalog).with_license_mode(cli.license_mode.into());
    if let Some(workspace_root) = &cli.workspace_root {
        ctx = ctx.with_workspace_root(workspace_root);
    }

    let started = Local::now();
    let outcome = Outcome::from(setup_test_environment(&ctx, &values, &payload, cli.debug));
    if let Some(path) = &cli.report {
        report::write_report(path, &report::to_json(&outcome, started, Local::now()))?;
    }
    Ok(report::summarize(&outcome))
}
