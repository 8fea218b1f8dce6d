use crate::catalog::Catalog;
use crate::error::SetupError;
use crate::license::install_license;
use crate::model::{LicenseMode, LicenseSpec};
use crate::patch::{AppliedPatch, PatchFailure, apply_appends, apply_overrides};
use crate::prepare::{copy_resources, prepare_directories};
use crate::values::ValueMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 一次运行所需的环境：项目根目录、workspace 根目录、规则目录
#[derive(Debug, Clone)]
pub struct SetupContext {
    pub project_root: PathBuf,
    pub workspace_root: PathBuf,
    pub catalog: Catalog,
    pub license_mode: LicenseMode,
}

impl SetupContext {
    /// workspace 根目录默认为项目根目录的上一级
    pub fn new(project_root: impl Into<PathBuf>, catalog: Catalog) -> Self {
        let project_root = project_root.into();
        let workspace_root = project_root
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_root.join(".."));
        Self {
            project_root,
            workspace_root,
            catalog,
            license_mode: LicenseMode::default(),
        }
    }

    pub fn with_workspace_root(mut self, workspace_root: impl Into<PathBuf>) -> Self {
        self.workspace_root = workspace_root.into();
        self
    }

    pub fn with_license_mode(mut self, mode: LicenseMode) -> Self {
        self.license_mode = mode;
        self
    }
}

#[derive(Debug, Default)]
pub struct SetupReport {
    pub applied: Vec<AppliedPatch>,
    pub failures: Vec<PatchFailure>,
    pub license_path: PathBuf,
}

impl SetupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 运行结果：成功 / 带告警的成功 / 致命失败
#[derive(Debug)]
pub enum Outcome {
    Success(SetupReport),
    SuccessWithWarnings(SetupReport),
    Fatal(SetupError),
}

impl From<Result<SetupReport, SetupError>> for Outcome {
    fn from(result: Result<SetupReport, SetupError>) -> Self {
        match result {
            Ok(report) if report.is_clean() => Outcome::Success(report),
            Ok(report) => Outcome::SuccessWithWarnings(report),
            Err(e) => Outcome::Fatal(e),
        }
    }
}

/// 准备目录 -> 复制资源 -> 替换 -> 追加 -> license
pub fn setup_test_environment(
    ctx: &SetupContext,
    values: &ValueMap,
    license_payload: &str,
    debug: bool,
) -> Result<SetupReport, SetupError> {
    info!("Preparing integration tests");
    prepare_directories(&ctx.catalog.directory_spec(&ctx.workspace_root))?;
    copy_resources(&ctx.catalog.resource_specs(&ctx.project_root))?;

    let overrides = ctx.catalog.build_overrides(values, &ctx.project_root)?;
    let appends = ctx.catalog.build_appends(values, &ctx.project_root)?;

    info!("Overriding properties");
    log_detected("overrides", &overrides);
    let override_report = apply_overrides(&overrides, debug);

    info!("Adding properties");
    log_detected("appends", &appends);
    let append_report = apply_appends(&appends);

    let license_path = ctx.catalog.license_path(&ctx.workspace_root);
    install_license(&LicenseSpec {
        target_path: license_path.clone(),
        payload: license_payload.to_string(),
        mode: ctx.license_mode,
    })?;

    let mut report = SetupReport {
        license_path,
        ..Default::default()
    };
    for part in [override_report, append_report] {
        report.applied.extend(part.applied);
        report.failures.extend(part.failures);
    }
    if !report.is_clean() {
        warn!("Completed with {} failed patches", report.failures.len());
    }
    Ok(report)
}

fn log_detected<T: serde::Serialize>(what: &str, rules: &T) {
    match serde_json::to_string_pretty(rules) {
        Ok(json) => info!("Detected {} {}", what, json),
        Err(e) => warn!("Cannot serialize {}: {}", what, e),
    }
}
