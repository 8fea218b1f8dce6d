use crate::error::CatalogError;
use crate::model::{AppendRule, DirectorySpec, OverrideRule, ResourceCopySpec};
use crate::values::ValueMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tinytemplate::TinyTemplate;

/// 内置规则目录
pub const DEFAULT_CATALOG: &str = include_str!("catalog.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
    pub license: LicenseEntry,
    #[serde(default)]
    pub overrides: Vec<FileOverride>,
    #[serde(default)]
    pub appends: Vec<FileAppend>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    pub name: String,
    pub source_dir: String,
    pub target_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicenseEntry {
    pub dir: String,
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileOverride {
    pub file: String,
    pub rules: Vec<PropertyOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyOverride {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileAppend {
    pub file: String,
    pub lines: Vec<String>,
}

impl Catalog {
    pub fn parse(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(DEFAULT_CATALOG)
    }

    pub fn directory_spec(&self, workspace_root: &Path) -> DirectorySpec {
        DirectorySpec {
            directories: self
                .directories
                .iter()
                .map(|dir| workspace_root.join(dir))
                .collect(),
        }
    }

    pub fn resource_specs(&self, project_root: &Path) -> Vec<ResourceCopySpec> {
        self.resources
            .iter()
            .map(|res| ResourceCopySpec {
                resource_name: res.name.clone(),
                source_dir: project_root.join(&res.source_dir),
                target_dir: project_root.join(&res.target_dir),
            })
            .collect()
    }

    pub fn license_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.license.dir).join(&self.license.file)
    }

    /// 生成替换规则，规则数量与取值是否齐全无关
    pub fn build_overrides(
        &self,
        values: &ValueMap,
        project_root: &Path,
    ) -> Result<Vec<OverrideRule>, CatalogError> {
        let renderer = Renderer::new(&self.keys, values);
        let mut rules = Vec::new();
        for entry in &self.overrides {
            let target_file = project_root.join(renderer.render(&entry.file)?);
            for prop in &entry.rules {
                rules.push(OverrideRule {
                    target_file: target_file.clone(),
                    match_pattern: prop.pattern.clone(),
                    replacement_line: renderer.render(&prop.replacement)?,
                });
            }
        }
        Ok(rules)
    }

    pub fn build_appends(
        &self,
        values: &ValueMap,
        project_root: &Path,
    ) -> Result<Vec<AppendRule>, CatalogError> {
        let renderer = Renderer::new(&self.keys, values);
        let mut rules = Vec::with_capacity(self.appends.len());
        for entry in &self.appends {
            let lines = entry
                .lines
                .iter()
                .map(|line| renderer.render(line))
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(AppendRule {
                target_file: project_root.join(renderer.render(&entry.file)?),
                lines,
            });
        }
        Ok(rules)
    }
}

/// 模板上下文：声明的键（缺失时为空）加上调用方提供的全部键
struct Renderer {
    context: BTreeMap<String, String>,
}

impl Renderer {
    fn new(keys: &[String], values: &ValueMap) -> Self {
        let mut context: BTreeMap<String, String> = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for key in keys {
            context
                .entry(key.clone())
                .or_insert_with(|| values.resolve(key).to_string());
        }
        Self { context }
    }

    fn render(&self, template: &str) -> Result<String, CatalogError> {
        if !template.contains('{') {
            return Ok(template.to_string());
        }
        let to_error = |source| CatalogError::Template {
            template: template.to_string(),
            source,
        };
        let mut tt = TinyTemplate::new();
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        tt.add_template("tpl", template).map_err(to_error)?;
        tt.render("tpl", &self.context).map_err(to_error)
    }
}
