use serde::Serialize;
use std::path::PathBuf;

/// 按行替换：匹配 `match_pattern` 的部分替换为 `replacement_line`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideRule {
    pub target_file: PathBuf,
    pub match_pattern: String,
    pub replacement_line: String,
}

/// 追加到文件末尾的行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendRule {
    pub target_file: PathBuf,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySpec {
    pub directories: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCopySpec {
    pub resource_name: String,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
}

impl ResourceCopySpec {
    pub fn source(&self) -> PathBuf {
        self.source_dir.join(&self.resource_name)
    }

    pub fn target(&self) -> PathBuf {
        self.target_dir.join(&self.resource_name)
    }
}

/// License 写入方式。默认追加，重复运行会重复写入内容。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LicenseMode {
    #[default]
    Append,
    Truncate,
}

#[derive(Debug, Clone)]
pub struct LicenseSpec {
    pub target_path: PathBuf,
    pub payload: String,
    pub mode: LicenseMode,
}
