use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 致命错误，立即中止运行
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    #[error("resource source {path} does not exist")]
    MissingResource { path: PathBuf },

    #[error("failed to copy resource {from} to {to}: {source}")]
    CopyResource {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to install license at {path}: {source}")]
    License { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render template `{template}`: {source}")]
    Template {
        template: String,
        source: tinytemplate::error::Error,
    },
}

/// 单个文件或单条规则的失败，记录后继续
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("cannot append to {path}: {source}")]
    Append { path: PathBuf, source: io::Error },
}
