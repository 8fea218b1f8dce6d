use crate::error::SetupError;
use crate::model::{DirectorySpec, ResourceCopySpec};
use std::fs;
use tracing::info;

/// 递归创建目录，已存在不报错
pub fn prepare_directories(spec: &DirectorySpec) -> Result<(), SetupError> {
    for dir in &spec.directories {
        info!("Creating IT folder {}", dir.display());
        fs::create_dir_all(dir).map_err(|source| SetupError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

/// 复制种子资源，覆盖已有文件
pub fn copy_resources(specs: &[ResourceCopySpec]) -> Result<(), SetupError> {
    for spec in specs {
        let source = spec.source();
        let target = spec.target();
        if !source.is_file() {
            return Err(SetupError::MissingResource { path: source });
        }
        info!("Copying resource {} to {}", source.display(), target.display());
        fs::create_dir_all(&spec.target_dir).map_err(|e| SetupError::CreateDirectory {
            path: spec.target_dir.clone(),
            source: e,
        })?;
        fs::copy(&source, &target).map_err(|e| SetupError::CopyResource {
            from: source.clone(),
            to: target.clone(),
            source: e,
        })?;
    }
    Ok(())
}
