use crate::error::SetupError;
use crate::model::{LicenseMode, LicenseSpec};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::{info, warn};

/// 写入 license 文件，父目录不存在时创建
pub fn install_license(spec: &LicenseSpec) -> Result<(), SetupError> {
    let path = &spec.target_path;
    let to_error = |source| SetupError::License {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }

    info!("Adding license to {}", path.display());
    let mut options = OpenOptions::new();
    options.create(true);
    match spec.mode {
        LicenseMode::Append => options.append(true),
        LicenseMode::Truncate => options.write(true).truncate(true),
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o777);
    }
    let mut file = options.open(path).map_err(to_error)?;
    file.write_all(spec.payload.as_bytes()).map_err(to_error)?;

    match fs::metadata(path) {
        Ok(meta) => info!("License file {} is {} bytes", path.display(), meta.len()),
        Err(e) => warn!("Cannot stat {}: {}", path.display(), e),
    }
    Ok(())
}
