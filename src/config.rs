use anyhow::{Context, Result, bail};
use config_patcher::ValueMap;
use std::fs;
use std::path::Path;

/// 读取取值文件并叠加命令行 `--set`，后者优先
pub fn load_values(file: Option<&Path>, overrides: &[(String, String)]) -> Result<ValueMap> {
    let from_file: ValueMap = match file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read values file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse values file {}", path.display()))?
        }
        None => ValueMap::new(),
    };
    // 同名键后出现的覆盖先出现的
    Ok(from_file
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .chain(overrides.iter().cloned())
        .collect())
}

/// `--license-key` 优先，其次 `--license-file`，都没有时为空
pub fn license_payload(key: Option<&str>, file: Option<&Path>) -> Result<String> {
    match (key, file) {
        (Some(key), _) => Ok(key.to_string()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read license file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

pub fn parse_key_value(arg: &str) -> Result<(String, String)> {
    let Some((key, value)) = arg.split_once('=') else {
        bail!("expected KEY=VALUE, got `{}`", arg);
    };
    if key.trim().is_empty() {
        bail!("empty key in `{}`", arg);
    }
    Ok((key.trim().to_string(), value.to_string()))
}
