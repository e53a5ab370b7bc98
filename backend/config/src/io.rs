//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

/// File name looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "roomscribe.yaml";

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ROOMSCRIBE_CONFIG";

/// Resolve which config file to load.
///
/// Priority: explicit path (`--config`) > `ROOMSCRIBE_CONFIG` > `./roomscribe.yaml`
/// > `~/.roomscribe/config.yaml`. Returns `None` when nothing is found; the
/// config is then built from env vars and defaults alone.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    dirs::home_dir()
        .map(|home| home.join(".roomscribe").join("config.yaml"))
        .filter(|p| p.exists())
}

/// Read a YAML config file into an untyped value tree.
///
/// A missing file yields an empty object (first run).
pub async fn load_raw(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value = parse_yaml(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

/// Parse YAML text; an empty document is treated as an empty object.
pub fn parse_yaml(raw: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(raw)?;
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.yaml");
        assert_eq!(resolve_config_path(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn empty_document_is_empty_object() {
        assert_eq!(parse_yaml("").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn yaml_maps_to_json_tree() {
        let v = parse_yaml("server:\n  port: 9000\nmodel:\n  apiKey: ${KEY}\n").unwrap();
        assert_eq!(v["server"]["port"], 9000);
        assert_eq!(v["model"]["apiKey"], "${KEY}");
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let v = load_raw(Path::new("/nonexistent/roomscribe.yaml")).await.unwrap();
        assert_eq!(v, serde_json::json!({}));
    }
}
