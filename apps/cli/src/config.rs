//! CLI configuration discovery and loading.

use anyhow::{Context, Result, bail};
use prism_core::PrismConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Local config file name, looked up in the current directory.
const LOCAL_CONFIG: &str = "prism.toml";

/// Locate the config file to load.
///
/// Precedence:
/// 1. `--config` path
/// 2. Local config file (./prism.toml)
/// 3. Global config file (~/.prism/config.toml)
///
/// Returns `None` when no config file exists, in which case defaults apply.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }

    default_global_path().filter(|path| path.exists())
}

/// Global config path (~/.prism/config.toml).
pub fn default_global_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".prism").join("config.toml"))
}

/// Load the effective configuration.
///
/// An explicit `--config` path must exist; discovered files are optional.
pub fn load_config(explicit: Option<&Path>) -> Result<PrismConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
    }

    match discover_config_path(explicit) {
        Some(path) => {
            debug!(path = %path.display(), "Loading config");
            PrismConfig::load(&path)
                .with_context(|| format!("Failed to load config: {}", path.display()))
        }
        None => Ok(PrismConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/some/where/prism.toml");
        assert_eq!(discover_config_path(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = load_config(Some(&temp.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "[batch]\nmax_concurrent = 7\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.batch.max_concurrent, 7);
    }

    #[test]
    fn test_global_path_shape() {
        if let Some(path) = default_global_path() {
            assert!(path.ends_with(".prism/config.toml"));
        }
    }
}
