//! Config file loading and creation.
//!
//! Config lives at ~/.config/blindrank/config.toml. All fields are
//! optional — CLI flags override config values.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct CliConfig {
    /// Root directory whose subdirectories are subsets.
    pub library: Option<PathBuf>,
    /// Where rating JSON files are kept.
    pub data_dir: Option<PathBuf>,
    /// Prefix for aesthetic tags written to sidecar files.
    pub tag_prefix: Option<String>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# blindrank configuration
# All values here can be overridden by CLI flags.

# Root directory whose subdirectories are image subsets
# library = \"/path/to/images\"

# Where rating state is persisted (created if missing)
# data_dir = \"/path/to/data\"

# Prefix for aesthetic tags written to sidecar .txt files
# tag_prefix = \"aesthetic_rating_\"
";

/// Returns the default config path: ~/.config/blindrank/config.toml
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("blindrank")
        .join("config.toml")
}

/// Load config from a file path. Returns default (all None) if the
/// file doesn't exist; a malformed file is a startup error, not
/// something to silently ignore.
pub fn load_config(path: &Path) -> Result<CliConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CliConfig::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read config at {}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config() -> Result<PathBuf> {
    let path = config_path();

    if path.exists() {
        bail!("config file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write config to {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_default() {
        let cfg = load_config(Path::new("/definitely/not/a/real/config.toml")).unwrap();
        assert!(cfg.library.is_none());
        assert!(cfg.data_dir.is_none());
        assert!(cfg.tag_prefix.is_none());
    }

    #[test]
    fn parses_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "library = \"/imgs\"\ntag_prefix = \"score_\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.library, Some(PathBuf::from("/imgs")));
        assert_eq!(cfg.tag_prefix.as_deref(), Some("score_"));
        assert!(cfg.data_dir.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "library = [not toml").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn template_is_valid_commented_toml() {
        let cfg: CliConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(cfg.library.is_none());
    }
}
