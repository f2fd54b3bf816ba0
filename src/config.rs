//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Every setting
//! has a stock default; a `config.toml` in the source directory overrides
//! just the keys it names, and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! out = "web"                 # Output directory
//! css = "style.css"           # Stylesheet copied to <out>/style.css
//! # url = "example.org"       # Canonical URL, required for RSS feeds
//! verbose = false
//! generate_previews = false
//!
//! [files]
//! index = "index"             # Root manifest
//! symbols = "symbols"         # Directive code mapping
//! header = "header.html"
//! footer = "footer.html"
//! feed_store = "rss-store.json"
//! feeds_listicle = "feeds"
//!
//! [copy]
//! ignore = [".git", "node_modules"]
//!
//! [git]
//! default_branch = "master"
//! remote = "local"
//!
//! [preview]
//! width = 1024
//! height = 512
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Output directory, relative to the working directory.
    pub out: String,
    /// Stylesheet copied into the output root.
    pub css: String,
    /// Canonical URL of the hosted site. Feeds are skipped without it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Print per-step diagnostics.
    pub verbose: bool,
    /// Emit open-graph tags and preview images.
    pub generate_previews: bool,
    /// Names of the input and state files, relative to the source directory.
    pub files: FilesConfig,
    /// Directory copy settings.
    pub copy: CopyConfig,
    /// Git mirror settings.
    pub git: GitConfig,
    /// Preview image dimensions.
    pub preview: PreviewConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            out: "web".to_string(),
            css: "style.css".to_string(),
            url: None,
            verbose: false,
            generate_previews: false,
            files: FilesConfig::default(),
            copy: CopyConfig::default(),
            git: GitConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.out.trim().is_empty() {
            return Err(ConfigError::Validation("out must not be empty".into()));
        }
        if self.files.index.trim().is_empty() {
            return Err(ConfigError::Validation(
                "files.index must not be empty".into(),
            ));
        }
        if self.git.default_branch.trim().is_empty() {
            return Err(ConfigError::Validation(
                "git.default_branch must not be empty".into(),
            ));
        }
        if self.preview.width == 0 || self.preview.height == 0 {
            return Err(ConfigError::Validation(
                "preview.width and preview.height must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Input and state file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    pub index: String,
    pub symbols: String,
    pub header: String,
    pub footer: String,
    /// Persisted feed item store (JSON).
    pub feed_store: String,
    /// Listicle enumerating the generated feeds.
    pub feeds_listicle: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            index: "index".to_string(),
            symbols: "symbols".to_string(),
            header: "header.html".to_string(),
            footer: "footer.html".to_string(),
            feed_store: "rss-store.json".to_string(),
            feeds_listicle: "feeds".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CopyConfig {
    /// Directory names never descended into when copying a tree.
    pub ignore: Vec<String>,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            ignore: vec![".git".to_string(), "node_modules".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Branch pushed by the post-commit hook when `br` is absent.
    pub default_branch: String,
    /// Name of the remote registered in source repositories.
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_branch: "master".to_string(),
            remote: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 512,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock config: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Prefix a scheme when the canonical URL has none.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Printed by `--gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# plainweb configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags win over this file.
# Unknown keys will cause an error.

# Output directory for the generated site.
out = "web"

# Stylesheet copied to <out>/style.css after the build.
css = "style.css"

# Canonical URL of the hosted site. Needed for RSS feeds and preview metadata.
# A missing scheme is treated as https.
# url = "example.org"

# Print every step of the build.
verbose = false

# Emit open-graph metadata and preview images under <out>/og/.
generate_previews = false

# ---------------------------------------------------------------------------
# Input and state files (relative to the source directory)
# ---------------------------------------------------------------------------
[files]
index = "index"
symbols = "symbols"
header = "header.html"
footer = "footer.html"
# Feed items already published; keeps pubDates stable between builds.
feed_store = "rss-store.json"
# Listicle written with one entry per generated feed.
feeds_listicle = "feeds"

# ---------------------------------------------------------------------------
# Directory copies (cp)
# ---------------------------------------------------------------------------
[copy]
# Directory names skipped at any depth.
ignore = [".git", "node_modules"]

# ---------------------------------------------------------------------------
# Git mirrors (gt)
# ---------------------------------------------------------------------------
[git]
# Branch pushed by the generated post-commit hook when `br` is not given.
default_branch = "master"
# Remote added to the source repository, pointing at the mirror.
remote = "local"

# ---------------------------------------------------------------------------
# Preview images
# ---------------------------------------------------------------------------
[preview]
width = 1024
height = 512
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.out, "web");
        assert_eq!(config.files.index, "index");
        assert_eq!(config.files.feed_store, "rss-store.json");
        assert_eq!(config.copy.ignore, vec![".git", "node_modules"]);
        assert_eq!(config.git.default_branch, "master");
        assert!(config.url.is_none());
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.out, "web");
        assert_eq!(config.preview.width, 1024);
    }

    #[test]
    fn load_config_merges_partial_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
url = "example.org"

[git]
default_branch = "main"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.url.as_deref(), Some("example.org"));
        assert_eq!(config.git.default_branch, "main");
        // Sibling keys keep their defaults
        assert_eq!(config.git.remote, "local");
        assert_eq!(config.out, "web");
    }

    #[test]
    fn load_config_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "outt = \"x\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[preview]\nwidth = 0\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn merge_toml_overlays_nested_tables() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.out, defaults.out);
        assert_eq!(config.files.symbols, defaults.files.symbols);
        assert_eq!(config.copy.ignore, defaults.copy.ignore);
        assert_eq!(config.preview.height, defaults.preview.height);
    }

    #[test]
    fn normalize_url_adds_missing_scheme() {
        assert_eq!(normalize_url("example.org"), "https://example.org");
        assert_eq!(normalize_url("http://example.org"), "http://example.org");
        assert_eq!(normalize_url(" https://a.b "), "https://a.b");
    }
}
