//! Configuration file discovery and parsing
//!
//! Searches for `.config/xray.yaml` walking up from a directory. Every field
//! is optional; missing fields take the defaults of [`XrayOptions`].

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result, WrapErr, bail, eyre};
use facet::Facet;
use std::str::FromStr;
use xray::{DEFAULT_CUTOFF, DEFAULT_MAX_DEPTH, DEFAULT_SHALLOW_KEYS, ParseOptions};

const CONFIG_DIR: &str = ".config";
const CONFIG_FILE_YAML: &str = "xray.yaml";

/// Environment variable checked against `only_env` unless overridden
pub const DEFAULT_ONLY_ENV_NAME: &str = "DODECA_ENV";

/// Xray configuration from `.config/xray.yaml`
#[derive(Debug, Clone, Default, Facet)]
#[facet(rename_all = "snake_case")]
pub struct XrayConfig {
    /// Record per-page render timings in the snapshot
    #[facet(default)]
    pub benchmarks: Option<bool>,

    /// Maximum characters of a summarized string before it is cut
    #[facet(default)]
    pub cutoff: Option<u32>,

    /// Output subdirectory for the snapshot and client assets
    #[facet(default)]
    pub dir: Option<String>,

    /// Record the current commit and branch in the snapshot
    #[facet(default)]
    pub git: Option<bool>,

    /// Client log level (`debug`, `info`, `warn`, `error`); empty to leave unset
    #[facet(default)]
    pub log_level: Option<String>,

    /// Number of levels walked below the root
    #[facet(default)]
    pub max_depth: Option<u32>,

    /// `auto`, `build` or `serve`
    #[facet(default)]
    pub mode: Option<String>,

    /// Only enable the overlay when the environment variable has this value
    #[facet(default)]
    pub only_env: Option<String>,

    /// Name of the environment variable compared against `only_env`
    #[facet(default)]
    pub only_env_name: Option<String>,

    /// Keys whose objects are summarized instead of walked
    #[facet(default)]
    pub shallow_keys: Option<Vec<String>>,
}

/// How the snapshot and client assets reach the browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XrayMode {
    /// Virtual assets when serving, files when building
    #[default]
    Auto,
    /// Always write files to the output directory
    Build,
    /// Only active under the dev server
    Serve,
}

impl FromStr for XrayMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "build" => Ok(Self::Build),
            "serve" => Ok(Self::Serve),
            other => bail!("unknown xray mode `{other}` (expected auto, build or serve)"),
        }
    }
}

/// Resolved options with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrayOptions {
    pub benchmarks: bool,
    pub cutoff: usize,
    /// Output subdirectory, without leading or trailing slashes
    pub dir: String,
    pub git: bool,
    pub log_level: Option<String>,
    pub max_depth: usize,
    pub mode: XrayMode,
    pub only_env: Option<String>,
    pub only_env_name: String,
    pub shallow_keys: Vec<String>,
}

impl Default for XrayOptions {
    fn default() -> Self {
        Self {
            benchmarks: true,
            cutoff: DEFAULT_CUTOFF,
            dir: "_xray".to_string(),
            git: true,
            log_level: Some("warn".to_string()),
            max_depth: DEFAULT_MAX_DEPTH,
            mode: XrayMode::Auto,
            only_env: None,
            only_env_name: DEFAULT_ONLY_ENV_NAME.to_string(),
            shallow_keys: DEFAULT_SHALLOW_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl XrayOptions {
    /// Apply defaults to a parsed config file
    pub fn resolve(config: XrayConfig) -> Result<Self> {
        let defaults = Self::default();

        let dir = match config.dir {
            Some(dir) => {
                let trimmed = dir.trim_matches('/');
                if trimmed.is_empty() {
                    bail!("xray `dir` must name a subdirectory, got `{dir}`");
                }
                trimmed.to_string()
            }
            None => defaults.dir,
        };

        let mode = match config.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => defaults.mode,
        };

        let log_level = match config.log_level {
            Some(level) if level.is_empty() => None,
            Some(level) => Some(level),
            None => defaults.log_level,
        };

        Ok(Self {
            benchmarks: config.benchmarks.unwrap_or(defaults.benchmarks),
            cutoff: config.cutoff.map_or(defaults.cutoff, |c| c as usize),
            dir,
            git: config.git.unwrap_or(defaults.git),
            log_level,
            max_depth: config.max_depth.map_or(defaults.max_depth, |d| d as usize),
            mode,
            only_env: config.only_env,
            only_env_name: config.only_env_name.unwrap_or(defaults.only_env_name),
            shallow_keys: config.shallow_keys.unwrap_or(defaults.shallow_keys),
        })
    }

    /// Parse YAML config text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: XrayConfig = facet_yaml::from_str(content)
            .map_err(|e| eyre!("Failed to parse xray config: {e}"))?;
        Self::resolve(config)
    }

    /// Load options from a specific file
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content =
            fs_err::read_to_string(path).wrap_err_with(|| format!("Failed to read {path}"))?;
        Self::from_yaml(&content).wrap_err_with(|| format!("Invalid config in {path}"))
    }

    /// Search for `.config/xray.yaml` walking up from `start`
    pub fn discover_from(start: &Utf8Path) -> Result<Option<Self>> {
        match find_config_file(start) {
            Some(path) => {
                tracing::debug!("Loading xray config from {path}");
                Ok(Some(Self::load(&path)?))
            }
            None => Ok(None),
        }
    }

    /// Search from `start`, falling back to defaults when no config exists
    pub fn discover_or_default(start: &Utf8Path) -> Result<Self> {
        Ok(Self::discover_from(start)?.unwrap_or_default())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
            cutoff: self.cutoff,
            shallow_keys: self.shallow_keys.clone(),
        }
    }

    /// Absolute URL path of the xray directory, e.g. `/_xray`
    pub fn url_dir(&self) -> String {
        format!("/{}", self.dir)
    }
}

fn find_config_file(start: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = start;
    loop {
        let yaml_file = current.join(CONFIG_DIR).join(CONFIG_FILE_YAML);
        if yaml_file.exists() {
            return Some(yaml_file);
        }
        current = current.parent()?;
    }
}
