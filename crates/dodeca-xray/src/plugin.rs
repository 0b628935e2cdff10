//! Build lifecycle hooks
//!
//! The host drives the plugin through one build at a time:
//!
//! 1. [`XrayPlugin::before_build`] starts a fresh snapshot
//! 2. [`XrayPlugin::overlay`] is called for every page that asks for the
//!    overlay, and returns the markup to inject
//! 3. [`XrayPlugin::after_build`] records sizes, timings and Git state, and
//!    in build mode writes the snapshot and client assets to the output
//!
//! Under the dev server the same assets are answered by [`XrayPlugin::router`].

use crate::assets::{self, Asset};
use crate::benchmarks::{BenchmarkGroup, get_benchmarks};
use crate::config::{XrayMode, XrayOptions};
use crate::git::GitInfo;
use crate::overlay::{OverlayPage, render_overlay};
use crate::serve;
use crate::snapshot::{PageField, SnapshotHandle, XrayData, read_snapshot, write_snapshot};
use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result, WrapErr, bail};
use std::fmt;
use std::str::FromStr;
use xray::{DataParser, Value};

/// How the host is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One-off build
    Build,
    /// Rebuild on change, output served by something else
    Watch,
    /// Dev server
    Serve,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Build => "build",
            RunMode::Watch => "watch",
            RunMode::Serve => "serve",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build" => Ok(RunMode::Build),
            "watch" => Ok(RunMode::Watch),
            "serve" => Ok(RunMode::Serve),
            other => bail!("unknown run mode `{other}` (expected build, watch or serve)"),
        }
    }
}

/// A page asking for the overlay
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub url: &'a str,
    /// Template the page is rendered from
    pub input_path: &'a str,
    /// Everything the template can see
    pub context: &'a Value,
    /// Top-level context keys that come from global data
    pub global_keys: &'a [String],
}

/// A page written by the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub url: String,
    pub input_path: String,
    /// Size of the written page in bytes
    pub size: usize,
}

impl BuildResult {
    pub fn new(url: impl Into<String>, input_path: impl Into<String>, content: &str) -> Self {
        Self {
            url: url.into(),
            input_path: input_path.into(),
            size: content.len(),
        }
    }
}

pub struct XrayPlugin {
    options: XrayOptions,
    run_mode: RunMode,
    /// Host name and version shown in the overlay
    generator: String,
    disabled: Option<String>,
    parser: DataParser,
    snapshot: SnapshotHandle,
}

impl XrayPlugin {
    /// Set up the plugin, checking `only_env` against the process environment
    pub fn new(options: XrayOptions, run_mode: RunMode, generator: impl Into<String>) -> Self {
        let env_value = std::env::var(&options.only_env_name).ok();
        Self::with_env(options, run_mode, generator, env_value.as_deref())
    }

    /// Set up the plugin with an explicit value for the `only_env_name` variable
    pub fn with_env(
        options: XrayOptions,
        run_mode: RunMode,
        generator: impl Into<String>,
        env_value: Option<&str>,
    ) -> Self {
        let disabled = disabled_reason(&options, run_mode, env_value);
        match &disabled {
            Some(reason) => tracing::warn!("{reason}. Xray disabled."),
            None => tracing::debug!(?options, %run_mode, "Xray enabled"),
        }

        let parser = DataParser::new(options.parse_options());
        Self {
            options,
            run_mode,
            generator: generator.into(),
            disabled,
            parser,
            snapshot: XrayData::new().into_handle(),
        }
    }

    pub fn options(&self) -> &XrayOptions {
        &self.options
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled.is_none()
    }

    /// Why the plugin is disabled, if it is
    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled.as_deref()
    }

    /// Whether assets are answered by the dev server instead of written
    pub fn serves_virtually(&self) -> bool {
        self.is_enabled()
            && self.run_mode == RunMode::Serve
            && matches!(self.options.mode, XrayMode::Auto | XrayMode::Serve)
    }

    /// Whether assets are written to the output directory after each build
    pub fn writes_files(&self) -> bool {
        self.is_enabled()
            && match self.options.mode {
                XrayMode::Build => true,
                XrayMode::Auto => self.run_mode != RunMode::Serve,
                XrayMode::Serve => false,
            }
    }

    /// The live snapshot; shared with the dev server routes
    pub fn snapshot(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    /// Forget everything from the previous build
    pub fn before_build(&mut self) {
        if !self.is_enabled() {
            return;
        }
        tracing::debug!("Starting xray snapshot");
        self.parser.reset();
        write_snapshot(&self.snapshot, |data| *data = XrayData::new());
    }

    /// Overlay markup for one page.
    ///
    /// The first page of a build also fills in the global data tree.
    pub fn overlay(&mut self, page: &PageContext<'_>) -> Result<String> {
        if !self.is_enabled() {
            return Ok(String::new());
        }

        if self.parser.global_keys().is_none() {
            let mut keys = page.global_keys.to_vec();
            for key in &self.options.shallow_keys {
                if !keys.contains(key) {
                    keys.push(key.clone());
                }
            }
            tracing::debug!(url = page.url, ?keys, "Parsing global data");
            self.parser.set_global_keys(keys);

            let global = self.parser.parse_global_data(page.context)?;
            if let Some(global) = global {
                write_snapshot(&self.snapshot, |data| data.set_global_data(global));
            }
        }

        let page_html = match self.parser.parse_page_data(page.context)? {
            Some(tree) => xray::render(&tree),
            None => String::new(),
        };

        let url_dir = self.options.url_dir();
        let generator = format!("{} ({})", self.generator, self.run_mode);
        let html = render_overlay(&OverlayPage {
            url: page.url,
            input_path: page.input_path,
            xray_dir: &url_dir,
            log_level: self.options.log_level.as_deref(),
            generator: &generator,
            page_html: &page_html,
        })
        .wrap_err_with(|| format!("Failed to render xray overlay for {}", page.url))?;

        write_snapshot(&self.snapshot, |data| {
            data.set_page_field(page.url, PageField::XraySize(html.len()))
        });
        Ok(html)
    }

    /// Record what the build produced in the snapshot without writing files
    pub fn record_build(
        &self,
        results: &[BuildResult],
        benchmarks: Option<&BenchmarkGroup>,
        project_root: &Utf8Path,
    ) {
        if !self.is_enabled() {
            return;
        }

        let git = if self.options.git {
            match GitInfo::discover(project_root) {
                Ok(Some(git)) => Some(git),
                Ok(None) => {
                    tracing::debug!("{project_root} is not in a Git repository");
                    None
                }
                Err(e) => {
                    tracing::warn!("Skipping Git info: {e:?}");
                    None
                }
            }
        } else {
            None
        };

        write_snapshot(&self.snapshot, |data| {
            if let Some(git) = git {
                data.set_git(git);
            }
            for result in results {
                data.set_page_field(&result.url, PageField::Size(result.size));
                if self.options.benchmarks {
                    let timings = get_benchmarks(&result.input_path, benchmarks);
                    data.set_page_field(&result.url, PageField::Benchmarks(timings));
                }
            }
        });
        tracing::debug!(pages = results.len(), "Xray snapshot complete");
    }

    /// Record what the build produced and, in build mode, write the files.
    ///
    /// Returns the paths written.
    pub async fn after_build(
        &self,
        results: &[BuildResult],
        benchmarks: Option<&BenchmarkGroup>,
        project_root: &Utf8Path,
        output_dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>> {
        self.record_build(results, benchmarks, project_root);
        if !self.writes_files() {
            return Ok(Vec::new());
        }
        let assets = self.assets()?;
        write_assets(&output_dir.join(&self.options.dir), &assets).await
    }

    /// Every asset for the current snapshot
    pub fn assets(&self) -> Result<Vec<Asset>> {
        read_snapshot(&self.snapshot, assets::all_assets)
    }

    /// Dev server routes for the assets, answering from the live snapshot
    pub fn router(&self) -> axum::Router {
        serve::router(&self.options.url_dir(), self.snapshot())
    }
}

fn disabled_reason(
    options: &XrayOptions,
    run_mode: RunMode,
    env_value: Option<&str>,
) -> Option<String> {
    if let Some(only_env) = options.only_env.as_deref()
        && env_value != Some(only_env)
    {
        return Some(format!(
            "onlyEnv condition not met ({}={} but expected {only_env})",
            options.only_env_name,
            env_value.unwrap_or("<unset>")
        ));
    }
    if options.mode == XrayMode::Serve && run_mode != RunMode::Serve {
        return Some(format!("Run mode is `{run_mode}` but xray mode is `serve`"));
    }
    None
}

/// Write assets into `dir`, creating it if needed
pub async fn write_assets(dir: &Utf8Path, assets: &[Asset]) -> Result<Vec<Utf8PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .wrap_err_with(|| format!("Failed to create {dir}"))?;

    let mut written = Vec::with_capacity(assets.len());
    for asset in assets {
        let path = dir.join(asset.name);
        tokio::fs::write(&path, asset.body.as_bytes())
            .await
            .wrap_err_with(|| format!("Error while writing xray file {path}"))?;
        written.push(path);
    }
    tracing::info!("Wrote {} xray files to {dir}", written.len());
    Ok(written)
}
