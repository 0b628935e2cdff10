//! Template data inspector overlay for dodeca.
//!
//! Every page that asks for it gets an overlay showing the data its template
//! could see, split into page data (rendered into the page) and global data
//! (shared by all pages, loaded by the browser from a per-build snapshot).
//! See [`XrayPlugin`] for the build lifecycle.

pub mod assets;
pub mod benchmarks;
pub mod config;
pub mod data;
pub mod git;
pub mod overlay;
pub mod plugin;
pub mod serve;
pub mod snapshot;

pub use benchmarks::{Benchmark, BenchmarkGroup, Benchmarks, get_benchmarks};
pub use config::{XrayConfig, XrayMode, XrayOptions};
pub use git::GitInfo;
pub use overlay::{OverlayPage, relative_to_root, render_overlay};
pub use plugin::{BuildResult, PageContext, RunMode, XrayPlugin};
pub use snapshot::{PageData, PageField, SnapshotHandle, XrayData};
