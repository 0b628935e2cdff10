//! The build snapshot served to the browser client as `xray-data.json`

use crate::benchmarks::Benchmarks;
use crate::git::GitInfo;
use eyre::{Result, WrapErr};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use xray::Descriptor;

/// Snapshot shared between the build and the dev server routes
pub type SnapshotHandle = Arc<RwLock<XrayData>>;

/// Everything known about the last build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XrayData {
    /// Build start, in milliseconds since the Unix epoch.
    ///
    /// The client caches the snapshot under this value.
    pub timestamp: i64,
    /// Per-page facts keyed by page URL
    pub pages: BTreeMap<String, PageData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_data: Option<Descriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    /// Size of the rendered page in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Bytes of the page taken by the overlay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xray_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmarks: Option<Benchmarks>,
}

/// One fact about a page
#[derive(Debug, Clone, PartialEq)]
pub enum PageField {
    Size(usize),
    XraySize(usize),
    Benchmarks(Benchmarks),
}

#[derive(Serialize)]
struct Timestamp {
    timestamp: i64,
}

impl XrayData {
    /// An empty snapshot stamped with the current time
    pub fn new() -> Self {
        Self::at(chrono::Utc::now().timestamp_millis())
    }

    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn into_handle(self) -> SnapshotHandle {
        Arc::new(RwLock::new(self))
    }

    /// Record a fact about the page at `url`, creating its entry if needed
    pub fn set_page_field(&mut self, url: &str, field: PageField) {
        let page = self.pages.entry(url.to_string()).or_default();
        match field {
            PageField::Size(size) => page.size = Some(size),
            PageField::XraySize(size) => page.xray_size = Some(size),
            PageField::Benchmarks(benchmarks) => page.benchmarks = Some(benchmarks),
        }
    }

    pub fn page(&self, url: &str) -> Option<&PageData> {
        self.pages.get(url)
    }

    pub fn set_global_data(&mut self, global_data: Descriptor) {
        self.global_data = Some(global_data);
    }

    pub fn has_global_data(&self) -> bool {
        self.global_data.is_some()
    }

    pub fn set_git(&mut self, git: GitInfo) {
        self.git = Some(git);
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).wrap_err("Failed to serialize xray snapshot")
    }

    /// Contents of `xray-timestamp.json`
    pub fn timestamp_json(&self) -> Result<String> {
        serde_json::to_string(&Timestamp {
            timestamp: self.timestamp,
        })
        .wrap_err("Failed to serialize xray timestamp")
    }
}

/// Read the shared snapshot, ignoring poisoning from a panicked writer
pub fn read_snapshot<T>(handle: &SnapshotHandle, f: impl FnOnce(&XrayData) -> T) -> T {
    let guard = handle.read().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

/// Update the shared snapshot, ignoring poisoning from a panicked writer
pub fn write_snapshot<T>(handle: &SnapshotHandle, f: impl FnOnce(&mut XrayData) -> T) -> T {
    let mut guard = handle.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}
