//! Files the browser client needs, served virtually or written to the output

use crate::snapshot::XrayData;
use eyre::Result;
use std::borrow::Cow;

/// Client script
pub const XRAY_JS: &str = include_str!("../assets/xray.js");
/// Client stylesheet, loaded into the overlay's shadow root
pub const XRAY_CSS: &str = include_str!("../assets/xray.css");

pub const XRAY_JS_NAME: &str = "xray.js";
pub const XRAY_CSS_NAME: &str = "xray.css";
pub const TIMESTAMP_NAME: &str = "xray-timestamp.json";
pub const DATA_NAME: &str = "xray-data.json";

/// A file below the xray directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// File name within the xray directory
    pub name: &'static str,
    pub content_type: &'static str,
    pub body: Cow<'static, str>,
}

impl Asset {
    /// URL of this asset when the xray directory is served at `url_dir`
    pub fn url(&self, url_dir: &str) -> String {
        format!("{url_dir}/{}", self.name)
    }
}

/// Script and stylesheet, identical for every build
pub fn static_assets() -> [Asset; 2] {
    [
        Asset {
            name: XRAY_JS_NAME,
            content_type: "text/javascript; charset=utf-8",
            body: Cow::Borrowed(XRAY_JS),
        },
        Asset {
            name: XRAY_CSS_NAME,
            content_type: "text/css; charset=utf-8",
            body: Cow::Borrowed(XRAY_CSS),
        },
    ]
}

/// Timestamp file the client checks before using its cached snapshot
pub fn timestamp_asset(snapshot: &XrayData) -> Result<Asset> {
    Ok(Asset {
        name: TIMESTAMP_NAME,
        content_type: "application/json",
        body: Cow::Owned(snapshot.timestamp_json()?),
    })
}

pub fn data_asset(snapshot: &XrayData) -> Result<Asset> {
    Ok(Asset {
        name: DATA_NAME,
        content_type: "application/json",
        body: Cow::Owned(snapshot.to_json()?),
    })
}

/// Every asset for the given snapshot
pub fn all_assets(snapshot: &XrayData) -> Result<Vec<Asset>> {
    let mut assets = static_assets().to_vec();
    assets.push(timestamp_asset(snapshot)?);
    assets.push(data_asset(snapshot)?);
    Ok(assets)
}
