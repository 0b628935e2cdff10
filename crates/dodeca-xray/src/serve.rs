//! Dev server routes answering the xray assets from the live snapshot

use crate::assets::{self, Asset};
use crate::snapshot::{SnapshotHandle, XrayData, read_snapshot};
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

/// Cache control headers
const CACHE_NO_CACHE: &str = "no-cache, no-store, must-revalidate";

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CACHE_CONTROL, CACHE_NO_CACHE),
            ],
            Body::from(self.body.into_owned()),
        )
            .into_response()
    }
}

/// Routes for every asset below `url_dir` (e.g. `/_xray`)
pub fn router(url_dir: &str, snapshot: SnapshotHandle) -> Router {
    let mut router = Router::new();

    for asset in assets::static_assets() {
        let url = asset.url(url_dir);
        router = router.route(
            &url,
            get(move || {
                let asset = asset.clone();
                async move { asset }
            }),
        );
    }

    router
        .route(
            &format!("{url_dir}/{}", assets::TIMESTAMP_NAME),
            get(timestamp_handler),
        )
        .route(
            &format!("{url_dir}/{}", assets::DATA_NAME),
            get(data_handler),
        )
        .with_state(snapshot)
}

async fn timestamp_handler(State(snapshot): State<SnapshotHandle>) -> Response {
    snapshot_response(&snapshot, assets::timestamp_asset)
}

async fn data_handler(State(snapshot): State<SnapshotHandle>) -> Response {
    snapshot_response(&snapshot, assets::data_asset)
}

fn snapshot_response(
    snapshot: &SnapshotHandle,
    build: fn(&XrayData) -> eyre::Result<Asset>,
) -> Response {
    match read_snapshot(snapshot, build) {
        Ok(asset) => asset.into_response(),
        Err(e) => {
            tracing::error!("Failed to serve xray snapshot: {e:?}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
