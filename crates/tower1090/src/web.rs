//! The HTTP view: a JSON snapshot of the merged fleet, the embedded map
//! page, and pass-through serving of locally cached tiles and leaflet
//! assets.

use serde::Serialize;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::reply::Reply;
use warp::Filter;

use crate::tracker::{unix_time, Tracker};

static INDEX_HTML: &str = include_str!("index.html");

/// An API error serializable to JSON.
#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

/// Compose all routes. `expire` is the staleness cutoff in seconds applied
/// when the snapshot is taken.
pub fn routes(
    tracker: Arc<Tracker>,
    expire: f64,
    static_dir: &Path,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let home = warp::path::end().map(|| warp::reply::html(INDEX_HTML));

    let aircraft = warp::path!("data" / "aircraft.json")
        .and(warp::any().map(move || tracker.clone()))
        .and_then(move |tracker: Arc<Tracker>| async move {
            aircraft_json(&tracker, expire).await
        });

    let tiles = warp::path("tiles").and(warp::fs::dir(static_dir.join("tiles")));
    let leaflet_css =
        warp::path("leaflet.css").and(warp::fs::file(static_dir.join("leaflet.css")));
    let leaflet_js =
        warp::path("leaflet.js").and(warp::fs::file(static_dir.join("leaflet.js")));

    warp::get().and(home.or(aircraft).or(tiles).or(leaflet_css).or(leaflet_js))
}

async fn aircraft_json(
    tracker: &Tracker,
    expire: f64,
) -> Result<warp::reply::Json, Infallible> {
    let snapshot = tracker.snapshot(unix_time(), expire).await;
    Ok::<_, Infallible>(warp::reply::json(&snapshot))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Route not found, try / or /data/aircraft.json";
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Only GET queries are supported";
    } else {
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Unknown error";
    }

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message: message.into(),
    });

    Ok(warp::reply::with_status(json, code))
}
