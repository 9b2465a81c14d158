//! The JSON view model served at `/data/aircraft.json`. Field names follow
//! the dump1090 convention so stock map viewers can consume the feed.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Snapshot {
    /// Unix time of the snapshot, in seconds
    pub now: f64,
    /// Monotonic count of frames sent and received
    pub messages: u64,
    pub aircraft: Vec<Entry>,
}

/// One aircraft, simulated or received. Unknown numerics stay `null`.
#[derive(Debug, Serialize)]
pub struct Entry {
    pub hex: String,
    pub flight: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<i32>,
    pub track: Option<f64>,
    pub speed: Option<f64>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub messages: u64,
    /// Seconds since the last frame; 0 for simulated aircraft
    pub seen: i64,
    pub source: &'static str,
}
