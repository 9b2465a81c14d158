//! All mutable state shared between the simulator tick, the receiver tasks
//! and the web endpoint lives in one [`Tracker`] value behind a single
//! async mutex. Tasks hold the lock for bookkeeping only, never across
//! socket I/O.

use sim1090::decode::cpr::{airborne_position, CPRFormat, CprFrame};
use sim1090::prelude::*;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::fleet::Aircraft;
use crate::snapshot::{Entry, Snapshot};

/// Wall clock in seconds since the unix epoch.
pub fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// State assembled from inbound DF17 frames for one airframe.
#[derive(Debug, Clone, Default)]
pub struct TrackedAircraft {
    pub callsign: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<i32>,
    pub groundspeed: Option<f64>,
    pub track: Option<f64>,
    pub messages: u64,
    pub last_seen: f64,
    even: Option<CprFrame>,
    odd: Option<CprFrame>,
}

#[derive(Debug, Default)]
struct State {
    fleet: Vec<Aircraft>,
    received: BTreeMap<u32, TrackedAircraft>,
    /// Monotonic count of frames sent and received
    messages: u64,
}

#[derive(Debug, Default)]
pub struct Tracker {
    inner: Mutex<State>,
}

impl Tracker {
    pub fn new(fleet: Vec<Aircraft>) -> Self {
        Self {
            inner: Mutex::new(State {
                fleet,
                ..State::default()
            }),
        }
    }

    /// Run `f` over the simulated fleet under the lock.
    pub async fn with_fleet<R>(
        &self,
        f: impl FnOnce(&mut Vec<Aircraft>) -> R,
    ) -> R {
        let mut state = self.inner.lock().await;
        f(&mut state.fleet)
    }

    /// Account for frames successfully written to the downstream socket.
    pub async fn add_sent(&self, count: u64) {
        self.inner.lock().await.messages += count;
    }

    /// Fold one decoded inbound frame into the received-aircraft table.
    /// Anything that is not a DF17 extended squitter is ignored.
    pub async fn update(&self, msg: &Message, now: f64) {
        let ExtendedSquitterADSB(adsb) = &msg.df else {
            return;
        };
        let mut state = self.inner.lock().await;
        state.messages += 1;
        let aircraft = state.received.entry(adsb.icao24.0).or_default();
        aircraft.last_seen = now;
        aircraft.messages += 1;

        match &adsb.message {
            ME::BDS08(ident) => {
                if !ident.callsign.is_empty() {
                    aircraft.callsign = Some(ident.callsign.clone());
                }
            }
            ME::BDS05(position) => {
                // the altitude stands on its own, even when the CPR pair
                // is still incomplete
                if let Some(alt) = position.alt {
                    aircraft.altitude = Some(alt);
                }
                let frame = CprFrame {
                    parity: position.parity,
                    lat_cpr: position.lat_cpr,
                    lon_cpr: position.lon_cpr,
                    timestamp: now,
                };
                match position.parity {
                    CPRFormat::Even => aircraft.even = Some(frame),
                    CPRFormat::Odd => aircraft.odd = Some(frame),
                }
                if let (Some(even), Some(odd)) =
                    (&aircraft.even, &aircraft.odd)
                {
                    if let Some(position) = airborne_position(even, odd) {
                        aircraft.latitude = Some(position.latitude);
                        aircraft.longitude = Some(position.longitude);
                    }
                }
            }
            ME::BDS09(velocity) => {
                if let Some(speed) = velocity.groundspeed {
                    aircraft.groundspeed = Some(speed);
                }
                if let Some(track) = velocity.track {
                    aircraft.track = Some(track);
                }
            }
            ME::Unsupported { .. } => {}
        }
    }

    /// Expire stale received aircraft, then merge both fleets into the
    /// serializable snapshot. Serialization happens outside the lock.
    pub async fn snapshot(&self, now: f64, timeout: f64) -> Snapshot {
        let mut state = self.inner.lock().await;
        state
            .received
            .retain(|_, aircraft| now - aircraft.last_seen <= timeout);

        let mut aircraft =
            Vec::with_capacity(state.fleet.len() + state.received.len());
        for ac in &state.fleet {
            let (lat, lon) = ac.position();
            aircraft.push(Entry {
                hex: format!("{:06X}", ac.icao),
                flight: ac.callsign.clone(),
                lat: Some(lat),
                lon: Some(lon),
                altitude: Some(ac.altitude_ft),
                track: Some(ac.heading()),
                speed: Some(ac.speed_kn),
                kind: ac.kind.as_str(),
                messages: state.messages,
                seen: 0,
                source: "simulated",
            });
        }
        for (icao, ac) in &state.received {
            aircraft.push(Entry {
                hex: format!("{icao:06X}"),
                flight: ac
                    .callsign
                    .clone()
                    .unwrap_or_else(|| format!("{icao:06X}")),
                lat: ac.latitude,
                lon: ac.longitude,
                altitude: ac.altitude,
                track: ac.track,
                speed: ac.groundspeed,
                kind: "unknown",
                messages: ac.messages,
                seen: (now - ac.last_seen) as i64,
                source: "adsb",
            });
        }

        Snapshot {
            now,
            messages: state.messages,
            aircraft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim1090::encode;

    fn decode(frame: &str) -> Message {
        let bytes = hex::decode(frame).unwrap();
        Message::from_bytes((&bytes, 0)).unwrap().1
    }

    #[tokio::test]
    async fn frames_assemble_an_aircraft() {
        let tracker = Tracker::new(Vec::new());
        let icao = 0xAAA111;

        tracker
            .update(&decode(&encode::ident(icao, "TEST01")), 100.0)
            .await;
        tracker
            .update(
                &decode(&encode::position(
                    icao,
                    33.8,
                    -84.4,
                    12_000,
                    CPRFormat::Even,
                )),
                100.2,
            )
            .await;
        tracker
            .update(
                &decode(&encode::position(
                    icao,
                    33.8,
                    -84.4,
                    12_000,
                    CPRFormat::Odd,
                )),
                100.7,
            )
            .await;
        tracker
            .update(&decode(&encode::velocity(icao, 320.0, 45.0, 0)), 101.0)
            .await;

        let snapshot = tracker.snapshot(101.5, 60.0).await;
        assert_eq!(snapshot.aircraft.len(), 1);
        let entry = &snapshot.aircraft[0];
        assert_eq!(entry.hex, "AAA111");
        assert_eq!(entry.flight, "TEST01");
        assert_eq!(entry.altitude, Some(12_000));
        assert!((entry.lat.unwrap() - 33.8).abs() < 5e-4);
        assert!((entry.lon.unwrap() + 84.4).abs() < 5e-4);
        assert!((entry.speed.unwrap() - 320.0).abs() < 1.5);
        assert!((entry.track.unwrap() - 45.0).abs() < 1.0);
        assert_eq!(entry.source, "adsb");
        assert_eq!(entry.kind, "unknown");
        assert_eq!(entry.messages, 4);
        assert_eq!(entry.seen, 0);
    }

    #[tokio::test]
    async fn altitude_survives_an_incomplete_cpr_pair() {
        let tracker = Tracker::new(Vec::new());
        tracker
            .update(
                &decode(&encode::position(
                    0x123456,
                    10.0,
                    20.0,
                    25_000,
                    CPRFormat::Even,
                )),
                50.0,
            )
            .await;
        let snapshot = tracker.snapshot(50.0, 60.0).await;
        let entry = &snapshot.aircraft[0];
        assert_eq!(entry.altitude, Some(25_000));
        assert_eq!(entry.lat, None);
        assert_eq!(entry.lon, None);
    }

    #[tokio::test]
    async fn stale_aircraft_leave_the_snapshot() {
        let tracker = Tracker::new(Vec::new());
        tracker
            .update(&decode(&encode::ident(0xAAA111, "GHOST")), 1000.0)
            .await;

        let visible = tracker.snapshot(1059.0, 60.0).await;
        assert_eq!(visible.aircraft.len(), 1);

        let expired = tracker.snapshot(1061.0, 60.0).await;
        assert!(expired.aircraft.is_empty());
    }

    #[tokio::test]
    async fn non_adsb_frames_are_ignored() {
        let tracker = Tracker::new(Vec::new());
        tracker
            .update(&decode("A0001910CC300030AA0000EAE004"), 10.0)
            .await;
        let snapshot = tracker.snapshot(10.0, 60.0).await;
        assert!(snapshot.aircraft.is_empty());
        assert_eq!(snapshot.messages, 0);
    }
}
