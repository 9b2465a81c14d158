//! The outbound half: a 10 Hz tick advances the fleet, emits whatever each
//! aircraft owes on its per-class schedule, and writes the Beast-framed
//! result to the downstream TCP consumer. The socket belongs to this task
//! alone; on write failure it reconnects with a bounded retry budget while
//! the fleet keeps flying.

use rand::Rng;
use sim1090::encode;
use sim1090::wire::beast;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::fleet::Aircraft;
use crate::tracker::Tracker;

const TICK: Duration = Duration::from_millis(100);
const IDENT_INTERVAL: Duration = Duration::from_secs(10);
const POSITION_INTERVAL: Duration = Duration::from_millis(500);
const VELOCITY_INTERVAL: Duration = Duration::from_secs(2);
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const RECONNECT_ATTEMPTS: u32 = 5;

/// Drive the fleet and the downstream connection until cancellation.
pub async fn run(tracker: Arc<Tracker>, target: String, cancel: CancellationToken) {
    let mut connection = Connection::new(target);
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let started = Instant::now();
    let mut last_tick = Instant::now();
    let mut last_report = Instant::now();
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f64();
        last_tick = now;

        connection.maintain(now).await;

        // advance the fleet under the lock; frames are only generated
        // while connected, and nothing in the schedule moves yet
        let pending = tracker
            .with_fleet(|fleet| {
                for aircraft in fleet.iter_mut() {
                    aircraft.update(dt);
                }
                if connection.is_up() {
                    collect_due(fleet, now)
                } else {
                    Vec::new()
                }
            })
            .await;

        let mut delivered = 0;
        for pending in &pending {
            if !connection.send(&pending.frame).await {
                // drop the rest of this batch; uncommitted schedules mean
                // the same frames are owed again next tick
                break;
            }
            delivered += 1;
        }
        if delivered > 0 {
            tracker
                .with_fleet(|fleet| {
                    commit_sent(fleet, &pending[..delivered], now);
                })
                .await;
            sent += delivered as u64;
            tracker.add_sent(delivered as u64).await;
        }

        if now.duration_since(last_report) >= REPORT_INTERVAL {
            last_report = now;
            let elapsed = now.duration_since(started).as_secs_f64();
            let rate = if elapsed > 0.0 { sent as f64 / elapsed } else { 0.0 };
            info!(
                "runtime {:.0}s | messages sent: {sent} | rate: {rate:.1} msg/s",
                elapsed
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FrameClass {
    Ident,
    Position,
    Velocity,
}

/// One frame owed by an aircraft, identified by its index in the fleet so
/// the schedule can be committed once the frame is actually on the wire.
struct Pending {
    index: usize,
    class: FrameClass,
    frame: String,
}

/// Every frame the fleet owes at `now`. Timers and CPR parity stay
/// untouched here; they advance in [`commit_sent`] after delivery.
fn collect_due(fleet: &[Aircraft], now: Instant) -> Vec<Pending> {
    let mut pending = Vec::new();
    for (index, aircraft) in fleet.iter().enumerate() {
        if due(aircraft.last_ident, now, IDENT_INTERVAL) {
            pending.push(Pending {
                index,
                class: FrameClass::Ident,
                frame: encode::ident(aircraft.icao, &aircraft.callsign),
            });
        }
        if due(aircraft.last_position, now, POSITION_INTERVAL) {
            let (lat, lon) = aircraft.position();
            pending.push(Pending {
                index,
                class: FrameClass::Position,
                frame: encode::position(
                    aircraft.icao,
                    lat,
                    lon,
                    aircraft.altitude_ft,
                    aircraft.parity(),
                ),
            });
        }
        if due(aircraft.last_velocity, now, VELOCITY_INTERVAL) {
            // level flight, no vertical rate
            pending.push(Pending {
                index,
                class: FrameClass::Velocity,
                frame: encode::velocity(
                    aircraft.icao,
                    aircraft.speed_kn,
                    aircraft.heading(),
                    0,
                ),
            });
        }
    }
    pending
}

/// Mark frames as delivered: reset the class timer and, for position
/// frames, flip the CPR parity of the owning aircraft.
fn commit_sent(fleet: &mut [Aircraft], delivered: &[Pending], now: Instant) {
    for pending in delivered {
        let aircraft = &mut fleet[pending.index];
        match pending.class {
            FrameClass::Ident => aircraft.last_ident = Some(now),
            FrameClass::Position => {
                aircraft.last_position = Some(now);
                aircraft.advance_parity();
            }
            FrameClass::Velocity => aircraft.last_velocity = Some(now),
        }
    }
}

fn due(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last.map_or(true, |last| now.duration_since(last) >= interval)
}

/// The downstream TCP client with its retry budget. A fresh budget of
/// [`RECONNECT_ATTEMPTS`] applies to every outage; when it runs dry the
/// simulator stops sending but keeps simulating.
struct Connection {
    target: String,
    stream: Option<TcpStream>,
    attempts_left: u32,
    next_attempt: Instant,
}

impl Connection {
    fn new(target: String) -> Self {
        Self {
            target,
            stream: None,
            attempts_left: RECONNECT_ATTEMPTS,
            next_attempt: Instant::now(),
        }
    }

    fn is_up(&self) -> bool {
        self.stream.is_some()
    }

    /// One reconnection attempt per backoff window, without stalling the
    /// tick loop longer than the connect timeout.
    async fn maintain(&mut self, now: Instant) {
        if self.stream.is_some()
            || self.attempts_left == 0
            || now < self.next_attempt
        {
            return;
        }
        self.next_attempt = now + RECONNECT_DELAY;
        match tokio::time::timeout(
            RECONNECT_DELAY,
            TcpStream::connect(&self.target),
        )
        .await
        {
            Ok(Ok(stream)) => {
                info!("connected to {}", self.target);
                self.stream = Some(stream);
                self.attempts_left = RECONNECT_ATTEMPTS;
            }
            Ok(Err(e)) => self.fail(format!("{e}")),
            Err(_) => self.fail("connection timed out".to_string()),
        }
    }

    fn fail(&mut self, reason: String) {
        self.attempts_left -= 1;
        if self.attempts_left == 0 {
            error!(
                "giving up on {} after {} attempts: {reason}",
                self.target, RECONNECT_ATTEMPTS
            );
        } else {
            warn!(
                "connection to {} failed ({reason}), {} attempts left",
                self.target, self.attempts_left
            );
        }
    }

    /// Beast-frame and write one message; on failure the socket is dropped
    /// and the retry budget rearmed.
    async fn send(&mut self, frame_hex: &str) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let Some(payload) = beast_payload(frame_hex) else {
            return false;
        };
        match stream.write_all(&payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("write to {} failed: {e}, reconnecting", self.target);
                self.stream = None;
                self.attempts_left = RECONNECT_ATTEMPTS;
                self.next_attempt = Instant::now() + RECONNECT_DELAY;
                false
            }
        }
    }
}

/// Wrap an encoded frame in Beast framing with a wall-clock MLAT timestamp
/// and a plausible signal level.
fn beast_payload(frame_hex: &str) -> Option<Vec<u8>> {
    let bytes = hex::decode(frame_hex).ok()?;
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_micros() as u64;
    let signal = rand::thread_rng().gen_range(150..=250);
    beast::frame(&bytes, beast::mlat_timestamp(micros), signal)
}
