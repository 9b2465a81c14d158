//! The simulated fleet: circular flight paths around the configured center,
//! with headings derived from the analytic tangent so that position and
//! velocity reports stay consistent for downstream decoders.

use rand::Rng;
use sim1090::decode::cpr::CPRFormat;
use std::collections::HashSet;
use std::f64::consts::TAU;
use tokio::time::Instant;

const AIRLINES: &[&str] = &[
    "AAL", "DAL", "UAL", "SWA", "JBU", "ASA", "SKW", "FFT", "NKS", "BAW",
    "DLH", "AFR", "KLM", "ACA", "UAE", "QTR", "SIA", "CPA", "JAL", "ANA",
];

const MILITARY: &[&str] = &[
    "VIPER", "SNAKE", "EAGLE", "HAWK", "RAVEN", "GHOST", "SABER", "TALON",
];

/// Share of the fleet flying under a military callsign
const MILITARY_SHARE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Civilian,
    Military,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Civilian => "civilian",
            Kind::Military => "military",
        }
    }
}

/// One simulated aircraft on a circular pattern.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub icao: u32,
    pub callsign: String,
    pub kind: Kind,
    pub altitude_ft: i32,
    pub speed_kn: f64,

    center_lat: f64,
    center_lon: f64,
    radius_nm: f64,
    clockwise: bool,
    /// Signed, in radians per second; negative for counter-clockwise
    angular_velocity: f64,
    angle: f64,

    /// Parity of the next position frame; advances once a frame of that
    /// parity has been delivered
    parity: CPRFormat,
    pub last_ident: Option<Instant>,
    pub last_position: Option<Instant>,
    pub last_velocity: Option<Instant>,
}

impl Aircraft {
    pub fn spawn(
        rng: &mut impl Rng,
        icao: u32,
        center_lat: f64,
        center_lon: f64,
    ) -> Self {
        let radius_nm = rng.gen_range(5.0..50.0);
        let speed_kn = rng.gen_range(150.0..550.0);
        let clockwise = rng.gen_bool(0.5);

        let (callsign, kind) = if rng.gen_bool(MILITARY_SHARE) {
            let base = MILITARY[rng.gen_range(0..MILITARY.len())];
            (format!("{}{:02}", base, rng.gen_range(1..100)), Kind::Military)
        } else {
            let airline = AIRLINES[rng.gen_range(0..AIRLINES.len())];
            (
                format!("{}{:04}", airline, rng.gen_range(1..10_000)),
                Kind::Civilian,
            )
        };

        // one revolution takes 2*pi*r / v hours
        let mut angular_velocity = speed_kn / (3600.0 * radius_nm);
        if !clockwise {
            angular_velocity = -angular_velocity;
        }

        Self {
            icao,
            callsign,
            kind,
            altitude_ft: rng.gen_range(100..=400) * 100,
            speed_kn,
            center_lat,
            center_lon,
            radius_nm,
            clockwise,
            angular_velocity,
            angle: rng.gen_range(0.0..TAU),
            parity: CPRFormat::Even,
            last_ident: None,
            last_position: None,
            last_velocity: None,
        }
    }

    /// Advance the path angle by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        self.angle = (self.angle + self.angular_velocity * dt).rem_euclid(TAU);
    }

    /// Current position on the circle. The longitude offset is stretched by
    /// the cosine of the center latitude so the ground track stays circular
    /// (valid for radii far below one latitude degree times 60).
    pub fn position(&self) -> (f64, f64) {
        let radius_deg = self.radius_nm / 60.0;
        let lat = self.center_lat + radius_deg * self.angle.sin();
        let lon = self.center_lon
            + radius_deg * self.angle.cos() / self.center_lat.to_radians().cos();
        (lat, lon)
    }

    /// Course over ground in degrees from true north, from the tangent of
    /// the circle. Matches the east/north components the velocity encoder
    /// derives from it, so decoders reconstruct a consistent track.
    pub fn heading(&self) -> f64 {
        let (v_north, v_east) = if self.clockwise {
            (self.angle.cos(), -self.angle.sin())
        } else {
            (-self.angle.cos(), self.angle.sin())
        };
        v_east.atan2(v_north).to_degrees().rem_euclid(360.0)
    }

    /// Parity of the next position frame to go on the wire.
    pub fn parity(&self) -> CPRFormat {
        self.parity
    }

    /// Flip the parity once a position frame has been delivered, so
    /// successive transmitted frames strictly alternate even and odd.
    pub fn advance_parity(&mut self) {
        self.parity = self.parity.flip();
    }
}

/// Generate a fleet with unique ICAO addresses around the given center.
pub fn generate(
    rng: &mut impl Rng,
    count: usize,
    center_lat: f64,
    center_lon: f64,
) -> Vec<Aircraft> {
    let mut used = HashSet::with_capacity(count);
    (0..count)
        .map(|_| {
            let mut icao = rng.gen_range(1..0x100_0000);
            while !used.insert(icao) {
                icao = rng.gen_range(1..0x100_0000);
            }
            Aircraft::spawn(rng, icao, center_lat, center_lon)
        })
        .collect()
}
