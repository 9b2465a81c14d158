/**
* Position information is packed in Compact Position Reporting (CPR) format:
* 17 bits per axis, with the global ambiguity resolved across two frames of
* alternating parity (even and odd) that slice the latitude band into
* slightly different zone counts.
*
* This module owns both directions:
*
*  - encoding a (latitude, longitude) pair into the 17-bit fields of a frame
*    of a given parity;
*  - globally unambiguous decoding from a pair of even and odd frames
*    received close together in time.
*/
use deku::prelude::*;
use libm::{fabs, floor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A flag to qualify a CPR position as odd or even
#[derive(Debug, PartialEq, Eq, Serialize, DekuRead, Copy, Clone)]
#[deku(type = "u8", bits = "1")]
#[serde(rename_all = "snake_case")]
pub enum CPRFormat {
    Even = 0,
    Odd = 1,
}

impl CPRFormat {
    #[must_use]
    pub fn flip(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }
}

impl fmt::Display for CPRFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Even => "even",
                Self::Odd => "odd",
            }
        )
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Copy)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();

        if parts.len() != 2 {
            return Err("expected \"latitude,longitude\"".to_string());
        }

        let latitude: f64 = parts[0]
            .parse()
            .map_err(|e| format!("latitude parse error: {}", e))?;
        let longitude: f64 = parts[1]
            .parse()
            .map_err(|e| format!("longitude parse error: {}", e))?;

        Ok(Position {
            latitude,
            longitude,
        })
    }
}

/// The 17-bit CPR fields of one position frame, stamped on reception
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct CprFrame {
    pub parity: CPRFormat,
    pub lat_cpr: u32,
    pub lon_cpr: u32,
    /// Reception time in seconds (unix or any common epoch)
    pub timestamp: f64,
}

/// NZ represents the number of latitude zones between the equator and a pole.
/// In Mode S, is defined to be 15.
const NZ: f64 = 15.0;

/// CPR_MAX is 2^17 since CPR lat and lon values are encoded on 17 bits
const CPR_MAX: f64 = 131_072.0;

/// Even and odd frames pair up for a global decode only while their
/// reception times stay this close (in seconds).
pub const MAX_FRAME_SPACING: f64 = 10.0;

/// Transition latitudes of the NL function from 1090-WP-9-14, in degrees.
/// `NL_TRANSITIONS[i]` is the upper bound of the band with NL = 59 - i;
/// everything at or above 87 degrees has NL = 1.
#[rustfmt::skip]
const NL_TRANSITIONS: [f64; 58] = [
    10.470_471_30, 14.828_174_37, 18.186_263_57, 21.029_394_93,
    23.545_044_87, 25.829_247_07, 27.938_987_10, 29.911_356_86,
    31.772_097_08, 33.539_934_36, 35.228_995_98, 36.850_251_08,
    38.412_418_92, 39.922_566_84, 41.386_518_32, 42.809_140_12,
    44.194_549_51, 45.546_267_23, 46.867_332_52, 48.160_391_28,
    49.427_764_39, 50.671_501_66, 51.893_424_69, 53.095_161_53,
    54.278_174_72, 55.443_784_44, 56.593_187_56, 57.727_473_54,
    58.847_637_76, 59.954_592_77, 61.049_177_74, 62.132_166_59,
    63.204_274_79, 64.266_165_23, 65.318_453_10, 66.361_710_08,
    67.396_467_74, 68.423_220_22, 69.442_426_31, 70.454_510_75,
    71.459_864_73, 72.458_845_45, 73.451_774_42, 74.438_934_16,
    75.420_562_57, 76.396_843_91, 77.367_894_61, 78.333_740_83,
    79.294_282_25, 80.249_232_13, 81.198_013_49, 82.139_569_81,
    83.071_994_45, 83.991_735_63, 84.891_661_91, 85.755_416_21,
    86.535_369_98, 87.000_000_00,
];

/// Given the latitude, this function yields the number of longitude zones,
/// between 1 and 59.
pub fn nl(lat: f64) -> u64 {
    let lat = fabs(lat);
    match NL_TRANSITIONS.iter().position(|&bound| lat < bound) {
        Some(i) => 59 - i as u64,
        None => 1,
    }
}

const D_LAT_EVEN: f64 = 360.0 / (4.0 * NZ);
const D_LAT_ODD: f64 = 360.0 / (4.0 * NZ - 1.0);

// Main difference for % between Python and Rust is that in Rust, the sign
// of the result matches the sign of the dividend.
fn modulo(a: f64, b: f64) -> f64 {
    if a >= 0. {
        a % b
    } else {
        a % b + fabs(b)
    }
}

/**
 * Encode a position into the 17-bit latitude and longitude fields of an
 * airborne position frame of the given parity.
 */
pub fn encode(lat: f64, lon: f64, parity: CPRFormat) -> (u32, u32) {
    let p = f64::from(parity as u8);

    let d_lat = 360.0 / (4.0 * NZ - p);
    let yz = lat / d_lat;
    let lat_cpr = floor((yz - floor(yz)) * CPR_MAX) as u64 & 0x1_FFFF;

    let ni = std::cmp::max(nl(lat) as i64 - parity as i64, 1);
    let d_lon = 360.0 / ni as f64;
    let xz = lon / d_lon;
    let lon_cpr = floor((xz - floor(xz)) * CPR_MAX) as u64 & 0x1_FFFF;

    (lat_cpr as u32, lon_cpr as u32)
}

/**
 * Decode an airborne position from a pair of even and odd position frames.
 *
 * Returns `None` while the pair is underdetermined: frames further apart
 * than [`MAX_FRAME_SPACING`], mismatched parities, latitude candidates in
 * different NL bands (the longitude zone count would be ambiguous) or out
 * of range.
 */
pub fn airborne_position(even: &CprFrame, odd: &CprFrame) -> Option<Position> {
    if even.parity != CPRFormat::Even || odd.parity != CPRFormat::Odd {
        return None;
    }
    if fabs(even.timestamp - odd.timestamp) > MAX_FRAME_SPACING {
        return None;
    }

    let cpr_lat_even = f64::from(even.lat_cpr) / CPR_MAX;
    let cpr_lon_even = f64::from(even.lon_cpr) / CPR_MAX;
    let cpr_lat_odd = f64::from(odd.lat_cpr) / CPR_MAX;
    let cpr_lon_odd = f64::from(odd.lon_cpr) / CPR_MAX;

    let j = floor(59.0 * cpr_lat_even - 60.0 * cpr_lat_odd + 0.5);

    let mut lat_even = D_LAT_EVEN * (modulo(j, 60.) + cpr_lat_even);
    let mut lat_odd = D_LAT_ODD * (modulo(j, 59.) + cpr_lat_odd);

    if lat_even >= 270.0 {
        lat_even -= 360.0;
    }
    if lat_odd >= 270.0 {
        lat_odd -= 360.0;
    }

    if !(-90. ..=90.).contains(&lat_even) || !(-90. ..=90.).contains(&lat_odd)
    {
        return None;
    }
    if nl(lat_even) != nl(lat_odd) {
        return None;
    }

    let newest_is_even = even.timestamp >= odd.timestamp;
    let lat = if newest_is_even { lat_even } else { lat_odd };

    let nl_lat = nl(lat);
    let (p, c) = if newest_is_even {
        (0, cpr_lon_even)
    } else {
        (1, cpr_lon_odd)
    };
    let ni = std::cmp::max(nl_lat as i64 - p, 1) as f64;
    let m = floor(
        cpr_lon_even * (nl_lat - 1) as f64 - cpr_lon_odd * nl_lat as f64
            + 0.5,
    );

    let mut lon = (360.0 / ni) * (modulo(m, ni) + c);
    if lon >= 180.0 {
        lon -= 360.0;
    }

    Some(Position {
        latitude: lat,
        longitude: lon,
    })
}
