use deku::prelude::*;
use libm::{atan2, hypot};
use serde::Serialize;
use std::fmt;

/**
 * ## Airborne Velocity (BDS 0,9)
 *
 * Transmitted with type code 19 (consumed by the dispatching `ME` enum).
 * Subtype 1 reports the ground speed of subsonic aircraft as signed
 * east-west and north-south components; it is the only subtype carrying
 * state in this system. The airspeed subtypes (3 and 4) share the same
 * field widths, so the frame still parses, but no ground speed or track is
 * derived from them.
 */
#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
pub struct AirborneVelocity {
    /// The subtype value; ground speed semantics apply to subtype 1 only
    #[deku(bits = "3")]
    #[serde(skip)]
    pub subtype: u8,

    /// The intent change flag
    #[deku(bits = "1")]
    #[serde(skip)]
    pub intent_change: bool,

    /// The IFR capability flag
    #[deku(bits = "1")]
    #[serde(skip)]
    pub ifr_capability: bool,

    #[deku(bits = "3")]
    #[serde(rename = "NUCv")]
    /// The Navigation Uncertainty Category, velocity
    pub nuc_v: u8,

    #[serde(skip)]
    pub ew_sign: Sign,

    #[deku(
        endian = "big",
        bits = "10",
        map = "|v: u16| -> Result<_, DekuError> { Ok(component(v, *ew_sign)) }"
    )]
    #[serde(skip)]
    /// Velocity component along the east-west axis, east positive, in knots
    pub ew_vel: Option<f64>,

    #[serde(skip)]
    pub ns_sign: Sign,

    #[deku(
        endian = "big",
        bits = "10",
        map = "|v: u16| -> Result<_, DekuError> { Ok(component(v, *ns_sign)) }"
    )]
    #[serde(skip)]
    /// Velocity component along the north-south axis, north positive, in knots
    pub ns_vel: Option<f64>,

    /// The source for the vertical rate measurement (baro or GNSS)
    #[deku(bits = "1")]
    #[serde(skip)]
    pub vrate_src: u8,

    #[serde(skip)]
    pub vrate_sign: Sign,

    #[deku(
        endian = "big",
        bits = "9",
        map = "|v: u16| -> Result<_, DekuError> {
            if v == 0 { Ok(None) }
            else {
                Ok(Some(i32::from(vrate_sign.value()) * (i32::from(v) - 1) * 64))
            }
        }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// The vertical rate value in ft/mn, None if unavailable
    pub vertical_rate: Option<i32>,

    #[deku(bits = "2")]
    #[serde(skip)]
    pub reserved: u8,

    #[serde(skip)]
    /// The sign of the difference between GNSS height and barometric altitude
    pub gnss_sign: Sign,

    #[deku(
        endian = "big",
        bits = "7",
        map = "|v: u8| -> Result<_, DekuError> {
            if v < 2 { Ok(None) }
            else {
                Ok(Some(i16::from(gnss_sign.value()) * (i16::from(v) - 1) * 25))
            }
        }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// The signed difference between GNSS height and barometric altitude
    pub geo_minus_baro: Option<i16>,

    #[deku(
        bits = "0",
        map = "|_v: u8| -> Result<_, DekuError> { Ok(groundspeed(*subtype, *ew_vel, *ns_vel)) }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Ground speed in knots, derived from both components (subtype 1)
    pub groundspeed: Option<f64>,

    #[deku(
        bits = "0",
        map = "|_v: u8| -> Result<_, DekuError> { Ok(track(*subtype, *ew_vel, *ns_vel)) }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Track angle in degrees from true north, east positive (subtype 1)
    pub track: Option<f64>,
}

/// A signed velocity component: magnitude - 1 knots, 0 meaning unavailable
fn component(raw: u16, sign: Sign) -> Option<f64> {
    if raw == 0 {
        None
    } else {
        Some(f64::from(sign.value()) * (f64::from(raw) - 1.0))
    }
}

fn groundspeed(
    subtype: u8,
    ew_vel: Option<f64>,
    ns_vel: Option<f64>,
) -> Option<f64> {
    match (subtype, ew_vel, ns_vel) {
        (1, Some(ew), Some(ns)) => Some(hypot(ew, ns)),
        _ => None,
    }
}

fn track(subtype: u8, ew_vel: Option<f64>, ns_vel: Option<f64>) -> Option<f64> {
    match (subtype, ew_vel, ns_vel) {
        (1, Some(ew), Some(ns)) => {
            let h = atan2(ew, ns).to_degrees();
            Some(if h < 0.0 { h + 360.0 } else { h })
        }
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, DekuRead, Copy, Clone)]
#[deku(type = "u8", bits = "1")]
pub enum Sign {
    Positive = 0,
    Negative = 1,
}

impl Sign {
    #[must_use]
    pub fn value(&self) -> i16 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }
}

impl fmt::Display for AirborneVelocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Airborne velocity over ground (BDS 0,9)")?;
        if let (Some(speed), Some(track)) = (self.groundspeed, self.track) {
            writeln!(f, "  Groundspeed:   {speed:.1} kt")?;
            writeln!(f, "  Track angle:   {track:.1} deg")?;
        }
        if let Some(rate) = self.vertical_rate {
            writeln!(f, "  Vertical rate: {rate} ft/min")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use approx::assert_relative_eq;
    use hexlit::hex;

    #[test]
    fn decode_groundspeed_velocity() {
        let bytes = hex!("8D485020994409940838175B284F");
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(adsb) = msg.df {
            assert_eq!(format!("{}", adsb.icao24), "485020");
            if let ME::BDS09(me) = adsb.message {
                assert_eq!(me.subtype, 1);
                assert_eq!(me.vertical_rate, Some(-832));
                let speed = me.groundspeed.unwrap();
                let track = me.track.unwrap();
                assert_relative_eq!(speed, 159.0, epsilon = 1.0);
                assert_relative_eq!(track, 182.88, epsilon = 1.0);
                return;
            }
        }
        unreachable!();
    }

    #[test]
    fn airspeed_subtype_yields_no_groundspeed() {
        // subtype 3 (true airspeed): the frame parses, the tracker fields stay empty
        let bytes = hex!("8DA05F219B06B6AF189400CBC33F");
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(adsb) = msg.df {
            if let ME::BDS09(me) = adsb.message {
                assert_eq!(me.subtype, 3);
                assert_eq!(me.groundspeed, None);
                assert_eq!(me.track, None);
                return;
            }
        }
        unreachable!();
    }
}
