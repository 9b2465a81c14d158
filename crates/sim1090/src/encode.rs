/**
 * DF17 frame builders for the three message classes a transponder emits
 * most often: identification (TC 4), airborne position (TC 11) and airborne
 * velocity over ground (TC 19 subtype 1).
 *
 * Frames are assembled on an integer register with explicit widths, the
 * 24-bit parity is appended, and the result is rendered as the 28 uppercase
 * hex characters the wire framings expect. Builders never fail: out-of-range
 * speeds and altitudes are clamped to what the fields can carry.
 */
use crate::decode::bds::bds08::CHAR_LOOKUP;
use crate::decode::cpr::{self, CPRFormat};
use crate::decode::crc;
use libm::{cos, fabs, sin};

/// Downlink format: extended squitter
const DF_ADSB: u64 = 17;
/// Transponder capability: level 2+, airborne
const CA_AIRBORNE: u64 = 5;

/// Altitudes representable by the Q=1 (25 ft) encoding
const ALT_MIN_FT: i32 = -1000;
const ALT_MAX_FT: i32 = 50_175;

/// An MSB-first accumulator for fixed-width bit fields.
///
/// Mode S bodies are 88 bits before parity, so a 128-bit register covers
/// every frame this crate builds.
#[derive(Debug, Default)]
pub struct FieldPacker {
    acc: u128,
    bits: u32,
}

impl FieldPacker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `width` bits holding `value`; excess high bits are masked off.
    #[must_use]
    pub fn push(mut self, width: u32, value: u64) -> Self {
        debug_assert!(width <= 64 && self.bits + width <= 128);
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        self.acc = (self.acc << width) | u128::from(value & mask);
        self.bits += width;
        self
    }

    /// Render the accumulated fields, which must end on a byte boundary.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        debug_assert_eq!(self.bits % 8, 0);
        let len = (self.bits / 8) as usize;
        (0..len)
            .rev()
            .map(|i| (self.acc >> (8 * i)) as u8)
            .collect()
    }
}

/// Append the Mode S parity and render 28 uppercase hex characters.
fn seal(body: FieldPacker) -> String {
    let bytes = body.into_bytes();
    let parity = crc::checksum(&bytes);
    let mut frame = hex::encode_upper(bytes);
    frame.push_str(&format!("{parity:06X}"));
    frame
}

fn header(icao: u32) -> FieldPacker {
    FieldPacker::new()
        .push(5, DF_ADSB)
        .push(3, CA_AIRBORNE)
        .push(24, u64::from(icao))
}

/// Aircraft identification (TC 4).
///
/// The callsign is uppercased and right-padded with spaces to 8 characters;
/// characters outside the 6-bit charset encode as index 0.
pub fn ident(icao: u32, callsign: &str) -> String {
    let mut body = header(icao)
        .push(5, 4) // TC: aircraft identification
        .push(3, 0); // aircraft category: no information
    let callsign = callsign.to_ascii_uppercase();
    let mut chars = callsign.bytes().take(8).collect::<Vec<u8>>();
    chars.resize(8, b' ');
    for c in chars {
        let index = match c {
            b'A'..=b'Z' | b' ' | b'0'..=b'9' => {
                CHAR_LOOKUP.iter().position(|&l| l == c).unwrap_or(0)
            }
            _ => 0,
        };
        body = body.push(6, index as u64);
    }
    seal(body)
}

/// Airborne position (TC 11) with barometric altitude and a CPR pair of the
/// given parity. Alternate parities on successive frames so receivers can
/// run a global decode.
pub fn position(
    icao: u32,
    lat: f64,
    lon: f64,
    alt_ft: i32,
    parity: CPRFormat,
) -> String {
    let alt = alt_ft.clamp(ALT_MIN_FT, ALT_MAX_FT);
    let n = ((alt + 1000) / 25) as u64;
    // 12-bit altitude field: top7 | Q=1 | bottom4
    let alt_code = ((n >> 4) & 0x7F) << 5 | 1 << 4 | (n & 0x0F);
    let (lat_cpr, lon_cpr) = cpr::encode(lat, lon, parity);
    seal(
        header(icao)
            .push(5, 11) // TC: airborne position, barometric altitude
            .push(2, 0) // surveillance status: no condition
            .push(1, 0) // NIC supplement B
            .push(12, alt_code)
            .push(1, 0) // T: not synchronized to UTC
            .push(1, parity as u64)
            .push(17, u64::from(lat_cpr))
            .push(17, u64::from(lon_cpr)),
    )
}

/// Airborne velocity over ground (TC 19, subtype 1).
///
/// The track is measured from true north with east positive; speeds beyond
/// 1022 kt and vertical rates beyond the 9-bit field are clamped.
pub fn velocity(icao: u32, speed_kn: f64, track_deg: f64, vr_fpm: i32) -> String {
    let speed = speed_kn.clamp(0.0, 1022.0);
    let track = track_deg.to_radians();
    let v_ew = speed * sin(track);
    let v_ns = speed * cos(track);

    let ew_sign = u64::from(v_ew < 0.0);
    let ns_sign = u64::from(v_ns < 0.0);
    let ew = (fabs(v_ew) as u64 + 1).min(1023);
    let ns = (fabs(v_ns) as u64 + 1).min(1023);

    let vr_sign = u64::from(vr_fpm < 0);
    let vr = if vr_fpm == 0 {
        0 // unavailable encodes level flight
    } else {
        (u64::from(vr_fpm.unsigned_abs()) / 64 + 1).min(511)
    };

    seal(
        header(icao)
            .push(5, 19) // TC: airborne velocity
            .push(3, 1) // subtype: ground speed, subsonic
            .push(1, 0) // intent change
            .push(1, 0) // IFR capability
            .push(3, 0) // NUCv
            .push(1, ew_sign)
            .push(10, ew)
            .push(1, ns_sign)
            .push(10, ns)
            .push(1, 0) // vertical rate source: barometric
            .push(1, vr_sign)
            .push(9, vr)
            .push(2, 0) // reserved
            .push(1, 0) // GNSS-baro delta sign
            .push(7, 0), // GNSS-baro delta: no information
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::cpr::{airborne_position, CprFrame};
    use crate::prelude::*;
    use approx::assert_relative_eq;

    fn decode(frame: &str) -> ADSB {
        assert_eq!(frame.len(), 28);
        let bytes = hex::decode(frame).unwrap();
        let (_, msg) = Message::from_bytes((&bytes, 0)).unwrap();
        match msg.df {
            ExtendedSquitterADSB(adsb) => adsb,
            _ => unreachable!(),
        }
    }

    #[test]
    fn ident_matches_the_canonical_frame() {
        let frame = ident(0x4840D6, "KLM1023");
        assert_eq!(frame, "8D4840D6202CC371C32CE0576098");
    }

    #[test]
    fn ident_round_trip() {
        for callsign in ["DAL1234", "N123AB", "VIPER07", "A", "SWA12345"] {
            let adsb = decode(&ident(0xABCDEF, callsign));
            assert_eq!(format!("{}", adsb.icao24), "abcdef");
            match adsb.message {
                ME::BDS08(id) => {
                    let expected: String =
                        callsign.chars().take(8).collect();
                    assert_eq!(id.callsign, expected);
                }
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn ident_maps_unknown_characters_to_padding() {
        let adsb = decode(&ident(0x123456, "A-B_C"));
        match adsb.message {
            // index 0 decodes as '#' and is stripped
            ME::BDS08(id) => assert_eq!(id.callsign, "ABC"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn position_round_trip() {
        let (lat, lon, alt) = (52.2572, 3.91937, 38_000);
        let even = decode(&position(0x40621D, lat, lon, alt, CPRFormat::Even));
        let odd = decode(&position(0x40621D, lat, lon, alt, CPRFormat::Odd));
        let (even, odd) = match (even.message, odd.message) {
            (ME::BDS05(e), ME::BDS05(o)) => (e, o),
            _ => unreachable!(),
        };
        assert_eq!(even.alt, Some(alt));
        assert_eq!(even.parity, CPRFormat::Even);
        assert_eq!(odd.parity, CPRFormat::Odd);

        let decoded = airborne_position(
            &CprFrame {
                parity: even.parity,
                lat_cpr: even.lat_cpr,
                lon_cpr: even.lon_cpr,
                timestamp: 0.0,
            },
            &CprFrame {
                parity: odd.parity,
                lat_cpr: odd.lat_cpr,
                lon_cpr: odd.lon_cpr,
                timestamp: 0.5,
            },
        )
        .unwrap();
        assert_relative_eq!(decoded.latitude, lat, epsilon = 5e-4);
        assert_relative_eq!(decoded.longitude, lon, epsilon = 5e-4);
    }

    #[test]
    fn altitude_round_trip_on_the_25ft_grid() {
        for alt in (-1000..=50_175).step_by(4025) {
            let adsb =
                decode(&position(0x123456, 10.0, 20.0, alt, CPRFormat::Even));
            match adsb.message {
                ME::BDS05(me) => assert_eq!(me.alt, Some(alt)),
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn altitude_is_clamped_to_the_field_range() {
        let adsb =
            decode(&position(0x123456, 10.0, 20.0, 99_999, CPRFormat::Even));
        match adsb.message {
            ME::BDS05(me) => assert_eq!(me.alt, Some(ALT_MAX_FT)),
            _ => unreachable!(),
        }
        let adsb =
            decode(&position(0x123456, 10.0, 20.0, -5000, CPRFormat::Odd));
        match adsb.message {
            ME::BDS05(me) => assert_eq!(me.alt, Some(ALT_MIN_FT)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn velocity_round_trip() {
        for &(speed, track, vr) in &[
            (159.0, 182.88, -832),
            (420.0, 87.3, 0),
            (1022.0, 359.5, 1600),
            (0.0, 0.0, -64),
            (250.0, 270.0, 64),
        ] {
            let adsb = decode(&velocity(0x485020, speed, track, vr));
            match adsb.message {
                ME::BDS09(me) => {
                    assert_eq!(me.subtype, 1);
                    let decoded_speed = me.groundspeed.unwrap();
                    assert!((decoded_speed - speed).abs() <= 1.5);
                    if speed > 1.0 {
                        let decoded_track = me.track.unwrap();
                        let delta = (decoded_track - track).rem_euclid(360.0);
                        assert!(delta <= 1.0 || delta >= 359.0);
                    }
                    if vr == 0 {
                        assert_eq!(me.vertical_rate, None);
                    } else {
                        assert_eq!(me.vertical_rate, Some(vr));
                    }
                }
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn speed_is_clamped() {
        let adsb = decode(&velocity(0x123456, 5000.0, 90.0, 0));
        match adsb.message {
            ME::BDS09(me) => {
                assert!(me.groundspeed.unwrap() <= 1022.0 + 1.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn every_frame_carries_a_valid_parity_field() {
        let frames = [
            ident(0x4840D6, "KLM1023"),
            position(0x40621D, 52.2572, 3.91937, 38_000, CPRFormat::Odd),
            velocity(0x485020, 159.0, 182.88, -832),
        ];
        for frame in &frames {
            let bytes = hex::decode(frame).unwrap();
            assert_eq!(bytes.len(), 14);
            let parity = u32::from(bytes[11]) << 16
                | u32::from(bytes[12]) << 8
                | u32::from(bytes[13]);
            assert_eq!(crc::checksum(&bytes[..11]), parity);
            assert_eq!(crc::residual(&bytes), 0);
        }
    }
}
