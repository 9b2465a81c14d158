use deku::bitvec::{BitSlice, Msb0};
use deku::prelude::*;
use serde::Serialize;
use std::fmt;

/**
 * ## Aircraft Identification and Category (BDS 0,8)
 *
 * Broadcast the identification (also known as the "callsign") of the
 * aircraft. The type code (1 to 4) is consumed by the dispatching `ME` enum.
 *
 * | TC  | CA  | C1  | C2  | C3  | C4  | C5  | C6  | C7  | C8  |
 * | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- |
 * | 5   | 3   | 6   | 6   | 6   | 6   | 6   | 6   | 6   | 6   |
 */
#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
pub struct AircraftIdentification {
    /// The category of the aircraft, unused for tracking
    #[deku(bits = "3")]
    #[serde(skip)]
    pub ca: u8,

    /// Callsign, padding stripped
    #[deku(reader = "callsign_read(deku::rest)")]
    pub callsign: String,
}

/// 6-bit index to character mapping; `#` marks indices that never appear in
/// a well-formed identification.
pub const CHAR_LOOKUP: &[u8; 64] =
    b"#ABCDEFGHIJKLMNOPQRSTUVWXYZ##### ###############0123456789######";

fn callsign_read(
    rest: &BitSlice<u8, Msb0>,
) -> Result<(&BitSlice<u8, Msb0>, String), DekuError> {
    let mut inside_rest = rest;

    let mut callsign = String::with_capacity(8);
    for _ in 0..8 {
        let (for_rest, c) = <u8>::read(inside_rest, deku::ctx::BitSize(6))?;
        let c = CHAR_LOOKUP[c as usize] as char;
        if c != '#' {
            callsign.push(c);
        }
        inside_rest = for_rest;
    }
    let trimmed = callsign.trim_end().len();
    callsign.truncate(trimmed);

    Ok((inside_rest, callsign))
}

impl fmt::Display for AircraftIdentification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Aircraft identification and category (BDS 0,8)")?;
        writeln!(f, "  Callsign:      {}", &self.callsign)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use hexlit::hex;

    #[test]
    fn decode_callsign() {
        let bytes = hex!("8d406b902015a678d4d220aa4bda");
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(adsb) = msg.df {
            if let ME::BDS08(id) = adsb.message {
                assert_eq!(id.callsign, "EZY85MH");
                return;
            }
        }
        unreachable!();
    }

    #[test]
    fn decode_canonical_callsign() {
        let bytes = hex!("8D4840D6202CC371C32CE0576098");
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(adsb) = msg.df {
            assert_eq!(format!("{}", adsb.icao24), "4840d6");
            if let ME::BDS08(id) = adsb.message {
                assert_eq!(id.callsign, "KLM1023");
                return;
            }
        }
        unreachable!();
    }
}
