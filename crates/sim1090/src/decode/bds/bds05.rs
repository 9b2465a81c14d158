use crate::decode::cpr::CPRFormat;
use deku::bitvec::{BitSlice, Msb0};
use deku::prelude::*;
use serde::Serialize;
use std::fmt;

/**
 * ## Airborne Position (BDS 0,5)
 *
 * Carried by type codes 9 to 18 (barometric altitude). The type code is
 * consumed by the dispatching `ME` enum, leaving 51 bits:
 *
 * | SS | NICb | ALT | T | F | LAT-CPR | LON-CPR |
 * | -- | ---- | --- | - | - | ------- | ------- |
 * | 2  |  1   | 12  | 1 | 1 |   17    |   17    |
 */
#[derive(Debug, PartialEq, Serialize, DekuRead, Copy, Clone)]
pub struct AirbornePosition {
    /// Surveillance status
    #[deku(bits = "2")]
    #[serde(skip)]
    pub ss: u8,

    /// NIC supplement B
    #[deku(bits = "1")]
    #[serde(skip)]
    pub nic_b: u8,

    /// Barometric altitude in feet, None if unavailable (Q=0)
    #[deku(reader = "decode_ac12(deku::rest)")]
    #[serde(rename = "altitude")]
    pub alt: Option<i32>,

    // UTC sync or not
    #[deku(bits = "1")]
    #[serde(skip)]
    pub t: bool,

    pub parity: CPRFormat,

    #[deku(bits = "17", endian = "big")]
    pub lat_cpr: u32,

    #[deku(bits = "17", endian = "big")]
    pub lon_cpr: u32,
}

/// Decode the 12-bit altitude field, laid out as `top7 | Q | bottom4`.
///
/// Only the Q=1 encoding (25 ft steps from -1000 ft) is supported here;
/// Q=0 Gillham-coded frames report the altitude as unknown.
fn decode_ac12(
    rest: &BitSlice<u8, Msb0>,
) -> Result<(&BitSlice<u8, Msb0>, Option<i32>), DekuError> {
    let (rest, num) =
        u16::read(rest, (deku::ctx::Endian::Big, deku::ctx::BitSize(12)))?;

    if num & 0x10 == 0 {
        return Ok((rest, None));
    }

    let n = i32::from(((num & 0x0FE0) >> 1) | (num & 0x000F));
    Ok((rest, Some(n * 25 - 1000)))
}

impl fmt::Display for AirbornePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Airborne position (BDS 0,5)")?;
        let altitude = self.alt.map_or_else(
            || "unknown".to_string(),
            |altitude| format!("{altitude} ft"),
        );
        writeln!(f, "  Altitude:      {} barometric", altitude)?;
        writeln!(f, "  CPR parity:    {}", self.parity)?;
        writeln!(f, "  CPR latitude:  ({})", self.lat_cpr)?;
        writeln!(f, "  CPR longitude: ({})", self.lon_cpr)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use hexlit::hex;

    #[test]
    fn decode_altitude_and_cpr_fields() {
        let bytes = hex!("8D40621D58C382D690C8AC2863A7");
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(adsb) = msg.df {
            assert_eq!(format!("{}", adsb.icao24), "40621d");
            if let ME::BDS05(me) = adsb.message {
                assert_eq!(me.alt, Some(38000));
                assert_eq!(me.parity, CPRFormat::Even);
                assert_eq!(me.lat_cpr, 93000);
                assert_eq!(me.lon_cpr, 51372);
                return;
            }
        }
        unreachable!();
    }

    #[test]
    fn serialize_position_fields() {
        let bytes = hex!("8D40621D58C382D690C8AC2863A7");
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(adsb) = msg.df {
            if let ME::BDS05(me) = adsb.message {
                let json = serde_json::to_value(me).unwrap();
                assert_eq!(json["altitude"], 38000);
                assert_eq!(json["parity"], "even");
                return;
            }
        }
        unreachable!();
    }

    #[test]
    fn gillham_coded_altitude_is_unknown() {
        // same frame with the Q bit cleared and the parity recomputed
        let mut bytes = hex!("8D40621D58C382D690C8AC2863A7");
        bytes[5] &= !0x01;
        let parity = crate::decode::crc::checksum(&bytes[..11]);
        bytes[11] = (parity >> 16) as u8;
        bytes[12] = (parity >> 8) as u8;
        bytes[13] = parity as u8;
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(adsb) = msg.df {
            if let ME::BDS05(me) = adsb.message {
                assert_eq!(me.alt, None);
                return;
            }
        }
        unreachable!();
    }
}
