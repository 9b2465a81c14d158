pub mod adsb;
pub mod bds;
pub mod cpr;
pub mod crc;

use adsb::ADSB;
use deku::bitvec::{BitSlice, Msb0};
use deku::prelude::*;
use serde::ser::{Serialize, Serializer};
use std::fmt;

/**
 * DF stands for Downlink Format, a number between 0 and 24 encoding the type
 * of the message and whether it is short (56 bits) or long (112 bits).
 *
 * Only DF17, the ADS-B extended squitter, carries state in this system;
 * every other format decodes to an opaque variant that downstream code
 * ignores.
 */
#[derive(Debug, PartialEq, serde::Serialize, DekuRead, Clone)]
#[deku(type = "u8", bits = "5")]
#[serde(tag = "DF")]
pub enum DF {
    /// Extended Squitter ADS-B, Downlink Format 17 (3.1.2.8.6)
    #[deku(id = "17")]
    #[serde(rename = "ADSB")]
    ExtendedSquitterADSB(ADSB),

    /// Any other downlink format
    #[deku(id_pat = "_")]
    #[serde(skip)]
    Unknown,
}

/// The entry point to Mode S and ADS-B decoding
///
/// Use as `Message::from_bytes()` in mostly all applications
#[derive(Debug, PartialEq, serde::Serialize, DekuRead, Clone)]
pub struct Message {
    /// Calculated from all bits, must be 0 for ADS-B (raises a DekuError
    /// otherwise), so corrupted frames never reach the tracker
    #[deku(reader = "Self::read_crc(deku::input_bits)")]
    #[serde(skip)]
    pub crc: u32,

    /// The Downlink Format encoded in 5 bits
    #[serde(flatten)]
    pub df: DF,
}

impl Message {
    /// Read rest as CRC bits
    fn read_crc(
        rest: &BitSlice<u8, Msb0>,
    ) -> Result<(&BitSlice<u8, Msb0>, u32), DekuError> {
        const MODES_LONG_MSG_BYTES: usize = 14;
        const MODES_SHORT_MSG_BYTES: usize = 7;

        let (_, remaining_bytes, _) = rest.domain().region().ok_or_else(
            || DekuError::Assertion("empty frame".to_string()),
        )?;

        // Decode the DF quickly to determine the length of the message
        let df = remaining_bytes[0] >> 3;

        let byte_len = if df & 0x10 != 0 {
            MODES_LONG_MSG_BYTES
        } else {
            MODES_SHORT_MSG_BYTES
        };
        if remaining_bytes.len() < byte_len {
            return Err(DekuError::Assertion(format!(
                "truncated frame: {} bytes",
                remaining_bytes.len()
            )));
        }

        let crc = crc::residual(&remaining_bytes[..byte_len]);
        // The CRC must be 0 for ADS-B (DF=17) messages
        match (df, crc) {
            (17, c) if c > 0 => Err(DekuError::Assertion(format!(
                "invalid CRC in ADS-B message: {c:06x}"
            ))),
            _ => Ok((rest, crc)),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.df {
            DF::ExtendedSquitterADSB(msg) => write!(f, "{msg}"),
            DF::Unknown => Ok(()),
        }
    }
}

/// ICAO 24-bit address, commonly used to reference airframes, i.e. tail
/// numbers of aircraft
#[derive(PartialEq, Eq, PartialOrd, DekuRead, Hash, Copy, Clone, Ord)]
pub struct ICAO(#[deku(bits = "24", endian = "big")] pub u32);

impl fmt::Debug for ICAO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)?;
        Ok(())
    }
}

impl fmt::Display for ICAO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)?;
        Ok(())
    }
}

impl Serialize for ICAO {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let icao = format!("{:06x}", &self.0);
        serializer.serialize_str(&icao)
    }
}

impl core::str::FromStr for ICAO {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let num = u32::from_str_radix(s, 16)?;
        Ok(Self(num))
    }
}
