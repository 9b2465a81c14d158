use super::bds::{bds05, bds08, bds09};
use super::ICAO;
use deku::prelude::*;
use serde::Serialize;
use std::fmt;

/**
 * An ADS-B frame is 112 bits long and consists of five main parts,
 * shown as follows:
 *
 * +----------+----------+-------------+------------------------+-----------+
 * |  DF (5)  |  CA (3)  |  ICAO (24)  |         ME (56)        |  PI (24)  |
 * +----------+----------+-------------+------------------------+-----------+
 */
#[derive(Debug, PartialEq, DekuRead, Clone, Serialize)]
pub struct ADSB {
    /// Transponder capability
    #[deku(bits = "3")]
    #[serde(skip)]
    pub capability: u8,

    /// ICAO aircraft address
    pub icao24: ICAO,

    /// ME (typecode-dispatched payload)
    #[deku(bits = "5")]
    #[serde(skip)]
    pub tc: u8,

    #[deku(ctx = "*tc")]
    #[serde(flatten)]
    pub message: ME,

    /// Parity/Interrogator ID
    #[serde(skip)]
    pub parity: ICAO,
}

impl fmt::Display for ADSB {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " DF17. Extended Squitter")?;
        writeln!(f, "  Address:       {}", &self.icao24)?;
        write!(f, "{}", &self.message)
    }
}

/*
* |  TC      |  Payload                            |
* | -------- | ----------------------------------- |
* | 1..=4    | [`AircraftIdentification`]          |
* | 9..=18   | [`AirbornePosition`] (barometric)   |
* | 19       | [`AirborneVelocity`]                |
* | others   | opaque, ignored by the tracker      |
*/
#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
#[deku(ctx = "tc: u8", id = "tc")]
#[serde(tag = "BDS")]
pub enum ME {
    #[deku(id_pat = "1..=4")]
    #[serde(rename = "0,8")]
    BDS08(bds08::AircraftIdentification),

    #[deku(id_pat = "9..=18")]
    #[serde(rename = "0,5")]
    BDS05(bds05::AirbornePosition),

    #[deku(id = "19")]
    #[serde(rename = "0,9")]
    BDS09(bds09::AirborneVelocity),

    /// Surface position, status and operational messages: parsed for
    /// frame alignment only. 51 bits, since the dispatching typecode is
    /// already consumed.
    #[deku(id_pat = "_")]
    #[serde(skip)]
    Unsupported {
        #[deku(bits = "51", endian = "big")]
        me: u64,
    },
}

impl fmt::Display for ME {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ME::BDS05(me) => write!(f, "{me}"),
            ME::BDS08(me) => write!(f, "{me}"),
            ME::BDS09(me) => write!(f, "{me}"),
            ME::Unsupported { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use hexlit::hex;

    #[test]
    fn decode_icao24() {
        let bytes = hex!("8D406B902015A678D4D220AA4BDA");
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(msg) = msg.df {
            assert_eq!(format!("{}", msg.icao24), "406b90");
            return;
        }
        unreachable!();
    }

    #[test]
    fn unsupported_typecode_is_opaque() {
        // a DF17 frame with an all-zero ME (TC 0, no position information)
        let mut bytes = hex!("8DABCDEF00000000000000000000");
        let parity = crate::decode::crc::checksum(&bytes[..11]);
        bytes[11] = (parity >> 16) as u8;
        bytes[12] = (parity >> 8) as u8;
        bytes[13] = parity as u8;
        let msg = Message::from_bytes((&bytes, 0)).unwrap().1;
        if let ExtendedSquitterADSB(msg) = msg.df {
            assert!(matches!(msg.message, ME::Unsupported { .. }));
            return;
        }
        unreachable!();
    }
}
