/**
 * Beast binary framing for Mode S messages:
 *
 *  - esc "2" : 6 byte MLAT timestamp, 1 byte signal level, 7 byte Mode S short frame
 *  - esc "3" : 6 byte MLAT timestamp, 1 byte signal level, 14 byte Mode S long frame
 *
 * esc esc: true 0x1a — every 0x1a after the initial marker is doubled.
 * esc is 0x1a, and "2" and "3" are 0x32 and 0x33.
 */

/// Frame escape and start-of-message marker
pub const ESC: u8 = 0x1A;
/// Type byte for a 7-byte Mode S short frame
pub const TYPE_SHORT: u8 = 0x32;
/// Type byte for a 14-byte Mode S long frame
pub const TYPE_LONG: u8 = 0x33;

/// timestamp (6) + signal (1) + long frame (14), before escaping
pub(crate) const LONG_BODY_LEN: usize = 21;

/// The 48-bit MLAT counter: the wall clock in 12 MHz ticks.
pub fn mlat_timestamp(unix_micros: u64) -> u64 {
    unix_micros.wrapping_mul(12) & 0xFFFF_FFFF_FFFF
}

/// Frame a raw Mode S message of 7 or 14 bytes; any other length yields
/// `None` since no type byte describes it.
pub fn frame(msg: &[u8], timestamp: u64, signal: u8) -> Option<Vec<u8>> {
    let msg_type = match msg.len() {
        7 => TYPE_SHORT,
        14 => TYPE_LONG,
        _ => return None,
    };

    let mut out = Vec::with_capacity(msg.len() + 12);
    out.push(ESC);
    out.push(msg_type);
    let timestamp = timestamp.to_be_bytes();
    for &byte in timestamp[2..].iter().chain([signal].iter()).chain(msg) {
        if byte == ESC {
            out.push(ESC);
        }
        out.push(byte);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout() {
        let msg = [0x8Du8; 14];
        let out = frame(&msg, 0x0102_0304_0506, 0xC8).unwrap();
        assert_eq!(out[0], ESC);
        assert_eq!(out[1], TYPE_LONG);
        assert_eq!(&out[2..8], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(out[8], 0xC8);
        assert_eq!(&out[9..], &msg);
    }

    #[test]
    fn escape_bytes_are_doubled() {
        let mut msg = [0u8; 14];
        msg[4] = ESC;
        let out = frame(&msg, 0, 200).unwrap();
        // timestamp of zero contains no escapes; the payload byte does
        let escapes = out.iter().filter(|&&b| b == ESC).count();
        assert_eq!(escapes, 3); // marker + doubled payload byte
    }

    #[test]
    fn odd_lengths_are_refused() {
        assert!(frame(&[0u8; 10], 0, 200).is_none());
    }

    #[test]
    fn mlat_timestamp_wraps_to_48_bits() {
        assert_eq!(mlat_timestamp(1) & !0xFFFF_FFFF_FFFF, 0);
        assert_eq!(mlat_timestamp(u64::MAX) & !0xFFFF_FFFF_FFFF, 0);
    }
}
