/**
 * The last 24 bits of every Mode S frame carry a parity field computed over
 * the rest of the frame with the ICAO generator polynomial
 * x^24 + x^23 + x^22 + x^21 + x^20 + x^19 + x^18 + x^17 + x^16 + x^15 +
 * x^14 + x^13 + x^12 + x^10 + x^3 + 1.
 *
 * For DF17 the parity is the plain CRC, so a valid frame leaves a zero
 * residual when the division is run over all 112 bits.
 */
use once_cell::sync::Lazy;

/// 24-bit generator, the x^24 term implicit
const GENERATOR: u32 = 0xFFF409;

static CRC_TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0u32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = (i as u32) << 16;
        for _ in 0..8 {
            if crc & 0x80_0000 != 0 {
                crc = (crc << 1) ^ GENERATOR;
            } else {
                crc <<= 1;
            }
            crc &= 0xFF_FFFF;
        }
        *entry = crc;
    }
    table
});

/// Remainder of `data` followed by 24 appended zero bits.
///
/// Feed the first 11 bytes of a long frame to obtain the parity field the
/// transponder would append.
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = 0u32;
    for &byte in data {
        let idx = ((crc >> 16) ^ u32::from(byte)) & 0xFF;
        crc = ((crc << 8) ^ CRC_TABLE[idx as usize]) & 0xFF_FFFF;
    }
    crc
}

/// Remainder over a full frame, parity field included: zero for a valid DF17.
pub fn residual(frame: &[u8]) -> u32 {
    if frame.len() < 4 {
        return frame
            .iter()
            .fold(0, |acc, &b| (acc << 8 | u32::from(b)) & 0xFF_FFFF);
    }
    let (payload, parity) = frame.split_at(frame.len() - 3);
    checksum(payload)
        ^ (u32::from(parity[0]) << 16
            | u32::from(parity[1]) << 8
            | u32::from(parity[2]))
}
