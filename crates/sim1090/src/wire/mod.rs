/**
 * Wire framings for Mode S messages.
 *
 * Outbound, [`beast::frame`] and [`avr::frame`] wrap an encoded frame for
 * transmission. Inbound, [`FrameExtractor`] scans a byte stream in which
 * both framings may be interleaved and yields complete 28-character frames.
 */
pub mod avr;
pub mod beast;

use tracing::debug;

/// Upper bound on buffered unparsed bytes per connection
const MAX_BUFFER: usize = 10 * 1024;
/// Bytes kept from the tail when the bound is exceeded
const KEEP_ON_OVERFLOW: usize = 1024;
/// Hex characters in a long Mode S frame
const LONG_FRAME_HEX: usize = 28;

/// An incremental scanner over a raw feed.
///
/// Feed it whatever a socket read returned with [`FrameExtractor::push`],
/// then drain complete frames with [`FrameExtractor::next_frame`]. Partial
/// frames stay buffered until the next read; garbage is skipped one byte at
/// a time until a marker resynchronizes the scan.
#[derive(Debug, Default)]
pub struct FrameExtractor {
    buf: Vec<u8>,
}

enum Unescape {
    Complete { body: Vec<u8>, consumed: usize },
    Pending,
    Corrupt,
}

impl FrameExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        if self.buf.len() > MAX_BUFFER {
            let excess = self.buf.len() - KEEP_ON_OVERFLOW;
            debug!("parse buffer overflow, dropping {excess} bytes");
            self.buf.drain(..excess);
        }
    }

    /// The next complete frame, as 28 uppercase hex characters, or `None`
    /// once the buffered bytes are exhausted.
    pub fn next_frame(&mut self) -> Option<String> {
        let mut frame = None;
        let mut i = 0;
        while i < self.buf.len() {
            match self.buf[i] {
                b'*' => {
                    // AVR: the hex payload sits between '*' and ';'
                    let Some(length) =
                        self.buf[i + 1..].iter().position(|&b| b == b';')
                    else {
                        break; // incomplete line, wait for more input
                    };
                    let end = i + 1 + length + 1;
                    let body = &self.buf[i + 1..end - 1];
                    if body.len() == LONG_FRAME_HEX
                        && body.iter().all(u8::is_ascii_hexdigit)
                    {
                        frame = Some(
                            body.iter()
                                .map(|&b| b.to_ascii_uppercase() as char)
                                .collect(),
                        );
                    }
                    i = end;
                    if frame.is_some() {
                        break;
                    }
                }
                beast::ESC => {
                    if i + 2 > self.buf.len() {
                        break; // type byte not read yet
                    }
                    if self.buf[i + 1] != beast::TYPE_LONG {
                        // short frames and status messages are skipped by
                        // advancing one byte
                        i += 1;
                        continue;
                    }
                    match unescape(&self.buf[i + 2..], beast::LONG_BODY_LEN) {
                        Unescape::Complete { body, consumed } => {
                            // timestamp and signal level are not kept
                            frame = Some(hex::encode_upper(&body[7..]));
                            i += 2 + consumed;
                            break;
                        }
                        Unescape::Pending => break,
                        Unescape::Corrupt => i += 1,
                    }
                }
                _ => i += 1,
            }
        }
        self.buf.drain(..i);
        frame
    }
}

/// Collapse doubled escapes while collecting `want` body bytes.
fn unescape(data: &[u8], want: usize) -> Unescape {
    let mut body = Vec::with_capacity(want);
    let mut i = 0;
    while body.len() < want {
        let Some(&byte) = data.get(i) else {
            return Unescape::Pending;
        };
        if byte == beast::ESC {
            match data.get(i + 1) {
                Some(&beast::ESC) => {
                    body.push(beast::ESC);
                    i += 2;
                }
                // a lone escape inside the body is a new start marker
                Some(_) => return Unescape::Corrupt,
                None => return Unescape::Pending,
            }
        } else {
            body.push(byte);
            i += 1;
        }
    }
    Unescape::Complete { body, consumed: i }
}
