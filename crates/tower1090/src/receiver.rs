//! The inbound half: accept AVR or Beast feeds over TCP and fold every
//! valid DF17 frame into the tracker. One task per connection; a broken
//! feed closes its own task and nothing else.

use sim1090::prelude::*;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tracker::{unix_time, Tracker};

/// Accept feeds until cancellation. The listener socket must already be
/// bound, so that a busy port fails startup instead of a background task.
pub async fn run(
    listener: TcpListener,
    tracker: Arc<Tracker>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, address)) => {
                    info!("feed connected from {address}");
                    let tracker = tracker.clone();
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        handle_feed(stream, address, tracker, cancel).await;
                    });
                }
                Err(e) => warn!("accept failed: {e}"),
            }
        }
    }
}

async fn handle_feed(
    mut stream: TcpStream,
    address: SocketAddr,
    tracker: Arc<Tracker>,
    cancel: CancellationToken,
) {
    let mut extractor = FrameExtractor::new();
    let mut buffer = [0u8; 4096];
    let mut frames: u64 = 0;

    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => break,
            read = stream.read(&mut buffer) => read,
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("read from {address} failed: {e}");
                break;
            }
        };

        extractor.push(&buffer[..n]);
        while let Some(frame_hex) = extractor.next_frame() {
            // wrong length, unknown DF and bad CRC all end here, without
            // disturbing the connection
            let Ok(bytes) = hex::decode(&frame_hex) else {
                continue;
            };
            let Ok((_, msg)) = Message::from_bytes((&bytes, 0)) else {
                debug!("dropped undecodable frame {frame_hex}");
                continue;
            };
            tracker.update(&msg, unix_time()).await;
            frames += 1;
        }
    }
    info!("feed from {address} closed after {frames} frames");
}
