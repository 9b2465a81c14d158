#![doc = include_str!("../readme.md")]

mod cli;
mod fleet;
mod receiver;
mod simulator;
mod snapshot;
mod tracker;
mod web;

use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = cli::Options::parse();
    let (center, count) = options.resolve()?;

    let fleet = {
        let mut rng = rand::thread_rng();
        fleet::generate(&mut rng, count, center.latitude, center.longitude)
    };
    info!(
        "generated {count} aircraft around {:.4}, {:.4}",
        center.latitude, center.longitude
    );
    for aircraft in &fleet {
        info!(
            "  {:8} ({:06X}) {:>5} ft, {:3.0} kt, {}",
            aircraft.callsign,
            aircraft.icao,
            aircraft.altitude_ft,
            aircraft.speed_kn,
            aircraft.kind.as_str(),
        );
    }

    let tracker = Arc::new(tracker::Tracker::new(fleet));
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                cancel.cancel();
            }
        });
    }

    // a busy ADS-B port is fatal, so bind before spawning anything
    let listener = TcpListener::bind(("0.0.0.0", options.listen))
        .await
        .map_err(|e| {
            format!("cannot bind ADS-B port {}: {e}", options.listen)
        })?;
    info!("listening for ADS-B feeds on 0.0.0.0:{}", options.listen);
    tokio::spawn(receiver::run(listener, tracker.clone(), cancel.clone()));

    let routes = web::routes(
        tracker.clone(),
        options.expire as f64,
        &options.static_dir,
    )
    .recover(web::handle_rejection);
    let shutdown = {
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    };
    let (address, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(
            ([127, 0, 0, 1], options.http_port),
            shutdown,
        )?;
    info!("live view on http://{address}/");
    tokio::spawn(server);

    // the simulator owns the outbound socket and runs until cancellation
    simulator::run(tracker, options.connect.clone(), cancel.clone()).await;

    info!("closed down cleanly");
    Ok(())
}
