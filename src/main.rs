#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use portfolio_notifier::config::Config;
use portfolio_notifier::services::notice_log::NoticeLog;
use portfolio_notifier::{spawn_signal_handler, telemetry};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx);

    let notices = Arc::new(NoticeLog::default());
    let client = portfolio_notifier::build_client(&config, Arc::<NoticeLog>::clone(&notices))?;
    let handle = client.spawn(shutdown_rx.clone());

    // Stand-in for the views that re-fetch their data after a notification.
    let mut refresh_rx = handle.subscribe_refresh();
    let mut refresh_shutdown = shutdown_rx;
    let refresh_task = tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    _ = refresh_shutdown.wait_for(|&s| s) => break,
                    signal = refresh_rx.recv() => match signal {
                        Ok(_) => tracing::debug!("Refresh signal published"),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(skipped = n, "Refresh listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }
        .instrument(tracing::info_span!("refresh_listener")),
    );

    handle.join().await;
    let _ = refresh_task.await;

    tracing::info!(shown = notices.shown(), "Notifier stopped");
    telemetry_guard.shutdown();
    Ok(())
}
