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

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::http::HttpReceiptSender;
use crate::adapters::identity::{SessionFileIdentity, StaticIdentity};
use crate::config::Config;
use crate::services::notification::endpoint::PushEndpoint;
use crate::services::notification::provider::{IdentityProvider, NoticeSink};
use crate::services::notification::NotificationClient;
use std::sync::Arc;
use tokio::sync::watch;

/// Wires the production collaborators described by `config` into a client
/// that reports to `sink`.
///
/// # Errors
/// Returns an error if the endpoint or the receipt client cannot be built.
pub fn build_client(config: &Config, sink: Arc<dyn NoticeSink>) -> error::Result<NotificationClient> {
    let endpoint = PushEndpoint::from_config(&config.endpoint)?;
    let receipts = Arc::new(HttpReceiptSender::new(&config.receipts)?);

    let identity: Arc<dyn IdentityProvider> = match &config.identity.session_file {
        Some(path) => Arc::new(SessionFileIdentity::new(path)),
        None => Arc::new(StaticIdentity::new(config.identity.user_id.as_deref())),
    };

    NotificationClient::builder(endpoint)
        .with_reconnect(config.reconnect.clone())
        .with_notices(config.notices.clone())
        .with_identity(identity)
        .with_receipts(receipts)
        .with_sink(sink)
        .build()
}

/// Flips the shutdown channel on Ctrl-C or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl-C"),
            () = terminate => tracing::info!("Received SIGTERM"),
        }

        let _ = shutdown_tx.send(true);
    });
}
