use crate::domain::subscriber::SubscriberId;
use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;
use url::Url;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Opens a transport to the push endpoint.
    ///
    /// # Errors
    /// Returns `TransportError` if the connection cannot be established.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError>;
}

#[async_trait]
pub trait Transport: Send {
    /// Receives the next text payload. `None` means the peer closed the
    /// connection. Must be cancel-safe.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}

#[derive(Debug)]
pub(crate) enum TransportEventKind {
    Opened,
    Message(String),
    Closed,
    Error(TransportError),
}

#[derive(Debug)]
pub(crate) struct TransportEvent {
    pub(crate) generation: u64,
    pub(crate) kind: TransportEventKind,
}

/// Handle to one live transport task.
#[derive(Debug)]
pub(crate) struct TransportHandle {
    generation: u64,
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    pub(crate) fn spawn(
        generation: u64,
        subscriber: &SubscriberId,
        url: Url,
        connect_timeout: Duration,
        connector: Arc<dyn Connector>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(
            drive(generation, url, connect_timeout, connector, events, close_rx).instrument(tracing::info_span!(
                "notification_transport",
                subscriber.id = %subscriber,
                generation
            )),
        );
        Self { generation, close_tx: Some(close_tx), task }
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    /// Asks the transport to close and waits for its task to finish.
    pub(crate) async fn close(mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut self.task).await.is_err() {
            tracing::warn!(generation = self.generation, "Transport did not close in time, aborting");
            self.task.abort();
        }
    }
}

async fn drive(
    generation: u64,
    url: Url,
    connect_timeout: Duration,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let emit = |kind| {
        let _ = events.send(TransportEvent { generation, kind });
    };

    tracing::debug!(url = %redact(&url), "Connecting to push endpoint");

    let mut transport = tokio::select! {
        biased;

        // A server that accepts TCP but never answers the upgrade must not
        // stall the client.
        result = tokio::time::timeout(connect_timeout, connector.connect(&url)) => match result {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                emit(TransportEventKind::Error(e));
                return;
            }
            Err(_) => {
                emit(TransportEventKind::Error(TransportError::HandshakeTimeout(connect_timeout)));
                return;
            }
        },
        _ = &mut close_rx => return,
    };

    emit(TransportEventKind::Opened);

    loop {
        tokio::select! {
            biased;

            _ = &mut close_rx => {
                transport.close().await;
                return;
            }

            frame = transport.recv() => match frame {
                Some(Ok(text)) => emit(TransportEventKind::Message(text)),
                Some(Err(e)) => {
                    emit(TransportEventKind::Error(e));
                    return;
                }
                None => {
                    emit(TransportEventKind::Closed);
                    return;
                }
            },
        }
    }
}

/// Strips the query string, which carries the subscriber id.
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
