use crate::adapters::websocket::WsConnector;
use crate::config::{NoticeConfig, ReconnectConfig};
use crate::domain::notification::{Notice, NotificationEvent, NotificationId, RefreshSignal};
use crate::error::{NotifierError, TransportError};
use opentelemetry::{
    global,
    metrics::{Counter, UpDownCounter},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

pub mod connection;
pub mod endpoint;
pub mod provider;
pub mod transport;

use connection::{Connection, RetryDelay};
use endpoint::PushEndpoint;
use provider::{IdentityProvider, NoticeSink, ReceiptSender};
use transport::{Connector, TransportEvent, TransportEventKind, TransportHandle};

#[derive(Clone, Debug)]
struct Metrics {
    connect_attempts_total: Counter<u64>,
    received_total: Counter<u64>,
    malformed_total: Counter<u64>,
    reconnects_total: Counter<u64>,
    receipt_failures_total: Counter<u64>,
    live_connections: UpDownCounter<i64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("portfolio-notifier");
        Self {
            connect_attempts_total: meter
                .u64_counter("push_connect_attempts_total")
                .with_description("Total push endpoint connection attempts")
                .build(),
            received_total: meter
                .u64_counter("push_notifications_received_total")
                .with_description("Total notifications decoded from the push endpoint")
                .build(),
            malformed_total: meter
                .u64_counter("push_notifications_malformed_total")
                .with_description("Total push payloads that could not be decoded")
                .build(),
            reconnects_total: meter
                .u64_counter("push_reconnects_scheduled_total")
                .with_description("Total reconnects scheduled after a closed or failed transport")
                .build(),
            receipt_failures_total: meter
                .u64_counter("push_read_receipt_failures_total")
                .with_description("Total read-receipts that could not be submitted")
                .build(),
            live_connections: meter
                .i64_up_down_counter("push_live_connections")
                .with_description("Push connections currently established")
                .build(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Connect,
    Shutdown,
}

/// Assembles a [`NotificationClient`] from its collaborators.
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: PushEndpoint,
    reconnect: ReconnectConfig,
    notices: NoticeConfig,
    identity: Option<Arc<dyn IdentityProvider>>,
    connector: Option<Arc<dyn Connector>>,
    receipts: Option<Arc<dyn ReceiptSender>>,
    sink: Option<Arc<dyn NoticeSink>>,
}

impl ClientBuilder {
    #[must_use]
    pub fn new(endpoint: PushEndpoint) -> Self {
        Self {
            endpoint,
            reconnect: ReconnectConfig::default(),
            notices: NoticeConfig::default(),
            identity: None,
            connector: None,
            receipts: None,
            sink: None,
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_notices(mut self, notices: NoticeConfig) -> Self {
        self.notices = notices;
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Defaults to [`WsConnector`] when not set.
    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub fn with_receipts(mut self, receipts: Arc<dyn ReceiptSender>) -> Self {
        self.receipts = Some(receipts);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// # Errors
    /// Returns `NotifierError::MissingCollaborator` if the identity provider,
    /// receipt sender or notice sink was not set.
    pub fn build(self) -> crate::error::Result<NotificationClient> {
        let identity = self.identity.ok_or(NotifierError::MissingCollaborator("identity provider"))?;
        let receipts = self.receipts.ok_or(NotifierError::MissingCollaborator("receipt sender"))?;
        let sink = self.sink.ok_or(NotifierError::MissingCollaborator("notice sink"))?;
        let connector = self.connector.unwrap_or_else(|| Arc::new(WsConnector::default()));

        Ok(NotificationClient {
            endpoint: self.endpoint,
            reconnect: self.reconnect,
            notices: self.notices,
            identity,
            connector,
            receipts,
            sink,
        })
    }
}

/// Reconnecting push notification client.
///
/// Keeps at most one live transport to the push endpoint, shows every
/// inbound notification, acknowledges the ones carrying an id, and
/// reconnects with exponential backoff whenever the transport closes.
#[derive(Debug)]
pub struct NotificationClient {
    endpoint: PushEndpoint,
    reconnect: ReconnectConfig,
    notices: NoticeConfig,
    identity: Arc<dyn IdentityProvider>,
    connector: Arc<dyn Connector>,
    receipts: Arc<dyn ReceiptSender>,
    sink: Arc<dyn NoticeSink>,
}

impl NotificationClient {
    #[must_use]
    pub fn builder(endpoint: PushEndpoint) -> ClientBuilder {
        ClientBuilder::new(endpoint)
    }

    /// Starts the client. The first connection attempt happens after the
    /// activation delay. The client stops when `shutdown_rx` flips to `true`,
    /// when [`ClientHandle::shutdown`] is called, or when the handle is dropped.
    #[must_use]
    pub fn spawn(self, shutdown_rx: watch::Receiver<bool>) -> ClientHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (refresh_tx, _) = broadcast::channel(self.notices.refresh_channel_capacity.max(1));

        let activation_delay = self.reconnect.activation_delay();
        let supervisor = Supervisor {
            endpoint: self.endpoint,
            connect_timeout: self.reconnect.connect_timeout(),
            identity: self.identity,
            connector: self.connector,
            receipts: self.receipts,
            sink: self.sink,
            default_title: self.notices.default_title,
            refresh: refresh_tx.clone(),
            connection: Connection::new(RetryDelay::from_config(&self.reconnect)),
            events_tx,
            events_rx,
            commands: commands_rx,
            shutdown_rx,
            metrics: Metrics::new(),
        };

        let task = tokio::spawn(supervisor.run(activation_delay));

        ClientHandle { commands: commands_tx, refresh: refresh_tx, task }
    }
}

/// Owner-side handle of a running [`NotificationClient`].
#[derive(Debug)]
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<Command>,
    refresh: broadcast::Sender<RefreshSignal>,
    task: JoinHandle<()>,
}

impl ClientHandle {
    /// Requests an immediate connection, replacing the live transport and
    /// any pending reconnect.
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Subscribes to the signal published after every displayed notification.
    #[must_use]
    pub fn subscribe_refresh(&self) -> broadcast::Receiver<RefreshSignal> {
        self.refresh.subscribe()
    }

    /// Stops the client: cancels any pending reconnect and closes the live
    /// transport before returning.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        self.join().await;
    }

    /// Waits for the client to stop on its own (shutdown signal).
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Notification client task failed");
        }
    }

    /// Whether the client has stopped, without waiting for it.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

struct Supervisor {
    endpoint: PushEndpoint,
    connect_timeout: Duration,
    identity: Arc<dyn IdentityProvider>,
    connector: Arc<dyn Connector>,
    receipts: Arc<dyn ReceiptSender>,
    sink: Arc<dyn NoticeSink>,
    default_title: String,
    refresh: broadcast::Sender<RefreshSignal>,
    connection: Connection,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown_rx: watch::Receiver<bool>,
    metrics: Metrics,
}

impl Supervisor {
    #[tracing::instrument(name = "notification_client", skip_all)]
    async fn run(mut self, activation_delay: Duration) {
        // Activation is deferred like any other reconnect.
        self.connection.pending_reconnect = Some(Box::pin(tokio::time::sleep(activation_delay)));

        loop {
            if *self.shutdown_rx.borrow() {
                tracing::info!("Shutdown signal received, stopping notification client");
                break;
            }

            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Shutdown sender dropped, stopping notification client");
                        break;
                    }
                }

                command = self.commands.recv() => match command {
                    Some(Command::Connect) => self.connect().await,
                    Some(Command::Shutdown) | None => break,
                },

                Some(event) = self.events_rx.recv() => self.handle_event(event),

                () = connection::reconnect_due(&mut self.connection.pending_reconnect) => {
                    self.connection.pending_reconnect = None;
                    self.connect().await;
                }
            }
        }

        self.teardown().await;
    }

    async fn connect(&mut self) {
        let Some(subscriber) = self.identity.current().await else {
            tracing::info!("No subscriber identity, skipping push connection");
            return;
        };

        self.connection.cancel_reconnect();
        if let Some(previous) = self.connection.transport.take() {
            tracing::debug!(generation = previous.generation(), "Closing superseded transport");
            self.mark_disconnected();
            previous.close().await;
        }

        let url = self.endpoint.url_for(&subscriber);
        let generation = self.connection.next_generation();
        self.metrics.connect_attempts_total.add(1, &[]);
        tracing::info!(subscriber.id = %subscriber, generation, "Connecting to push endpoint");

        self.connection.transport = Some(TransportHandle::spawn(
            generation,
            &subscriber,
            url,
            self.connect_timeout,
            Arc::clone(&self.connector),
            self.events_tx.clone(),
        ));
        self.connection.subscriber = Some(subscriber);
    }

    fn handle_event(&mut self, event: TransportEvent) {
        let TransportEvent { generation, kind } = event;
        match kind {
            // Payloads already delivered are shown even if their transport was superseded.
            TransportEventKind::Message(text) => self.on_message(&text),
            _ if !self.connection.is_current(generation) => {
                tracing::debug!(generation, "Ignoring lifecycle event from superseded transport");
            }
            TransportEventKind::Opened => self.on_open(),
            TransportEventKind::Closed => self.on_close(),
            TransportEventKind::Error(e) => self.on_error(&e),
        }
    }

    fn on_open(&mut self) {
        self.connection.retry.reset();
        self.connection.established = true;
        self.metrics.live_connections.add(1, &[]);
        tracing::info!(subscriber.id = ?self.connection.subscriber, "Push connection established");
    }

    fn on_close(&mut self) {
        self.connection.transport = None;
        self.mark_disconnected();
        let delay = self.connection.schedule_reconnect();
        self.metrics.reconnects_total.add(1, &[]);
        tracing::info!(retry_in = ?delay, "Push connection closed, reconnect scheduled");
    }

    fn on_error(&mut self, error: &TransportError) {
        tracing::warn!(error = %error, "Push transport failed");
        // The transport task has already exited; dropping the handle closes it.
        self.connection.transport = None;
        self.on_close();
    }

    fn mark_disconnected(&mut self) {
        if std::mem::take(&mut self.connection.established) {
            self.metrics.live_connections.add(-1, &[]);
        }
    }

    fn on_message(&self, text: &str) {
        match NotificationEvent::decode(text, &self.default_title) {
            Ok(event) => {
                self.metrics.received_total.add(1, &[]);
                tracing::info!(notification.id = ?event.id, title = %event.title, "Notification received");

                self.sink.show(Notice::from_event(&event));
                let _ = self.refresh.send(RefreshSignal);

                if let Some(id) = event.id {
                    self.submit_receipt(id);
                }
            }
            Err(e) => {
                self.metrics.malformed_total.add(1, &[]);
                tracing::warn!(error = %e, "Malformed notification payload, showing raw text");
                self.sink.show(Notice::raw(text));
            }
        }
    }

    /// Fire-and-forget: failures are logged and counted, never retried.
    fn submit_receipt(&self, id: NotificationId) {
        let receipts = Arc::clone(&self.receipts);
        let failures = self.metrics.receipt_failures_total.clone();
        let span = tracing::debug_span!("read_receipt", notification.id = %id);

        tokio::spawn(
            async move {
                match receipts.mark_read(&id).await {
                    Ok(()) => tracing::debug!("Read-receipt submitted"),
                    Err(e) => {
                        failures.add(1, &[]);
                        tracing::warn!(error = %e, "Failed to submit read-receipt");
                    }
                }
            }
            .instrument(span),
        );
    }

    async fn teardown(&mut self) {
        if self.connection.cancel_reconnect() {
            tracing::debug!("Cancelled pending reconnect");
        }
        if let Some(transport) = self.connection.transport.take() {
            self.mark_disconnected();
            transport.close().await;
        }
        tracing::info!("Notification client stopped");
    }
}
