#![allow(dead_code)]

use axum::{
    Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, patch},
};
use portfolio_notifier::config::Config;
use portfolio_notifier::services::notice_board::NoticeBoard;
use portfolio_notifier::services::notification::ClientHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use url::Url;

pub fn setup_tracing() {
    portfolio_notifier::telemetry::init_test_telemetry();
}

#[derive(Debug)]
struct BackendState {
    upgrades: AtomicUsize,
    live: AtomicUsize,
    refuse_upgrades: AtomicBool,
    subscribers: Mutex<Vec<String>>,
    receipts: Mutex<Vec<String>>,
    receipt_status: AtomicU16,
    frames: broadcast::Sender<String>,
    kick: broadcast::Sender<()>,
}

/// Stand-in for the portfolio backend: a push endpoint at `/api/ws` and the
/// read-receipt route at `/notifications/{id}/read`.
pub struct FakeBackend {
    pub origin: Url,
    state: Arc<BackendState>,
    server: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        setup_tracing();

        let (frames, _) = broadcast::channel(64);
        let (kick, _) = broadcast::channel(4);
        let state = Arc::new(BackendState {
            upgrades: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            refuse_upgrades: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
            receipts: Mutex::new(Vec::new()),
            receipt_status: AtomicU16::new(204),
            frames,
            kick,
        });

        let app = Router::new()
            .route("/api/ws", any(ws_handler))
            .route("/notifications/{id}/read", patch(receipt_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { origin: Url::parse(&format!("http://{addr}")).unwrap(), state, server }
    }

    pub fn start_client(&self, user_id: Option<&str>) -> TestClient {
        start_client(client_config(&self.origin, user_id))
    }

    pub fn push(&self, frame: &str) {
        self.state.frames.send(frame.to_string()).unwrap();
    }

    /// Closes every open push connection from the server side.
    pub fn drop_connections(&self) {
        let _ = self.state.kick.send(());
    }

    pub fn refuse_upgrades(&self, refuse: bool) {
        self.state.refuse_upgrades.store(refuse, Ordering::SeqCst);
    }

    pub fn set_receipt_status(&self, status: StatusCode) {
        self.state.receipt_status.store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn upgrades(&self) -> usize {
        self.state.upgrades.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub fn subscribers(&self) -> Vec<String> {
        self.state.subscribers.lock().unwrap().clone()
    }

    pub fn receipts(&self) -> Vec<String> {
        self.state.receipts.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Client configuration pointing at `origin` with short timers.
pub fn client_config(origin: &Url, user_id: Option<&str>) -> Config {
    let mut config = Config::default();
    config.endpoint.origin = origin.clone();
    config.identity.user_id = user_id.map(ToString::to_string);
    config.receipts.api_url = origin.clone();
    config.receipts.timeout_secs = 2;
    config.reconnect.activation_delay_ms = 10;
    config.reconnect.min_backoff_ms = 50;
    config.reconnect.max_backoff_ms = 200;
    config
}

pub fn start_client(config: Config) -> TestClient {
    let board = Arc::new(NoticeBoard::default());
    let client = portfolio_notifier::build_client(&config, board.clone()).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = client.spawn(shutdown_rx);
    TestClient { board, handle, shutdown_tx }
}

/// Accepts TCP connections and never answers the websocket upgrade.
pub struct SilentListener {
    pub origin: Url,
    accepts: Arc<AtomicUsize>,
    task: tokio::task::JoinHandle<()>,
}

impl SilentListener {
    pub async fn spawn() -> Self {
        setup_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = Arc::new(AtomicUsize::new(0));

        let counter = accepts.clone();
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        Self { origin: Url::parse(&format!("http://{addr}")).unwrap(), accepts, task }
    }

    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}

impl Drop for SilentListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct TestClient {
    pub board: Arc<NoticeBoard>,
    pub handle: ClientHandle,
    pub shutdown_tx: watch::Sender<bool>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<BackendState>>,
) -> Response {
    if state.refuse_upgrades.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    state.upgrades.fetch_add(1, Ordering::SeqCst);
    state.subscribers.lock().unwrap().push(params.get("user_id").cloned().unwrap_or_default());
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<BackendState>) {
    let mut frames = state.frames.subscribe();
    let mut kick = state.kick.subscribe();
    state.live.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Ok(frame) = frame else { break };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            _ = kick.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.live.fetch_sub(1, Ordering::SeqCst);
}

async fn receipt_handler(Path(id): Path<String>, State(state): State<Arc<BackendState>>) -> StatusCode {
    state.receipts.lock().unwrap().push(id);
    StatusCode::from_u16(state.receipt_status.load(Ordering::SeqCst)).unwrap_or(StatusCode::NO_CONTENT)
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Timed out waiting for {what}");
}
