use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),
    #[error("Transport error: {0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Payload is not a JSON object")]
    NotAnObject,
}

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Read-receipt rejected with status {0}")]
    Status(reqwest::StatusCode),
    #[error("API URL cannot carry a path: {0}")]
    InvalidApiUrl(String),
}

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("Unsupported origin scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Origin has no host")]
    MissingHost,
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Failed to read session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse session file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Receipt(#[from] ReceiptError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Missing client collaborator: {0}")]
    MissingCollaborator(&'static str),
}

pub type Result<T> = std::result::Result<T, NotifierError>;
