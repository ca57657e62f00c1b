use crate::config::EndpointConfig;
use crate::domain::subscriber::SubscriberId;
use crate::error::EndpointError;
use url::Url;

/// Base URL of the push endpoint, without the subscriber parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEndpoint {
    base: Url,
}

impl PushEndpoint {
    /// Uses `ws_url` when set, otherwise derives the endpoint from the page
    /// origin.
    ///
    /// # Errors
    /// Returns `EndpointError` if the URL cannot be used for a websocket.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, EndpointError> {
        match &config.ws_url {
            Some(url) => Self::explicit(url.clone()),
            None => Self::from_origin(&config.origin, &config.api_root, &config.ws_path),
        }
    }

    /// # Errors
    /// Returns `EndpointError::UnsupportedScheme` unless the scheme is `ws` or `wss`.
    pub fn explicit(url: Url) -> Result<Self, EndpointError> {
        match url.scheme() {
            "ws" | "wss" => Ok(Self { base: url }),
            other => Err(EndpointError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Mirrors the origin's scheme: `https` pages get `wss`, `http` pages get `ws`.
    ///
    /// # Errors
    /// Returns `EndpointError` for origins without a host or with another scheme.
    pub fn from_origin(origin: &Url, api_root: &str, ws_path: &str) -> Result<Self, EndpointError> {
        let scheme = match origin.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };
        if origin.host_str().is_none() {
            return Err(EndpointError::MissingHost);
        }

        let mut base = origin.clone();
        base.set_scheme(scheme).map_err(|()| EndpointError::UnsupportedScheme(scheme.to_string()))?;
        base.set_path(&format!("{}/{}", api_root.trim_end_matches('/'), ws_path.trim_start_matches('/')));
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self { base })
    }

    #[must_use]
    pub fn url_for(&self, subscriber: &SubscriberId) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("user_id", subscriber.as_str());
        url
    }
}
