//! Address Resolver
//!
//! Determines the base address of the realtime endpoint. A remote
//! configuration lookup is attempted first; any failure degrades to an
//! address derived from the client's own context, so resolution never
//! fails outward.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::config::ContextConfig;

/// Front-end dev server port and its paired back-end port. When the client
/// context itself runs on the front-end dev port, the fallback address
/// targets the back-end port on the same host.
const DEV_FRONTEND_PORT: u16 = 3001;
const DEV_BACKEND_PORT: u16 = 3002;

/// Where the client itself is reachable: scheme, hostname, optional port.
/// Used to derive same-origin request bases and fallback addresses.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub secure: bool,
    pub hostname: String,
    pub port: Option<u16>,
}

impl ClientContext {
    /// Host with port, e.g. `app.example.com` or `localhost:3001`
    pub fn host(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.hostname, port),
            None => self.hostname.clone(),
        }
    }

    /// HTTP base for same-origin requests, e.g. `https://app.example.com`
    pub fn http_base(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}", scheme, self.host())
    }

    /// WebSocket base derived from this context
    pub fn ws_base(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}", scheme, self.host())
    }

    pub fn is_localhost(&self) -> bool {
        self.hostname.contains("localhost")
    }
}

impl From<&ContextConfig> for ClientContext {
    fn from(config: &ContextConfig) -> Self {
        Self {
            secure: config.secure,
            hostname: config.hostname.clone(),
            port: config.port,
        }
    }
}

/// Reasons a remote resolution attempt can fail. Never propagates past the
/// resolver; recorded on the log surface before falling back.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("config request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("config endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("config response carried no usable endpoint address")]
    InvalidAddress,
}

/// Configuration endpoint response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointConfig {
    ws_url: Option<String>,
    /// Diagnostic only, never used for resolution
    request_host: Option<String>,
}

/// Resolves the realtime endpoint base address for each connection attempt
pub struct AddressResolver {
    http: reqwest::Client,
    context: ClientContext,
    config_url: String,
}

impl AddressResolver {
    /// Create a resolver. When `config_url` is unset, the configuration
    /// endpoint is derived from the client context.
    pub fn new(context: ClientContext, config_url: Option<String>) -> Self {
        let config_url =
            config_url.unwrap_or_else(|| format!("{}/api/config", context.http_base()));
        Self {
            http: reqwest::Client::new(),
            context,
            config_url,
        }
    }

    /// Resolve the realtime endpoint base address (scheme + host, no path).
    ///
    /// Never fails: any error in the remote lookup degrades to the
    /// context-derived fallback. Invoked fresh on every connection and
    /// reconnection attempt, since the correct address may change between
    /// attempts.
    pub async fn resolve(&self, token: &str) -> String {
        match self.fetch_remote(token).await {
            Ok(base) => base,
            Err(e) => {
                warn!(error = %e, "Could not resolve endpoint from config, using fallback");
                self.fallback()
            }
        }
    }

    async fn fetch_remote(&self, token: &str) -> Result<String, ResolveError> {
        let response = self
            .http
            .get(&self.config_url)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ResolveError::Status(response.status()));
        }

        let config: EndpointConfig = response.json().await?;
        debug!(
            ws_url = config.ws_url.as_deref().unwrap_or("<missing>"),
            request_host = config.request_host.as_deref().unwrap_or("<missing>"),
            "Endpoint config received"
        );

        let ws_url = config.ws_url.ok_or(ResolveError::InvalidAddress)?;
        if ws_url == "undefined" || ws_url.contains("undefined") {
            return Err(ResolveError::InvalidAddress);
        }

        // A misconfigured server may echo its own development address,
        // unreachable from a deployed client.
        if ws_url.contains("localhost") && !self.context.is_localhost() {
            warn!(
                ws_url = %ws_url,
                context_host = %self.context.host(),
                "Config returned a localhost address, overriding with context host"
            );
            return Ok(self.context.ws_base());
        }

        Ok(ws_url)
    }

    /// Context-derived fallback base address
    fn fallback(&self) -> String {
        let scheme = if self.context.secure { "wss" } else { "ws" };
        let host = if self.context.port == Some(DEV_FRONTEND_PORT) {
            format!("{}:{}", self.context.hostname, DEV_BACKEND_PORT)
        } else {
            self.context.host()
        };
        let base = format!("{}://{}", scheme, host);
        debug!(base = %base, "Fallback endpoint address constructed");
        base
    }
}
