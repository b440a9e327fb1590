//! Connection Manager
//!
//! Owns the single realtime channel: resolves the endpoint address, opens
//! the WebSocket, services inbound and outbound traffic, and reconnects
//! after a fixed delay for as long as the manager is alive.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::cli::config::Config;
use crate::client::session::ClientHandle;
use crate::client::state::{ChannelState, ChannelStateTracker};
use crate::connection::resolver::AddressResolver;
use crate::credentials::CredentialStore;

/// How a single channel session ended
enum SessionEnd {
    /// The channel closed or errored; a reconnection should follow
    Closed,
    /// Teardown was requested; no reconnection
    Shutdown,
}

/// Connection manager for the realtime channel.
///
/// At most one channel exists at a time; it is exclusively owned by the
/// manager task spawned by [`ConnectionManager::start`]. Consumers interact
/// through the [`ClientHandle`] returned by [`ConnectionManager::handle`].
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct ManagerInner {
    resolver: AddressResolver,
    credentials: Arc<dyn CredentialStore>,
    token_key: String,
    ws_path: String,
    reconnect_delay: Duration,
    outbound_buffer: usize,
    handle: ClientHandle,
    state: ChannelStateTracker,
}

impl ConnectionManager {
    /// Create a new connection manager from configuration
    pub fn new(config: &Config, credentials: Arc<dyn CredentialStore>) -> Self {
        let resolver = AddressResolver::new(
            (&config.context).into(),
            config.channel.config_url.clone(),
        );

        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(ManagerInner {
                resolver,
                credentials,
                token_key: config.credentials.token_key.clone(),
                ws_path: config.channel.ws_path.clone(),
                reconnect_delay: Duration::from_millis(config.channel.reconnect_delay_ms),
                outbound_buffer: config.channel.outbound_buffer,
                handle: ClientHandle::new(),
                state: ChannelStateTracker::new(),
            }),
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Get a consumer handle to the session
    pub fn handle(&self) -> ClientHandle {
        self.inner.handle.clone()
    }

    /// Get the current channel state
    pub fn state(&self) -> ChannelState {
        self.inner.state.current_state()
    }

    /// Get the state tracker for diagnostics
    pub fn state_tracker(&self) -> ChannelStateTracker {
        self.inner.state.clone()
    }

    /// Start the manager task. No-op if it is already running.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            debug!("Connection manager already running");
            return;
        }

        let _ = self.shutdown.send(false);
        let inner = self.inner.clone();
        let shutdown_rx = self.shutdown.subscribe();
        *task = Some(tokio::spawn(async move {
            inner.run(shutdown_rx).await;
        }));
    }

    /// Stop the manager: cancel any pending reconnection and close the
    /// active channel. Deterministic and idempotent.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);

        let task = { self.task.lock().take() };
        if let Some(task) = task {
            if task.await.is_err() {
                warn!("Connection manager task ended abnormally");
            }
        }

        self.inner.handle.clear();
        info!("Connection manager stopped");
    }
}

impl ManagerInner {
    /// Run the connection loop with auto-reconnect
    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            // Missing credential is a hard precondition failure: the channel
            // stays idle and no retry is scheduled.
            let Some(token) = self.credentials.get(&self.token_key) else {
                warn!(
                    key = %self.token_key,
                    "No authentication token available, channel stays idle"
                );
                return;
            };

            match self.connect_and_serve(&token, &mut shutdown).await {
                Ok(SessionEnd::Shutdown) => {
                    self.handle.clear();
                    self.state.set_closed(Some("Shutdown requested".to_string()));
                    return;
                }
                Ok(SessionEnd::Closed) => {
                    self.handle.clear();
                    self.state.set_closed(Some("Channel closed".to_string()));
                }
                Err(e) => {
                    error!(error = %e, "Channel session error");
                    self.handle.clear();
                    self.state.set_closed(Some(e.to_string()));
                }
            }

            if *shutdown.borrow() {
                return;
            }

            info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "Waiting before reconnection attempt"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = shutdown.changed() => return,
            }
        }
    }

    /// Resolve the endpoint, open the channel, and service it until it
    /// closes, errors, or teardown is requested
    async fn connect_and_serve(
        &self,
        token: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd> {
        self.state.set_connecting();

        // Resolved fresh on every attempt: the correct address may have
        // changed since the last one.
        let base = self.resolver.resolve(token).await;
        let url = format!("{}{}?token={}", base, self.ws_path, urlencoding::encode(token));

        info!(base = %base, "Connecting to realtime endpoint");

        let (ws_stream, _) = connect_async(&url)
            .await
            .context("Failed to open realtime channel")?;

        info!("Realtime channel open");
        self.state.set_open();

        let (mut write, mut read) = ws_stream.split();

        // Channel for outgoing messages from consumer handles
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Value>(self.outbound_buffer);
        self.handle.publish(&base, outbound_tx);

        loop {
            tokio::select! {
                // Handle incoming frames
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            // A malformed payload is dropped; it does not
                            // affect connection state or the message log.
                            match serde_json::from_str::<Value>(&text) {
                                Ok(message) => {
                                    debug!("Channel message received");
                                    self.handle.push_message(message);
                                }
                                Err(e) => {
                                    warn!(error = %e, "Malformed channel message dropped");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "Server closed the channel");
                            return Ok(SessionEnd::Closed);
                        }
                        Some(Ok(Message::Binary(_))) => {
                            debug!("Received binary frame (ignored)");
                        }
                        Some(Ok(Message::Frame(_))) => {
                            // Raw frame, typically not used
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Channel transport error");
                            return Err(e.into());
                        }
                        None => {
                            info!("Channel stream ended");
                            return Ok(SessionEnd::Closed);
                        }
                    }
                }

                // Handle outgoing messages from consumer handles
                outgoing = outbound_rx.recv() => {
                    if let Some(message) = outgoing {
                        let text = serde_json::to_string(&message)?;
                        debug!("Sending message over channel");
                        write.send(Message::Text(text.into())).await?;
                    }
                }

                // Teardown closes the active channel
                _ = shutdown.changed() => {
                    info!("Shutdown requested, closing channel");
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }
}
