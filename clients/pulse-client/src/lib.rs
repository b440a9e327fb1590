//! Pulse Client Library
//!
//! This crate provides the core functionality for the Pulse realtime client,
//! including dynamic endpoint resolution, WebSocket channel lifecycle
//! management, and the consumer-facing session surface.

pub mod cli;
pub mod client;
pub mod connection;
pub mod credentials;

// Re-exports for convenience
pub use cli::config::Config;
pub use client::session::{ClientHandle, ConnectionInfo};
pub use client::state::{ChannelState, ChannelStateTracker};
pub use connection::resolver::{AddressResolver, ClientContext};
pub use connection::websocket::ConnectionManager;
pub use credentials::{
    CredentialStore, EnvCredentialStore, FileCredentialStore, MemoryCredentialStore,
};
