//! Connection module
//!
//! This module handles communication with the realtime endpoint, including
//! address resolution and the WebSocket connection lifecycle.

pub mod resolver;
pub mod websocket;
