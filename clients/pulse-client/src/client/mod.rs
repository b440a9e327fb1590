//! Client module
//!
//! This module contains the channel state machine and the session surface
//! shared between the connection manager and consumers.

pub mod session;
pub mod state;
