//! CLI module
//!
//! Configuration loading for the client binary.

pub mod config;
