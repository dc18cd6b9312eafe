//! Dasher - DASH packaging for HbbTV
//!
//! This library crate exposes configuration loading and the packaging
//! pipeline for the binary and for integration testing.

pub mod config;
pub mod pipeline;
