//! FXOS chassis manager client.
//!
//! This crate binds the token-header authentication handshake and the JSON codec
//! from `appliance-core` to the FXOS management REST API.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{fxos_auth, Fxos, FxosSession};
pub use models::{FirmwareReport, FirmwareVersion};

/// Convenient result alias that reuses the shared appliance error type.
pub type Result<T> = appliance_core::Result<T>;
