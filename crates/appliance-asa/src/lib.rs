//! ASA REST agent client.
//!
//! The ASA REST agent hands out an `X-Auth-Token` on login but still needs the
//! Basic authorization header on every call to report the right user and
//! privilege level. This crate binds `appliance-core`'s dual authentication
//! strategy and JSON codec to it and adds CLI passthrough.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{asa_auth, Asa, AsaSession};
pub use models::{CliOutput, CliRequest, CliResponse};

/// Convenient result alias that reuses the shared appliance error type.
pub type Result<T> = appliance_core::Result<T>;
