//! # appliance-core
//!
//! Generic REST client composition layer for network appliance management APIs.
//!
//! Every appliance shares the same lifecycle: authenticate once, replay a token or
//! cookie on every call, log out explicitly. This crate keeps the three moving parts
//! apart and composes them inside a [`Session`]:
//!
//! - the session engine owns transport, lifecycle and error classification,
//! - an [`AuthStrategy`] describes one appliance's authentication handshake,
//! - a [`PayloadCodec`] turns wire bytes into a structured value and back.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and conversions
//! - [`config`] - Session configuration
//! - [`client`] - HTTP transport settings and default timeouts
//! - [`types`] - Appliance identifiers and login credentials
//! - [`query`] - Query parameter builder
//! - [`request`] - Request descriptions, per-call options and responses
//! - [`auth`] - Authentication strategies
//! - [`codec`] - JSON and XML payload codecs
//! - [`session`] - The session engine
//! - [`pagination`] - Lazily fetched page streams

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod pagination;
pub mod query;
pub mod request;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use auth::{AuthStrategy, CookieAuth, CredentialPolicy, DualAuth, TokenHeaderAuth};
pub use client::HttpConfig;
pub use codec::{JsonCodec, PayloadCodec, XmlAttribute, XmlCodec, XmlElement, XmlValue};
pub use config::SessionConfig;
pub use error::{Error, ErrorKind, Result};
pub use pagination::PageQuery;
pub use query::QueryParams;
pub use request::{ApiRequest, ApiResponse, RequestOptions};
pub use session::{scoped, ApplianceClient, Session, SessionBuilder, SessionState};
pub use types::{Appliance, Credentials};
