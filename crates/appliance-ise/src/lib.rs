//! ISE External RESTful Services (ERS) client.
//!
//! ISE authenticates with Basic auth and answers with session cookies that are
//! replayed on every later call. Resources are exchanged as namespaced XML and
//! collections are searched page by page until a page stops advertising a
//! `nextPage` link.
//!
//! ```no_run
//! use appliance_core::SessionConfig;
//! use appliance_ise::Ise;
//!
//! # async fn run() -> appliance_ise::Result<()> {
//! let config = SessionConfig::new("https://ise.example.net:9060")?
//!     .with_credentials("ersadmin", "secret".to_string());
//! let ise = Ise::connect(&config).await?;
//! if let Some(endpoint) = ise.find_endpoint("00:11:22:33:44:55").await? {
//!     println!("{}", endpoint.id);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{ise_auth, Ise, IseSession};
pub use models::{
    has_next_page, is_empty_page, resources, NewEndpoint, NewInternalUser, ResourceRef, ResourceType,
};

/// Convenient result alias that reuses the shared appliance error type.
pub type Result<T> = appliance_core::Result<T>;
