//! Payload codecs.
//!
//! A [`PayloadCodec`] converts between wire bytes and the structured value a
//! session hands to its callers. Decoding distinguishes "no data" (`Ok(None)`)
//! from a decoded value that happens to be empty.

mod json;
mod xml;

pub use json::JsonCodec;
pub use xml::{XmlAttribute, XmlCodec, XmlElement, XmlValue};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::error::Result;

/// Conversion between wire bytes and a structured value.
pub trait PayloadCodec: Send + Sync {
    /// Structured value produced by decoding.
    type Value: Send + Sync;

    /// Media type used for the default `Accept` and `Content-Type` headers.
    fn media_type(&self) -> &str;

    /// Encode a value into a request body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EncodeError`] if the value cannot be serialized.
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>>;

    /// Decode a response body; `Ok(None)` marks a body without data.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DecodeError`] for malformed bodies.
    fn decode(&self, body: &[u8]) -> Result<Option<Self::Value>>;

    /// Default `Accept` and `Content-Type` headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the media type is not a valid header value.
    fn default_headers(&self) -> Result<HeaderMap> {
        let value = HeaderValue::from_str(self.media_type())?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, value.clone());
        headers.insert(CONTENT_TYPE, value);
        Ok(headers)
    }
}

/// Returns true if the body holds nothing but whitespace.
pub(crate) fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}
