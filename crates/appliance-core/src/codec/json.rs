//! JSON payloads.

use serde_json::Value;

use super::{is_blank, PayloadCodec};
use crate::error::{Error, Result};

const JSON_MEDIA_TYPE: &str = "application/json";

/// JSON codec producing order-preserving [`serde_json::Value`] trees.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    media_type: String,
}

impl JsonCodec {
    /// Create a codec using `application/json`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            media_type: JSON_MEDIA_TYPE.to_string(),
        }
    }

    /// Use a vendor media type instead of `application/json`.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCodec for JsonCodec {
    type Value = Value;

    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::EncodeError(e.to_string()))
    }

    fn decode(&self, body: &[u8]) -> Result<Option<Value>> {
        if is_blank(body) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(body)?))
    }
}
