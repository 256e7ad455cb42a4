//! Transport-agnostic request and response types.
//!
//! A `Request` is a method selector plus a byte payload and string metadata;
//! a `Response` is string metadata plus an optional serialized row-set.
//! Both are created per call and discarded afterwards - the engine holds no
//! cross-call state in them. On the wire (JSON) the byte payload travels as
//! base64.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key naming the operation to perform.
pub const METADATA_METHOD: &str = "method";
/// Metadata key selecting the transaction isolation level.
pub const METADATA_ISOLATION_LEVEL: &str = "isolation_level";
/// Response metadata key carrying the outcome: `ok` or an error description.
pub const METADATA_RESULT: &str = "result";

/// An inbound operation: string metadata plus a byte payload interpreted
/// as SQL text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Request {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metadata key-value pair (builder style).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the byte payload (builder style).
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Look up a metadata value.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The method selector, if present.
    pub fn method(&self) -> Option<&str> {
        self.metadata(METADATA_METHOD)
    }

    /// The payload interpreted as SQL text.
    pub fn sql_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// An outbound result: `result` metadata plus an optional serialized
/// row-set. `data` is absent on error and for operations that produce
/// no rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_opt_bytes"
    )]
    pub data: Option<Vec<u8>>,
}

impl Response {
    /// A successful acknowledgment with no row data.
    pub fn ok() -> Self {
        Self::default().with_metadata(METADATA_RESULT, "ok")
    }

    /// A failure response carrying the error description in `result`.
    pub fn from_error(err: &crate::error::EngineError) -> Self {
        Self::default().with_metadata(METADATA_RESULT, err.to_string())
    }

    /// Set a metadata key-value pair (builder style).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a serialized row-set (builder style).
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// The `result` metadata value, if present.
    pub fn result(&self) -> Option<&str> {
        self.metadata.get(METADATA_RESULT).map(String::as_str)
    }

    /// Whether this response reports success.
    pub fn is_ok(&self) -> bool {
        self.result() == Some("ok")
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

mod base64_opt_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            Some(s) => STANDARD
                .decode(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_request_builder() {
        let req = Request::new()
            .with_metadata(METADATA_METHOD, "query")
            .with_data("SELECT 1");
        assert_eq!(req.method(), Some("query"));
        assert_eq!(req.sql_text(), "SELECT 1");
    }

    #[test]
    fn test_request_missing_method() {
        let req = Request::new().with_data("SELECT 1");
        assert!(req.method().is_none());
    }

    #[test]
    fn test_response_ok() {
        let resp = Response::ok();
        assert!(resp.is_ok());
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_response_from_error_has_no_data() {
        let resp = Response::from_error(&EngineError::validation("empty sql"));
        assert!(!resp.is_ok());
        assert!(resp.result().unwrap().contains("empty sql"));
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_request_wire_round_trip() {
        let req = Request::new()
            .with_metadata(METADATA_METHOD, "exec")
            .with_data("INSERT INTO t VALUES (1)");
        let json = serde_json::to_string(&req).unwrap();
        // Payload travels as base64, not raw SQL
        assert!(!json.contains("INSERT"));
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_response_omits_absent_data() {
        let json = serde_json::to_string(&Response::ok()).unwrap();
        assert!(!json.contains("data"));
    }
}
