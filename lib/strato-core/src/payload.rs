//! Request payloads.

use bytes::Bytes;

use crate::{Form, Result};

/// A request payload: structured JSON or a multipart form.
#[derive(Debug, Clone)]
pub enum Payload {
    /// JSON payload, serialized to the body with `content-type:
    /// application/json`.
    Json(serde_json::Value),
    /// Multipart form payload, encoded with its own boundary content type.
    Form(Form),
}

impl Payload {
    /// Builds a JSON payload from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Returns `true` for multipart form payloads.
    #[must_use]
    pub const fn is_form(&self) -> bool {
        matches!(self, Self::Form(_))
    }

    /// Encodes to `(content_type, body)`. The content type is `None` for
    /// JSON payloads; the JSON header is decided by the header-construction
    /// rules, not the payload.
    pub fn encode(&self) -> Result<(Option<String>, Bytes)> {
        match self {
            Self::Json(value) => {
                let body = serde_json::to_vec(value).map(Bytes::from)?;
                Ok((None, body))
            }
            Self::Form(form) => {
                let (content_type, body) = form.encode();
                Ok((Some(content_type), body))
            }
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<Form> for Payload {
    fn from(form: Form) -> Self {
        Self::Form(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_encodes_body_only() {
        let payload = Payload::Json(serde_json::json!({"name": "Alice"}));
        let (content_type, body) = payload.encode().expect("encode");

        assert!(content_type.is_none());
        assert_eq!(body.as_ref(), br#"{"name":"Alice"}"#);
    }

    #[test]
    fn form_payload_carries_boundary_content_type() {
        let payload = Payload::from(Form::with_boundary("b1").text("a", "1"));
        let (content_type, body) = payload.encode().expect("encode");

        assert_eq!(
            content_type.as_deref(),
            Some("multipart/form-data; boundary=b1")
        );
        assert!(!body.is_empty());
        assert!(payload.is_form());
    }

    #[test]
    fn from_serialize() {
        #[derive(serde::Serialize)]
        struct User {
            name: String,
        }

        let payload = Payload::from_serialize(&User {
            name: "Bob".to_string(),
        })
        .expect("serialize");
        let (_, body) = payload.encode().expect("encode");
        assert_eq!(body.as_ref(), br#"{"name":"Bob"}"#);
    }
}
