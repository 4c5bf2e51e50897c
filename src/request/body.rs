//! Request bodies.

use crate::protocol::constants;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Body of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
    Form(BTreeMap<String, String>),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Text(text) => text.is_empty(),
            Body::Bytes(bytes) => bytes.is_empty(),
            Body::Json(value) => value.is_null(),
            Body::Form(fields) => fields.is_empty(),
        }
    }

    /// Content type implied by the body, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Empty => None,
            Body::Text(_) => Some(constants::MIME_TEXT),
            Body::Bytes(_) => Some(constants::MIME_OCTET_STREAM),
            Body::Json(_) => Some(constants::MIME_JSON),
            Body::Form(_) => Some(constants::MIME_FORM),
        }
    }

    /// Layer a request body over a connector default body.
    ///
    /// JSON objects and form maps merge key by key with `overrides` winning.
    /// Otherwise a non-empty `overrides` replaces `self`.
    pub fn merged(&self, overrides: &Body) -> Body {
        match (self, overrides) {
            (Body::Json(serde_json::Value::Object(base)), Body::Json(serde_json::Value::Object(top))) => {
                let mut merged = base.clone();
                for (k, v) in top {
                    merged.insert(k.clone(), v.clone());
                }
                Body::Json(serde_json::Value::Object(merged))
            }
            (Body::Form(base), Body::Form(top)) => {
                let mut merged = base.clone();
                merged.extend(top.iter().map(|(k, v)| (k.clone(), v.clone())));
                Body::Form(merged)
            }
            (base, top) if top.is_empty() => base.clone(),
            (_, top) => top.clone(),
        }
    }

    /// Encode the body for the wire.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Body::Empty => Bytes::new(),
            Body::Text(text) => Bytes::from(text.clone()),
            Body::Bytes(bytes) => bytes.clone(),
            Body::Json(value) => Bytes::from(value.to_string()),
            Body::Form(fields) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                Bytes::from(encoded)
            }
        }
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}
