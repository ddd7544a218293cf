use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

/// Whatever the payment gateway posted back, as a flat key/value bag.
///
/// The gateway posts `application/x-www-form-urlencoded` bodies, while manual
/// calls and some gateway modes send JSON; both land here. JSON scalars are
/// kept as-is so numeric fields still read back through [`GatewayPayload::get`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayPayload(pub BTreeMap<String, Value>);

impl GatewayPayload {
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    /// String view of a scalar field; empty strings and nulls read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn parse(content_type: Option<&str>, bytes: &[u8]) -> Result<Self, PayloadRejection> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let is_json = content_type
            .map(|ct| ct.starts_with("application/json") || ct.contains("+json"))
            .unwrap_or(false);

        if is_json {
            let value: Value = serde_json::from_slice(bytes)
                .map_err(|e| PayloadRejection::InvalidJson(e.to_string()))?;
            return match value {
                Value::Object(map) => Ok(Self(map.into_iter().collect())),
                _ => Err(PayloadRejection::InvalidJson("expected a JSON object".to_string())),
            };
        }

        Ok(Self::from_pairs(url::form_urlencoded::parse(bytes).into_owned()))
    }
}

#[derive(Error, Debug)]
pub enum PayloadRejection {
    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),
}

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl<S> FromRequest<S> for GatewayPayload
where
    S: Send + Sync,
{
    type Rejection = PayloadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| PayloadRejection::Body(e.to_string()))?;

        debug!("Gateway payload: {} bytes ({:?})", bytes.len(), content_type);
        Self::parse(content_type.as_deref(), &bytes)
    }
}
