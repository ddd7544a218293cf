use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Supabase client is not configured")]
    NotConfigured,

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// PostgREST rejected the request. `code` is the Postgres/PostgREST error code when present.
    #[error("API error ({status}): {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
}

impl SupabaseError {
    pub fn code(&self) -> Option<&str> {
        match self {
            SupabaseError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// PostgREST error body: `{"code", "message", "details", "hint"}`.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Result<Self, SupabaseError> {
        let client = Client::builder()
            .timeout(config.database_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        })
    }

    fn get_headers(&self, extra: Option<HeaderMap>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.service_key)
            .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(extra) = extra {
            headers.extend(extra);
        }

        Ok(headers)
    }

    /// Sends a request and returns the raw response text of a 2xx reply.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<String, SupabaseError> {
        if self.base_url.is_empty() {
            return Err(SupabaseError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers(headers)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("API error ({}): {}", status, text);

            let parsed: Option<PostgrestError> = serde_json::from_str(&text).ok();
            let (code, message) = match parsed {
                Some(err) => (err.code, err.message.unwrap_or_else(|| text.clone())),
                None => (None, text),
            };

            return Err(SupabaseError::Api { status, code, message });
        }

        Ok(text)
    }

    /// Inserts `rows` into `table` without asking for the representation back.
    pub async fn insert<R: Serialize>(&self, table: &str, rows: &[R]) -> Result<(), SupabaseError> {
        let body = serde_json::to_value(rows).map_err(|e| SupabaseError::Api {
            status: StatusCode::BAD_REQUEST,
            code: None,
            message: format!("Failed to serialize rows: {}", e),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=minimal"));

        let path = format!("/rest/v1/{}", table);
        self.send(Method::POST, &path, Some(body), Some(headers)).await?;

        debug!("Inserted {} row(s) into {}", rows.len(), table);
        Ok(())
    }
}
