//! Thin HTTP gateway: every call targets the configured origin, non-success
//! statuses become [`ApiError::RequestFailed`], bodies are decoded by
//! content type.

use crate::error::ApiError;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    /// Client for the server at `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// GET, bypassing any caching layer between us and the server.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!(path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        handle(resp).await
    }

    /// POST a multipart form.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, ApiError> {
        tracing::debug!(path, "POST");
        let resp = self.http.post(self.url(path)).multipart(form).send().await?;
        handle(resp).await
    }

    pub async fn del<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!(path, "DELETE");
        let resp = self.http.delete(self.url(path)).send().await?;
        handle(resp).await
    }
}

/// JSON bodies decode into `T` (an empty body reads as `null`); anything else
/// is handed to `T` as a string.
async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "request failed");
        return Err(ApiError::RequestFailed(if text.is_empty() {
            format!("Request failed: {}", status.as_u16())
        } else {
            text
        }));
    }

    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let body = resp.bytes().await?;

    if !is_json {
        let text = String::from_utf8_lossy(&body).into_owned();
        return Ok(serde_json::from_value(Value::String(text))?);
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/students"), "http://localhost:8000/students");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(ApiClient::new("not a url"), Err(ApiError::InvalidUrl(_))));
    }
}
