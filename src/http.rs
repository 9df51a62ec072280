use crate::error::{Error, Result};
use reqwest::{Client, header};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-over-HTTP client bound to one upstream platform.
///
/// Sends exactly one request per call. Non-2xx responses become
/// [`Error::Api`] carrying the status code and the provider-reported detail.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    platform: String,
}

impl HttpClient {
    pub fn new(platform: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("llm-comparator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(e.to_string()))?;

        Ok(Self {
            client,
            platform: platform.into(),
        })
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// POST `body` as JSON with `Authorization: Bearer <token>`.
    pub async fn post_json_bearer<B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<String> {
        let body = serialize(body)?;
        let auth = format!("Bearer {token}");
        self.post_json_raw(url, &body, &[(header::AUTHORIZATION.as_str(), auth.as_str())])
            .await
    }

    pub async fn post_json_raw(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<String> {
        debug!(platform = %self.platform, url, "sending request");

        let mut req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        match req.send().await {
            Ok(resp) => self.handle_response(resp).await,
            Err(e) => {
                warn!(platform = %self.platform, error = %e, "request failed");
                Err(Error::http(e.to_string()))
            }
        }
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        if status.is_success() {
            return resp.text().await.map_err(|e| Error::http(e.to_string()));
        }

        let body = resp.text().await.unwrap_or_default();
        let reason = status.canonical_reason().unwrap_or("Unknown Status");
        Err(Error::api(
            self.platform.clone(),
            extract_error_detail(&body, reason),
            status.as_u16(),
        ))
    }
}

fn serialize<B: Serialize + ?Sized>(body: &B) -> Result<String> {
    serde_json::to_string(body).map_err(|e| Error::parse(format!("serialize request: {e}")))
}

/// Pull the human-readable detail out of an error body.
///
/// Prefers `error.message`, then a top-level `message`, and falls back to
/// the HTTP reason phrase when the body is not JSON or carries neither.
pub(crate) fn extract_error_detail(body: &str, reason: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return reason.to_string();
    };
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .unwrap_or(reason)
        .to_string()
}
