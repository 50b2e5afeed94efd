//! HTTP transport shared by all API namespaces.
//!
//! The [`Transport`] trait is the seam between the request pipelines
//! and the network: pipelines ask for JSON in and out, the transport
//! handles the base URL, the bearer token and multipart encoding. The
//! trait is automocked so pipeline tests can run without a server.

use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::errors::CapError;

/// Returned in place of a response body that cannot be parsed as JSON.
pub const JSON_PARSE_PLACEHOLDER: &str = "error parsing JSON response";

/// Authenticated request primitives against the API base URL.
///
/// One request is outstanding at a time; there is no retry policy.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET a path and parse the response as JSON. A body that fails
    /// JSON parsing degrades into [`JSON_PARSE_PLACEHOLDER`] instead
    /// of raising.
    async fn get(&self, path: &str) -> Result<Value, CapError>;

    /// GET raw bytes, for static assets.
    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, CapError>;

    /// POST a JSON body and parse the response as JSON.
    async fn post(&self, path: &str, body: Value) -> Result<Value, CapError>;

    /// POST a multipart upload: a `filedata` file part (omitted when
    /// the local file does not exist) plus a `metadata` text field
    /// holding the JSON-encoded mapping.
    async fn post_upload(
        &self,
        path: &str,
        file_path: &Path,
        metadata: Value,
    ) -> Result<Value, CapError>;
}

/// Ensure an API URL carries a scheme and a trailing slash.
pub fn normalize_url(url: &str) -> String {
    let mut result = url.to_string();
    if !result.starts_with("http") {
        result = format!("https://{result}");
    }
    ends_slash(&result)
}

fn ends_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Transport over `reqwest` with a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(api_url: &str, token: &str) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            api_url: normalize_url(api_url),
            token: token.to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, CapError> {
        let url = self.url(path);
        info!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| CapError::client(format!("GET {url} failed: {e}")))?;
        let result = match response.json::<Value>().await {
            Ok(value) => value,
            Err(_) => Value::String(JSON_PARSE_PLACEHOLDER.to_string()),
        };
        info!(url = %url, result = %result, "GET result");
        Ok(result)
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, CapError> {
        let url = self.url(path);
        info!(url = %url, "GET bytes");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| CapError::client(format!("GET {url} failed: {e}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CapError::client(format!("GET {url}: could not read body: {e}")))?;
        info!(url = %url, bytes = bytes.len(), "GET bytes result");
        Ok(bytes.to_vec())
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, CapError> {
        let url = ends_slash(&self.url(path));
        info!(url = %url, body = %body, "POST");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapError::client(format!("POST {url} failed: {e}")))?;
        let result = response
            .json::<Value>()
            .await
            .map_err(|e| CapError::client(format!("POST {url}: invalid JSON response: {e}")))?;
        info!(url = %url, result = %result, "POST result");
        Ok(result)
    }

    async fn post_upload(
        &self,
        path: &str,
        file_path: &Path,
        metadata: Value,
    ) -> Result<Value, CapError> {
        let url = ends_slash(&self.url(path));
        info!(url = %url, file = %file_path.display(), metadata = %metadata, "POST upload");
        let mut form = reqwest::multipart::Form::new().text("metadata", metadata.to_string());
        if file_path.is_file() {
            let bytes = tokio::fs::read(file_path).await.map_err(|e| {
                CapError::client(format!("could not read {}: {e}", file_path.display()))
            })?;
            let file_name = file_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("file")
                .to_string();
            form = form.part(
                "filedata",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );
        }
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CapError::client(format!("POST {url} failed: {e}")))?;
        let result = response
            .json::<Value>()
            .await
            .map_err(|e| CapError::client(format!("POST {url}: invalid JSON response: {e}")))?;
        info!(url = %url, result = %result, "POST upload result");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme_and_slash() {
        assert_eq!(normalize_url("www.captest.io"), "https://www.captest.io/");
    }

    #[test]
    fn normalize_keeps_wellformed_url() {
        assert_eq!(
            normalize_url("https://api.captest.io/"),
            "https://api.captest.io/"
        );
    }

    #[test]
    fn url_join_avoids_double_slash() {
        let transport = HttpTransport::new("https://api.captest.io/", "t");
        assert_eq!(
            transport.url("/blog/create/"),
            "https://api.captest.io/blog/create/"
        );
    }
}
