//! HTTP utilities for InsightCloudSec REST API calls

use super::{ApiError, ApiResult};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the InsightCloudSec API key
pub const API_KEY_HEADER: &str = "Api-Key";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Operator-facing text for an HTTP status
/// Security: generic messages avoid echoing raw API error bodies
pub fn describe_status(status: u16) -> &'static str {
    match status {
        400 => "Invalid request. Check your parameters.",
        401 => "Authentication failed. Check the InsightCloudSec API key.",
        403 => "Permission denied. The API key lacks the required role.",
        404 => "Resource not found.",
        409 => "Resource conflict. The resource may already exist or be in use.",
        429 => "Rate limit exceeded. Please try again later.",
        500..=599 => "InsightCloudSec service temporarily unavailable. Please try again.",
        _ => "Request failed. Check your network connection and try again.",
    }
}

/// HTTP client wrapper for InsightCloudSec API calls
#[derive(Clone)]
pub struct IcsHttpClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for IcsHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcsHttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl IcsHttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: Url, api_key: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(format!("terraform-provider-insightcloudsec/{}", crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an absolute endpoint URL from a path like `v2/public/clouds/list`
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        let url = self.url(path)?;
        tracing::debug!("{} {}", method, url);

        let mut request = self.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!("not found: {}", path);
            return Err(ApiError::NotFound {
                path: path.to_string(),
            });
        }

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: describe_status(status.as_u16()).to_string(),
            });
        }

        // Handle empty response
        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&response_body)?)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send(Method::GET, path, None).await
    }

    /// Make a POST request
    pub async fn post(&self, path: &str, body: Option<&Value>) -> ApiResult<Value> {
        self.send(Method::POST, path, body).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send(Method::DELETE, path, None).await
    }

    /// GET and decode into a typed payload
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        decode(self.get(path).await?)
    }

    /// POST and decode into a typed payload
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Option<&Value>) -> ApiResult<T> {
        decode(self.post(path, body).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    Ok(serde_json::from_value(value)?)
}
