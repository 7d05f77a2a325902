use crate::interface::{ApiMethod, ApiRequest, ApiResponse, HttpTransport};
use async_trait::async_trait;
use reqwest::{header, Client};
use sprintdesk_domain::{ClientError, ClientResult};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqwestTransportConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ReqwestTransportConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ReqwestTransportConfig {
    pub fn new(api_url: impl Into<String>, request_timeout_secs: u64) -> ClientResult<Self> {
        let api_url = api_url.into().trim().to_owned();
        if api_url.is_empty() {
            return Err(ClientError::Configuration(
                "api.base_url is empty. Provide the API root, e.g. http://localhost:8000/api."
                    .to_owned(),
            ));
        }
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ClientError::Configuration(format!(
                "api.base_url must start with http:// or https://, got '{api_url}'."
            )));
        }
        if request_timeout_secs == 0 {
            return Err(ClientError::Configuration(
                "api.request_timeout_secs must be greater than zero.".to_owned(),
            ));
        }

        Ok(Self {
            api_url,
            request_timeout_secs,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    config: ReqwestTransportConfig,
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: ReqwestTransportConfig) -> ClientResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|error| {
                ClientError::Configuration(format!("failed to build HTTP client: {error}"))
            })?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.api_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.endpoint(&request.path);
        let mut builder = match request.method {
            ApiMethod::Get => self.client.get(url),
            ApiMethod::Post => self.client.post(url),
            ApiMethod::Delete => self.client.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| ClientError::Network(format!("API request failed: {error}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| ClientError::Network(format!("API response read failed: {error}")))?;

        Ok(ApiResponse { status, body })
    }
}
