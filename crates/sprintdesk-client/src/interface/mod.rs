use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sprintdesk_domain::{AuthTokens, ClientResult, Validate};
use std::fmt;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Delete,
}

impl ApiMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One request/response round trip against the API, relative to the configured base URL.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ApiRequest {
    fn new(method: ApiMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(ApiMethod::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes a single HTTP call. Transport failures surface as `ClientError::Network`;
/// non-2xx statuses are returned as responses and classified by the caller.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

pub trait CredentialStore: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
    fn store_tokens(&self, tokens: AuthTokens);
    fn clear(&self);
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    tokens: RwLock<Option<AuthTokens>>,
}

impl InMemoryCredentialStore {
    pub fn with_access_token(access: impl Into<String>) -> Self {
        Self {
            tokens: RwLock::new(Some(AuthTokens {
                access: access.into(),
                refresh: None,
            })),
        }
    }

    pub fn tokens(&self) -> Option<AuthTokens> {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InMemoryCredentialStore")
            .field("has_token", &self.tokens().is_some())
            .finish()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn bearer_token(&self) -> Option<String> {
        self.tokens()
            .map(|tokens| tokens.access)
            .filter(|token| !token.trim().is_empty())
    }

    fn store_tokens(&self, tokens: AuthTokens) {
        *self
            .tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tokens);
    }

    fn clear(&self) {
        *self
            .tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Describes one nested collection: where it is listed, which parent id scopes it,
/// and where items are created and deleted.
pub trait ResourceKind: Send + Sync + 'static {
    type Id: Copy + Eq + fmt::Display + fmt::Debug + Send + Sync;
    type Parent: Copy + Eq + fmt::Display + fmt::Debug + Send + Sync;
    type Item: DeserializeOwned + Clone + fmt::Debug + Send + Sync;

    const NAME: &'static str;
    const LIST_PATH: &'static str;
    const PARENT_KEY: &'static str;
    const COLLECTION_PATH: &'static str;

    fn item_id(item: &Self::Item) -> Self::Id;

    fn create_path() -> String {
        format!("{}/", Self::COLLECTION_PATH)
    }

    fn item_path(id: Self::Id) -> String {
        format!("{}/{id}/", Self::COLLECTION_PATH)
    }
}

pub trait CreatableResource: ResourceKind {
    type Draft: Serialize + Validate + Clone + fmt::Debug + Send + Sync;

    fn draft_parent(draft: &Self::Draft) -> Self::Parent;
}
