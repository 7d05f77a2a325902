#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sprintdesk_client::{
    ApiRequest, ApiResponse, HttpTransport, InMemoryCredentialStore, ResourceClient,
};
use sprintdesk_controller::{
    Collaborators, ConfirmationGate, Navigator, Notification, NotificationLevel, Notifier, Route,
};
use sprintdesk_domain::{ClientError, ClientResult};
use tokio::sync::oneshot;

pub struct StubReply {
    response: ClientResult<ApiResponse>,
    arrived: Option<oneshot::Sender<()>>,
    release: Option<oneshot::Receiver<()>>,
}

impl StubReply {
    pub fn ok(status: u16, body: &str) -> Self {
        Self {
            response: Ok(ApiResponse::new(status, body)),
            arrived: None,
            release: None,
        }
    }

    pub fn network(message: &str) -> Self {
        Self {
            response: Err(ClientError::Network(message.to_owned())),
            arrived: None,
            release: None,
        }
    }

    /// Signals `arrived` when the request is received, then waits for `release`.
    pub fn gated(
        mut self,
        arrived: oneshot::Sender<()>,
        release: oneshot::Receiver<()>,
    ) -> Self {
        self.arrived = Some(arrived);
        self.release = Some(release);
        self
    }
}

/// Replies are queued per `METHOD path?query` key.
#[derive(Default)]
pub struct RoutedTransport {
    replies: Mutex<HashMap<String, VecDeque<StubReply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl RoutedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, key: &str, reply: StubReply) {
        self.replies
            .lock()
            .expect("replies lock")
            .entry(key.to_owned())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn request_keys(&self) -> Vec<String> {
        self.requests().iter().map(request_key).collect()
    }
}

pub fn request_key(request: &ApiRequest) -> String {
    let query = request
        .query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        format!("{} {}", request.method, request.path)
    } else {
        format!("{} {}?{query}", request.method, request.path)
    }
}

#[async_trait]
impl HttpTransport for RoutedTransport {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let key = request_key(&request);
        self.requests.lock().expect("requests lock").push(request);
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        let Some(reply) = reply else {
            return Err(ClientError::Network(format!("no stub reply for {key}")));
        };
        if let Some(arrived) = reply.arrived {
            let _ = arrived.send(());
        }
        if let Some(release) = reply.release {
            let _ = release.await;
        }
        reply.response
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().expect("notifications lock").clone()
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|notification| notification.level == NotificationLevel::Error)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .expect("notifications lock")
            .push(notification);
    }
}

pub struct ScriptedConfirmation {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmation {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_owned());
        self.answer
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().expect("routes lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().expect("routes lock").push(route);
    }
}

pub struct Harness {
    pub transport: Arc<RoutedTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub confirmation: Arc<ScriptedConfirmation>,
    pub navigator: Arc<RecordingNavigator>,
    pub client: ResourceClient,
    pub collaborators: Collaborators,
}

impl Harness {
    pub fn new(confirm: bool) -> Self {
        let transport = RoutedTransport::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let confirmation = Arc::new(ScriptedConfirmation::answering(confirm));
        let navigator = Arc::new(RecordingNavigator::default());
        let client = ResourceClient::new(
            transport.clone(),
            Arc::new(InMemoryCredentialStore::with_access_token("test-token")),
        );
        let collaborators = Collaborators::new(
            notifier.clone(),
            confirmation.clone(),
            navigator.clone(),
        );
        Self {
            transport,
            notifier,
            confirmation,
            navigator,
            client,
            collaborators,
        }
    }
}
