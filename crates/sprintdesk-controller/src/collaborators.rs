use crate::scope::Route;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}] {}", self.level.as_str(), self.message)
    }
}

/// Surfaces user-facing outcome messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Asks the user to approve a destructive action.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => {
                info!(level = notification.level.as_str(), "{}", notification.message)
            }
            NotificationLevel::Warning => warn!("{}", notification.message),
            NotificationLevel::Error => error!("{}", notification.message),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: Route) {
        info!(route = %route.path(), "navigation requested");
    }
}

/// Answers every confirmation prompt with a fixed decision.
#[derive(Debug, Clone, Copy)]
pub struct StaticConfirmation {
    pub approve: bool,
}

impl StaticConfirmation {
    pub const fn approve() -> Self {
        Self { approve: true }
    }

    pub const fn decline() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl ConfirmationGate for StaticConfirmation {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.approve
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub confirmation: Arc<dyn ConfirmationGate>,
    pub navigator: Arc<dyn Navigator>,
}

impl Collaborators {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        confirmation: Arc<dyn ConfirmationGate>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            notifier,
            confirmation,
            navigator,
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(
            Arc::new(TracingNotifier),
            Arc::new(StaticConfirmation::decline()),
            Arc::new(TracingNavigator),
        )
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
