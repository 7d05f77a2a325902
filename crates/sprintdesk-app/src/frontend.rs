use async_trait::async_trait;
use sprintdesk_controller::{ConfirmationGate, Navigator, Notification, Notifier, Route};
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Prints notifications to stderr and mirrors them into the log.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(level = notification.level.as_str(), message = %notification.message, "notification");
        eprintln!("{notification}");
    }
}

/// Prompts on stderr and reads a y/N answer from stdin, unless `--yes` was given.
#[derive(Debug)]
pub struct StdinConfirmation {
    assume_yes: bool,
}

impl StdinConfirmation {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl ConfirmationGate for StdinConfirmation {
    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let mut stderr = tokio::io::stderr();
        if stderr
            .write_all(format!("{prompt} [y/N] ").as_bytes())
            .await
            .is_err()
        {
            return false;
        }
        let _ = stderr.flush().await;

        let mut answer = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut answer).await {
            Ok(_) => is_affirmative(&answer),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read confirmation answer");
                false
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Reports redirects; the last one is kept so the caller can tell the view never rendered.
#[derive(Debug, Default)]
pub struct ConsoleNavigator {
    last: Mutex<Option<Route>>,
}

impl ConsoleNavigator {
    pub fn last_redirect(&self) -> Option<Route> {
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = %route, "redirect");
        eprintln!("-> {route}");
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(route);
    }
}
