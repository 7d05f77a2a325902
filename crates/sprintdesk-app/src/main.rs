mod cli;
mod frontend;
mod session;
mod workspace;

use anyhow::Result;
use cli::Command;
use frontend::{ConsoleNavigator, ConsoleNotifier, StdinConfirmation};
use session::SessionState;
use sprintdesk_client::{
    CredentialStore, InMemoryCredentialStore, OrphanPolicy, ReqwestTransport,
    ReqwestTransportConfig, ResourceClient, TeamCreationSettings,
};
use sprintdesk_config::SprintdeskConfig;
use sprintdesk_controller::Collaborators;
use sprintdesk_domain::{AuthTokens, ClientError};
use std::path::Path;
use std::sync::Arc;
use workspace::Workspace;

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = cli::parse_args(std::env::args().skip(1))?;
    if invocation.command == Command::Help {
        cli::print_help();
        return Ok(());
    }

    let config = sprintdesk_config::load_from_env()?;
    init_file_logging(&config.log_path())?;

    let session_path = config.session_state_path();
    let session = SessionState::load(&session_path)?;
    let credentials = Arc::new(build_credentials(&session));
    let client = build_client(&config, credentials.clone())?;

    let navigator = Arc::new(ConsoleNavigator::default());
    let collaborators = Collaborators::new(
        Arc::new(ConsoleNotifier),
        Arc::new(StdinConfirmation::new(invocation.assume_yes)),
        navigator.clone(),
    );
    let mut workspace = Workspace::new(
        client,
        collaborators,
        navigator,
        credentials,
        config.teams.member_role.clone(),
        session,
    );

    let succeeded = workspace.execute(invocation.command).await?;
    workspace.session().save(&session_path)?;
    if !succeeded {
        if let Some(route) = workspace.last_redirect() {
            tracing::info!(route = %route, "command ended on a redirect");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn init_file_logging(log_path: &Path) -> Result<(), ClientError> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|error| {
                ClientError::Configuration(format!(
                    "failed to create sprintdesk log directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|error| {
            ClientError::Configuration(format!(
                "failed to open sprintdesk log file '{}': {error}",
                log_path.display()
            ))
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();

    Ok(())
}

/// An access token from the environment wins over the one saved in the session.
fn build_credentials(session: &SessionState) -> InMemoryCredentialStore {
    let store = InMemoryCredentialStore::default();
    match sprintdesk_config::access_token_from_env() {
        Some(token) => store.store_tokens(AuthTokens {
            access: token.expose().to_owned(),
            refresh: None,
        }),
        None => {
            if let Some(tokens) = session.tokens.clone() {
                store.store_tokens(tokens);
            }
        }
    }
    store
}

fn build_client(
    config: &SprintdeskConfig,
    credentials: Arc<InMemoryCredentialStore>,
) -> Result<ResourceClient, ClientError> {
    let transport = ReqwestTransport::new(ReqwestTransportConfig::new(
        config.api.base_url.clone(),
        config.api.request_timeout_secs,
    )?)?;
    let orphan_policy = OrphanPolicy::from_key(&config.teams.orphaned_team_policy)
        .unwrap_or_default();

    Ok(ResourceClient::new(Arc::new(transport), credentials).with_team_settings(
        TeamCreationSettings {
            creator_role: config.teams.creator_role.clone(),
            orphan_policy,
        },
    ))
}
