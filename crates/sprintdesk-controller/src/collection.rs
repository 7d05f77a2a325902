use crate::collaborators::{Collaborators, Notification};
use crate::scope::{Route, ViewKind};
use sprintdesk_client::{
    CreatableResource, ProjectKind, ResourceClient, ResourceKind, SprintKind, TaskKind, TeamKind,
};
use sprintdesk_domain::{ClientError, Team};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Binds a resource kind to the view that lists it and the route shown when
/// its parent scope is missing.
pub trait ScopedView: ResourceKind {
    const VIEW: ViewKind;
    const FALLBACK: Route;
}

impl ScopedView for TeamKind {
    const VIEW: ViewKind = ViewKind::Teams;
    const FALLBACK: Route = Route::Login;
}

impl ScopedView for ProjectKind {
    const VIEW: ViewKind = ViewKind::Projects;
    const FALLBACK: Route = Route::Teams;
}

impl ScopedView for SprintKind {
    const VIEW: ViewKind = ViewKind::Sprints;
    const FALLBACK: Route = Route::Teams;
}

impl ScopedView for TaskKind {
    const VIEW: ViewKind = ViewKind::Tasks;
    const FALLBACK: Route = Route::Teams;
}

/// Result of a controller action. Failures have already been sent to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    Completed(T),
    Cancelled,
    Failed(ClientError),
}

impl<T> ActionOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled | Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Completed(_) | Self::Cancelled => None,
        }
    }
}

struct CollectionState<K: ResourceKind> {
    scope: Option<K::Parent>,
    // Bumped on every scope change; results tagged with an older epoch are dropped.
    epoch: u64,
    items: Vec<K::Item>,
    in_flight: usize,
    fallback: Route,
}

impl<K: ScopedView> CollectionState<K> {
    fn new() -> Self {
        Self {
            scope: None,
            epoch: 0,
            items: Vec::new(),
            in_flight: 0,
            fallback: K::FALLBACK,
        }
    }

    fn enter_scope(&mut self, scope: Option<K::Parent>) {
        self.scope = scope;
        self.epoch += 1;
        self.items.clear();
        self.in_flight = 0;
    }
}

/// Local cache of one nested collection under its active parent scope.
pub struct ScopedCollection<K: ScopedView> {
    client: ResourceClient,
    collaborators: Collaborators,
    state: Arc<RwLock<CollectionState<K>>>,
}

impl<K: ScopedView> Clone for ScopedCollection<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            collaborators: self.collaborators.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<K: ScopedView> fmt::Debug for ScopedCollection<K> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ScopedCollection")
            .field("resource", &K::NAME)
            .finish_non_exhaustive()
    }
}

impl<K: ScopedView> ScopedCollection<K> {
    pub fn new(client: ResourceClient, collaborators: Collaborators) -> Self {
        Self::with_fallback(client, collaborators, K::FALLBACK)
    }

    /// Like `new`, navigating to `fallback` instead of the kind's default when the scope is missing.
    pub fn with_fallback(client: ResourceClient, collaborators: Collaborators, fallback: Route) -> Self {
        let mut state = CollectionState::new();
        state.fallback = fallback;
        Self {
            client,
            collaborators,
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn items(&self) -> Vec<K::Item> {
        self.state.read().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.in_flight > 0
    }

    pub async fn scope(&self) -> Option<K::Parent> {
        self.state.read().await.scope
    }

    pub async fn set_fallback(&self, route: Route) {
        self.state.write().await.fallback = route;
    }

    /// Fetches the collection for `scope`, replacing the cached items wholesale.
    pub async fn load(&self, scope: Option<K::Parent>) -> ActionOutcome<Vec<K::Item>> {
        let Some(parent) = scope else {
            let fallback = {
                let mut state = self.state.write().await;
                if state.scope.is_some() {
                    state.enter_scope(None);
                }
                state.fallback
            };
            let error = self.scope_missing();
            self.report_failure(&error);
            self.collaborators.navigator.navigate(fallback);
            return ActionOutcome::Failed(error);
        };

        let epoch = {
            let mut state = self.state.write().await;
            if state.scope != Some(parent) {
                state.enter_scope(Some(parent));
            }
            state.in_flight += 1;
            state.epoch
        };

        let result = self.client.list::<K>(Some(parent)).await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!(resource = K::NAME, scope = %parent, "discarding list result for a stale scope");
            return ActionOutcome::Cancelled;
        }
        state.in_flight = state.in_flight.saturating_sub(1);
        match result {
            Ok(items) => {
                state.items = items.clone();
                drop(state);
                debug!(resource = K::NAME, scope = %parent, count = items.len(), "collection loaded");
                ActionOutcome::Completed(items)
            }
            Err(error) => {
                drop(state);
                self.report_failure(&error);
                ActionOutcome::Failed(error)
            }
        }
    }

    pub async fn refresh(&self) -> ActionOutcome<Vec<K::Item>> {
        let scope = self.scope().await;
        self.load(scope).await
    }

    /// Deletes `id` after confirmation and drops it from the cache.
    pub async fn remove(&self, id: K::Id) -> ActionOutcome<()> {
        let Some((_, epoch)) = self.active_scope().await else {
            let error = self.scope_missing();
            self.report_failure(&error);
            return ActionOutcome::Failed(error);
        };

        let prompt = format!("Delete {} {id}?", K::NAME);
        if !self.collaborators.confirmation.confirm(&prompt).await {
            debug!(resource = K::NAME, id = %id, "removal declined");
            return ActionOutcome::Cancelled;
        }

        match self.client.remove::<K>(id).await {
            Ok(()) => {
                {
                    let mut state = self.state.write().await;
                    if state.epoch == epoch {
                        state.items.retain(|item| K::item_id(item) != id);
                    }
                }
                info!(resource = K::NAME, id = %id, "removed");
                self.collaborators
                    .notifier
                    .notify(Notification::success(format!("{} {id} deleted", K::NAME)));
                ActionOutcome::Completed(())
            }
            Err(error) => {
                self.report_failure(&error);
                ActionOutcome::Failed(error)
            }
        }
    }

    async fn active_scope(&self) -> Option<(K::Parent, u64)> {
        let state = self.state.read().await;
        state.scope.map(|scope| (scope, state.epoch))
    }

    /// Appends a server-returned item unless the scope moved on while the request ran.
    async fn append_if_current(&self, epoch: u64, item: K::Item) {
        let mut state = self.state.write().await;
        if state.epoch == epoch {
            state.items.push(item);
        } else {
            debug!(resource = K::NAME, "created item belongs to a stale scope; not appended");
        }
    }

    fn scope_missing(&self) -> ClientError {
        ClientError::ScopeMissing {
            resource: K::NAME,
            parent_key: K::PARENT_KEY,
        }
    }

    fn report_failure(&self, error: &ClientError) {
        if error.is_local() {
            debug!(resource = K::NAME, error = %error, "collection action rejected locally");
        } else {
            warn!(resource = K::NAME, error = %error, "collection action failed");
        }
        let notification = match error {
            ClientError::PartialCompoundFailure { .. } => Notification::warning(error.to_string()),
            _ => Notification::error(error.to_string()),
        };
        self.collaborators.notifier.notify(notification);
    }
}

impl<K> ScopedCollection<K>
where
    K: ScopedView + CreatableResource,
{
    /// Submits `draft` and appends exactly the item the server returned.
    pub async fn create(&self, draft: K::Draft) -> ActionOutcome<K::Item> {
        let Some((scope, epoch)) = self.active_scope().await else {
            let error = self.scope_missing();
            self.report_failure(&error);
            return ActionOutcome::Failed(error);
        };

        if K::draft_parent(&draft) != scope {
            let error = ClientError::validation(K::PARENT_KEY, "does not match the active scope");
            self.report_failure(&error);
            return ActionOutcome::Failed(error);
        }

        match self.client.create::<K>(&draft).await {
            Ok(item) => {
                self.append_if_current(epoch, item.clone()).await;
                info!(resource = K::NAME, id = %K::item_id(&item), "created");
                self.collaborators
                    .notifier
                    .notify(Notification::success(format!("{} created", K::NAME)));
                ActionOutcome::Completed(item)
            }
            Err(error) => {
                self.report_failure(&error);
                ActionOutcome::Failed(error)
            }
        }
    }
}

impl ScopedCollection<TeamKind> {
    /// Creates a team owned by the scoped user; the team is only cached once
    /// its creator membership exists.
    pub async fn create_team_with_membership(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> ActionOutcome<Team> {
        let Some((user, epoch)) = self.active_scope().await else {
            let error = self.scope_missing();
            self.report_failure(&error);
            return ActionOutcome::Failed(error);
        };

        match self
            .client
            .create_team_with_membership(user, name, description)
            .await
        {
            Ok(team) => {
                self.append_if_current(epoch, team.clone()).await;
                info!(team_id = %team.id, "team created with creator membership");
                self.collaborators
                    .notifier
                    .notify(Notification::success(format!("team {} created", team.name)));
                ActionOutcome::Completed(team)
            }
            Err(error) => {
                self.report_failure(&error);
                ActionOutcome::Failed(error)
            }
        }
    }
}
