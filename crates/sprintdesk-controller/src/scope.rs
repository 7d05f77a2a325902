use crate::collaborators::Navigator;
use serde::{Deserialize, Serialize};
use sprintdesk_domain::{IdParseError, ProjectId, SprintId, TaskId, TeamId, UserId};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const CONTEXT_USER_KEY: &str = "userId";
pub const CONTEXT_TEAM_KEY: &str = "teamId";
pub const CONTEXT_TASK_KEY: &str = "taskId";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown route: {0}")]
    Unknown(String),
    #[error(transparent)]
    InvalidId(#[from] IdParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Teams,
    Projects {
        team: TeamId,
    },
    Sprints {
        team: TeamId,
        project: ProjectId,
    },
    Tasks {
        team: TeamId,
        project: ProjectId,
        sprint: SprintId,
    },
    TaskDetail {
        team: TeamId,
        project: ProjectId,
        sprint: SprintId,
        task: TaskId,
    },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".to_owned(),
            Self::Teams => "/teams".to_owned(),
            Self::Projects { team } => format!("/teams/{team}/projects"),
            Self::Sprints { team, project } => {
                format!("/teams/{team}/projects/{project}/sprints")
            }
            Self::Tasks {
                team,
                project,
                sprint,
            } => format!("/teams/{team}/projects/{project}/sprints/{sprint}/tasks"),
            Self::TaskDetail {
                team,
                project,
                sprint,
                task,
            } => format!("/teams/{team}/projects/{project}/sprints/{sprint}/tasks/{task}"),
        }
    }

    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let segments = path
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>();

        match segments.as_slice() {
            [] | ["login"] => Ok(Self::Login),
            ["teams"] => Ok(Self::Teams),
            ["teams", team, "projects"] => Ok(Self::Projects {
                team: team.parse()?,
            }),
            ["teams", team, "projects", project, "sprints"] => Ok(Self::Sprints {
                team: team.parse()?,
                project: project.parse()?,
            }),
            ["teams", team, "projects", project, "sprints", sprint, "tasks"] => Ok(Self::Tasks {
                team: team.parse()?,
                project: project.parse()?,
                sprint: sprint.parse()?,
            }),
            ["teams", team, "projects", project, "sprints", sprint, "tasks", task] => {
                Ok(Self::TaskDetail {
                    team: team.parse()?,
                    project: project.parse()?,
                    sprint: sprint.parse()?,
                    task: task.parse()?,
                })
            }
            _ => Err(RouteError::Unknown(path.to_owned())),
        }
    }

    pub fn team(&self) -> Option<TeamId> {
        match self {
            Self::Login | Self::Teams => None,
            Self::Projects { team }
            | Self::Sprints { team, .. }
            | Self::Tasks { team, .. }
            | Self::TaskDetail { team, .. } => Some(*team),
        }
    }

    pub fn project(&self) -> Option<ProjectId> {
        match self {
            Self::Sprints { project, .. }
            | Self::Tasks { project, .. }
            | Self::TaskDetail { project, .. } => Some(*project),
            _ => None,
        }
    }

    pub fn sprint(&self) -> Option<SprintId> {
        match self {
            Self::Tasks { sprint, .. } | Self::TaskDetail { sprint, .. } => Some(*sprint),
            _ => None,
        }
    }

    pub fn task(&self) -> Option<TaskId> {
        match self {
            Self::TaskDetail { task, .. } => Some(*task),
            _ => None,
        }
    }

    /// The collection view a route renders; `Login` renders none.
    pub fn view(&self) -> Option<ViewKind> {
        match self {
            Self::Login => None,
            Self::Teams => Some(ViewKind::Teams),
            Self::Projects { .. } => Some(ViewKind::Projects),
            Self::Sprints { .. } => Some(ViewKind::Sprints),
            Self::Tasks { .. } => Some(ViewKind::Tasks),
            Self::TaskDetail { .. } => Some(ViewKind::TaskDetail),
        }
    }

    /// Deepest route addressable with the given ids.
    pub fn deepest(
        team: Option<TeamId>,
        project: Option<ProjectId>,
        sprint: Option<SprintId>,
        task: Option<TaskId>,
    ) -> Self {
        match (team, project, sprint, task) {
            (Some(team), Some(project), Some(sprint), Some(task)) => Self::TaskDetail {
                team,
                project,
                sprint,
                task,
            },
            (Some(team), Some(project), Some(sprint), None) => Self::Tasks {
                team,
                project,
                sprint,
            },
            (Some(team), Some(project), None, _) => Self::Sprints { team, project },
            (Some(team), None, _, _) => Self::Projects { team },
            (None, _, _, _) => Self::Teams,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.path())
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Ids an ancestor view hands down to its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
}

impl ScopeContext {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Carries route params forward; ids absent from the route are left untouched.
    pub fn record_route(&mut self, route: &Route) {
        if let Some(team) = route.team() {
            self.team_id = Some(team);
        }
        if let Some(task) = route.task() {
            self.task_id = Some(task);
        }
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(user) = self.user_id {
            pairs.push((CONTEXT_USER_KEY, user.to_string()));
        }
        if let Some(team) = self.team_id {
            pairs.push((CONTEXT_TEAM_KEY, team.to_string()));
        }
        if let Some(task) = self.task_id {
            pairs.push((CONTEXT_TASK_KEY, task.to_string()));
        }
        pairs
    }

    /// Rebuilds a context from stored string pairs. Unparseable values read as absent.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut context = Self::default();
        for (key, value) in pairs {
            match key {
                CONTEXT_USER_KEY => context.user_id = parse_context_value(key, value),
                CONTEXT_TEAM_KEY => context.team_id = parse_context_value(key, value),
                CONTEXT_TASK_KEY => context.task_id = parse_context_value(key, value),
                _ => debug!(key, "ignoring unknown scope context key"),
            }
        }
        context
    }
}

fn parse_context_value<T>(key: &str, value: &str) -> Option<T>
where
    T: FromStr<Err = IdParseError>,
{
    match value.parse::<T>() {
        Ok(id) => Some(id),
        Err(error) => {
            warn!(key, error = %error, "discarding invalid scope context value");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Teams,
    Projects,
    Sprints,
    Tasks,
    TaskDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedScope {
    Teams {
        user: UserId,
    },
    Projects {
        team: TeamId,
    },
    Sprints {
        team: TeamId,
        project: ProjectId,
    },
    Tasks {
        team: TeamId,
        project: ProjectId,
        sprint: SprintId,
    },
    TaskDetail {
        team: TeamId,
        project: ProjectId,
        sprint: SprintId,
        task: TaskId,
    },
}

impl ResolvedScope {
    pub fn route(&self) -> Route {
        match *self {
            Self::Teams { .. } => Route::Teams,
            Self::Projects { team } => Route::Projects { team },
            Self::Sprints { team, project } => Route::Sprints { team, project },
            Self::Tasks {
                team,
                project,
                sprint,
            } => Route::Tasks {
                team,
                project,
                sprint,
            },
            Self::TaskDetail {
                team,
                project,
                sprint,
                task,
            } => Route::TaskDetail {
                team,
                project,
                sprint,
                task,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Resolving,
    Ready(ResolvedScope),
    Redirected(Route),
}

impl ResolverState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Resolving)
    }
}

/// Combines route params and the ambient context into the ids a view needs,
/// redirecting to the nearest resolvable ancestor when one is missing.
#[derive(Clone)]
pub struct ScopeResolver {
    navigator: Arc<dyn Navigator>,
}

impl ScopeResolver {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }

    pub fn resolve(&self, view: ViewKind, route: &Route, context: &ScopeContext) -> ResolverState {
        let state = resolve_scope(view, route, context);
        if let ResolverState::Redirected(target) = state {
            debug!(?view, from = %route, to = %target, "scope unresolved; redirecting");
            self.navigator.navigate(target);
        }
        state
    }
}

pub fn resolve_scope(view: ViewKind, route: &Route, context: &ScopeContext) -> ResolverState {
    let team = route.team().or(context.team_id);
    let project = route.project();
    let sprint = route.sprint();
    let task = route.task().or(context.task_id);

    let resolved = match view {
        ViewKind::Teams => context.user_id.map(|user| ResolvedScope::Teams { user }),
        ViewKind::Projects => team.map(|team| ResolvedScope::Projects { team }),
        ViewKind::Sprints => team
            .zip(project)
            .map(|(team, project)| ResolvedScope::Sprints { team, project }),
        ViewKind::Tasks => match (team, project, sprint) {
            (Some(team), Some(project), Some(sprint)) => Some(ResolvedScope::Tasks {
                team,
                project,
                sprint,
            }),
            _ => None,
        },
        ViewKind::TaskDetail => match (team, project, sprint, task) {
            (Some(team), Some(project), Some(sprint), Some(task)) => {
                Some(ResolvedScope::TaskDetail {
                    team,
                    project,
                    sprint,
                    task,
                })
            }
            _ => None,
        },
    };

    match resolved {
        Some(scope) => ResolverState::Ready(scope),
        None => ResolverState::Redirected(fallback_route(view, team, project, sprint, context)),
    }
}

fn fallback_route(
    view: ViewKind,
    team: Option<TeamId>,
    project: Option<ProjectId>,
    sprint: Option<SprintId>,
    context: &ScopeContext,
) -> Route {
    let depth = match view {
        ViewKind::Teams => return Route::Login,
        ViewKind::Projects => 0,
        ViewKind::Sprints => 1,
        ViewKind::Tasks => 2,
        ViewKind::TaskDetail => 3,
    };

    let route = match (team, project, sprint) {
        (Some(team), Some(project), Some(sprint)) if depth >= 3 => Route::Tasks {
            team,
            project,
            sprint,
        },
        (Some(team), Some(project), _) if depth >= 2 => Route::Sprints { team, project },
        (Some(team), _, _) if depth >= 1 => Route::Projects { team },
        _ => Route::Teams,
    };

    if route == Route::Teams && context.user_id.is_none() {
        Route::Login
    } else {
        route
    }
}
