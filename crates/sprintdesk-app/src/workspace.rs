use crate::cli::{Command, ScopeArgs};
use crate::frontend::ConsoleNavigator;
use crate::session::SessionState;
use anyhow::Result;
use sprintdesk_client::{
    CredentialStore, InMemoryCredentialStore, ProjectKind, ResourceClient, SprintKind, TaskKind,
    TeamKind,
};
use sprintdesk_controller::{
    search_users, ActionOutcome, Collaborators, MembershipRoster, Notification, ResolvedScope,
    ResolverState, Route, ScopeContext, ScopeResolver, ScopedCollection, ScopedView, ViewKind,
};
use sprintdesk_domain::{
    ClientError, Credentials, NewSprint, NewTask, NewUser, Project, ProjectId, Sprint, SprintId,
    Task, Team, TeamId, TeamMember, User, UserId,
};
use std::sync::Arc;
use tracing::info;

/// One command-line session: the client, its collaborators and the persisted context.
pub struct Workspace {
    client: ResourceClient,
    collaborators: Collaborators,
    resolver: ScopeResolver,
    navigator: Arc<ConsoleNavigator>,
    credentials: Arc<InMemoryCredentialStore>,
    member_role: String,
    session: SessionState,
}

impl Workspace {
    pub fn new(
        client: ResourceClient,
        collaborators: Collaborators,
        navigator: Arc<ConsoleNavigator>,
        credentials: Arc<InMemoryCredentialStore>,
        member_role: String,
        session: SessionState,
    ) -> Self {
        Self {
            client,
            resolver: ScopeResolver::new(collaborators.navigator.clone()),
            collaborators,
            navigator,
            credentials,
            member_role,
            session,
        }
    }

    /// Session state to persist, with whatever tokens the credential store now holds.
    pub fn session(&self) -> SessionState {
        SessionState {
            context: self.session.context,
            tokens: self.credentials.tokens(),
        }
    }

    /// Runs `command`; `Ok(false)` means the action failed, was declined, or redirected.
    pub async fn execute(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Help => {
                crate::cli::print_help();
                Ok(true)
            }
            Command::Login {
                email,
                password,
                user,
            } => Ok(self.login(email, password, user).await),
            Command::Logout => {
                self.credentials.clear();
                self.session = SessionState::default();
                println!("signed out");
                Ok(true)
            }
            Command::Register {
                name,
                email,
                password,
            } => {
                let draft = NewUser {
                    name,
                    email,
                    password,
                };
                match self.client.register(&draft).await {
                    Ok(user) => {
                        println!("registered user {} <{}>", user.id, user.email);
                        Ok(true)
                    }
                    Err(error) => Ok(self.report(error)),
                }
            }
            Command::Context => {
                for (key, value) in self.session.context.to_pairs() {
                    println!("{key}={value}");
                }
                Ok(true)
            }
            Command::Open { route } => Ok(self.open(route).await),
            Command::Teams => Ok(self.open(Route::Teams).await),
            Command::CreateTeam { name, description } => {
                let Some(teams) = self.mounted_teams().await else {
                    return Ok(false);
                };
                let outcome = teams.create_team_with_membership(name, description).await;
                Ok(print_outcome(outcome, |team| print_teams(&[team])))
            }
            Command::DeleteTeam { team } => {
                let Some(teams) = self.mounted_teams().await else {
                    return Ok(false);
                };
                let removed = teams.remove(team).await.is_completed();
                if removed && self.session.context.team_id == Some(team) {
                    self.session.context.team_id = None;
                }
                Ok(removed)
            }
            Command::Members { scope, filter } => {
                let Some((roster, team)) = self.mounted_roster(scope).await else {
                    return Ok(false);
                };
                let members = match filter {
                    Some(query) => roster.filter_members(team, &query).await,
                    None => roster.members(team).await,
                };
                print_members(&members);
                Ok(true)
            }
            Command::AddMember { scope, user } => {
                let Some((roster, team)) = self.mounted_roster(scope).await else {
                    return Ok(false);
                };
                let added = roster.add_member(team, user).await.is_completed();
                if added {
                    print_members(&roster.members(team).await);
                }
                Ok(added)
            }
            Command::RemoveMember { scope, membership } => {
                let Some((roster, team)) = self.mounted_roster(scope).await else {
                    return Ok(false);
                };
                Ok(roster.remove_member(team, membership).await.is_completed())
            }
            Command::Users { email } => match self.client.list_users().await {
                Ok(users) => {
                    match email {
                        Some(query) => print_users(search_users(&users, &query)),
                        None => print_users(users.iter()),
                    }
                    Ok(true)
                }
                Err(error) => Ok(self.report(error)),
            },
            Command::Projects { scope } => {
                let route = self.route_for(ScopeArgs {
                    project: None,
                    sprint: None,
                    ..scope
                });
                Ok(self.open(route).await)
            }
            Command::Sprints { scope } => {
                let route = self.route_for(ScopeArgs {
                    sprint: None,
                    ..scope
                });
                Ok(self.open(route).await)
            }
            Command::Tasks { scope } => {
                let route = self.route_for(scope);
                Ok(self.open(route).await)
            }
            Command::CreateSprint {
                scope,
                name,
                start,
                end,
            } => {
                let Some((sprints, project)) = self.mounted_sprints(scope).await else {
                    return Ok(false);
                };
                let draft = NewSprint {
                    name,
                    start_date: start,
                    end_date: end,
                    project,
                };
                let outcome = sprints.create(draft).await;
                Ok(print_outcome(outcome, |sprint| print_sprints(&[sprint])))
            }
            Command::DeleteSprint { scope, sprint } => {
                let Some((sprints, _)) = self.mounted_sprints(scope).await else {
                    return Ok(false);
                };
                Ok(sprints.remove(sprint).await.is_completed())
            }
            Command::CreateTask {
                scope,
                assignee,
                name,
                description,
                status,
                start,
                end,
            } => {
                let Some(assignee) = assignee.or(self.session.context.user_id) else {
                    return Ok(self.report(ClientError::validation(
                        "usuario",
                        "pass --assignee or sign in first",
                    )));
                };
                let Some((tasks, sprint)) = self.mounted_tasks(scope).await else {
                    return Ok(false);
                };
                let draft = NewTask {
                    name,
                    description,
                    status,
                    assignee,
                    sprint,
                    start_date: start,
                    end_date: end,
                };
                let outcome = tasks.create(draft).await;
                Ok(print_outcome(outcome, |task| print_tasks(&[task])))
            }
            Command::DeleteTask { scope, task } => {
                let Some((tasks, _)) = self.mounted_tasks(scope).await else {
                    return Ok(false);
                };
                let removed = tasks.remove(task).await.is_completed();
                if removed && self.session.context.task_id == Some(task) {
                    self.session.context.task_id = None;
                }
                Ok(removed)
            }
        }
    }

    async fn login(&mut self, email: String, password: String, user: Option<UserId>) -> bool {
        let credentials = Credentials {
            email: email.clone(),
            password,
        };
        if let Err(error) = self.client.login(&credentials).await {
            return self.report(error);
        }

        let user_id = match user {
            Some(user) => Some(user),
            None => match self.client.list_users().await {
                Ok(users) => users
                    .iter()
                    .find(|candidate| candidate.email.eq_ignore_ascii_case(email.trim()))
                    .map(|candidate| candidate.id),
                Err(error) => {
                    tracing::warn!(error = %error, "could not look up the signed-in user");
                    None
                }
            },
        };

        self.session.context = match user_id {
            Some(user_id) => ScopeContext::for_user(user_id),
            None => ScopeContext::default(),
        };
        match user_id {
            Some(user_id) => println!("signed in as user {user_id}"),
            None => println!("signed in; pass --user N to select your account"),
        }
        info!(user_id = ?user_id, "session started");
        true
    }

    fn route_for(&self, scope: ScopeArgs) -> Route {
        Route::deepest(
            scope.team.or(self.session.context.team_id),
            scope.project,
            scope.sprint,
            None,
        )
    }

    /// Resolves the scope for `view`, writing resolved ids into the context.
    fn resolve(&mut self, view: ViewKind, route: Route) -> Option<ResolvedScope> {
        match self.resolver.resolve(view, &route, &self.session.context) {
            ResolverState::Ready(scope) => {
                self.session.context.record_route(&scope.route());
                Some(scope)
            }
            ResolverState::Redirected(_) | ResolverState::Resolving => None,
        }
    }

    async fn open(&mut self, route: Route) -> bool {
        let Some(view) = route.view() else {
            println!("sign in with `sprintdesk login <email> <password>`");
            return true;
        };
        let Some(scope) = self.resolve(view, route) else {
            return false;
        };

        match scope {
            ResolvedScope::Teams { user } => {
                let teams = self.collection::<TeamKind>(Route::Login);
                show(teams.load(Some(user)).await, print_teams)
            }
            ResolvedScope::Projects { team } => {
                let projects = self.collection::<ProjectKind>(Route::Teams);
                show(projects.load(Some(team)).await, print_projects)
            }
            ResolvedScope::Sprints { team, project } => {
                let sprints = self.collection::<SprintKind>(Route::Projects { team });
                show(sprints.load(Some(project)).await, print_sprints)
            }
            ResolvedScope::Tasks {
                team,
                project,
                sprint,
            } => {
                let tasks = self.collection::<TaskKind>(Route::Sprints { team, project });
                show(tasks.load(Some(sprint)).await, print_tasks)
            }
            ResolvedScope::TaskDetail {
                team,
                project,
                sprint,
                task,
            } => {
                let tasks = self.collection::<TaskKind>(Route::Sprints { team, project });
                let Some(items) = tasks.load(Some(sprint)).await.completed() else {
                    return false;
                };
                match items.iter().find(|item| item.id == task) {
                    Some(found) => {
                        let assignee = self.assignee(found).await;
                        print_task_detail(found, assignee.as_ref());
                        true
                    }
                    None => {
                        self.collaborators.notifier.notify(Notification::error(format!(
                            "task {task} is not part of sprint {sprint}"
                        )));
                        self.collaborators.navigator.navigate(Route::Tasks {
                            team,
                            project,
                            sprint,
                        });
                        false
                    }
                }
            }
        }
    }

    /// Full user record for the task's assignee; the task row only carries the id and maybe a name.
    async fn assignee(&self, task: &Task) -> Option<User> {
        match self.client.get_user(task.assignee.id).await {
            Ok(user) => Some(user),
            Err(error) => {
                tracing::warn!(user_id = %task.assignee.id, error = %error, "could not load task assignee");
                None
            }
        }
    }

    fn collection<K: ScopedView>(&self, fallback: Route) -> ScopedCollection<K> {
        ScopedCollection::with_fallback(self.client.clone(), self.collaborators.clone(), fallback)
    }

    async fn mounted_teams(&mut self) -> Option<ScopedCollection<TeamKind>> {
        let ResolvedScope::Teams { user } = self.resolve(ViewKind::Teams, Route::Teams)? else {
            return None;
        };
        let teams = self.collection::<TeamKind>(Route::Login);
        teams.load(Some(user)).await.completed()?;
        Some(teams)
    }

    async fn mounted_roster(
        &mut self,
        scope: ScopeArgs,
    ) -> Option<(MembershipRoster, TeamId)> {
        let route = Route::deepest(scope.team.or(self.session.context.team_id), None, None, None);
        let ResolvedScope::Projects { team } = self.resolve(ViewKind::Projects, route)? else {
            return None;
        };
        let roster = MembershipRoster::new(self.client.clone(), self.collaborators.clone())
            .with_member_role(self.member_role.clone());
        roster.refresh(Some(team)).await.completed()?;
        Some((roster, team))
    }

    async fn mounted_sprints(
        &mut self,
        scope: ScopeArgs,
    ) -> Option<(ScopedCollection<SprintKind>, ProjectId)> {
        let route = self.route_for(ScopeArgs {
            sprint: None,
            ..scope
        });
        let ResolvedScope::Sprints { team, project } = self.resolve(ViewKind::Sprints, route)?
        else {
            return None;
        };
        let sprints = self.collection::<SprintKind>(Route::Projects { team });
        sprints.load(Some(project)).await.completed()?;
        Some((sprints, project))
    }

    async fn mounted_tasks(
        &mut self,
        scope: ScopeArgs,
    ) -> Option<(ScopedCollection<TaskKind>, SprintId)> {
        let route = self.route_for(scope);
        let ResolvedScope::Tasks {
            team,
            project,
            sprint,
        } = self.resolve(ViewKind::Tasks, route)?
        else {
            return None;
        };
        let tasks = self.collection::<TaskKind>(Route::Sprints { team, project });
        tasks.load(Some(sprint)).await.completed()?;
        Some((tasks, sprint))
    }

    fn report(&self, error: ClientError) -> bool {
        self.collaborators
            .notifier
            .notify(Notification::error(error.to_string()));
        false
    }

    pub fn last_redirect(&self) -> Option<Route> {
        self.navigator.last_redirect()
    }
}

/// Prints the loaded items of a completed outcome.
fn show<T>(outcome: ActionOutcome<Vec<T>>, print: fn(&[T])) -> bool {
    match outcome.completed() {
        Some(items) => {
            print(&items);
            true
        }
        None => false,
    }
}

fn print_outcome<T>(outcome: ActionOutcome<T>, print: impl FnOnce(T)) -> bool {
    match outcome {
        ActionOutcome::Completed(value) => {
            print(value);
            true
        }
        ActionOutcome::Cancelled | ActionOutcome::Failed(_) => false,
    }
}

fn print_teams(teams: &[Team]) {
    if teams.is_empty() {
        println!("no teams");
    }
    for team in teams {
        println!("{}\t{}\t{}", team.id, team.name, team.description);
    }
}

fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("no projects");
    }
    for project in projects {
        println!(
            "{}\t{}\t{}\t{}..{}",
            project.id,
            project.name,
            project.status,
            optional_date(project.start_date),
            optional_date(project.end_date)
        );
    }
}

fn print_sprints(sprints: &[Sprint]) {
    if sprints.is_empty() {
        println!("no sprints");
    }
    for sprint in sprints {
        println!(
            "{}\t{}\t{}..{}",
            sprint.id,
            sprint.name,
            optional_date(sprint.start_date),
            optional_date(sprint.end_date)
        );
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("no tasks");
    }
    for task in tasks {
        println!(
            "{}\t{}\t{}\t{}\tdue {}",
            task.id,
            task.name,
            task.status,
            assignee_label(task),
            task.end_date.map(|date| date.to_string()).unwrap_or_else(|| "-".to_owned())
        );
    }
}

fn print_task_detail(task: &Task, assignee: Option<&User>) {
    println!("task {}: {}", task.id, task.name);
    println!("  status:   {}", task.status);
    match assignee {
        Some(user) => println!("  assignee: {} <{}> ({})", user.name, user.email, user.id),
        None => println!("  assignee: {}", assignee_label(task)),
    }
    println!(
        "  dates:    {}..{}",
        optional_date(task.start_date),
        optional_date(task.end_date)
    );
    if !task.description.is_empty() {
        println!("  {}", task.description);
    }
}

fn print_members(members: &[TeamMember]) {
    if members.is_empty() {
        println!("no members");
    }
    for member in members {
        let membership = member
            .membership_id
            .map(|id| format!("membership {id}"))
            .unwrap_or_else(|| "membership ?".to_owned());
        let creator = if member.is_creator { "\tcreator" } else { "" };
        println!(
            "{}\t{}\t{}\t{membership}{creator}",
            member.id, member.name, member.email
        );
    }
}

fn print_users<'a>(users: impl IntoIterator<Item = &'a User>) {
    for user in users {
        println!("{}\t{}\t{}", user.id, user.name, user.email);
    }
}

fn assignee_label(task: &Task) -> String {
    match task.assignee.name.as_deref() {
        Some(name) => format!("{name} ({})", task.assignee.id),
        None => format!("user {}", task.assignee.id),
    }
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|date| date.to_string())
        .unwrap_or_else(|| "?".to_owned())
}
