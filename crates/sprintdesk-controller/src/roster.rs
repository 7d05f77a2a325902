use crate::collaborators::{Collaborators, Notification};
use crate::collection::ActionOutcome;
use chrono::{Local, NaiveDate};
use sprintdesk_client::ResourceClient;
use sprintdesk_domain::{
    ClientError, Membership, MembershipId, NewMembership, TeamId, TeamMember, User, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Cached team rosters. Every successful mutation is followed by a re-fetch,
/// so the server's roster is authoritative.
#[derive(Clone)]
pub struct MembershipRoster {
    client: ResourceClient,
    collaborators: Collaborators,
    member_role: String,
    rosters: Arc<RwLock<HashMap<TeamId, Vec<TeamMember>>>>,
}

impl MembershipRoster {
    pub fn new(client: ResourceClient, collaborators: Collaborators) -> Self {
        Self {
            client,
            collaborators,
            member_role: String::new(),
            rosters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_member_role(mut self, member_role: impl Into<String>) -> Self {
        self.member_role = member_role.into();
        self
    }

    pub async fn members(&self, team: TeamId) -> Vec<TeamMember> {
        self.rosters
            .read()
            .await
            .get(&team)
            .cloned()
            .unwrap_or_default()
    }

    /// Case-insensitive name match over the cached roster; a blank query returns everyone.
    pub async fn filter_members(&self, team: TeamId, query: &str) -> Vec<TeamMember> {
        let needle = query.trim().to_lowercase();
        self.members(team)
            .await
            .into_iter()
            .filter(|member| needle.is_empty() || member.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub async fn refresh(&self, team: Option<TeamId>) -> ActionOutcome<Vec<TeamMember>> {
        let Some(team) = team else {
            return self.fail(ClientError::ScopeMissing {
                resource: "member",
                parent_key: "equipo_trabajo_id",
            });
        };

        match self.client.list_team_members(Some(team)).await {
            Ok(members) => {
                debug!(team_id = %team, count = members.len(), "roster refreshed");
                self.rosters.write().await.insert(team, members.clone());
                ActionOutcome::Completed(members)
            }
            Err(error) => self.fail(error),
        }
    }

    pub async fn add_member(&self, team: TeamId, user: UserId) -> ActionOutcome<Membership> {
        self.add_member_on(team, user, Local::now().date_naive())
            .await
    }

    /// Adds `user` as a regular member. Users already on the cached roster are
    /// rejected without a request.
    pub async fn add_member_on(
        &self,
        team: TeamId,
        user: UserId,
        joined_on: NaiveDate,
    ) -> ActionOutcome<Membership> {
        let already_member = self
            .rosters
            .read()
            .await
            .get(&team)
            .is_some_and(|members| members.iter().any(|member| member.id == user));
        if already_member {
            return self.fail(ClientError::validation(
                "usuario",
                format!("user {user} already belongs to team {team}"),
            ));
        }

        let draft = NewMembership {
            user,
            team,
            is_creator: false,
            joined_on,
            role: self.member_role.clone(),
        };
        let membership = match self.client.create_membership(&draft).await {
            Ok(membership) => membership,
            Err(error) => return self.fail(error),
        };
        info!(team_id = %team, user_id = %user, "member added");
        self.collaborators
            .notifier
            .notify(Notification::success(format!("user {user} added to team")));

        if let ActionOutcome::Failed(error) = self.refresh(Some(team)).await {
            warn!(team_id = %team, error = %error, "roster re-fetch failed after adding a member");
        }
        ActionOutcome::Completed(membership)
    }

    pub async fn remove_member(&self, team: TeamId, membership: MembershipId) -> ActionOutcome<()> {
        let prompt = format!("Remove membership {membership} from team {team}?");
        if !self.collaborators.confirmation.confirm(&prompt).await {
            debug!(team_id = %team, membership_id = %membership, "member removal declined");
            return ActionOutcome::Cancelled;
        }

        if let Err(error) = self.client.remove_membership(membership).await {
            return self.fail(error);
        }
        info!(team_id = %team, membership_id = %membership, "member removed");
        self.collaborators
            .notifier
            .notify(Notification::success("member removed"));

        if let ActionOutcome::Failed(error) = self.refresh(Some(team)).await {
            warn!(team_id = %team, error = %error, "roster re-fetch failed after removing a member");
        }
        ActionOutcome::Completed(())
    }

    fn fail<T>(&self, error: ClientError) -> ActionOutcome<T> {
        warn!(error = %error, "roster action failed");
        self.collaborators
            .notifier
            .notify(Notification::error(error.to_string()));
        ActionOutcome::Failed(error)
    }
}

/// Case-insensitive email match over a user directory, in directory order.
pub fn search_users<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    users
        .iter()
        .filter(|user| user.email.to_lowercase().contains(&needle))
        .collect()
}
