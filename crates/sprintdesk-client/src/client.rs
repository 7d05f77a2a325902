use crate::interface::{
    ApiRequest, ApiResponse, CreatableResource, CredentialStore, HttpTransport, ResourceKind,
};
use crate::resources::TeamKind;
use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sprintdesk_domain::{
    AuthTokens, ClientError, ClientResult, Credentials, FieldError, Membership, MembershipId,
    NewMembership, NewTeam, NewUser, Team, TeamId, TeamMember, User, UserId, Validate,
};
use std::sync::Arc;
use tracing::{debug, warn};

const MEMBERSHIPS_PATH: &str = "usuariosEquipo/";
const TEAM_MEMBERS_PATH: &str = "usuariosEquipo/getUserPerEquipoTrabajo";
const TEAM_MEMBERS_KEY: &str = "equipo_trabajo_id";
const USERS_PATH: &str = "usuarios/";
const LOGIN_PATH: &str = "login/";
const REGISTER_PATH: &str = "usuario/";
const LIST_WRAPPER_KEYS: [&str; 3] = ["results", "data", "items"];

/// What to do with a team whose creator membership could not be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    #[default]
    Compensate,
    Keep,
}

impl OrphanPolicy {
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::Compensate => "compensate",
            Self::Keep => "keep",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compensate" => Some(Self::Compensate),
            "keep" => Some(Self::Keep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamCreationSettings {
    pub creator_role: String,
    pub orphan_policy: OrphanPolicy,
}

impl Default for TeamCreationSettings {
    fn default() -> Self {
        Self {
            creator_role: "creador".to_owned(),
            orphan_policy: OrphanPolicy::Compensate,
        }
    }
}

#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    team_settings: TeamCreationSettings,
}

impl ResourceClient {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            transport,
            credentials,
            team_settings: TeamCreationSettings::default(),
        }
    }

    pub fn with_team_settings(mut self, team_settings: TeamCreationSettings) -> Self {
        self.team_settings = team_settings;
        self
    }

    pub fn team_settings(&self) -> &TeamCreationSettings {
        &self.team_settings
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Lists the children of `parent`. No request is issued without a parent.
    pub async fn list<K: ResourceKind>(
        &self,
        parent: Option<K::Parent>,
    ) -> ClientResult<Vec<K::Item>> {
        let parent = parent.ok_or(ClientError::ScopeMissing {
            resource: K::NAME,
            parent_key: K::PARENT_KEY,
        })?;
        let request = ApiRequest::get(K::LIST_PATH).query(K::PARENT_KEY, parent);
        let payload: Value = self.request_json(request).await?;
        extract_list(payload, K::NAME)
    }

    pub async fn create<K: CreatableResource>(&self, draft: &K::Draft) -> ClientResult<K::Item> {
        draft.validate()?;
        let request = ApiRequest::post(K::create_path()).json(encode_body(draft)?);
        self.request_created(request).await
    }

    pub async fn remove<K: ResourceKind>(&self, id: K::Id) -> ClientResult<()> {
        self.request_status_only(ApiRequest::delete(K::item_path(id)))
            .await
    }

    pub async fn create_team_with_membership(
        &self,
        creator: UserId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> ClientResult<Team> {
        self.create_team_with_membership_on(creator, name, description, Local::now().date_naive())
            .await
    }

    /// Creates the team, then records `creator` as its creator member joined on `joined_on`.
    pub async fn create_team_with_membership_on(
        &self,
        creator: UserId,
        name: impl Into<String>,
        description: impl Into<String>,
        joined_on: NaiveDate,
    ) -> ClientResult<Team> {
        let draft = NewTeam {
            creator,
            name: name.into(),
            description: description.into(),
        };
        draft.validate()?;
        let request = ApiRequest::post(TeamKind::create_path()).json(encode_body(&draft)?);
        let team: Team = self.request_created(request).await?;

        let membership = NewMembership {
            user: creator,
            team: team.id,
            is_creator: true,
            joined_on,
            role: self.team_settings.creator_role.clone(),
        };
        match self.create_membership(&membership).await {
            Ok(created) => {
                debug!(team_id = %team.id, membership_id = %created.id, "creator membership recorded");
                Ok(Team {
                    membership_id: team.membership_id.or(Some(created.id)),
                    ..team
                })
            }
            Err(error) => {
                warn!(
                    team_id = %team.id,
                    policy = self.team_settings.orphan_policy.as_key(),
                    error = %error,
                    "creator membership failed after team creation"
                );
                let rolled_back = match self.team_settings.orphan_policy {
                    OrphanPolicy::Compensate => match self.remove::<TeamKind>(team.id).await {
                        Ok(()) => true,
                        Err(rollback_error) => {
                            warn!(
                                team_id = %team.id,
                                error = %rollback_error,
                                "failed to delete orphaned team"
                            );
                            false
                        }
                    },
                    OrphanPolicy::Keep => false,
                };
                Err(ClientError::PartialCompoundFailure {
                    team_id: team.id,
                    rolled_back,
                    source: Box::new(error),
                })
            }
        }
    }

    pub async fn list_team_members(&self, team: Option<TeamId>) -> ClientResult<Vec<TeamMember>> {
        let team = team.ok_or(ClientError::ScopeMissing {
            resource: "member",
            parent_key: TEAM_MEMBERS_KEY,
        })?;
        let request = ApiRequest::get(TEAM_MEMBERS_PATH).query(TEAM_MEMBERS_KEY, team);
        let payload: Value = self.request_json(request).await?;
        extract_list(payload, "member")
    }

    pub async fn create_membership(&self, draft: &NewMembership) -> ClientResult<Membership> {
        draft.validate()?;
        let request = ApiRequest::post(MEMBERSHIPS_PATH).json(encode_body(draft)?);
        self.request_created(request).await
    }

    pub async fn remove_membership(&self, id: MembershipId) -> ClientResult<()> {
        self.request_status_only(ApiRequest::delete(format!("{MEMBERSHIPS_PATH}{id}/")))
            .await
    }

    pub async fn list_users(&self) -> ClientResult<Vec<User>> {
        let payload: Value = self.request_json(ApiRequest::get(USERS_PATH)).await?;
        extract_list(payload, "user")
    }

    pub async fn get_user(&self, id: UserId) -> ClientResult<User> {
        self.request_json(ApiRequest::get(format!("{USERS_PATH}{id}/")))
            .await
    }

    /// Exchanges credentials for tokens and stores them for subsequent requests.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<AuthTokens> {
        credentials.validate()?;
        let request = ApiRequest::post(LOGIN_PATH).json(encode_body(credentials)?);
        let tokens: AuthTokens = self.request_created_anonymous(request).await?;
        self.credentials.store_tokens(tokens.clone());
        debug!("login succeeded; tokens stored");
        Ok(tokens)
    }

    pub async fn register(&self, draft: &NewUser) -> ClientResult<User> {
        draft.validate()?;
        let request = ApiRequest::post(REGISTER_PATH).json(encode_body(draft)?);
        self.request_created_anonymous(request).await
    }

    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.execute(request).await.map_err(|error| {
            warn!(%method, path = %path, error = %error, "API request did not complete");
            error
        })?;
        debug!(%method, path = %path, status = response.status, "API request completed");
        Ok(response)
    }

    fn authorized(&self, request: ApiRequest) -> ApiRequest {
        request.bearer(self.credentials.bearer_token())
    }

    async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let response = self.send(self.authorized(request)).await?;
        if !response.is_success() {
            return Err(request_failure(response));
        }
        decode_body(&response.body)
    }

    async fn request_status_only(&self, request: ApiRequest) -> ClientResult<()> {
        let response = self.send(self.authorized(request)).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(request_failure(response))
        }
    }

    async fn request_created<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let response = self.send(self.authorized(request)).await?;
        created_or_failure(response)
    }

    async fn request_created_anonymous<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> ClientResult<T> {
        let response = self.send(request).await?;
        created_or_failure(response)
    }
}

fn encode_body<T: Serialize>(value: &T) -> ClientResult<Value> {
    serde_json::to_value(value).map_err(|error| {
        ClientError::MalformedResponse(format!("request body could not be encoded: {error}"))
    })
}

fn decode_body<T: DeserializeOwned>(body: &str) -> ClientResult<T> {
    serde_json::from_str(body).map_err(|error| {
        ClientError::MalformedResponse(format!("API response was malformed JSON: {error}"))
    })
}

fn request_failure(response: ApiResponse) -> ClientError {
    ClientError::Request {
        status: response.status,
        body: response.body,
    }
}

fn created_or_failure<T: DeserializeOwned>(response: ApiResponse) -> ClientResult<T> {
    if response.is_success() {
        return decode_body(&response.body);
    }
    if matches!(response.status, 400 | 422) {
        if let Some(fields) = field_errors_from_body(&response.body) {
            return Err(ClientError::Validation { fields });
        }
    }
    Err(request_failure(response))
}

/// Reads a `{field: [messages]}` rejection body. A lone `detail` message is not a field map.
fn field_errors_from_body(body: &str) -> Option<Vec<FieldError>> {
    let payload: Value = serde_json::from_str(body).ok()?;
    let object = payload.as_object()?;
    let fields = object
        .iter()
        .filter(|(field, _)| field.as_str() != "detail")
        .filter_map(|(field, value)| {
            let message = match value {
                Value::String(message) => message.clone(),
                Value::Array(messages) => messages
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
                _ => return None,
            };
            Some(FieldError::new(field.clone(), message))
        })
        .collect::<Vec<_>>();
    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

fn extract_list<T: DeserializeOwned>(payload: Value, resource: &str) -> ClientResult<Vec<T>> {
    let values = match payload {
        Value::Array(values) => values,
        Value::Object(mut object) => LIST_WRAPPER_KEYS
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(Value::Array(values)) => Some(values),
                _ => None,
            })
            .ok_or_else(|| {
                ClientError::MalformedResponse(format!(
                    "{resource} response does not contain a list"
                ))
            })?,
        _ => {
            return Err(ClientError::MalformedResponse(format!(
                "{resource} response is not a list"
            )))
        }
    };

    values
        .into_iter()
        .map(|raw| {
            serde_json::from_value(raw).map_err(|error| {
                ClientError::MalformedResponse(format!("{resource} payload decode failed: {error}"))
            })
        })
        .collect()
}
