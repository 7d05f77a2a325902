use crate::error::{ClientError, FieldError};
use crate::ids::{MembershipId, ProjectId, SprintId, TaskId, TeamId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Local required-field checks run before a payload is submitted.
pub trait Validate {
    fn field_errors(&self) -> Vec<FieldError>;

    fn validate(&self) -> Result<(), ClientError> {
        let fields = self.field_errors();
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation { fields })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    #[serde(rename = "nombre_equipo")]
    pub name: String,
    #[serde(rename = "descripcion_equipo", default)]
    pub description: String,
    #[serde(
        rename = "usuario_equipo_id",
        alias = "usuarioEquipoId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_id_ref"
    )]
    pub membership_id: Option<MembershipId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(rename = "nombre_proyecto")]
    pub name: String,
    #[serde(rename = "descripcion_proyecto", default)]
    pub description: String,
    #[serde(rename = "fecha_inicio_proyecto", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin_proyecto", default)]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "estado_proyecto", default)]
    pub status: String,
    #[serde(rename = "equipo_trabajo", deserialize_with = "deserialize_id_ref")]
    pub team: TeamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    #[serde(rename = "nombre_sprint")]
    pub name: String,
    #[serde(rename = "fecha_inicio", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin", default)]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "proyecto", deserialize_with = "deserialize_id_ref")]
    pub project: ProjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "nombre_tarea")]
    pub name: String,
    #[serde(rename = "descripcion_tarea", default)]
    pub description: String,
    #[serde(rename = "estado_tarea", default)]
    pub status: String,
    #[serde(rename = "fecha_inicio_tarea", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin_tarea", default)]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "usuario")]
    pub assignee: UserRef,
    #[serde(deserialize_with = "deserialize_id_ref")]
    pub sprint: SprintId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "usuario_equipo_id", alias = "id")]
    pub id: MembershipId,
    #[serde(rename = "fecha_union", default)]
    pub joined_on: Option<NaiveDate>,
    #[serde(rename = "rol_equipo", default)]
    pub role: String,
    #[serde(rename = "usuario")]
    pub user: UserRef,
    #[serde(rename = "equipo_trabajo", deserialize_with = "deserialize_id_ref")]
    pub team: TeamId,
    #[serde(rename = "es_creador", default)]
    pub is_creator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// One row of a team roster as returned by the members endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: UserId,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "es_creador", default)]
    pub is_creator: bool,
    #[serde(
        rename = "usuario_equipo_id",
        alias = "usuarioEquipoId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_id_ref"
    )]
    pub membership_id: Option<MembershipId>,
}

/// A user reference that the API sends either as a bare id or as a nested user object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: UserId,
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserRef {
    pub fn id(id: UserId) -> Self {
        Self { id, name: None }
    }
}

impl<'de> Deserialize<'de> for UserRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let id = json_value_to_id(&value).ok_or_else(|| {
            serde::de::Error::custom("expected a user id or a user object with an `id` field")
        })?;
        let name = value
            .get("nombre")
            .or_else(|| value.get("name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned);
        Ok(Self {
            id: UserId::new(id),
            name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTeam {
    #[serde(rename = "usuario_id")]
    pub creator: UserId,
    #[serde(rename = "nombre_equipo")]
    pub name: String,
    #[serde(rename = "descripcion_equipo")]
    pub description: String,
}

impl Validate for NewTeam {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut fields = Vec::new();
        require_text(&mut fields, "nombre_equipo", &self.name);
        require_text(&mut fields, "descripcion_equipo", &self.description);
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProject {
    #[serde(rename = "nombre_proyecto")]
    pub name: String,
    #[serde(rename = "descripcion_proyecto")]
    pub description: String,
    #[serde(rename = "fecha_inicio_proyecto")]
    pub start_date: NaiveDate,
    #[serde(rename = "fecha_fin_proyecto")]
    pub end_date: NaiveDate,
    #[serde(rename = "estado_proyecto")]
    pub status: String,
    #[serde(rename = "equipo_trabajo")]
    pub team: TeamId,
}

impl Validate for NewProject {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut fields = Vec::new();
        require_text(&mut fields, "nombre_proyecto", &self.name);
        require_text(&mut fields, "estado_proyecto", &self.status);
        require_ordered_dates(
            &mut fields,
            "fecha_fin_proyecto",
            "fecha_inicio_proyecto",
            Some(self.start_date),
            self.end_date,
        );
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSprint {
    #[serde(rename = "nombre_sprint")]
    pub name: String,
    #[serde(rename = "fecha_inicio")]
    pub start_date: NaiveDate,
    #[serde(rename = "fecha_fin")]
    pub end_date: NaiveDate,
    #[serde(rename = "proyecto")]
    pub project: ProjectId,
}

impl Validate for NewSprint {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut fields = Vec::new();
        require_text(&mut fields, "nombre_sprint", &self.name);
        require_ordered_dates(
            &mut fields,
            "fecha_fin",
            "fecha_inicio",
            Some(self.start_date),
            self.end_date,
        );
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    #[serde(rename = "nombre_tarea")]
    pub name: String,
    #[serde(rename = "descripcion_tarea")]
    pub description: String,
    #[serde(rename = "estado_tarea")]
    pub status: String,
    #[serde(rename = "usuario")]
    pub assignee: UserId,
    pub sprint: SprintId,
    #[serde(rename = "fecha_inicio_tarea", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin_tarea")]
    pub end_date: NaiveDate,
}

impl Validate for NewTask {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut fields = Vec::new();
        require_text(&mut fields, "nombre_tarea", &self.name);
        require_text(&mut fields, "descripcion_tarea", &self.description);
        require_text(&mut fields, "estado_tarea", &self.status);
        require_ordered_dates(
            &mut fields,
            "fecha_fin_tarea",
            "fecha_inicio_tarea",
            self.start_date,
            self.end_date,
        );
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMembership {
    #[serde(rename = "usuario")]
    pub user: UserId,
    #[serde(rename = "equipo_trabajo")]
    pub team: TeamId,
    #[serde(rename = "es_creador")]
    pub is_creator: bool,
    #[serde(rename = "fecha_union")]
    pub joined_on: NaiveDate,
    #[serde(rename = "rol_equipo", skip_serializing_if = "String::is_empty")]
    pub role: String,
}

impl Validate for NewMembership {
    fn field_errors(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for Credentials {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut fields = Vec::new();
        require_text(&mut fields, "email", &self.email);
        require_text(&mut fields, "password", &self.password);
        fields
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Validate for NewUser {
    fn field_errors(&self) -> Vec<FieldError> {
        let mut fields = Vec::new();
        require_text(&mut fields, "nombre", &self.name);
        require_text(&mut fields, "email", &self.email);
        require_text(&mut fields, "password", &self.password);
        if !self.email.trim().is_empty() && !self.email.contains('@') {
            fields.push(FieldError::new("email", "must be an email address"));
        }
        fields
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthTokens")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn require_text(fields: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        fields.push(FieldError::required(field));
    }
}

fn require_ordered_dates(
    fields: &mut Vec<FieldError>,
    end_field: &str,
    start_field: &str,
    start: Option<NaiveDate>,
    end: NaiveDate,
) {
    if let Some(start) = start {
        if end < start {
            fields.push(FieldError::new(
                end_field,
                format!("must not precede {start_field}"),
            ));
        }
    }
}

fn json_value_to_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().filter(|id| *id > 0),
        Value::String(raw) => raw.trim().parse::<u64>().ok().filter(|id| *id > 0),
        Value::Object(map) => map.get("id").and_then(json_value_to_id),
        _ => None,
    }
}

fn deserialize_id_ref<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<u64>,
{
    let value = Value::deserialize(deserializer)?;
    json_value_to_id(&value)
        .map(T::from)
        .ok_or_else(|| serde::de::Error::custom("expected a positive id or an object with an `id`"))
}

fn deserialize_optional_id_ref<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<u64>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(json_value_to_id).map(T::from))
}
