pub mod entities;
pub mod error;
pub mod ids;

pub use entities::{
    AuthTokens, Credentials, Membership, NewMembership, NewProject, NewSprint, NewTask, NewTeam,
    NewUser, Project, Sprint, Task, Team, TeamMember, User, UserRef, Validate,
};
pub use error::{ClientError, ClientResult, FieldError};
pub use ids::{IdParseError, MembershipId, ProjectId, SprintId, TaskId, TeamId, UserId};
