pub mod client;
pub mod interface;
pub mod resources;
pub mod transport;

pub use client::{OrphanPolicy, ResourceClient, TeamCreationSettings};
pub use interface::{
    ApiMethod, ApiRequest, ApiResponse, CreatableResource, CredentialStore, HttpTransport,
    InMemoryCredentialStore, ResourceKind,
};
pub use resources::{ProjectKind, SprintKind, TaskKind, TeamKind};
pub use transport::{ReqwestTransport, ReqwestTransportConfig};
