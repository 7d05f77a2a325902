pub mod collaborators;
pub mod collection;
pub mod roster;
pub mod scope;

pub use collaborators::{
    Collaborators, ConfirmationGate, Navigator, Notification, NotificationLevel, Notifier,
    StaticConfirmation, TracingNavigator, TracingNotifier,
};
pub use collection::{ActionOutcome, ScopedCollection, ScopedView};
pub use roster::{search_users, MembershipRoster};
pub use scope::{
    ResolvedScope, ResolverState, Route, RouteError, ScopeContext, ScopeResolver, ViewKind,
};
