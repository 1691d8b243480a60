//! Rights layer
//!
//! Role, group and direct grants resolved into per-user ACLs of routes.

pub mod model;
pub mod navigation;
pub mod repository;
pub mod resolver;

pub use model::{Group, ResourceRight, Right, RightsData, Role, Subject, User};
pub use navigation::{load_navigation, prune_navigation, NavNode};
pub use repository::{InMemoryRightsRepository, RightsRepository};
pub use resolver::{
    hash_password, RightCandidate, RightsResolver, RightsResult, ADMIN_ROLE, GUEST_ROLE,
    SYSTEM_ADMIN_USER,
};
