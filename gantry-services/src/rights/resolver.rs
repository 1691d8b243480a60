//! Rights Resolver - effective ACLs, access checks and rights bootstrap
//!
//! An ACL is the set of routes a user may call. It is the union of the
//! user's direct rights, the rights of the user's roles (including roles
//! inherited through groups) and the rights of the user's groups. There is
//! no deny: adding a grant anywhere only adds routes.
//!
//! Resolved ACLs are cached per user. Nothing invalidates the cache
//! implicitly; callers that change rights data call
//! [`RightsResolver::refresh_rights_index`]. Every invalidation bumps a
//! generation counter, and an ACL resolved under an older generation is
//! returned to its caller but never cached.

use super::model::{ResourceRight, Right, Role, Subject, User};
use super::navigation::{prune_navigation, NavNode};
use super::repository::RightsRepository;
use crate::controllers::RegistrySnapshot;
use crate::error::RightsError;
use crate::session::{SessionUser, GUEST_USER_ID, GUEST_USER_NAME};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const ADMIN_ROLE: &str = "Admin";
pub const GUEST_ROLE: &str = "Guest";
pub const SYSTEM_ADMIN_USER: &str = "sysadmin";

pub type RightsResult<T> = Result<T, RightsError>;

/// A controller action offered as an assignable right
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RightCandidate {
    pub name: String,
    pub description: Option<String>,
    pub roles: Vec<String>,
}

pub struct RightsResolver {
    enabled: bool,
    repository: Arc<dyn RightsRepository>,
    acl_cache: RwLock<HashMap<String, Arc<HashSet<String>>>>,
    /// Bumped under the cache write lock on every invalidation
    generation: AtomicU64,
    /// Right id -> right name
    right_index: RwLock<HashMap<String, String>>,
    indexed: AtomicBool,
}

impl RightsResolver {
    pub fn new(repository: Arc<dyn RightsRepository>, enabled: bool) -> Self {
        Self {
            enabled,
            repository,
            acl_cache: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            right_index: RwLock::new(HashMap::new()),
            indexed: AtomicBool::new(false),
        }
    }

    /// Whether access checks are enforced
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn repository(&self) -> Arc<dyn RightsRepository> {
        Arc::clone(&self.repository)
    }

    /// Rebuild the right id index and drop every cached ACL
    pub async fn refresh_rights_index(&self) -> RightsResult<usize> {
        let index: HashMap<String, String> = self
            .repository
            .rights()
            .await?
            .into_iter()
            .map(|right| (right.id, right.name))
            .collect();
        let count = index.len();

        *self.right_index.write().await = index;
        self.indexed.store(true, Ordering::Release);
        self.invalidate_acls().await;

        debug!(rights = count, "Rights index refreshed");
        Ok(count)
    }

    async fn invalidate_acls(&self) {
        let mut cache = self.acl_cache.write().await;
        cache.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Effective ACL of a user; unknown users get an empty ACL
    pub async fn get_user_acl(&self, user_id: &str) -> RightsResult<Arc<HashSet<String>>> {
        if let Some(acl) = self.acl_cache.read().await.get(user_id) {
            return Ok(Arc::clone(acl));
        }

        if !self.indexed.load(Ordering::Acquire) {
            self.refresh_rights_index().await?;
        }

        let generation = self.generation.load(Ordering::Acquire);
        let acl = Arc::new(self.resolve_acl(user_id).await?);

        let mut cache = self.acl_cache.write().await;
        if self.generation.load(Ordering::Acquire) == generation {
            cache.insert(user_id.to_string(), Arc::clone(&acl));
        } else {
            debug!(user_id, "Rights changed during resolution, ACL not cached");
        }
        drop(cache);

        debug!(user_id, routes = acl.len(), "Resolved ACL");
        Ok(acl)
    }

    async fn resolve_acl(&self, user_id: &str) -> RightsResult<HashSet<String>> {
        let Some(user) = self.repository.user(user_id).await? else {
            debug!(user_id, "Unknown user resolves to an empty ACL");
            return Ok(HashSet::new());
        };

        let roles = self.repository.roles().await?;
        let groups = self.repository.groups().await?;
        let member_of: Vec<_> = groups
            .iter()
            .filter(|group| user.groups.contains(&group.id))
            .collect();
        let role_ids = effective_role_ids(&user, &member_of);

        let direct = user.rights.iter();
        let from_roles = roles
            .iter()
            .filter(|role| role_ids.contains(role.id.as_str()))
            .flat_map(|role| role.rights.iter());
        let from_groups = member_of.iter().flat_map(|group| group.rights.iter());

        Ok(self
            .materialize(direct.chain(from_roles).chain(from_groups))
            .await)
    }

    /// Map right ids to route names and expand prefix rights
    ///
    /// Grants that are not a known id are taken as right names.
    async fn materialize<'a, I>(&self, grants: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let index = self.right_index.read().await;
        let mut acl = HashSet::new();

        for grant in grants {
            let name = index.get(grant).unwrap_or(grant);
            if Right::is_prefix(name) {
                acl.extend(
                    index
                        .values()
                        .filter(|known| known.starts_with(name.as_str()) && !Right::is_prefix(known))
                        .cloned(),
                );
            } else {
                acl.insert(name.clone());
            }
        }

        acl
    }

    /// `true` when rights are disabled or `route` is in the user's ACL
    pub async fn user_has_access_to(&self, user_id: &str, route: &str) -> RightsResult<bool> {
        if !self.enabled {
            return Ok(true);
        }
        Ok(self.get_user_acl(user_id).await?.contains(route))
    }

    /// Membership in a role, directly or through a group
    pub async fn user_is_in_role(&self, user_id: &str, role_name: &str) -> RightsResult<bool> {
        let Some(user) = self.repository.user(user_id).await? else {
            return Ok(false);
        };

        let groups = self.repository.groups().await?;
        let member_of: Vec<_> = groups
            .iter()
            .filter(|group| user.groups.contains(&group.id))
            .collect();
        let role_ids = effective_role_ids(&user, &member_of);

        Ok(self
            .repository
            .roles()
            .await?
            .iter()
            .any(|role| role.name == role_name && role_ids.contains(role.id.as_str())))
    }

    /// Navigation tree reduced to what the user may reach
    pub async fn secure_navigation(
        &self,
        tree: &[NavNode],
        user_id: &str,
    ) -> RightsResult<Vec<NavNode>> {
        if !self.enabled {
            return Ok(tree.to_vec());
        }
        let acl = self.get_user_acl(user_id).await?;
        Ok(prune_navigation(tree, &acl))
    }

    /// Session-ready reference to a stored user
    pub async fn get_user(&self, user_id: &str) -> RightsResult<SessionUser> {
        let user = self
            .repository
            .user(user_id)
            .await?
            .ok_or_else(|| RightsError::UserNotFound {
                id: user_id.to_string(),
            })?;
        self.session_user(&user).await
    }

    async fn session_user(&self, user: &User) -> RightsResult<SessionUser> {
        let groups = self.repository.groups().await?;
        let member_of: Vec<_> = groups
            .iter()
            .filter(|group| user.groups.contains(&group.id))
            .collect();
        let role_ids = effective_role_ids(user, &member_of);

        let mut roles: Vec<String> = self
            .repository
            .roles()
            .await?
            .into_iter()
            .filter(|role| role_ids.contains(role.id.as_str()))
            .map(|role| role.name)
            .collect();
        roles.sort();

        Ok(SessionUser::new(&user.id, &user.name).with_roles(roles))
    }

    /// Base ACL plus the rights of roles granted on `resource`
    pub async fn get_extended_acl(
        &self,
        user_id: &str,
        resource: &str,
    ) -> RightsResult<HashSet<String>> {
        let mut acl = (*self.get_user_acl(user_id).await?).clone();

        let Some(user) = self.repository.user(user_id).await? else {
            return Ok(acl);
        };

        let role_ids: HashSet<String> = self
            .repository
            .resource_rights(resource)
            .await?
            .into_iter()
            .filter(|grant| {
                grant.user_id.as_deref() == Some(user.id.as_str())
                    || grant
                        .group_id
                        .as_ref()
                        .is_some_and(|group| user.groups.contains(group))
            })
            .map(|grant| grant.role_id)
            .collect();

        if role_ids.is_empty() {
            return Ok(acl);
        }

        let roles = self.repository.roles().await?;
        let grants = roles
            .iter()
            .filter(|role| role_ids.contains(&role.id))
            .flat_map(|role| role.rights.iter());
        acl.extend(self.materialize(grants).await);

        Ok(acl)
    }

    /// Grant `role_name` on `resource` to a user or group
    pub async fn add_resource_right(
        &self,
        resource: &str,
        subject: Subject,
        role_name: &str,
    ) -> RightsResult<()> {
        let role = self
            .repository
            .role_by_name(role_name)
            .await?
            .ok_or_else(|| RightsError::RoleNotFound {
                name: role_name.to_string(),
            })?;

        let (user_id, group_id) = match subject {
            Subject::User(id) => (Some(id), None),
            Subject::Group(id) => (None, Some(id)),
        };

        self.repository
            .add_resource_right(ResourceRight {
                resource: resource.to_string(),
                user_id,
                group_id,
                role_id: role.id,
            })
            .await
    }

    /// Every registered route as a candidate right
    pub fn get_public_functions_from_controllers(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Vec<RightCandidate> {
        snapshot
            .actions()
            .map(|action| RightCandidate {
                name: action.route.to_string(),
                description: action.description.clone(),
                roles: action.roles.clone(),
            })
            .collect()
    }

    /// Create missing rights for registered routes and assign them
    ///
    /// `Admin` receives every right; each action's declared roles receive
    /// that action's right. Returns the number of rights created.
    pub async fn refresh_rights_from_controllers(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> RightsResult<usize> {
        let candidates = self.get_public_functions_from_controllers(snapshot);
        let mut created = 0;
        let mut ids = HashMap::new();

        for candidate in &candidates {
            let right = match self.repository.right_by_name(&candidate.name).await? {
                Some(right) => right,
                None => {
                    let right = Right {
                        id: new_id(),
                        name: candidate.name.clone(),
                        description: candidate.description.clone(),
                    };
                    self.repository.save_right(right.clone()).await?;
                    created += 1;
                    right
                }
            };
            ids.insert(candidate.name.clone(), right.id);
        }

        match self.repository.role_by_name(ADMIN_ROLE).await? {
            Some(mut admin) => {
                let all = self.repository.rights().await?;
                if grant_all(&mut admin, all.into_iter().map(|right| right.id)) {
                    self.repository.save_role(admin).await?;
                }
            }
            None => warn!("Role {} does not exist, rights not assigned", ADMIN_ROLE),
        }

        for candidate in &candidates {
            let Some(right_id) = ids.get(&candidate.name) else {
                continue;
            };
            for role_name in candidate.roles.iter().filter(|r| r.as_str() != ADMIN_ROLE) {
                match self.repository.role_by_name(role_name).await? {
                    Some(mut role) => {
                        if grant_all(&mut role, std::iter::once(right_id.clone())) {
                            self.repository.save_role(role).await?;
                        }
                    }
                    None => warn!(
                        route = %candidate.name,
                        role = %role_name,
                        "Declared role does not exist, skipping"
                    ),
                }
            }
        }

        self.refresh_rights_index().await?;
        info!(
            candidates = candidates.len(),
            created, "Rights refreshed from controllers"
        );
        Ok(created)
    }

    /// Create the `Admin` and `Guest` roles and the `sysadmin` and `guest`
    /// users when missing; safe to call on every start
    pub async fn ensure_that_default_system_users_exists(
        &self,
        admin_password: Option<&str>,
    ) -> RightsResult<()> {
        let admin_role = self
            .ensure_role(ADMIN_ROLE, "Full access to every action")
            .await?;
        let guest_role = self.ensure_role(GUEST_ROLE, "Anonymous visitors").await?;

        if self
            .repository
            .user_by_name(SYSTEM_ADMIN_USER)
            .await?
            .is_none()
        {
            let mut admin = User::new(new_id(), SYSTEM_ADMIN_USER);
            admin.display_name = Some("System Administrator".to_string());
            admin.roles = vec![admin_role.id];
            match admin_password {
                Some(password) => admin.password_hash = Some(hash_password(password)?),
                None => warn!("{} has no password, set rights.admin_password to allow login", SYSTEM_ADMIN_USER),
            }

            info!("Creating default system user: {}", SYSTEM_ADMIN_USER);
            self.repository.save_user(admin).await?;
        }

        if self.repository.user(GUEST_USER_ID).await?.is_none() {
            let mut guest = User::new(GUEST_USER_ID, GUEST_USER_NAME);
            guest.roles = vec![guest_role.id];

            info!("Creating default system user: {}", GUEST_USER_NAME);
            self.repository.save_user(guest).await?;
        }

        self.invalidate_acls().await;
        Ok(())
    }

    async fn ensure_role(&self, name: &str, description: &str) -> RightsResult<Role> {
        if let Some(role) = self.repository.role_by_name(name).await? {
            return Ok(role);
        }

        let mut role = Role::new(new_id(), name);
        role.description = Some(description.to_string());
        self.repository.save_role(role.clone()).await?;
        Ok(role)
    }

    /// Verify credentials; `None` for an unknown user or a wrong password
    pub async fn authenticate(
        &self,
        name: &str,
        password: &str,
    ) -> RightsResult<Option<SessionUser>> {
        let Some(user) = self.repository.user_by_name(name).await? else {
            debug!("Login failed: unknown user {}", name);
            return Ok(None);
        };
        let Some(hash) = user.password_hash.as_deref() else {
            debug!("Login failed: user {} has no password", name);
            return Ok(None);
        };

        if !verify_password(password, hash)? {
            debug!("Login failed: wrong password for {}", name);
            return Ok(None);
        }

        Ok(Some(self.session_user(&user).await?))
    }
}

fn effective_role_ids<'a>(user: &'a User, groups: &[&'a super::model::Group]) -> HashSet<&'a str> {
    user.roles
        .iter()
        .chain(groups.iter().flat_map(|group| group.roles.iter()))
        .map(String::as_str)
        .collect()
}

/// Add missing right ids to a role; `true` when the role changed
fn grant_all<I: IntoIterator<Item = String>>(role: &mut Role, right_ids: I) -> bool {
    let mut changed = false;
    for id in right_ids {
        if !role.rights.contains(&id) {
            role.rights.push(id);
            changed = true;
        }
    }
    changed
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> RightsResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RightsError::PasswordHash {
            message: e.to_string(),
        })
}

fn verify_password(password: &str, hash: &str) -> RightsResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| RightsError::PasswordHash {
        message: e.to_string(),
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
