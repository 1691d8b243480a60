//! Rights persistence boundary

use super::model::{Group, ResourceRight, Right, RightsData, Role, User};
use crate::error::RightsError;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

/// Narrow interface to wherever users, roles, groups and rights live
///
/// `save_*` methods upsert by id.
#[async_trait]
pub trait RightsRepository: Send + Sync {
    async fn users(&self) -> Result<Vec<User>, RightsError>;
    async fn user(&self, id: &str) -> Result<Option<User>, RightsError>;
    async fn user_by_name(&self, name: &str) -> Result<Option<User>, RightsError>;
    async fn save_user(&self, user: User) -> Result<(), RightsError>;

    async fn roles(&self) -> Result<Vec<Role>, RightsError>;
    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, RightsError>;
    async fn save_role(&self, role: Role) -> Result<(), RightsError>;

    async fn groups(&self) -> Result<Vec<Group>, RightsError>;
    async fn save_group(&self, group: Group) -> Result<(), RightsError>;

    async fn rights(&self) -> Result<Vec<Right>, RightsError>;
    async fn right_by_name(&self, name: &str) -> Result<Option<Right>, RightsError>;
    async fn save_right(&self, right: Right) -> Result<(), RightsError>;

    async fn resource_rights(&self, resource: &str) -> Result<Vec<ResourceRight>, RightsError>;
    async fn add_resource_right(&self, grant: ResourceRight) -> Result<(), RightsError>;
}

/// Repository backed by an in-process dataset
#[derive(Default)]
pub struct InMemoryRightsRepository {
    data: RwLock<RightsData>,
}

impl InMemoryRightsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: RightsData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Load a JSON dataset from disk
    pub async fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self, RightsError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let data: RightsData =
            serde_json::from_str(&content).map_err(|source| RightsError::Seed {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            users = data.users.len(),
            roles = data.roles.len(),
            rights = data.rights.len(),
            "Loaded rights seed from {}",
            path.display()
        );
        Ok(Self::from_data(data))
    }

    /// Copy of the current dataset
    pub async fn snapshot(&self) -> RightsData {
        self.data.read().await.clone()
    }
}

fn upsert<T, F>(items: &mut Vec<T>, item: T, same: F)
where
    F: Fn(&T, &T) -> bool,
{
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

#[async_trait]
impl RightsRepository for InMemoryRightsRepository {
    async fn users(&self) -> Result<Vec<User>, RightsError> {
        Ok(self.data.read().await.users.clone())
    }

    async fn user(&self, id: &str) -> Result<Option<User>, RightsError> {
        Ok(self.data.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_name(&self, name: &str) -> Result<Option<User>, RightsError> {
        Ok(self
            .data
            .read()
            .await
            .users
            .iter()
            .find(|u| u.name == name)
            .cloned())
    }

    async fn save_user(&self, user: User) -> Result<(), RightsError> {
        upsert(&mut self.data.write().await.users, user, |a, b| a.id == b.id);
        Ok(())
    }

    async fn roles(&self) -> Result<Vec<Role>, RightsError> {
        Ok(self.data.read().await.roles.clone())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, RightsError> {
        Ok(self
            .data
            .read()
            .await
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn save_role(&self, role: Role) -> Result<(), RightsError> {
        upsert(&mut self.data.write().await.roles, role, |a, b| a.id == b.id);
        Ok(())
    }

    async fn groups(&self) -> Result<Vec<Group>, RightsError> {
        Ok(self.data.read().await.groups.clone())
    }

    async fn save_group(&self, group: Group) -> Result<(), RightsError> {
        upsert(&mut self.data.write().await.groups, group, |a, b| a.id == b.id);
        Ok(())
    }

    async fn rights(&self) -> Result<Vec<Right>, RightsError> {
        Ok(self.data.read().await.rights.clone())
    }

    async fn right_by_name(&self, name: &str) -> Result<Option<Right>, RightsError> {
        Ok(self
            .data
            .read()
            .await
            .rights
            .iter()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn save_right(&self, right: Right) -> Result<(), RightsError> {
        upsert(&mut self.data.write().await.rights, right, |a, b| a.id == b.id);
        Ok(())
    }

    async fn resource_rights(&self, resource: &str) -> Result<Vec<ResourceRight>, RightsError> {
        Ok(self
            .data
            .read()
            .await
            .resource_rights
            .iter()
            .filter(|r| r.resource == resource)
            .cloned()
            .collect())
    }

    async fn add_resource_right(&self, grant: ResourceRight) -> Result<(), RightsError> {
        let mut data = self.data.write().await;
        if !data.resource_rights.contains(&grant) {
            data.resource_rights.push(grant);
        }
        Ok(())
    }
}
