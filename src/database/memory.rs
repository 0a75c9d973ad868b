use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::gateway::{Attachment, Gateway, UnitOfWork};
use crate::database::manager::DatabaseError;
use crate::database::models::{Group, GroupPatch, User, UserGroup, UserPatch};
use crate::filter::UserFilter;

/// In-process gateway enforcing the same keys and references as the SQL schema.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub memberships: Vec<UserGroup>,
}

/// A buffered write, replayed against the shared state on commit.
#[derive(Debug, Clone)]
enum Write {
    CreateGroup(Group),
    UpdateGroup(Uuid, GroupPatch),
    Attach(Uuid, Vec<Uuid>),
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.read().await.clone()
    }
}

impl MemoryState {
    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn ensure_login_free(&self, login: &str, except: Option<Uuid>) -> Result<(), DatabaseError> {
        let taken = self
            .users
            .iter()
            .any(|u| !u.is_deleted && u.login == login && Some(u.id) != except);
        if taken {
            return Err(DatabaseError::UniqueViolation(format!(
                "duplicate key value violates unique constraint \"users_active_login_key\": login '{}'",
                login
            )));
        }
        Ok(())
    }

    fn insert_user(&mut self, user: &User) -> Result<User, DatabaseError> {
        if self.users.iter().any(|u| u.id == user.id) {
            return Err(DatabaseError::UniqueViolation(format!(
                "duplicate key value violates unique constraint \"users_pkey\": id {}",
                user.id
            )));
        }
        if !user.is_deleted {
            self.ensure_login_free(&user.login, None)?;
        }
        self.users.push(user.clone());
        Ok(user.clone())
    }

    fn update_user(&mut self, id: Uuid, patch: &UserPatch) -> Result<u64, DatabaseError> {
        let active = self.users.iter().any(|u| u.id == id && !u.is_deleted);
        if !active {
            return Ok(0);
        }
        self.ensure_login_free(&patch.login, Some(id))?;
        match self.user_mut(id) {
            Some(user) => {
                user.apply(patch);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn soft_delete_user(&mut self, id: Uuid) -> u64 {
        match self.user_mut(id) {
            Some(user) if !user.is_deleted => {
                user.is_deleted = true;
                1
            }
            _ => 0,
        }
    }

    fn apply(&mut self, write: &Write) -> Result<u64, DatabaseError> {
        match write {
            Write::CreateGroup(group) => {
                if self.groups.iter().any(|g| g.id == group.id) {
                    return Err(DatabaseError::UniqueViolation(format!(
                        "duplicate key value violates unique constraint \"groups_pkey\": id {}",
                        group.id
                    )));
                }
                self.groups.push(group.clone());
                Ok(1)
            }
            Write::UpdateGroup(id, patch) => match self.groups.iter_mut().find(|g| g.id == *id) {
                Some(group) => {
                    group.apply(patch);
                    Ok(1)
                }
                None => Ok(0),
            },
            Write::Attach(group_id, user_ids) => {
                for membership in UserGroup::for_group(*group_id, user_ids) {
                    self.insert_membership(membership)?;
                }
                Ok(user_ids.len() as u64)
            }
        }
    }

    fn insert_membership(&mut self, membership: UserGroup) -> Result<(), DatabaseError> {
        if !self.users.iter().any(|u| u.id == membership.user_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "insert on table \"user_groups\" violates foreign key constraint \"user_groups_user_id_fkey\": user {} is not present",
                membership.user_id
            )));
        }
        if !self.groups.iter().any(|g| g.id == membership.group_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "insert on table \"user_groups\" violates foreign key constraint \"user_groups_group_id_fkey\": group {} is not present",
                membership.group_id
            )));
        }
        if self.memberships.contains(&membership) {
            return Err(DatabaseError::UniqueViolation(format!(
                "duplicate key value violates unique constraint \"user_groups_pkey\": user {} group {}",
                membership.user_id, membership.group_id
            )));
        }
        self.memberships.push(membership);
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        let mut candidates = state.users.iter().filter(|u| u.login == login);
        let first = candidates.clone().find(|u| !u.is_deleted);
        Ok(first.or_else(|| candidates.next()).cloned())
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        self.state.write().await.insert_user(user)
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<u64, DatabaseError> {
        self.state.write().await.update_user(id, patch)
    }

    async fn soft_delete_user(&self, id: Uuid) -> Result<u64, DatabaseError> {
        Ok(self.state.write().await.soft_delete_user(id))
    }

    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<Group>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn find_groups(&self) -> Result<Vec<Group>, DatabaseError> {
        Ok(self.state.read().await.groups.clone())
    }

    async fn hard_delete_group(&self, id: Uuid) -> Result<u64, DatabaseError> {
        let mut state = self.state.write().await;
        let before = state.groups.len();
        state.groups.retain(|g| g.id != id);
        if state.groups.len() == before {
            return Ok(0);
        }
        state.memberships.retain(|m| m.group_id != id);
        Ok(1)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let working = self.snapshot().await;
        Ok(Box::new(MemoryUnitOfWork {
            state: Arc::clone(&self.state),
            working,
            writes: Vec::new(),
        }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Writes land in a private copy first so callers see their own changes and
/// constraint failures surface at the call that caused them.
pub struct MemoryUnitOfWork {
    state: Arc<RwLock<MemoryState>>,
    working: MemoryState,
    writes: Vec<Write>,
}

impl MemoryUnitOfWork {
    fn record(&mut self, write: Write) -> Result<u64, DatabaseError> {
        let affected = self.working.apply(&write)?;
        self.writes.push(write);
        Ok(affected)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn create_group(&mut self, group: &Group) -> Result<Group, DatabaseError> {
        self.record(Write::CreateGroup(group.clone()))?;
        Ok(group.clone())
    }

    async fn update_group(&mut self, id: Uuid, patch: &GroupPatch) -> Result<u64, DatabaseError> {
        self.record(Write::UpdateGroup(id, patch.clone()))
    }

    async fn attach_users_to_group(
        &mut self,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Attachment, DatabaseError> {
        let attached = self.record(Write::Attach(group_id, user_ids.to_vec()))?;
        Ok(Attachment {
            success: true,
            attached: attached as usize,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let mut shared = self.state.write().await;
        // Replay against a copy so a conflicting concurrent commit leaves the shared state untouched
        let mut next = shared.clone();
        for write in &self.writes {
            next.apply(write)?;
        }
        *shared = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Permission;

    fn user(login: &str) -> User {
        User::new(UserPatch {
            login: login.to_string(),
            password: "pass1".to_string(),
            age: 30,
        })
    }

    fn group(name: &str) -> Group {
        Group::new(GroupPatch {
            name: name.to_string(),
            permissions: vec![Permission::Read],
        })
    }

    #[tokio::test]
    async fn soft_delete_counts_once() {
        let gateway = MemoryGateway::new();
        let u = gateway.create_user(&user("anna")).await.unwrap();

        assert_eq!(gateway.soft_delete_user(u.id).await.unwrap(), 1);
        assert_eq!(gateway.soft_delete_user(u.id).await.unwrap(), 0);
        assert!(gateway.find_user_by_id(u.id).await.unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn active_logins_are_unique() {
        let gateway = MemoryGateway::new();
        let first = gateway.create_user(&user("anna")).await.unwrap();

        let err = gateway.create_user(&user("anna")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(_)));

        gateway.soft_delete_user(first.id).await.unwrap();
        assert!(gateway.create_user(&user("anna")).await.is_ok());
    }

    #[tokio::test]
    async fn login_lookup_prefers_active_user() {
        let gateway = MemoryGateway::new();
        let old = gateway.create_user(&user("anna")).await.unwrap();
        gateway.soft_delete_user(old.id).await.unwrap();
        let current = gateway.create_user(&user("anna")).await.unwrap();

        let found = gateway.find_user_by_login("anna").await.unwrap().unwrap();
        assert_eq!(found.id, current.id);
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let gateway = MemoryGateway::new();
        let g = group("admins");

        let mut uow = gateway.begin().await.unwrap();
        uow.create_group(&g).await.unwrap();
        assert!(gateway.find_group_by_id(g.id).await.unwrap().is_none());

        uow.rollback().await.unwrap();
        assert!(gateway.find_group_by_id(g.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_publishes_group_and_memberships() {
        let gateway = MemoryGateway::new();
        let u = gateway.create_user(&user("anna")).await.unwrap();
        let g = group("admins");

        let mut uow = gateway.begin().await.unwrap();
        uow.create_group(&g).await.unwrap();
        let attachment = uow.attach_users_to_group(g.id, &[u.id]).await.unwrap();
        assert_eq!(attachment, Attachment { success: true, attached: 1 });
        uow.commit().await.unwrap();

        let state = gateway.snapshot().await;
        assert_eq!(state.groups, vec![g.clone()]);
        assert_eq!(state.memberships, vec![UserGroup { user_id: u.id, group_id: g.id }]);
    }

    #[tokio::test]
    async fn attach_rejects_unknown_users() {
        let gateway = MemoryGateway::new();
        let g = group("admins");

        let mut uow = gateway.begin().await.unwrap();
        uow.create_group(&g).await.unwrap();
        let err = uow
            .attach_users_to_group(g.id, &[Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn attach_rejects_duplicate_membership() {
        let gateway = MemoryGateway::new();
        let u = gateway.create_user(&user("anna")).await.unwrap();
        let g = group("admins");

        let mut uow = gateway.begin().await.unwrap();
        uow.create_group(&g).await.unwrap();
        let err = uow
            .attach_users_to_group(g.id, &[u.id, u.id])
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn deleting_group_drops_memberships() {
        let gateway = MemoryGateway::new();
        let u = gateway.create_user(&user("anna")).await.unwrap();
        let g = group("admins");

        let mut uow = gateway.begin().await.unwrap();
        uow.create_group(&g).await.unwrap();
        uow.attach_users_to_group(g.id, &[u.id]).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(gateway.hard_delete_group(g.id).await.unwrap(), 1);
        assert_eq!(gateway.hard_delete_group(g.id).await.unwrap(), 0);
        assert!(gateway.snapshot().await.memberships.is_empty());
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let gateway = MemoryGateway::new();
        for login in ["anna", "annie", "joanna"] {
            gateway.create_user(&user(login)).await.unwrap();
        }

        let found = gateway
            .find_users(&UserFilter::suggest(vec!["ann".to_string()], 2))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }
}
