use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{Group, GroupPatch, User, UserPatch};
use crate::database::DatabaseError;
use crate::filter::UserFilter;

/// Outcome of attaching users to a group inside a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub success: bool,
    pub attached: usize,
}

/// Typed access to the users, groups and membership tables.
///
/// Counts returned by `update_*`/`*_delete` are affected rows (0 or 1).
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// First user registered under `login`, deleted or not.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DatabaseError>;

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError>;

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<u64, DatabaseError>;

    /// Sets `is_deleted`; the row stays.
    async fn soft_delete_user(&self, id: Uuid) -> Result<u64, DatabaseError>;

    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<Group>, DatabaseError>;

    async fn find_groups(&self) -> Result<Vec<Group>, DatabaseError>;

    /// Removes the group row and, by cascade, its memberships.
    async fn hard_delete_group(&self, id: Uuid) -> Result<u64, DatabaseError>;

    /// Open a unit of work for multi-table group writes.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Writes that commit or roll back together. Dropping without `commit` discards them.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn create_group(&mut self, group: &Group) -> Result<Group, DatabaseError>;

    async fn update_group(&mut self, id: Uuid, patch: &GroupPatch) -> Result<u64, DatabaseError>;

    /// One membership row per user id; any failing row fails the whole call.
    async fn attach_users_to_group(
        &mut self,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Attachment, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
