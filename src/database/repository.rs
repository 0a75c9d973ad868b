use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::gateway::{Attachment, Gateway, UnitOfWork};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::group::permission_names;
use crate::database::models::{Group, GroupPatch, GroupRow, User, UserGroup, UserPatch};
use crate::filter::UserFilter;

const USER_COLUMNS: &str = "id, login, password, age, is_deleted";
const GROUP_COLUMNS: &str = "id, name, permissions";

/// PostgreSQL gateway over a shared pool.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, DatabaseError> {
        // Active rows first so a re-registered login wins over its deleted predecessor
        let sql = format!(
            "SELECT {} FROM users WHERE login = $1 ORDER BY is_deleted LIMIT 1",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        filter.push_sql(&mut qb);

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users ({cols}) VALUES ($1, $2, $3, $4, $5) RETURNING {cols}",
            cols = USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.login)
            .bind(&user.password)
            .bind(user.age)
            .bind(user.is_deleted)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET login = $2, password = $3, age = $4 WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(&patch.login)
        .bind(&patch.password)
        .bind(patch.age)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn soft_delete_user(&self, id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE users SET is_deleted = TRUE WHERE id = $1 AND NOT is_deleted")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<Group>, DatabaseError> {
        let sql = format!("SELECT {} FROM groups WHERE id = $1", GROUP_COLUMNS);
        sqlx::query_as::<_, GroupRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Group::try_from)
            .transpose()
    }

    async fn find_groups(&self) -> Result<Vec<Group>, DatabaseError> {
        let sql = format!("SELECT {} FROM groups", GROUP_COLUMNS);
        sqlx::query_as::<_, GroupRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Group::try_from)
            .collect()
    }

    async fn hard_delete_group(&self, id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

/// A single PostgreSQL transaction. sqlx rolls it back if dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn create_group(&mut self, group: &Group) -> Result<Group, DatabaseError> {
        let sql = format!(
            "INSERT INTO groups ({cols}) VALUES ($1, $2, $3) RETURNING {cols}",
            cols = GROUP_COLUMNS
        );
        let row = sqlx::query_as::<_, GroupRow>(&sql)
            .bind(group.id)
            .bind(&group.name)
            .bind(group.permission_names())
            .fetch_one(&mut *self.tx)
            .await?;
        Group::try_from(row)
    }

    async fn update_group(&mut self, id: Uuid, patch: &GroupPatch) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE groups SET name = $2, permissions = $3 WHERE id = $1")
            .bind(id)
            .bind(&patch.name)
            .bind(permission_names(&patch.permissions))
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn attach_users_to_group(
        &mut self,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Attachment, DatabaseError> {
        let mut attached = 0;
        for membership in UserGroup::for_group(group_id, user_ids) {
            sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
                .bind(membership.user_id)
                .bind(membership.group_id)
                .execute(&mut *self.tx)
                .await?;
            attached += 1;
        }
        Ok(Attachment {
            success: true,
            attached,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
