use sqlx::PgPool;
use tracing::info;

use crate::database::DatabaseError;

/// Tables backing users, groups and their memberships. Idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        login TEXT NOT NULL,
        password TEXT NOT NULL,
        age INTEGER NOT NULL,
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS users_active_login_key
        ON users (login) WHERE NOT is_deleted
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        permissions TEXT[] NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_groups (
        user_id UUID NOT NULL REFERENCES users (id),
        group_id UUID NOT NULL REFERENCES groups (id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, group_id)
    )
    "#,
];

pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Database schema is up to date");
    Ok(())
}
