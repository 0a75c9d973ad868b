// Runs against a real database: DATABASE_URL=postgres://... cargo test -- --ignored

use anyhow::{Context, Result};
use uuid::Uuid;

use user_groups_api::config::AppConfig;
use user_groups_api::database::models::{Group, GroupPatch, Permission, User, UserPatch};
use user_groups_api::database::{schema, DatabaseError, DatabaseManager, Gateway, PgGateway};
use user_groups_api::filter::UserFilter;

async fn gateway() -> Result<PgGateway> {
    let mut config = AppConfig::development().database;
    config.url = Some(std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?);

    let pool = DatabaseManager::connect(&config).await?;
    schema::ensure_schema(&pool).await?;
    Ok(PgGateway::new(pool))
}

fn unique_login() -> String {
    format!("pg{}", &Uuid::new_v4().simple().to_string()[..12])
}

#[tokio::test]
#[ignore]
async fn user_lifecycle_round_trips() -> Result<()> {
    let gateway = gateway().await?;
    let login = unique_login();
    let user = User::new(UserPatch {
        login: login.clone(),
        password: "pass1".to_string(),
        age: 30,
    });

    let created = gateway.create_user(&user).await?;
    assert_eq!(created, user);

    let duplicate = User::new(UserPatch {
        login: login.clone(),
        password: "pass2".to_string(),
        age: 31,
    });
    assert!(matches!(
        gateway.create_user(&duplicate).await,
        Err(DatabaseError::UniqueViolation(_))
    ));

    let found = gateway
        .find_users(&UserFilter::suggest(vec![login.clone()], 10))
        .await?;
    assert_eq!(found.len(), 1);

    assert_eq!(gateway.soft_delete_user(user.id).await?, 1);
    assert_eq!(gateway.soft_delete_user(user.id).await?, 0);
    assert!(gateway
        .find_users(&UserFilter::suggest(vec![login], 10))
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn failed_attach_rolls_back_group_insert() -> Result<()> {
    let gateway = gateway().await?;
    let group = Group::new(GroupPatch {
        name: "pgroup".to_string(),
        permissions: vec![Permission::Read, Permission::UploadFiles],
    });

    let mut uow = gateway.begin().await?;
    uow.create_group(&group).await?;
    let attach = uow.attach_users_to_group(group.id, &[Uuid::new_v4()]).await;
    assert!(matches!(attach, Err(DatabaseError::ForeignKeyViolation(_))));
    uow.rollback().await?;

    assert!(gateway.find_group_by_id(group.id).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn committed_group_reads_back() -> Result<()> {
    let gateway = gateway().await?;
    let group = Group::new(GroupPatch {
        name: "pgroup".to_string(),
        permissions: vec![Permission::Share],
    });

    let mut uow = gateway.begin().await?;
    uow.create_group(&group).await?;
    uow.commit().await?;

    assert_eq!(gateway.find_group_by_id(group.id).await?, Some(group.clone()));
    assert_eq!(gateway.hard_delete_group(group.id).await?, 1);
    Ok(())
}
