#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use user_groups_api::auth::generate_jwt;
use user_groups_api::config::{AppConfig, StorageBackend};
use user_groups_api::database::models::{Group, GroupPatch, Permission, User, UserPatch};
use user_groups_api::database::{Attachment, DatabaseError, Gateway, MemoryGateway, UnitOfWork};
use user_groups_api::filter::UserFilter;
use user_groups_api::{app, AppState};

pub const TOKEN_HEADER: &str = "x-access-token";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.backend = StorageBackend::Memory;
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.security.token_header = TOKEN_HEADER.to_string();
    config.api.base_path = "/api".to_string();
    config
}

/// Router over an in-memory store, plus a valid token for the protected routes.
pub struct TestApp {
    pub router: Router,
    pub memory: MemoryGateway,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let memory = MemoryGateway::new();
        Self::with_gateway(memory.clone(), Arc::new(memory))
    }

    /// `memory` is the store behind `gateway`, used for seeding and inspection.
    pub fn with_gateway(memory: MemoryGateway, gateway: Arc<dyn Gateway>) -> Self {
        let config = test_config();
        let token = generate_jwt("tester", Uuid::new_v4(), &config.security)
            .expect("test token should sign");
        let router = app(AppState::new(gateway, config));
        Self {
            router,
            memory,
            token,
        }
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, None).await
    }

    /// Authenticated request with an optional JSON body.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(TOKEN_HEADER, &self.token)
            .body(json_body(body))?;
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    /// Insert an active user directly through the store.
    pub async fn seed_user(&self, login: &str) -> Result<User> {
        let user = User::new(UserPatch {
            login: login.to_string(),
            password: "pass1".to_string(),
            age: 30,
        });
        Ok(self.memory.create_user(&user).await?)
    }

    pub async fn seed_group(&self, name: &str) -> Result<Group> {
        let group = Group::new(GroupPatch {
            name: name.to_string(),
            permissions: vec![Permission::Read],
        });
        let mut uow = self.memory.begin().await?;
        let created = uow.create_group(&group).await?;
        uow.commit().await?;
        Ok(created)
    }
}

pub fn json_body(body: Option<Value>) -> Body {
    match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    }
}

/// Delegates to a `MemoryGateway`, counting calls and optionally reporting
/// zero affected rows from every write.
pub struct InstrumentedGateway {
    inner: MemoryGateway,
    stale_writes: bool,
    pub calls: Arc<AtomicUsize>,
}

impl InstrumentedGateway {
    pub fn counting(inner: MemoryGateway) -> Self {
        Self {
            inner,
            stale_writes: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stale(inner: MemoryGateway) -> Self {
        Self {
            stale_writes: true,
            ..Self::counting(inner)
        }
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Gateway for InstrumentedGateway {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.hit();
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, DatabaseError> {
        self.hit();
        self.inner.find_user_by_login(login).await
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>, DatabaseError> {
        self.hit();
        self.inner.find_users(filter).await
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        self.hit();
        self.inner.create_user(user).await
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<u64, DatabaseError> {
        self.hit();
        if self.stale_writes {
            return Ok(0);
        }
        self.inner.update_user(id, patch).await
    }

    async fn soft_delete_user(&self, id: Uuid) -> Result<u64, DatabaseError> {
        self.hit();
        if self.stale_writes {
            return Ok(0);
        }
        self.inner.soft_delete_user(id).await
    }

    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<Group>, DatabaseError> {
        self.hit();
        self.inner.find_group_by_id(id).await
    }

    async fn find_groups(&self) -> Result<Vec<Group>, DatabaseError> {
        self.hit();
        self.inner.find_groups().await
    }

    async fn hard_delete_group(&self, id: Uuid) -> Result<u64, DatabaseError> {
        self.hit();
        if self.stale_writes {
            return Ok(0);
        }
        self.inner.hard_delete_group(id).await
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        self.hit();
        let inner = self.inner.begin().await?;
        Ok(Box::new(InstrumentedUnitOfWork {
            inner,
            stale_writes: self.stale_writes,
        }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.inner.health_check().await
    }
}

struct InstrumentedUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    stale_writes: bool,
}

#[async_trait]
impl UnitOfWork for InstrumentedUnitOfWork {
    async fn create_group(&mut self, group: &Group) -> Result<Group, DatabaseError> {
        self.inner.create_group(group).await
    }

    async fn update_group(&mut self, id: Uuid, patch: &GroupPatch) -> Result<u64, DatabaseError> {
        if self.stale_writes {
            return Ok(0);
        }
        self.inner.update_group(id, patch).await
    }

    async fn attach_users_to_group(
        &mut self,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Attachment, DatabaseError> {
        self.inner.attach_users_to_group(group_id, user_ids).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.inner.rollback().await
    }
}
