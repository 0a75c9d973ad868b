use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user row. `password` is stored and returned as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub password: String,
    pub age: i32,
    pub is_deleted: bool,
}

/// Fields a client may set on create and replace on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub login: String,
    pub password: String,
    pub age: i32,
}

impl User {
    /// New active user with a freshly assigned v4 id.
    pub fn new(patch: UserPatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            login: patch.login,
            password: patch.password,
            age: patch.age,
            is_deleted: false,
        }
    }

    pub fn apply(&mut self, patch: &UserPatch) {
        self.login.clone_from(&patch.login);
        self.password.clone_from(&patch.password);
        self.age = patch.age;
    }
}
