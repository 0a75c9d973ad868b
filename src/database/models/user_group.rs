use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    pub user_id: Uuid,
    pub group_id: Uuid,
}

impl UserGroup {
    /// One membership row per user id, in input order.
    pub fn for_group(group_id: Uuid, user_ids: &[Uuid]) -> Vec<Self> {
        user_ids
            .iter()
            .map(|&user_id| Self { user_id, group_id })
            .collect()
    }
}
