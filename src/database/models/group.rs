use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Read,
    Write,
    Delete,
    Share,
    UploadFiles,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::Read,
        Permission::Write,
        Permission::Delete,
        Permission::Share,
        Permission::UploadFiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::Delete => "DELETE",
            Permission::Share => "SHARE",
            Permission::UploadFiles => "UPLOAD_FILES",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPatch {
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Group {
    pub fn new(patch: GroupPatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: patch.name,
            permissions: patch.permissions,
        }
    }

    pub fn apply(&mut self, patch: &GroupPatch) {
        self.name.clone_from(&patch.name);
        self.permissions.clone_from(&patch.permissions);
    }

    pub fn permission_names(&self) -> Vec<String> {
        permission_names(&self.permissions)
    }
}

pub fn permission_names(permissions: &[Permission]) -> Vec<String> {
    permissions.iter().map(|p| p.as_str().to_string()).collect()
}

/// Database shape of a group; permissions live in a `TEXT[]` column.
#[derive(Debug, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
}

impl TryFrom<GroupRow> for Group {
    type Error = DatabaseError;

    fn try_from(row: GroupRow) -> Result<Self, Self::Error> {
        let permissions = row
            .permissions
            .iter()
            .map(|p| p.parse::<Permission>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::InvalidRecord(format!("group {}: {}", row.id, e)))?;

        Ok(Group {
            id: row.id,
            name: row.name,
            permissions,
        })
    }
}
