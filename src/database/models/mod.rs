pub mod group;
pub mod user;
pub mod user_group;

pub use group::{Group, GroupPatch, GroupRow, Permission};
pub use user::{User, UserPatch};
pub use user_group::UserGroup;
