pub mod gateway;
pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;

pub use gateway::{Attachment, Gateway, UnitOfWork};
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryGateway;
pub use repository::PgGateway;
