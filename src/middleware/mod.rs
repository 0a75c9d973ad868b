pub mod auth;
pub mod request_log;
pub mod response;
pub mod validate_request;

pub use auth::{require_token, AuthUser};
pub use request_log::log_request;
pub use response::{ApiResponse, ApiResult};
pub use validate_request::{ValidId, ValidatedJson};
