// handlers/public/mod.rs - Handlers reachable without a token

pub mod authenticate;
pub mod health;

pub use authenticate::authenticate;
pub use health::health;
