pub mod auth;
pub mod request_logger;

pub use auth::require_identity;
pub use request_logger::request_logger_middleware;
