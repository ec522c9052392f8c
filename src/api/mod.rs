//! HTTP listener for inbound channel requests

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use server::serve_api;
