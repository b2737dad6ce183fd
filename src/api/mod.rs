pub mod handlers;
pub mod models;
pub mod routes;

pub use models::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_api_router;
