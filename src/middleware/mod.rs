pub mod auth;
pub mod extract;
pub mod features;
pub mod request_id;
pub mod response;
pub mod usage;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use features::expertfolio_gate;
pub use request_id::{current_request_id, request_id_middleware, REQUEST_ID_HEADER};
pub use response::{ApiResponse, ApiResult};
pub use usage::usage_tracking_middleware;
