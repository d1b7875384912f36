//! axum shell over the controller.
//!
//! Route templates use `:param` placeholders; [`guard::to_matchit_path`]
//! converts them for both the router and the guard policy.

pub mod error;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use error::ApiError;
pub use guard::{RoutePolicy, RouteTarget};
pub use routes::router;
