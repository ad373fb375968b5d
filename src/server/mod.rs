mod admin;
pub mod dto;
mod release;
pub mod response;
mod router;

pub use admin::admin_router;
pub use release::release_router;
pub use router::{AppState, create_router};
