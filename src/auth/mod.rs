use crate::state::AppState;
use axum::Router;

mod dto;
pub mod events;
pub(crate) mod extractors;
pub mod handlers;
mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::PublicUser;
pub use extractors::{AuthUser, PageSession};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
