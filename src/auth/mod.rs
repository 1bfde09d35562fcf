pub mod dto;
pub mod extractors;
pub mod handlers;
mod password;
pub mod repo;
mod token;

pub use extractors::AuthUser;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
