pub mod aggregator;
pub mod dto;
pub mod handlers;

use crate::state::AppState;
use axum::Router;

pub use aggregator::Macros;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
