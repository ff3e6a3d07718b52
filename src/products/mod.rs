pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo::{PgProductStore, Product, ProductStore};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
