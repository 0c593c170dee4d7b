/// API routes and handlers
pub mod download;
pub mod health;
pub mod pages;
pub mod upload;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(upload::routes())
        .merge(download::routes())
}
