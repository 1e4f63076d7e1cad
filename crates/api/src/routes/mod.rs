pub mod health;
pub mod quiet_hour;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /quiet-hours          list, create
/// /quiet-hours/{id}     get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/quiet-hours", quiet_hour::router())
}
