//! Route definitions for the `/quiet-hours` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::quiet_hour;
use crate::state::AppState;

/// Routes mounted at `/quiet-hours`. All require a bearer token.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> create
/// GET    /{id}    -> get_by_id
/// PUT    /{id}    -> update
/// DELETE /{id}    -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(quiet_hour::list).post(quiet_hour::create))
        .route(
            "/{id}",
            get(quiet_hour::get_by_id)
                .put(quiet_hour::update)
                .delete(quiet_hour::delete),
        )
}
