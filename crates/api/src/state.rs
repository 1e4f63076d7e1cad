use std::sync::Arc;

use quiet_db::service::WindowService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the service holds its store behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Quiet hour write path and owner-scoped reads.
    pub windows: WindowService,
    /// Server configuration (JWT settings are read by the auth extractor).
    pub config: Arc<ServerConfig>,
}
