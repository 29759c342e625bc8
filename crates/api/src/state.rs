use std::sync::Arc;

use services::AppServices;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: services and config sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices, config: ServerConfig) -> Self {
        Self {
            services,
            config: Arc::new(config),
        }
    }
}
