use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Gateway;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn Gateway>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>, config: AppConfig) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }
}
