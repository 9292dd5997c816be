use std::sync::Arc;

use crate::config::AppConfig;
use crate::fabric::FabricClient;
use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<Registry>,
    pub fabric: Arc<FabricClient>,
}

impl AppState {
    pub fn new(config: AppConfig, registry: Arc<Registry>, fabric: FabricClient) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            fabric: Arc::new(fabric),
        }
    }
}
