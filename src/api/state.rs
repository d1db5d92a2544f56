use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::dispatch::DispatchController;
use crate::observability::Metrics;
use crate::registry::RouteRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RouteRegistry>,
    pub store: Arc<ArtifactStore>,
    pub dispatcher: Arc<DispatchController>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        registry: Arc<RouteRegistry>,
        store: Arc<ArtifactStore>,
        dispatcher: DispatchController,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            store,
            dispatcher: Arc::new(dispatcher),
            metrics: Arc::new(Metrics::new()),
        }
    }
}
