use std::sync::Arc;

use hermes_db::{MessageLog, SubscriberDirectory};
use hermes_delivery::{DispatcherRegistry, Ledger, Publisher, SubscriberResolver};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub directory: Arc<dyn SubscriberDirectory>,
    pub log: Arc<dyn MessageLog>,
    pub publisher: Arc<Publisher>,
}

impl AppState {
    /// Wire the publish pipeline over the given stores and dispatchers.
    pub fn new(
        config: ServerConfig,
        directory: Arc<dyn SubscriberDirectory>,
        log: Arc<dyn MessageLog>,
        dispatchers: DispatcherRegistry,
    ) -> Self {
        let gateway = &config.gateway;
        let resolver = SubscriberResolver::new(Arc::clone(&directory), gateway.resolution_strategy)
            .with_broadcast_topic(gateway.broadcast_topic.clone());
        let publisher = Publisher::new(
            Arc::new(gateway.rate_limiter()),
            Ledger::new(Arc::clone(&log)),
            resolver,
            dispatchers,
            gateway.publisher_config(),
        );

        Self {
            config: Arc::new(config),
            directory,
            log,
            publisher: Arc::new(publisher),
        }
    }
}
