//! Parse Context
//!
//! Everything a build model needs from its surroundings, passed in
//! explicitly when the model is created.

use std::sync::Arc;

use r_droid_core::{DslConfig, EventBus, GradleDialect};

/// Dialect, settings and event bus for one build model
#[derive(Debug, Clone)]
pub struct DslContext {
    pub dialect: GradleDialect,
    pub config: DslConfig,
    pub events: Arc<EventBus>,
}

impl DslContext {
    /// Context with default settings and a private event bus
    pub fn new(dialect: GradleDialect) -> Self {
        Self {
            dialect,
            config: DslConfig::default(),
            events: Arc::new(EventBus::new()),
        }
    }

    pub fn with_config(mut self, config: DslConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }
}

impl Default for DslContext {
    fn default() -> Self {
        Self::new(GradleDialect::default())
    }
}
