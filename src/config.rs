use crate::types::RetentionPolicy;
use std::time::Duration;

/// Process-level configuration, supplied once at startup.
#[derive(Debug, Clone)]
pub struct GraceConfig {
    /// SQLite URL of the state store.
    pub database_url: String,
    /// Topic every domain event is published on.
    pub events_topic: String,
    /// Capacity of the in-process event broadcast channel.
    pub event_bus_capacity: usize,
    /// Absolute TTL of memory-cache entries.
    pub cache_ttl: Duration,
    /// Retention seeded into new repositories and used for entities
    /// above the repository level.
    pub default_retention: RetentionPolicy,
}

impl Default for GraceConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            events_topic: "graceevents".to_string(),
            event_bus_capacity: 256,
            cache_ttl: Duration::from_secs(120),
            default_retention: RetentionPolicy::default(),
        }
    }
}

impl GraceConfig {
    pub fn with_database_url(mut self, database_url: &str) -> Self {
        self.database_url = database_url.to_string();
        self
    }
}
