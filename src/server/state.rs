use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::gateway::GraphQlClient;
use crate::models::EnumCatalog;
use crate::pipeline::ListingService;

/// Default lifetime of a cached enum catalog.
pub const ENUM_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Single-slot TTL cache for the enum catalog. The catalog changes only
/// when the CMS schema does, so one upstream fetch per hour is plenty.
pub struct EnumCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, EnumCatalog)>>,
}

impl EnumCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn get(&self) -> Option<EnumCatalog> {
        let slot = self.slot.lock().unwrap();
        match slot.as_ref() {
            Some((stored, catalog)) if stored.elapsed() < self.ttl => Some(catalog.clone()),
            _ => None,
        }
    }

    pub fn put(&self, catalog: EnumCatalog) {
        *self.slot.lock().unwrap() = Some((Instant::now(), catalog));
    }

    pub fn invalidate(&self) {
        *self.slot.lock().unwrap() = None;
    }
}

impl Default for EnumCache {
    fn default() -> Self {
        Self::new(ENUM_CACHE_TTL)
    }
}

/// Shared state for the API routes.
///
/// The service is `None` when the upstream is unconfigured; routes that
/// need it answer with a configuration error while health checks and
/// short-query suggestion requests keep working.
#[derive(Clone)]
pub struct AppState {
    service: Option<Arc<ListingService>>,
    pub enum_cache: Arc<EnumCache>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let service = match GraphQlClient::new(config.upstream.as_ref()) {
            Ok(client) => {
                info!("GraphQL upstream configured");
                Some(Arc::new(ListingService::new(Arc::new(client))))
            }
            Err(err) => {
                warn!(error = %err, "Starting without a GraphQL upstream");
                None
            }
        };

        Self {
            service,
            enum_cache: Arc::new(EnumCache::default()),
        }
    }

    pub fn with_service(service: Arc<ListingService>) -> Self {
        Self {
            service: Some(service),
            enum_cache: Arc::new(EnumCache::default()),
        }
    }

    pub fn service(&self) -> Result<&Arc<ListingService>> {
        self.service.as_ref().ok_or(Error::Configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> EnumCatalog {
        EnumCatalog {
            currencies: vec!["GHS".to_string(), "USD".to_string()],
            ..EnumCatalog::default()
        }
    }

    #[test]
    fn cache_serves_within_ttl_and_expires_after() {
        let cache = EnumCache::new(Duration::from_secs(3600));
        assert!(cache.get().is_none());

        cache.put(catalog());
        assert_eq!(cache.get().unwrap().currencies.len(), 2);

        // A zero TTL is always expired.
        let expired = EnumCache::new(Duration::ZERO);
        expired.put(catalog());
        assert!(expired.get().is_none());
    }

    #[test]
    fn invalidate_clears_the_slot() {
        let cache = EnumCache::new(Duration::from_secs(3600));
        cache.put(catalog());
        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn unconfigured_state_reports_a_configuration_error() {
        let state = AppState::new(&AppConfig {
            port: 3000,
            upstream: None,
        });
        assert!(matches!(state.service(), Err(Error::Configuration)));
    }
}
