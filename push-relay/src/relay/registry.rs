//! Transport client registry.
//!
//! Holds exactly one transport per application. Dispatchers look a transport
//! up on every attempt and keep the `Arc` only for that attempt, so a refresh
//! never disturbs a request that is already in flight.

use std::collections::HashMap;
use std::sync::Arc;

use apns_gateway::{TransportFactory, TransportHandle};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::{Error, Result};

pub struct TransportRegistry {
    factory: Arc<dyn TransportFactory>,
    transports: RwLock<HashMap<String, TransportHandle>>,
}

impl TransportRegistry {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Build and register the transport for `app`.
    ///
    /// Startup configuration only. A construction failure is returned as
    /// [`Error::Configuration`] and should abort the process.
    ///
    /// # Panics
    ///
    /// If `app` is already registered.
    pub fn create(&self, app: &str) -> Result<TransportHandle> {
        assert!(
            !self.contains(app),
            "tried to overwrite existing transport for {app}"
        );

        let transport = self
            .factory
            .construct(app)
            .map_err(|e| Error::config(format!("Failed to create transport for {app}: {e}")))?;

        let mut transports = self.transports.write();
        assert!(
            !transports.contains_key(app),
            "tried to overwrite existing transport for {app}"
        );
        transports.insert(app.to_string(), transport.clone());
        info!(app = %app, "Registered gateway transport");

        Ok(transport)
    }

    /// Current transport for `app`.
    pub fn get(&self, app: &str) -> Result<TransportHandle> {
        self.transports
            .read()
            .get(app)
            .cloned()
            .ok_or_else(|| Error::unknown_app(app))
    }

    pub fn contains(&self, app: &str) -> bool {
        self.transports.read().contains_key(app)
    }

    /// Registered application identifiers, sorted.
    pub fn apps(&self) -> Vec<String> {
        let mut apps: Vec<String> = self.transports.read().keys().cloned().collect();
        apps.sort();
        apps
    }

    pub fn len(&self) -> usize {
        self.transports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.read().is_empty()
    }

    /// Replace the transport for `app` with a newly built one.
    ///
    /// If the new transport cannot be built the current one stays in place.
    pub fn refresh(&self, app: &str) -> Result<()> {
        if !self.contains(app) {
            return Err(Error::unknown_app(app));
        }

        // Build outside the lock; lookups continue against the old transport.
        let transport = self.factory.construct(app)?;

        match self.transports.write().get_mut(app) {
            Some(slot) => {
                *slot = transport;
                Ok(())
            }
            None => Err(Error::unknown_app(app)),
        }
    }

    /// Refresh every registered transport. Returns how many were replaced.
    ///
    /// Blocks while credentials are read; call from a blocking context.
    pub fn refresh_all(&self) -> usize {
        let mut refreshed = 0;
        for app in self.apps() {
            match self.refresh(&app) {
                Ok(()) => refreshed += 1,
                Err(e) => warn!(app = %app, error = %e, "Failed to refresh gateway transport"),
            }
        }
        refreshed
    }
}
