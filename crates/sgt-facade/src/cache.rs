use crate::service::{Binding, Transport};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, PoisonError};

/// EndpointCache holds the Bindings of recently used service descriptions,
/// keyed by URL. Once full, binding a new URL evicts the least-recently used.
pub struct EndpointCache {
    capacity: usize,
    // Ordered from least to most recently used.
    entries: Mutex<IndexMap<String, Arc<dyn Binding>>>,
}

impl EndpointCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, wsdl_url: &str) -> bool {
        self.lock().contains_key(wsdl_url)
    }

    /// Cached URLs, from least to most recently used.
    pub fn urls(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Return the cached Binding of `wsdl_url`, marking it most recently used,
    /// or bind it using `transport` and cache the result.
    ///
    /// The lock isn't held while binding, so concurrent misses of one URL
    /// may each bind it. The last to finish is the one retained.
    pub async fn get_or_bind(
        &self,
        wsdl_url: &str,
        transport: &dyn Transport,
    ) -> Result<Arc<dyn Binding>, soap::Error> {
        if let Some(binding) = self.touch(wsdl_url) {
            tracing::debug!(wsdl_url, "endpoint cache hit");
            return Ok(binding);
        }
        tracing::debug!(wsdl_url, "endpoint cache miss");

        let binding = transport.bind(wsdl_url).await?;
        self.insert(wsdl_url, binding.clone());

        Ok(binding)
    }

    fn touch(&self, wsdl_url: &str) -> Option<Arc<dyn Binding>> {
        let mut entries = self.lock();
        let binding = entries.shift_remove(wsdl_url)?;
        entries.insert(wsdl_url.to_string(), binding.clone());
        Some(binding)
    }

    fn insert(&self, wsdl_url: &str, binding: Arc<dyn Binding>) {
        let mut entries = self.lock();
        entries.shift_remove(wsdl_url);

        while entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.shift_remove_index(0) {
                tracing::debug!(wsdl_url = %evicted, "evicted endpoint");
            }
        }
        entries.insert(wsdl_url.to_string(), binding);
    }

    // A panic while holding the lock can't leave the map inconsistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<String, Arc<dyn Binding>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
