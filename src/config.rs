//! Store configuration.

/// Options applied when a [`DocumentStore`](crate::DocumentStore) is built.
///
/// # Default Configuration
///
/// ```rust
/// use docstore::StoreConfig;
/// let config = StoreConfig::default();
/// assert!(config.require_endpoints);
/// assert!(config.reserve_collection_capacity.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Whether `create_relationship` requires both endpoint documents to exist.
    ///
    /// **Default:** `true`
    ///
    /// With `false`, edges may name documents that are written later. Reads
    /// still only return documents that exist at read time.
    pub require_endpoints: bool,

    /// Capacity hint for collections created by the store.
    ///
    /// **Default:** `None`
    pub reserve_collection_capacity: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            require_endpoints: true,
            reserve_collection_capacity: None,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_require_endpoints(mut self, require: bool) -> Self {
        self.require_endpoints = require;
        self
    }

    pub fn with_collection_capacity(mut self, capacity: usize) -> Self {
        self.reserve_collection_capacity = Some(capacity);
        self
    }
}
