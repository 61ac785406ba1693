use super::CartEntry;
use std::sync::Mutex;

/// Durable client-side storage for the cart ledger.
///
/// Mirrors the storefront's local-storage behavior: the whole entry list is
/// written on save and the key is dropped when the cart empties.
pub trait CartStore {
    /// Returns the persisted entries, or `None` when storage is empty.
    fn load(&self) -> Result<Option<Vec<CartEntry>>, CartStoreError>;
    fn save(&self, entries: &[CartEntry]) -> Result<(), CartStoreError>;
    fn clear(&self) -> Result<(), CartStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CartStoreError {
    #[error("cart storage unavailable: {0}")]
    Unavailable(String),
    #[error("cart storage corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl<S: CartStore + ?Sized> CartStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<Vec<CartEntry>>, CartStoreError> {
        (**self).load()
    }

    fn save(&self, entries: &[CartEntry]) -> Result<(), CartStoreError> {
        (**self).save(entries)
    }

    fn clear(&self) -> Result<(), CartStoreError> {
        (**self).clear()
    }
}

/// In-memory store for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    serialized: Mutex<Option<String>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for InMemoryCartStore {
    fn load(&self) -> Result<Option<Vec<CartEntry>>, CartStoreError> {
        let guard = self
            .serialized
            .lock()
            .map_err(|e| CartStoreError::Unavailable(e.to_string()))?;
        match guard.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, entries: &[CartEntry]) -> Result<(), CartStoreError> {
        let raw = serde_json::to_string(entries)?;
        let mut guard = self
            .serialized
            .lock()
            .map_err(|e| CartStoreError::Unavailable(e.to_string()))?;
        *guard = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), CartStoreError> {
        let mut guard = self
            .serialized
            .lock()
            .map_err(|e| CartStoreError::Unavailable(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}
