use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{Cart, RepositoryResult};
use crate::repositories::KeyValueStore;

/// Key the cart is stored under, shared with the web front-end
pub const DEFAULT_CART_KEY: &str = "laundryServiceCart";

/// Storage port the cart manager persists through
pub trait CartStorage: Send + Sync {
    /// Read the stored cart; `Ok(None)` when nothing has been stored yet
    fn load(&self) -> RepositoryResult<Option<Cart>>;

    /// Replace the stored cart with `cart`
    fn save(&self, cart: &Cart) -> RepositoryResult<()>;
}

/// Cart storage on top of any key-value store, using the front-end's JSON shape
pub struct KeyValueCartRepository {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl KeyValueCartRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Repository using the default `laundryServiceCart` key
    pub fn with_default_key(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, DEFAULT_CART_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl CartStorage for KeyValueCartRepository {
    #[instrument(skip(self), fields(key = %self.key))]
    fn load(&self) -> RepositoryResult<Option<Cart>> {
        let raw = match self.store.get(&self.key)? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => {
                info!("No stored cart");
                return Ok(None);
            }
        };

        let cart: Option<Cart> = serde_json::from_str(&raw)?;
        if let Some(ref cart) = cart {
            info!("Stored cart found with {} lines", cart.len());
        }
        Ok(cart)
    }

    #[instrument(skip(self, cart), fields(key = %self.key, line_count = cart.len()))]
    fn save(&self, cart: &Cart) -> RepositoryResult<()> {
        let serialized = serde_json::to_string(cart)?;
        self.store.set(&self.key, &serialized)?;
        Ok(())
    }
}
