use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::models::{
    accept_set_quantity, normalize_add_quantity, Cart, CartEvent, CartLine, CartSummary, Service,
};
use crate::observability::Metrics;
use crate::repositories::CartStorage;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Owns the cart aggregate, persists every mutation write-through and
/// broadcasts a one-shot event after each one.
///
/// Nothing here fails: bad inputs are coerced, unknown lines are ignored and
/// storage errors are logged while the in-memory cart stays authoritative.
pub struct CartManager {
    cart: Cart,
    storage: Arc<dyn CartStorage>,
    events: broadcast::Sender<CartEvent>,
    metrics: Option<Arc<Metrics>>,
}

impl CartManager {
    /// Rehydrate from storage, falling back to an empty cart
    pub fn load(storage: Arc<dyn CartStorage>) -> Self {
        Self::load_with_metrics(storage, None)
    }

    #[instrument(skip_all)]
    pub fn load_with_metrics(storage: Arc<dyn CartStorage>, metrics: Option<Arc<Metrics>>) -> Self {
        let cart = match storage.load() {
            Ok(Some(cart)) => {
                info!(
                    line_count = cart.len(),
                    item_count = cart.item_count(),
                    "Cart restored from storage"
                );
                cart
            }
            Ok(None) => {
                info!("No stored cart, starting empty");
                Cart::new()
            }
            Err(e) => {
                warn!(error = %e, "Stored cart unreadable, starting empty");
                if let Some(ref metrics) = metrics {
                    metrics.record_persistence_failure("load");
                }
                Cart::new()
            }
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let manager = Self {
            cart,
            storage,
            events,
            metrics,
        };
        manager.update_size_metrics();
        manager
    }

    /// Add `quantity` of a service; quantities below one count as one
    #[instrument(skip(self, service), fields(service_id = %service.id, quantity = quantity))]
    pub fn add_item(&mut self, service: &Service, quantity: i64) -> &Cart {
        let added = normalize_add_quantity(quantity);
        let merged = self.cart.find_by_service(&service.id).is_some();
        let line = self.cart.add_service(service, added);

        let event = CartEvent::ItemAdded {
            line_id: line.line_id.clone(),
            service_id: line.service_id.clone(),
            name: line.name.clone(),
            added,
            quantity: line.quantity(),
            merged,
        };
        info!(line_id = %line.line_id, merged, new_quantity = line.quantity(), "Item added to cart");

        self.commit(event);
        &self.cart
    }

    /// Remove a line; returns the removed line, or `None` if it wasn't there
    #[instrument(skip(self))]
    pub fn remove_item(&mut self, line_id: &str) -> Option<CartLine> {
        let Some(line) = self.cart.remove_line(line_id) else {
            debug!("Line not in cart, nothing to remove");
            self.record_noop("remove_item");
            return None;
        };

        info!(service_id = %line.service_id, "Item removed from cart");
        self.commit(CartEvent::item_removed(&line));
        Some(line)
    }

    /// Set a line's quantity. Values below one and unknown lines are ignored;
    /// a line is never removed this way.
    #[instrument(skip(self))]
    pub fn set_quantity(&mut self, line_id: &str, new_quantity: i64) -> &Cart {
        let Some(quantity) = accept_set_quantity(new_quantity) else {
            debug!("Quantity below floor, ignoring");
            self.record_noop("set_quantity");
            return &self.cart;
        };

        let previous = match self.cart.get_line(line_id) {
            Some(line) if line.quantity() != quantity => line.quantity(),
            Some(_) => {
                debug!("Quantity unchanged");
                self.record_noop("set_quantity");
                return &self.cart;
            }
            None => {
                debug!("Line not in cart, ignoring");
                self.record_noop("set_quantity");
                return &self.cart;
            }
        };

        self.cart.set_quantity(line_id, quantity);
        info!(previous, quantity, "Cart line quantity updated");

        self.commit(CartEvent::QuantityChanged {
            line_id: line_id.to_string(),
            previous,
            quantity,
        });
        &self.cart
    }

    /// Empty the cart, e.g. once checkout has completed
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> &Cart {
        if self.cart.is_empty() {
            self.record_noop("clear");
            return &self.cart;
        }

        let removed_lines = self.cart.len();
        self.cart.clear();
        info!(removed_lines, "Cart cleared");

        self.commit(CartEvent::Cleared { removed_lines });
        &self.cart
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Cart total for display, two decimals
    pub fn cart_total(&self) -> String {
        self.cart.formatted_total()
    }

    /// Exact cart total
    pub fn cart_total_amount(&self) -> Decimal {
        self.cart.total()
    }

    pub fn item_count(&self) -> u64 {
        self.cart.item_count()
    }

    /// Snapshot for the presentation layer or a checkout collaborator
    pub fn summary(&self) -> CartSummary {
        self.cart.summary()
    }

    /// Subscribe to cart events sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    fn commit(&self, event: CartEvent) {
        let operation = event.kind();
        self.persist(operation);

        if let Some(ref metrics) = self.metrics {
            metrics.record_cart_operation(operation, true);
        }
        self.update_size_metrics();

        if self.events.send(event).is_err() {
            debug!("No cart event subscribers");
        }
    }

    fn persist(&self, operation: &str) {
        match self.storage.save(&self.cart) {
            Ok(()) => debug!(operation, "Cart persisted"),
            Err(e) => {
                error!(operation, error = %e, "Failed to persist cart, keeping in-memory state");
                if let Some(ref metrics) = self.metrics {
                    metrics.record_persistence_failure(operation);
                }
            }
        }
    }

    fn record_noop(&self, operation: &str) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cart_operation(operation, false);
        }
    }

    fn update_size_metrics(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.set_cart_size(self.cart.len(), self.cart.item_count());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{coerce_price, RepositoryError, RepositoryResult, MAX_PRICE};
    use crate::repositories::{InMemoryStore, KeyValueCartRepository, KeyValueStore};
    use mockall::mock;
    use rust_decimal_macros::dec;

    mock! {
        TestCartStorage {}

        impl CartStorage for TestCartStorage {
            fn load(&self) -> RepositoryResult<Option<Cart>>;
            fn save(&self, cart: &Cart) -> RepositoryResult<()>;
        }
    }

    fn in_memory_storage() -> (Arc<InMemoryStore>, Arc<KeyValueCartRepository>) {
        let store = Arc::new(InMemoryStore::new());
        let repo = Arc::new(KeyValueCartRepository::with_default_key(store.clone()));
        (store, repo)
    }

    fn service(id: &str, price: Decimal) -> Service {
        Service::new(id, format!("Service {}", id), price)
    }

    #[test]
    fn test_add_new_item() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);

        let cart = manager.add_item(&service("S1", dec!(10)), 2);

        assert_eq!(cart.len(), 1);
        let line = &cart.lines()[0];
        assert_eq!(line.quantity(), 2);
        assert_eq!(line.line_total(), dec!(20));
        assert_eq!(manager.cart_total(), "20.00");
        assert_eq!(manager.item_count(), 2);
    }

    #[test]
    fn test_re_adding_keeps_first_snapshot_price() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);

        manager.add_item(&service("S1", dec!(10)), 2);
        let cart = manager.add_item(&service("S1", dec!(15)), 1);

        assert_eq!(cart.len(), 1);
        let line = cart.find_by_service("S1").unwrap();
        assert_eq!(line.quantity(), 3);
        assert_eq!(line.price, dec!(10));
        assert_eq!(line.line_total(), dec!(30));
        assert_eq!(manager.cart_total(), "30.00");
    }

    #[test]
    fn test_non_positive_add_quantity_defaults_to_one() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);

        manager.add_item(&service("S1", dec!(4)), 0);
        manager.add_item(&service("S2", dec!(4)), -3);

        assert_eq!(manager.item_count(), 2);
        assert_eq!(manager.cart_total_amount(), dec!(8));
    }

    #[test]
    fn test_set_quantity_below_one_is_noop() {
        let (store, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        manager.add_item(&service("S1", dec!(10)), 3);
        let line_id = manager.cart().lines()[0].line_id.clone();
        let persisted_before = store.get("laundryServiceCart").unwrap();

        manager.set_quantity(&line_id, 0);
        manager.set_quantity(&line_id, -7);

        assert_eq!(manager.cart().get_line(&line_id).unwrap().quantity(), 3);
        assert_eq!(manager.cart().len(), 1);
        assert_eq!(store.get("laundryServiceCart").unwrap(), persisted_before);
    }

    #[test]
    fn test_set_quantity_updates_line() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        manager.add_item(&service("S1", dec!(2.5)), 1);
        let line_id = manager.cart().lines()[0].line_id.clone();

        let cart = manager.set_quantity(&line_id, 4);

        assert_eq!(cart.get_line(&line_id).unwrap().quantity(), 4);
        assert_eq!(cart.get_line(&line_id).unwrap().line_total(), dec!(10));
        assert_eq!(manager.cart_total(), "10.00");
    }

    #[test]
    fn test_unknown_line_is_noop() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        manager.add_item(&service("S1", dec!(10)), 1);

        assert!(manager.remove_item("missing").is_none());
        manager.set_quantity("missing", 5);

        assert_eq!(manager.cart().len(), 1);
        assert_eq!(manager.item_count(), 1);
    }

    #[test]
    fn test_remove_item_scenario() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);

        manager.add_item(&service("S1", dec!(10)), 2);
        manager.add_item(&service("S1", dec!(15)), 1);
        let s1_line = manager.cart().find_by_service("S1").unwrap().line_id.clone();
        manager.set_quantity(&s1_line, 0);
        assert_eq!(manager.cart().get_line(&s1_line).unwrap().quantity(), 3);

        manager.add_item(&service("S2", dec!(5)), 1);
        let removed = manager.remove_item(&s1_line).unwrap();

        assert_eq!(removed.service_id, "S1");
        assert_eq!(manager.cart().len(), 1);
        assert_eq!(manager.cart_total(), "5.00");
        assert_eq!(manager.item_count(), 1);
    }

    #[test]
    fn test_reload_restores_persisted_cart() {
        let (store, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        manager.add_item(&service("S1", dec!(12.99)), 2);
        manager.add_item(&service("S2", dec!(8.49)), 3);
        let original = manager.cart().clone();
        drop(manager);

        let fresh_repo = Arc::new(KeyValueCartRepository::with_default_key(store));
        let reloaded = CartManager::load(fresh_repo);

        assert_eq!(reloaded.cart(), &original);
        assert_eq!(reloaded.item_count(), 5);
        assert_eq!(reloaded.cart_total_amount(), dec!(51.45));
    }

    #[test]
    fn test_corrupt_storage_falls_back_to_empty() {
        let store = Arc::new(InMemoryStore::new());
        store.set("laundryServiceCart", "[{\"broken\":").unwrap();
        let repo = Arc::new(KeyValueCartRepository::with_default_key(store));
        let metrics = Arc::new(Metrics::new().unwrap());

        let manager = CartManager::load_with_metrics(repo, Some(metrics.clone()));

        assert!(manager.cart().is_empty());
        assert_eq!(
            metrics
                .cart_persistence_failures_total
                .with_label_values(&["load"])
                .get(),
            1.0
        );
    }

    #[test]
    fn test_storage_read_error_falls_back_to_empty() {
        let mut storage = MockTestCartStorage::new();
        storage.expect_load().times(1).returning(|| {
            Err(RepositoryError::Unavailable {
                message: "disk gone".to_string(),
            })
        });

        let manager = CartManager::load(Arc::new(storage));

        assert!(manager.cart().is_empty());
        assert_eq!(manager.cart_total(), "0.00");
    }

    #[test]
    fn test_write_failure_keeps_in_memory_state() {
        let mut storage = MockTestCartStorage::new();
        storage.expect_load().times(1).returning(|| Ok(None));
        storage.expect_save().times(3).returning(|cart| {
            Err(RepositoryError::QuotaExceeded {
                key: "laundryServiceCart".to_string(),
                size: cart.len() * 100,
                quota: 10,
            })
        });
        let metrics = Arc::new(Metrics::new().unwrap());

        let mut manager = CartManager::load_with_metrics(Arc::new(storage), Some(metrics.clone()));
        manager.add_item(&service("S1", dec!(10)), 1);
        manager.add_item(&service("S2", dec!(20)), 1);
        let line_id = manager.cart().lines()[0].line_id.clone();
        manager.set_quantity(&line_id, 3);

        assert_eq!(manager.cart().len(), 2);
        assert_eq!(manager.cart_total(), "50.00");
        assert_eq!(
            metrics
                .cart_persistence_failures_total
                .with_label_values(&["add_item"])
                .get(),
            2.0
        );
    }

    #[test]
    fn test_every_mutation_is_written_through() {
        let mut storage = MockTestCartStorage::new();
        storage.expect_load().times(1).returning(|| Ok(None));
        storage.expect_save().times(4).returning(|_| Ok(()));

        let mut manager = CartManager::load(Arc::new(storage));
        manager.add_item(&service("S1", dec!(1)), 1);
        let line_id = manager.cart().lines()[0].line_id.clone();
        manager.set_quantity(&line_id, 2);
        manager.set_quantity(&line_id, 2);
        manager.set_quantity(&line_id, 0);
        manager.remove_item("missing");
        manager.add_item(&service("S2", dec!(1)), 1);
        manager.remove_item(&line_id);
    }

    #[test]
    fn test_clear() {
        let (store, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        manager.add_item(&service("S1", dec!(10)), 2);
        manager.add_item(&service("S2", dec!(3)), 1);

        let cart = manager.clear();
        assert!(cart.is_empty());
        assert_eq!(manager.cart_total(), "0.00");
        assert_eq!(store.get("laundryServiceCart").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_events_are_broadcast() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        let mut events = manager.subscribe();

        manager.add_item(&service("S1", dec!(10)), 1);
        manager.add_item(&service("S1", dec!(10)), 2);
        let line_id = manager.cart().lines()[0].line_id.clone();
        manager.remove_item(&line_id);

        match events.try_recv().unwrap() {
            CartEvent::ItemAdded {
                merged, quantity, ..
            } => {
                assert!(!merged);
                assert_eq!(quantity, 1);
            }
            other => panic!("Expected ItemAdded, got {:?}", other),
        }
        match events.try_recv().unwrap() {
            CartEvent::ItemAdded {
                merged,
                added,
                quantity,
                ..
            } => {
                assert!(merged);
                assert_eq!(added, 2);
                assert_eq!(quantity, 3);
            }
            other => panic!("Expected merged ItemAdded, got {:?}", other),
        }
        let removed = events.try_recv().unwrap();
        assert_eq!(removed.message(), "Service S1 removed from cart");
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_mutations_without_subscribers_succeed() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);

        manager.add_item(&service("S1", dec!(1)), 1);
        assert_eq!(manager.item_count(), 1);
    }

    #[test]
    fn test_summary_matches_cart() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        manager.add_item(&service("S1", dec!(0.1)), 3);
        manager.add_item(&service("S2", dec!(0.2)), 1);

        let summary = manager.summary();
        assert_eq!(summary.total, dec!(0.5));
        assert_eq!(summary.formatted_total, "0.50");
        assert_eq!(summary.item_count, 4);
        assert_eq!(summary.lines.len(), 2);
    }

    #[test]
    fn test_oversized_catalog_price_adds_at_zero() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);
        let huge = Service::new(
            "S1",
            "Huge",
            coerce_price(&serde_json::json!("100000000000000000000")),
        );

        manager.add_item(&huge, 1_000_000_000);

        assert_eq!(manager.item_count(), 1_000_000_000);
        assert_eq!(manager.cart_total(), "0.00");
    }

    #[test]
    fn test_largest_price_and_quantity_total_exactly() {
        let (_, repo) = in_memory_storage();
        let mut manager = CartManager::load(repo);

        manager.add_item(&service("S1", MAX_PRICE), i64::MAX);
        manager.add_item(&service("S2", MAX_PRICE), i64::MAX);

        assert_eq!(manager.item_count(), 2 * u64::from(u32::MAX));
        assert_eq!(manager.cart_total(), "8589934590000000000.00");
    }

    #[test]
    fn test_stored_line_with_unrepresentable_total_loads() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(
                "laundryServiceCart",
                r#"[{"id":"a","serviceId":"S1","price":"79228162514264337593543950335","quantity":2}]"#,
            )
            .unwrap();
        let repo = Arc::new(KeyValueCartRepository::with_default_key(store));

        let summary = CartManager::load(repo).summary();

        assert_eq!(summary.line_count, 1);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.formatted_total, "0.00");
    }
}
