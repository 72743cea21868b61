//! Integration tests for the cart store.
//!
//! These tests drive the public cart surface against the in-memory and file
//! backends, covering persistence across restarts and the cart invariants.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cart::{
    CART_STORAGE_KEY, CartChange, CartConfig, CartContext, CartError, CartSnapshot, CartStore,
    CorruptSnapshotPolicy, NewLineItem, WriteRetryPolicy,
};
use kv_store::{FileStore, InMemoryStore, KeyValueStore};

fn config() -> CartConfig {
    CartConfig::new().with_write_retry(WriteRetryPolicy::new(2, Duration::ZERO, Duration::ZERO))
}

fn product(id: &str) -> NewLineItem {
    NewLineItem::new(id, format!("Product {id}"), format!("https://img/{id}.png"), 10.0)
}

fn quantities(snapshot: &CartSnapshot) -> Vec<(String, u32)> {
    snapshot
        .iter()
        .map(|item| (item.id.to_string(), item.quantity))
        .collect()
}

fn q(id: &str, quantity: u32) -> (String, u32) {
    (id.to_string(), quantity)
}

/// Store that records every written value in order.
#[derive(Clone, Default)]
struct RecordingStore {
    inner: InMemoryStore,
    writes: Arc<Mutex<Vec<String>>>,
    write_delay: Duration,
}

impl RecordingStore {
    fn with_write_delay(write_delay: Duration) -> Self {
        Self {
            write_delay,
            ..Self::default()
        }
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> kv_store::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> kv_store::Result<()> {
        // Yield or sleep so concurrent callers get a chance to interleave.
        if self.write_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.write_delay).await;
        }
        self.writes.lock().unwrap().push(value.clone());
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> kv_store::Result<()> {
        self.inner.remove(key).await
    }
}

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn add_increment_decrement_walkthrough() {
        let cart = CartStore::open(InMemoryStore::new(), config())
            .await
            .unwrap();
        let shirt = NewLineItem::new("1", "Shirt", "https://img/shirt.png", 50.0);

        cart.add_to_cart(shirt.clone()).await.unwrap();
        assert_eq!(quantities(&cart.products()), vec![q("1", 1)]);

        cart.add_to_cart(shirt).await.unwrap();
        assert_eq!(quantities(&cart.products()), vec![q("1", 2)]);

        cart.increment("1").await.unwrap();
        assert_eq!(quantities(&cart.products()), vec![q("1", 3)]);

        cart.decrement("1").await.unwrap();
        cart.decrement("1").await.unwrap();
        assert_eq!(quantities(&cart.products()), vec![q("1", 1)]);

        let change = cart.decrement("1").await.unwrap();
        assert_eq!(change, CartChange::Removed { id: "1".into() });
        assert!(cart.products().is_empty());
    }

    #[tokio::test]
    async fn hydrates_exact_stored_value() {
        let raw = r#"[{"id":"2","title":"Mug","image_url":"https://img/mug.png","price":12.5,"quantity":5}]"#;
        let storage = InMemoryStore::with_entries([(CART_STORAGE_KEY, raw)]);

        let cart = CartStore::open(storage.clone(), config()).await.unwrap();

        let products = cart.products();
        assert_eq!(quantities(&products), vec![q("2", 5)]);
        let mug = products.get("2").unwrap();
        assert_eq!(mug.title, "Mug");
        assert_eq!(mug.price, 12.5);
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn order_is_preserved_across_updates() {
        let cart = CartStore::open(InMemoryStore::new(), config())
            .await
            .unwrap();

        cart.add_to_cart(product("A")).await.unwrap();
        cart.add_to_cart(product("B")).await.unwrap();
        cart.increment("A").await.unwrap();

        assert_eq!(
            quantities(&cart.products()),
            vec![q("A", 2), q("B", 1)]
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_tolerated_without_writes() {
        let storage = InMemoryStore::new();
        let cart = CartStore::open(storage.clone(), config()).await.unwrap();
        cart.add_to_cart(product("A")).await.unwrap();
        let before = cart.products();

        cart.increment("ghost").await.unwrap();
        cart.decrement("ghost").await.unwrap();

        assert_eq!(*cart.products(), *before);
        assert_eq!(storage.write_count(), 1);
    }
}

mod invariants {
    use super::*;

    /// Deterministic linear congruential sequence so the test is repeatable.
    fn operations(seed: u64, count: usize) -> Vec<(u8, String)> {
        let mut state = seed;
        (0..count)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let op = ((state >> 33) % 3) as u8;
                let id = format!("p{}", (state >> 40) % 5);
                (op, id)
            })
            .collect()
    }

    #[tokio::test]
    async fn ids_stay_unique_and_quantities_positive() {
        let cart = CartStore::open(InMemoryStore::new(), config())
            .await
            .unwrap();

        for (op, id) in operations(7, 400) {
            match op {
                0 => cart.add_to_cart(product(&id)).await.unwrap(),
                1 => cart.increment(&id).await.unwrap(),
                _ => cart.decrement(&id).await.unwrap(),
            };

            let products = cart.products();
            assert!(products.validate().is_ok());
            assert!(products.iter().all(|item| item.quantity >= 1));
        }
    }

    #[tokio::test]
    async fn memory_and_storage_agree_after_every_operation() {
        let storage = InMemoryStore::new();
        let cart = CartStore::open(storage.clone(), config()).await.unwrap();

        for (op, id) in operations(42, 100) {
            let change = match op {
                0 => cart.add_to_cart(product(&id)).await.unwrap(),
                1 => cart.increment(&id).await.unwrap(),
                _ => cart.decrement(&id).await.unwrap(),
            };

            if change.is_mutation() {
                let raw = storage.get(CART_STORAGE_KEY).await.unwrap().unwrap();
                assert_eq!(CartSnapshot::from_json(&raw).unwrap(), *cart.products());
            }
        }
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn cart_survives_restart_with_file_store() {
        let dir = tempfile::tempdir().unwrap();

        {
            let storage = FileStore::open(dir.path()).await.unwrap();
            let cart = CartStore::open(storage, config()).await.unwrap();
            cart.add_to_cart(product("A")).await.unwrap();
            cart.add_to_cart(NewLineItem::new("B", "B", "", 0.1 + 0.2))
                .await
                .unwrap();
            cart.increment("A").await.unwrap();
        }

        let storage = FileStore::open(dir.path()).await.unwrap();
        let cart = CartStore::open(storage, config()).await.unwrap();

        let products = cart.products();
        assert_eq!(
            quantities(&products),
            vec![q("A", 2), q("B", 1)]
        );
        assert_eq!(products.get("B").unwrap().price, 0.1 + 0.2);
    }

    #[tokio::test]
    async fn corrupt_value_fails_hydration_by_default() {
        let storage = InMemoryStore::with_entries([(CART_STORAGE_KEY, "{not json")]);

        let result = CartStore::open(storage, config()).await;

        assert!(matches!(
            result,
            Err(CartError::CorruptPersistedData { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_lines_count_as_corrupt() {
        let raw = r#"[{"id":"1","title":"A","image_url":"","price":1,"quantity":0}]"#;
        let storage = InMemoryStore::with_entries([(CART_STORAGE_KEY, raw)]);

        let cart = CartStore::new(storage, config());
        let err = cart.hydrate().await.unwrap_err();

        assert!(matches!(err, CartError::CorruptPersistedData { .. }));
        assert!(!cart.is_ready());
    }

    #[tokio::test]
    async fn reset_policy_starts_empty_and_overwrites_on_next_write() {
        let storage = InMemoryStore::with_entries([(CART_STORAGE_KEY, "garbage")]);
        let cart = CartStore::open(
            storage.clone(),
            config().with_corrupt_policy(CorruptSnapshotPolicy::Reset),
        )
        .await
        .unwrap();

        assert!(cart.is_ready());
        assert!(cart.products().is_empty());
        assert_eq!(
            storage.get(CART_STORAGE_KEY).await.unwrap().as_deref(),
            Some("garbage")
        );

        cart.add_to_cart(product("A")).await.unwrap();
        let raw = storage.get(CART_STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(CartSnapshot::from_json(&raw).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn custom_storage_key_is_used() {
        let storage = InMemoryStore::new();
        let cart = CartStore::open(storage.clone(), config().with_storage_key("@test:cart"))
            .await
            .unwrap();

        cart.add_to_cart(product("A")).await.unwrap();

        assert!(storage.get("@test:cart").await.unwrap().is_some());
        assert!(storage.get(CART_STORAGE_KEY).await.unwrap().is_none());
    }
}

mod ordering {
    use super::*;

    #[tokio::test]
    async fn concurrent_operations_write_in_call_order() {
        let storage = RecordingStore::default();
        let cart = CartStore::open(storage.clone(), config()).await.unwrap();

        let ops = (0..5).map(|_| cart.add_to_cart(product("A")));
        let results = futures_util::future::join_all(ops).await;
        assert!(results.iter().all(Result::is_ok));

        let written: Vec<u32> = storage
            .writes()
            .iter()
            .map(|raw| CartSnapshot::from_json(raw).unwrap().get("A").unwrap().quantity)
            .collect();
        assert_eq!(written, vec![1, 2, 3, 4, 5]);
        assert_eq!(cart.products().get("A").unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn dropped_operation_still_persists_before_the_next_one() {
        let storage = RecordingStore::with_write_delay(Duration::from_millis(200));
        let cart = CartStore::open(storage.clone(), config()).await.unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), cart.add_to_cart(product("A"))).await;
        assert!(timed_out.is_err());
        assert_eq!(quantities(&cart.products()), vec![q("A", 1)]);

        cart.add_to_cart(product("B")).await.unwrap();

        let written: Vec<Vec<(String, u32)>> = storage
            .writes()
            .iter()
            .map(|raw| quantities(&CartSnapshot::from_json(raw).unwrap()))
            .collect();
        assert_eq!(written, vec![vec![q("A", 1)], vec![q("A", 1), q("B", 1)]]);
    }

    #[tokio::test]
    async fn dropped_operation_write_completes_in_background() {
        let storage = RecordingStore::with_write_delay(Duration::from_millis(200));
        let cart = CartStore::open(storage.clone(), config()).await.unwrap();

        let _ = tokio::time::timeout(Duration::from_millis(20), cart.add_to_cart(product("A"))).await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        let raw = storage.get(CART_STORAGE_KEY).await.unwrap();
        let persisted = CartSnapshot::from_json(&raw.unwrap()).unwrap();
        assert_eq!(quantities(&persisted), vec![q("A", 1)]);
    }
}

mod observers {
    use super::*;

    #[tokio::test]
    async fn listeners_see_every_mutation_and_hydration() {
        let raw = r#"[{"id":"A","title":"A","image_url":"","price":1,"quantity":2}]"#;
        let cart = CartStore::new(
            InMemoryStore::with_entries([(CART_STORAGE_KEY, raw)]),
            config(),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = cart.on_change(move |products: &CartSnapshot| {
            sink.lock().unwrap().push(products.total_quantity());
        });

        cart.hydrate().await.unwrap();
        cart.increment("A").await.unwrap();
        cart.increment("missing").await.unwrap();
        cart.decrement("A").await.unwrap();

        assert!(cart.remove_listener(id));
        cart.decrement("A").await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![2, 3, 2]);
    }

    #[tokio::test]
    async fn subscribers_observe_latest_snapshot() {
        let cart = CartStore::open(InMemoryStore::new(), config())
            .await
            .unwrap();
        let mut rx = cart.subscribe();

        cart.add_to_cart(product("A")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        let latest = rx.borrow_and_update().clone();
        assert_eq!(latest.len(), 1);
    }
}

mod scope {
    use super::*;

    #[tokio::test]
    async fn consumers_reach_the_cart_through_the_context() {
        let storage = InMemoryStore::new();
        let store = CartStore::open(storage.clone(), config()).await.unwrap();
        let context = CartContext::with_store(&store);

        let cart = context.cart().unwrap();
        cart.add_to_cart(product("A")).await.unwrap();
        cart.increment("A").await.unwrap();

        assert_eq!(cart.products().unwrap().get("A").unwrap().quantity, 2);
        assert_eq!(storage.write_count(), 2);
    }

    #[tokio::test]
    async fn access_outside_scope_is_a_usage_error() {
        let context: CartContext<InMemoryStore> = CartContext::default();
        let err = context.cart().unwrap_err();
        assert!(matches!(err, CartError::Usage(_)));
        assert!(err.to_string().contains("outside"));
    }
}
