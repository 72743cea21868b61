//! The cart store: in-memory cart lines mirrored to durable storage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use kv_store::KeyValueStore;
use tokio::sync::{Mutex, watch};
use tracing::Instrument;

use crate::config::{CartConfig, CorruptSnapshotPolicy};
use crate::error::{CartError, Result};
use crate::line_item::NewLineItem;
use crate::listener::{CartListener, ListenerId, ListenerRegistry};
use crate::snapshot::{CartChange, CartSnapshot};

struct CartInner<S> {
    storage: S,
    config: CartConfig,
    state: watch::Sender<Arc<CartSnapshot>>,
    // Serializes operations so durable writes land in call order. Owned
    // guards let a write outlive the caller's future.
    op_lock: Arc<Mutex<()>>,
    ready: AtomicBool,
    listeners: ListenerRegistry,
}

/// Shopping cart whose every mutation is persisted to a [`KeyValueStore`].
///
/// Mutations update memory first, so [`products`](Self::products) reflects an
/// operation as soon as it has started persisting. The operation then waits
/// for the durable write before resolving. Operations are serialized: an
/// operation issued after another one has resolved (or is still in flight)
/// writes after it.
///
/// If the write fails after all retries, the operation returns
/// [`CartError::StorageWriteFailure`] while memory keeps the change. Memory
/// and storage differ until the next successful write, which always carries
/// the whole cart.
///
/// Durable writes run on a spawned task, so dropping an operation's future
/// (a timeout, a `select!` branch) does not abandon a write whose change is
/// already visible in memory. Operations must therefore be called from
/// within a Tokio runtime.
///
/// Consumers should not mutate before [`hydrate`](Self::hydrate) has resolved;
/// use [`open`](Self::open) to construct and hydrate in one step.
pub struct CartStore<S: KeyValueStore> {
    inner: Arc<CartInner<S>>,
}

impl<S: KeyValueStore + 'static> CartStore<S> {
    /// Creates an empty, not yet hydrated store.
    pub fn new(storage: S, config: CartConfig) -> Self {
        let (state, _) = watch::channel(Arc::new(CartSnapshot::new()));
        Self {
            inner: Arc::new(CartInner {
                storage,
                config,
                state,
                op_lock: Arc::new(Mutex::new(())),
                ready: AtomicBool::new(false),
                listeners: ListenerRegistry::default(),
            }),
        }
    }

    /// Creates a store and hydrates it from storage.
    pub async fn open(storage: S, config: CartConfig) -> Result<Self> {
        let store = Self::new(storage, config);
        store.hydrate().await?;
        Ok(store)
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &CartConfig {
        &self.inner.config
    }

    /// Returns the underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.inner.storage
    }

    /// Returns true once hydration has completed.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Returns a weak handle for injecting into consumers.
    pub fn handle(&self) -> CartHandle<S> {
        CartHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Loads the persisted cart, replacing the in-memory lines.
    ///
    /// A missing value leaves the cart empty, discarding any lines added
    /// before hydration. An undecodable value fails
    /// with [`CartError::CorruptPersistedData`] unless the store is configured
    /// with [`CorruptSnapshotPolicy::Reset`].
    #[tracing::instrument(skip(self), fields(key = %self.inner.config.storage_key))]
    pub async fn hydrate(&self) -> Result<()> {
        let _guard = self.inner.op_lock.lock().await;
        let key = &self.inner.config.storage_key;

        let raw = self
            .inner
            .storage
            .get(key)
            .await
            .map_err(CartError::StorageRead)?;

        match raw {
            None => {
                tracing::info!("no persisted cart found");
                if !self.products().is_empty() {
                    metrics::gauge!("cart_line_items").set(0.0);
                    self.publish(Arc::new(CartSnapshot::new()));
                }
            }
            Some(raw) => {
                let snapshot = match CartSnapshot::from_json(&raw) {
                    Ok(snapshot) => snapshot,
                    Err(source) => match self.inner.config.corrupt_policy {
                        CorruptSnapshotPolicy::Fail => {
                            tracing::error!(error = %source, "persisted cart is corrupt");
                            return Err(CartError::CorruptPersistedData {
                                key: key.clone(),
                                source,
                            });
                        }
                        CorruptSnapshotPolicy::Reset => {
                            tracing::warn!(error = %source, "persisted cart is corrupt, starting empty");
                            CartSnapshot::new()
                        }
                    },
                };
                tracing::info!(lines = snapshot.len(), "hydrated cart");
                metrics::gauge!("cart_line_items").set(snapshot.len() as f64);
                self.publish(Arc::new(snapshot));
            }
        }

        self.inner.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Returns the current cart lines.
    ///
    /// The returned snapshot never changes; each mutation publishes a new one.
    pub fn products(&self) -> Arc<CartSnapshot> {
        self.inner.state.borrow().clone()
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CartSnapshot>> {
        self.inner.state.subscribe()
    }

    /// Registers a listener called with every new snapshot.
    pub fn on_change(&self, listener: impl CartListener + 'static) -> ListenerId {
        self.inner.listeners.register(Arc::new(listener))
    }

    /// Unregisters a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Adds one unit of `item`, appending a new line if the product is not in
    /// the cart yet.
    #[tracing::instrument(skip(self, item), fields(product_id = %item.id))]
    pub async fn add_to_cart(&self, item: NewLineItem) -> Result<CartChange> {
        if !item.price.is_finite() {
            return Err(CartError::InvalidItem {
                id: item.id,
                reason: "price must be a finite number",
            });
        }
        self.mutate("add", |cart| cart.add(item)).await
    }

    /// Adds one unit to the line for `id`. Unknown IDs are a no-op and do
    /// not write to storage.
    #[tracing::instrument(skip(self, id), fields(product_id = %id.as_ref()))]
    pub async fn increment(&self, id: impl AsRef<str>) -> Result<CartChange> {
        let id = id.as_ref();
        self.mutate("increment", |cart| cart.increment(id)).await
    }

    /// Removes one unit from the line for `id`, dropping the line at zero.
    /// Unknown IDs are a no-op and do not write to storage.
    #[tracing::instrument(skip(self, id), fields(product_id = %id.as_ref()))]
    pub async fn decrement(&self, id: impl AsRef<str>) -> Result<CartChange> {
        let id = id.as_ref();
        self.mutate("decrement", |cart| cart.decrement(id)).await
    }

    async fn mutate<F>(&self, operation: &'static str, apply: F) -> Result<CartChange>
    where
        F: FnOnce(&mut CartSnapshot) -> CartChange,
    {
        let guard = Arc::clone(&self.inner.op_lock).lock_owned().await;

        let current = self.products();
        let mut next = CartSnapshot::clone(&current);
        let change = apply(&mut next);

        if !change.is_mutation() {
            tracing::debug!(operation, "product not in cart, nothing to do");
            return Ok(change);
        }

        tracing::debug!(operation, ?change, lines = next.len(), "cart updated");
        metrics::counter!("cart_mutations_total", "operation" => operation).increment(1);
        metrics::gauge!("cart_line_items").set(next.len() as f64);

        let next = Arc::new(next);
        self.publish(Arc::clone(&next));

        let inner = Arc::clone(&self.inner);
        let write = tokio::spawn(
            async move {
                let _guard = guard;
                inner.persist(&next).await
            }
            .instrument(tracing::Span::current()),
        );
        write.await.map_err(CartError::WriteTask)??;

        Ok(change)
    }

    fn publish(&self, snapshot: Arc<CartSnapshot>) {
        self.inner.state.send_replace(Arc::clone(&snapshot));
        self.inner.listeners.notify(&snapshot);
    }
}

impl<S: KeyValueStore> CartInner<S> {
    async fn persist(&self, snapshot: &CartSnapshot) -> Result<()> {
        let key = &self.config.storage_key;
        let policy = &self.config.write_retry;
        let raw = snapshot.to_json()?;
        let started = Instant::now();

        let mut attempt = 1;
        loop {
            match self.storage.set(key, raw.clone()).await {
                Ok(()) => {
                    metrics::counter!("cart_storage_writes_total").increment(1);
                    metrics::histogram!("cart_persist_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    return Ok(());
                }
                Err(source) if attempt < policy.attempts() => {
                    let delay = policy.backoff_for(attempt);
                    tracing::warn!(attempt, ?delay, error = %source, "cart write failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    metrics::counter!("cart_storage_write_failures_total").increment(1);
                    tracing::error!(attempts = attempt, error = %source, "cart write failed");
                    return Err(CartError::StorageWriteFailure {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

/// Weak reference to a [`CartStore`] handed to consumers.
///
/// Every call fails with [`CartError::Usage`] once the owning store has been
/// dropped, instead of acting on a cart nobody manages any more.
pub struct CartHandle<S: KeyValueStore> {
    inner: Weak<CartInner<S>>,
}

impl<S: KeyValueStore> Clone for CartHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore> std::fmt::Debug for CartHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<S: KeyValueStore> CartHandle<S> {
    /// Returns true while the owning store exists.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<S: KeyValueStore + 'static> CartHandle<S> {
    fn store(&self) -> Result<CartStore<S>> {
        self.inner
            .upgrade()
            .map(|inner| CartStore { inner })
            .ok_or(CartError::Usage("cart used after its store was dropped"))
    }

    /// See [`CartStore::products`].
    pub fn products(&self) -> Result<Arc<CartSnapshot>> {
        Ok(self.store()?.products())
    }

    /// See [`CartStore::add_to_cart`].
    pub async fn add_to_cart(&self, item: NewLineItem) -> Result<CartChange> {
        self.store()?.add_to_cart(item).await
    }

    /// See [`CartStore::increment`].
    pub async fn increment(&self, id: impl AsRef<str>) -> Result<CartChange> {
        self.store()?.increment(id).await
    }

    /// See [`CartStore::decrement`].
    pub async fn decrement(&self, id: impl AsRef<str>) -> Result<CartChange> {
        self.store()?.decrement(id).await
    }

    /// See [`CartStore::on_change`].
    pub fn on_change(&self, listener: impl CartListener + 'static) -> Result<ListenerId> {
        Ok(self.store()?.on_change(listener))
    }

    /// See [`CartStore::subscribe`].
    pub fn subscribe(&self) -> Result<watch::Receiver<Arc<CartSnapshot>>> {
        Ok(self.store()?.subscribe())
    }
}
