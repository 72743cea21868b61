//! Scoped lookup of the active cart.
//!
//! The composition root creates the [`CartStore`] and `provide`s it here;
//! consumers that were handed the context call [`CartContext::cart`]. Looking
//! the cart up before a store is provided, or after it was cleared, is a
//! usage error.

use std::sync::{PoisonError, RwLock};

use kv_store::KeyValueStore;

use crate::error::{CartError, Result};
use crate::store::{CartHandle, CartStore};

/// Holds the cart handle for the current scope, if any.
pub struct CartContext<S: KeyValueStore> {
    handle: RwLock<Option<CartHandle<S>>>,
}

impl<S: KeyValueStore + 'static> CartContext<S> {
    /// Creates a context with no cart provided.
    pub fn new() -> Self {
        Self {
            handle: RwLock::new(None),
        }
    }

    /// Creates a context already scoped to `store`.
    pub fn with_store(store: &CartStore<S>) -> Self {
        Self {
            handle: RwLock::new(Some(store.handle())),
        }
    }

    /// Scopes the context to `store`, replacing any previous store.
    pub fn provide(&self, store: &CartStore<S>) {
        *self.handle.write().unwrap_or_else(PoisonError::into_inner) = Some(store.handle());
    }

    /// Ends the current scope.
    pub fn clear(&self) {
        *self.handle.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the active cart.
    pub fn cart(&self) -> Result<CartHandle<S>> {
        let handle = self
            .handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CartError::Usage(
                "cart accessed outside of an active cart scope",
            ))?;

        if !handle.is_alive() {
            return Err(CartError::Usage("cart used after its store was dropped"));
        }
        Ok(handle)
    }
}

impl<S: KeyValueStore + 'static> Default for CartContext<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CartConfig, NewLineItem};
    use kv_store::InMemoryStore;

    #[tokio::test]
    async fn lookup_without_provider_is_usage_error() {
        let context: CartContext<InMemoryStore> = CartContext::new();
        assert!(matches!(context.cart(), Err(CartError::Usage(_))));
    }

    #[tokio::test]
    async fn provided_cart_is_shared() {
        let store = CartStore::open(InMemoryStore::new(), CartConfig::default())
            .await
            .unwrap();
        let context = CartContext::with_store(&store);

        context
            .cart()
            .unwrap()
            .add_to_cart(NewLineItem::new("1", "Shirt", "", 50.0))
            .await
            .unwrap();

        assert_eq!(store.products().len(), 1);
    }

    #[tokio::test]
    async fn cleared_context_rejects_lookup() {
        let store = CartStore::open(InMemoryStore::new(), CartConfig::default())
            .await
            .unwrap();
        let context = CartContext::new();
        context.provide(&store);
        assert!(context.cart().is_ok());

        context.clear();
        assert!(matches!(context.cart(), Err(CartError::Usage(_))));
    }

    #[tokio::test]
    async fn dropped_store_is_usage_error() {
        let store = CartStore::open(InMemoryStore::new(), CartConfig::default())
            .await
            .unwrap();
        let context = CartContext::with_store(&store);
        drop(store);

        assert!(matches!(context.cart(), Err(CartError::Usage(_))));
    }
}
