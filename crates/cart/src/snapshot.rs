//! The ordered collection of cart lines and its mutation rules.

use std::collections::HashSet;

use common::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::line_item::{LineItem, NewLineItem};

/// Outcome of applying one operation to a [`CartSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended with quantity 1.
    Added { id: ProductId },
    /// An existing line's quantity went up.
    Incremented { id: ProductId, quantity: u32 },
    /// An existing line's quantity went down but stayed above zero.
    Decremented { id: ProductId, quantity: u32 },
    /// The line was at quantity 1 and has been dropped.
    Removed { id: ProductId },
    /// Nothing changed.
    Unchanged,
}

impl CartChange {
    /// Returns true if the operation modified the cart.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, CartChange::Unchanged)
    }
}

/// Reasons a persisted cart cannot be loaded.
#[derive(Debug, Error)]
pub enum SnapshotDecodeError {
    /// The value is not a JSON array of line items.
    #[error("malformed cart value: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Two lines share a product ID.
    #[error("duplicate line for product {0}")]
    DuplicateId(ProductId),

    /// A line has quantity 0.
    #[error("line for product {0} has zero quantity")]
    ZeroQuantity(ProductId),

    /// A line has a NaN or infinite price.
    #[error("line for product {0} has a non-finite price")]
    NonFinitePrice(ProductId),
}

/// Ordered sequence of cart lines.
///
/// Lines stay in the order they were first added; quantity changes never
/// reorder them. At most one line exists per product ID and every line has
/// a quantity of at least 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSnapshot {
    items: Vec<LineItem>,
}

impl CartSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from existing lines, checking the cart invariants.
    pub fn from_items(items: Vec<LineItem>) -> Result<Self, SnapshotDecodeError> {
        let snapshot = Self { items };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Decodes a persisted value.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotDecodeError> {
        let items: Vec<LineItem> = serde_json::from_str(raw)?;
        Self::from_items(items)
    }

    /// Encodes the snapshot in its persisted form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.items)
    }

    /// Checks uniqueness of IDs, positive quantities and finite prices.
    pub fn validate(&self) -> Result<(), SnapshotDecodeError> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !seen.insert(&item.id) {
                return Err(SnapshotDecodeError::DuplicateId(item.id.clone()));
            }
            if item.quantity == 0 {
                return Err(SnapshotDecodeError::ZeroQuantity(item.id.clone()));
            }
            if !item.price.is_finite() {
                return Err(SnapshotDecodeError::NonFinitePrice(item.id.clone()));
            }
        }
        Ok(())
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the position of the line for `id`.
    pub fn find(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Returns the line for `id`.
    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Sum of quantities over all lines.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `price * quantity` over all lines.
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Adds one unit of `candidate`.
    ///
    /// An existing line for the same ID is incremented in place; otherwise a
    /// new line with quantity 1 goes to the end.
    pub fn add(&mut self, candidate: NewLineItem) -> CartChange {
        match self.find(candidate.id.as_str()) {
            Some(index) => self.bump(index),
            None => {
                let id = candidate.id.clone();
                self.items.push(candidate.into_line_item());
                CartChange::Added { id }
            }
        }
    }

    /// Adds one unit to the line for `id`. Unknown IDs are ignored.
    pub fn increment(&mut self, id: &str) -> CartChange {
        match self.find(id) {
            Some(index) => self.bump(index),
            None => CartChange::Unchanged,
        }
    }

    /// Removes one unit from the line for `id`, dropping the line when it
    /// reaches zero. Unknown IDs are ignored.
    pub fn decrement(&mut self, id: &str) -> CartChange {
        let Some(index) = self.find(id) else {
            return CartChange::Unchanged;
        };
        let Some(item) = self.items.get_mut(index) else {
            return CartChange::Unchanged;
        };

        if item.quantity <= 1 {
            let removed = self.items.remove(index);
            CartChange::Removed { id: removed.id }
        } else {
            item.quantity -= 1;
            CartChange::Decremented {
                id: item.id.clone(),
                quantity: item.quantity,
            }
        }
    }

    fn bump(&mut self, index: usize) -> CartChange {
        let Some(item) = self.items.get_mut(index) else {
            return CartChange::Unchanged;
        };
        // Saturated lines stay as they are.
        let Some(quantity) = item.quantity.checked_add(1) else {
            return CartChange::Unchanged;
        };
        item.quantity = quantity;
        CartChange::Incremented {
            id: item.id.clone(),
            quantity,
        }
    }
}

impl<'a> IntoIterator for &'a CartSnapshot {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
