//! Shopping-cart state manager.
//!
//! This crate keeps an ordered list of cart lines in memory and mirrors every
//! change to a durable key/value store so the cart survives restarts:
//! - [`CartSnapshot`] holds the lines and the add/increment/decrement rules
//! - [`CartStore`] owns the snapshot, hydrates it and persists each mutation
//! - [`CartHandle`] and [`CartContext`] hand the cart to consumers
//! - [`CartListener`] receives every new snapshot

pub mod config;
pub mod context;
pub mod error;
pub mod line_item;
pub mod listener;
pub mod snapshot;
pub mod store;

pub use common::ProductId;
pub use config::{CART_STORAGE_KEY, CartConfig, CorruptSnapshotPolicy, WriteRetryPolicy};
pub use context::CartContext;
pub use error::{CartError, Result};
pub use line_item::{LineItem, NewLineItem};
pub use listener::{CartListener, ListenerId};
pub use snapshot::{CartChange, CartSnapshot, SnapshotDecodeError};
pub use store::{CartHandle, CartStore};
