//! Shared identifier types used across the cart workspace.

mod types;

pub use types::ProductId;
