//! Line items and add candidates.

use common::ProductId;
use serde::{Deserialize, Serialize};

/// One distinct product in the cart.
///
/// `title`, `image_url` and `price` are carried for display only; the cart
/// never interprets them. `quantity` is always at least 1 while the line is
/// part of a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product identifier; unique within a cart.
    pub id: ProductId,

    /// Display title.
    pub title: String,

    /// Display image location.
    #[serde(alias = "imageUrl")]
    pub image_url: String,

    /// Unit price.
    pub price: f64,

    /// Number of units in the cart.
    pub quantity: u32,
}

impl LineItem {
    /// Returns `price * quantity`.
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// A product offered to the cart: a [`LineItem`] without a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub id: ProductId,
    pub title: String,
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    pub price: f64,
}

impl NewLineItem {
    /// Creates a new add candidate.
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }

    /// Turns the candidate into a fresh line with quantity 1.
    pub fn into_line_item(self) -> LineItem {
        LineItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity: 1,
        }
    }
}
