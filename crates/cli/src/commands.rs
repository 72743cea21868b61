//! Cart subcommands.

use std::fmt::Write as _;

use cart::{CartChange, CartContext, CartError, CartSnapshot, NewLineItem};
use clap::Subcommand;
use kv_store::KeyValueStore;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the cart
    List,
    /// Add one unit of a product
    Add {
        /// Product identifier
        #[arg(long)]
        id: String,

        /// Display title
        #[arg(long)]
        title: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Product image location
        #[arg(long, default_value = "")]
        image_url: String,
    },
    /// Add one unit to a product already in the cart
    Increment {
        /// Product identifier
        id: String,
    },
    /// Remove one unit of a product, dropping it at zero
    Decrement {
        /// Product identifier
        id: String,
    },
}

/// Runs `command` against the cart in scope and returns the rendered cart.
pub async fn run<S: KeyValueStore + 'static>(
    command: Command,
    context: &CartContext<S>,
    json: bool,
) -> Result<String, CartError> {
    let cart = context.cart()?;

    let change = match command {
        Command::List => CartChange::Unchanged,
        Command::Add {
            id,
            title,
            price,
            image_url,
        } => {
            cart.add_to_cart(NewLineItem::new(id, title, image_url, price))
                .await?
        }
        Command::Increment { id } => cart.increment(&id).await?,
        Command::Decrement { id } => cart.decrement(&id).await?,
    };
    tracing::debug!(?change, "command applied");

    let products = cart.products()?;
    if json {
        Ok(products.to_json()?)
    } else {
        Ok(render(&products))
    }
}

/// Formats the cart as a plain-text table.
pub fn render(products: &CartSnapshot) -> String {
    if products.is_empty() {
        return "cart is empty\n".to_string();
    }

    let mut out = String::new();
    for item in products {
        let _ = writeln!(
            out,
            "{:<12} {:<24} {:>4} x {:>10.2} = {:>10.2}",
            item.id,
            item.title,
            item.quantity,
            item.price,
            item.line_total()
        );
    }
    let _ = writeln!(
        out,
        "{} item(s), subtotal {:.2}",
        products.total_quantity(),
        products.subtotal()
    );
    out
}
