use serde::{Deserialize, Serialize};

use super::CartLine;

/// One-shot notifications emitted after each cart mutation.
///
/// These are fire-and-forget: they are not persisted and are lost if nobody
/// is subscribed when they are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded {
        line_id: String,
        service_id: String,
        name: String,
        added: u32,
        quantity: u32,
        merged: bool,
    },
    QuantityChanged {
        line_id: String,
        previous: u32,
        quantity: u32,
    },
    ItemRemoved {
        line_id: String,
        service_id: String,
        name: String,
    },
    Cleared {
        removed_lines: usize,
    },
}

impl CartEvent {
    pub fn item_removed(line: &CartLine) -> Self {
        CartEvent::ItemRemoved {
            line_id: line.line_id.clone(),
            service_id: line.service_id.clone(),
            name: line.name.clone(),
        }
    }

    /// Short user-facing message, the kind a toast would show
    pub fn message(&self) -> String {
        match self {
            CartEvent::ItemAdded { name, .. } => format!("{} added to cart", name),
            CartEvent::QuantityChanged { quantity, .. } => {
                format!("Quantity updated to {}", quantity)
            }
            CartEvent::ItemRemoved { name, .. } => format!("{} removed from cart", name),
            CartEvent::Cleared { .. } => "Cart cleared".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded { .. } => "add_item",
            CartEvent::QuantityChanged { .. } => "set_quantity",
            CartEvent::ItemRemoved { .. } => "remove_item",
            CartEvent::Cleared { .. } => "clear",
        }
    }
}
