use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{coerce_price, PriceUnit, Service, DEFAULT_QUANTITY, MIN_LINE_QUANTITY};

/// One row of the cart: a snapshot of a service plus a quantity.
///
/// Serializes to the persisted shape
/// `{ id, serviceId, name, price, priceType, quantity, totalPrice, category, specifications }`.
/// `totalPrice` is derived on write and ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "StoredCartLine", try_from = "StoredCartLine")]
pub struct CartLine {
    pub line_id: String,
    pub service_id: String,
    pub name: String,
    pub price: Decimal,
    pub price_unit: PriceUnit,
    pub category: Option<String>,
    pub specifications: Value,
    quantity: u32,
}

/// The cart aggregate. Lines keep insertion order; at most one line exists
/// per service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<CartLine>", from = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

/// Read-only snapshot handed to the presentation layer and to checkout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub line_count: usize,
    pub item_count: u64,
    pub total: Decimal,
    pub formatted_total: String,
    pub is_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCartLine {
    #[serde(default)]
    id: String,
    #[serde(default)]
    service_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    price: Value,
    #[serde(rename = "priceType", default)]
    price_type: PriceUnit,
    #[serde(default)]
    quantity: Value,
    #[serde(default)]
    total_price: Value,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    specifications: Value,
}

impl From<CartLine> for StoredCartLine {
    fn from(line: CartLine) -> Self {
        let total = line.line_total();
        StoredCartLine {
            id: line.line_id,
            service_id: line.service_id,
            name: line.name,
            price: Value::String(line.price.to_string()),
            price_type: line.price_unit,
            quantity: Value::from(line.quantity),
            total_price: Value::String(total.to_string()),
            category: line.category,
            specifications: line.specifications,
        }
    }
}

impl TryFrom<StoredCartLine> for CartLine {
    type Error = String;

    fn try_from(stored: StoredCartLine) -> Result<Self, Self::Error> {
        if stored.service_id.trim().is_empty() {
            return Err(format!("cart line '{}' has no serviceId", stored.id));
        }

        let line_id = if stored.id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            stored.id
        };

        Ok(CartLine {
            line_id,
            service_id: stored.service_id,
            name: stored.name,
            price: coerce_price(&stored.price),
            price_unit: stored.price_type,
            category: stored.category,
            specifications: stored.specifications,
            quantity: coerce_stored_quantity(&stored.quantity),
        })
    }
}

fn coerce_stored_quantity(value: &Value) -> u32 {
    let raw = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match raw {
        Some(q) if q >= u64::from(MIN_LINE_QUANTITY) => u32::try_from(q).unwrap_or(u32::MAX),
        _ => DEFAULT_QUANTITY,
    }
}

impl CartLine {
    /// Snapshot a service into a brand new line
    pub fn from_service(service: &Service, quantity: u32) -> Self {
        Self {
            line_id: Uuid::new_v4().to_string(),
            service_id: service.id.clone(),
            name: service.name.clone(),
            price: service.price,
            price_unit: service.price_unit.clone(),
            category: service.category.clone(),
            specifications: Value::Null,
            quantity: quantity.max(MIN_LINE_QUANTITY),
        }
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `price * quantity`, computed from current state on every call.
    /// Saturates at `Decimal::MAX` rather than overflowing.
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }

    fn increase_quantity(&mut self, by: u32) {
        self.quantity = self.quantity.saturating_add(by);
    }
}

impl Cart {
    /// Create an empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from previously stored lines, restoring the invariants:
    /// quantities are at least one and each service appears once (the first
    /// stored line keeps its snapshot and absorbs the later quantities).
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Cart::new();
        for mut line in lines {
            line.quantity = line.quantity.max(MIN_LINE_QUANTITY);
            match cart
                .lines
                .iter_mut()
                .find(|existing| existing.service_id == line.service_id)
            {
                Some(existing) => existing.increase_quantity(line.quantity),
                None => cart.lines.push(line),
            }
        }
        cart
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get_line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.line_id == line_id)
    }

    pub fn find_by_service(&self, service_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.service_id == service_id)
    }

    /// Add a service, merging into the existing line for that service if
    /// there is one. Snapshot fields of an existing line are never refreshed.
    pub fn add_service(&mut self, service: &Service, quantity: u32) -> &CartLine {
        let quantity = quantity.max(MIN_LINE_QUANTITY);
        let index = match self
            .lines
            .iter()
            .position(|line| line.service_id == service.id)
        {
            Some(index) => {
                self.lines[index].increase_quantity(quantity);
                index
            }
            None => {
                self.lines.push(CartLine::from_service(service, quantity));
                self.lines.len() - 1
            }
        };
        &self.lines[index]
    }

    /// Set a line's quantity. Returns false (and changes nothing) when the
    /// line does not exist or the quantity is below the floor.
    pub fn set_quantity(&mut self, line_id: &str, quantity: u32) -> bool {
        if quantity < MIN_LINE_QUANTITY {
            return false;
        }
        match self.lines.iter_mut().find(|line| line.line_id == line_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line, returning it if it was present
    pub fn remove_line(&mut self, line_id: &str) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| line.line_id == line_id)?;
        Some(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Exact sum of all line totals
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Sum of quantities across all lines
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// The total rounded once, at read time, to two decimal places
    pub fn formatted_total(&self) -> String {
        format_amount(self.total())
    }

    pub fn summary(&self) -> CartSummary {
        let total = self.total();
        CartSummary {
            lines: self.lines.clone(),
            line_count: self.lines.len(),
            item_count: self.item_count(),
            total,
            formatted_total: format_amount(total),
            is_empty: self.lines.is_empty(),
        }
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Cart::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

/// Render an amount with exactly two decimals, rounding half away from zero
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}
