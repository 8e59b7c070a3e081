use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::str::FromStr;

/// Smallest quantity a cart line can hold
pub const MIN_LINE_QUANTITY: u32 = 1;

/// Quantity used when a caller supplies nothing usable
pub const DEFAULT_QUANTITY: u32 = 1;

/// Largest unit price a service or cart line can carry. With quantities capped
/// at `u32::MAX` this keeps every line total and cart total representable.
pub const MAX_PRICE: Decimal = dec!(1000000000);

/// Coerce an untrusted catalog price into a non-negative decimal.
///
/// Anything that is not a finite number in `0..=MAX_PRICE` (or a string
/// holding one) degrades to zero instead of raising an error.
pub fn coerce_price(value: &Value) -> Decimal {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()).or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };

    parsed.map(clamp_price).unwrap_or(Decimal::ZERO)
}

/// Apply the price bounds to an already-parsed amount
pub fn clamp_price(price: Decimal) -> Decimal {
    if price.is_sign_negative() || price > MAX_PRICE {
        Decimal::ZERO
    } else {
        price.normalize()
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Quantity requested by an add: non-positive values fall back to the default.
pub fn normalize_add_quantity(quantity: i64) -> u32 {
    if quantity < i64::from(MIN_LINE_QUANTITY) {
        DEFAULT_QUANTITY
    } else {
        u32::try_from(quantity).unwrap_or(u32::MAX)
    }
}

/// Quantity requested by a set: `None` when the value is below the floor and
/// the update must be ignored.
pub fn accept_set_quantity(quantity: i64) -> Option<u32> {
    if quantity < i64::from(MIN_LINE_QUANTITY) {
        None
    } else {
        Some(u32::try_from(quantity).unwrap_or(u32::MAX))
    }
}
