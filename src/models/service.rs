use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{clamp_price, coerce_price, CatalogError, PriceUnit};

/// A purchasable laundry service, normalized from the catalog's wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub price_unit: PriceUnit,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// A service record exactly as the catalog backend sends it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawService {
    #[serde(rename = "_id", default)]
    pub mongo_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Value,
    #[serde(rename = "priceType", default)]
    pub price_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Envelope returned by `GET /service/avaliable`
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub services: Vec<Value>,
}

/// Filters applied to the catalog listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceFilters {
    pub category: Option<String>,
    pub search_term: Option<String>,
    pub price_unit: Option<PriceUnit>,
}

impl TryFrom<RawService> for Service {
    type Error = CatalogError;

    fn try_from(raw: RawService) -> Result<Self, Self::Error> {
        let name = raw.name.unwrap_or_default().trim().to_string();

        let id = raw
            .mongo_id
            .or(raw.id)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CatalogError::MissingIdentifier { name: name.clone() })?;

        let price_unit = raw
            .price_type
            .map(|label| label.parse::<PriceUnit>().unwrap_or_default())
            .unwrap_or_default();

        Ok(Service {
            id,
            name,
            price: coerce_price(&raw.price),
            price_unit,
            category: raw.category.filter(|c| !c.trim().is_empty()),
            description: raw.description,
        })
    }
}

impl Service {
    /// Build a service directly, applying the same price coercion as the catalog boundary
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price: clamp_price(price),
            price_unit: PriceUnit::default(),
            category: None,
            description: None,
        }
    }

    pub fn with_price_unit(mut self, price_unit: PriceUnit) -> Self {
        self.price_unit = price_unit;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Check whether this service passes the given listing filters
    pub fn matches_filters(&self, filters: &ServiceFilters) -> bool {
        if let Some(ref category) = filters.category {
            let wanted = category.trim();
            if !wanted.is_empty() && !wanted.eq_ignore_ascii_case("all") {
                match self.category {
                    Some(ref own) if own.eq_ignore_ascii_case(wanted) => {}
                    _ => return false,
                }
            }
        }

        if let Some(ref price_unit) = filters.price_unit {
            if &self.price_unit != price_unit {
                return false;
            }
        }

        if let Some(ref search_term) = filters.search_term {
            let term = search_term.trim().to_lowercase();
            if !term.is_empty() {
                let haystacks = [
                    Some(self.name.as_str()),
                    self.description.as_deref(),
                    self.category.as_deref(),
                ];
                let found = haystacks
                    .iter()
                    .flatten()
                    .any(|text| text.to_lowercase().contains(&term));
                if !found {
                    return false;
                }
            }
        }

        true
    }
}
