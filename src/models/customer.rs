use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Customer row (`customers`)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub vat_id: Option<String>,
    /// Sum over paid invoices, maintained by `recalculate_customer_totals`
    pub total_spent: BigDecimal,
    /// Count of paid invoices, maintained alongside `total_spent`
    pub total_orders: i64,
    pub created_at: DateTime<Utc>,
}

/// Optional contact/location fields shared by inserts and back-fills
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFields {
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub vat_id: Option<String>,
}

/// Insert payload for a customer
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub contact: ContactFields,
}

/// Street / postal code / locality split out of one free-text address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAddress {
    pub raw: String,
    pub street: String,
    pub postal_code: String,
    pub location: String,
    pub country: Option<String>,
}

/// Recomputed aggregate fields
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTotals {
    pub customer_id: i64,
    pub total_spent: BigDecimal,
    pub total_orders: i64,
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map_or(true, str::is_empty)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ContactFields {
    pub fn is_empty(&self) -> bool {
        is_blank(&self.address)
            && is_blank(&self.postal_code)
            && is_blank(&self.city)
            && is_blank(&self.country)
            && is_blank(&self.email)
            && is_blank(&self.phone)
            && is_blank(&self.vat_id)
    }

    /// True when there is something to locate the customer by.
    pub fn has_location(&self) -> bool {
        !is_blank(&self.address) || !is_blank(&self.city)
    }
}

impl Customer {
    /// Fields of `incoming` that would fill an empty slot on this customer.
    /// Populated fields are never part of the result.
    pub fn backfill_from(&self, incoming: &ContactFields) -> ContactFields {
        fn fill(existing: &Option<String>, incoming: &Option<String>) -> Option<String> {
            if is_blank(existing) {
                non_blank(incoming)
            } else {
                None
            }
        }

        ContactFields {
            address: fill(&self.address, &incoming.address),
            postal_code: fill(&self.postal_code, &incoming.postal_code),
            city: fill(&self.city, &incoming.city),
            country: fill(&self.country, &incoming.country),
            email: fill(&self.email, &incoming.email),
            phone: fill(&self.phone, &incoming.phone),
            vat_id: fill(&self.vat_id, &incoming.vat_id),
        }
    }

    pub fn city_matches(&self, city: &str) -> bool {
        self.city
            .as_deref()
            .map_or(false, |c| c.trim().to_lowercase() == city.trim().to_lowercase())
    }

    pub fn address_contains(&self, fragment: &str) -> bool {
        let fragment = fragment.trim().to_lowercase();
        if fragment.is_empty() {
            return false;
        }
        self.address
            .as_deref()
            .map_or(false, |a| a.to_lowercase().contains(&fragment))
    }
}
