use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invoice row (`invoices`), keyed naturally by `invoice_number`
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub invoice_date: Option<NaiveDate>,
    pub status: String,
    pub subtotal: BigDecimal,
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
}

/// Line item row (`invoice_items`), deleted with its invoice
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub customer_id: i64,
    pub invoice_date: Option<NaiveDate>,
    pub status: String,
    pub subtotal: BigDecimal,
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
}

/// Invoice joined with the location/tax fields of its customer
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTaxView {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub customer_name: String,
    pub country: Option<String>,
    pub vat_id: Option<String>,
    pub subtotal: BigDecimal,
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
}
