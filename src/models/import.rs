use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::customer::{ContactFields, Customer, ParsedAddress};

/// One spreadsheet/JSON cell before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Number(f64),
    Text(String),
}

impl RawCell {
    /// Trimmed text form; whole numbers print without a fraction.
    pub fn as_text(&self) -> String {
        match self {
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RawCell::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }
}

/// Untyped import record as produced by spreadsheet parsing or sent by the UI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImportRow {
    pub name: Option<RawCell>,
    pub address: Option<RawCell>,
    #[serde(alias = "invoice_number")]
    pub invoice_number: Option<RawCell>,
    #[serde(alias = "date", alias = "invoice_date")]
    pub invoice_date: Option<RawCell>,
    #[serde(alias = "net", alias = "net_amount")]
    pub net_amount: Option<RawCell>,
    #[serde(alias = "gross", alias = "gross_amount")]
    pub gross_amount: Option<RawCell>,
    pub email: Option<RawCell>,
    pub phone: Option<RawCell>,
    pub country: Option<RawCell>,
    #[serde(alias = "vat_id")]
    pub vat_id: Option<RawCell>,
    #[serde(default)]
    pub items: Vec<RawLineItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    pub description: Option<String>,
    pub quantity: Option<RawCell>,
    pub unit_price: Option<RawCell>,
    pub total: Option<RawCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLineItem {
    pub description: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub total: BigDecimal,
}

/// Validated import row. `invoice_number` and `customer_name` are non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub row_number: usize,
    pub customer_name: String,
    pub address: Option<ParsedAddress>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub vat_id: Option<String>,
    pub invoice_number: String,
    /// None until a date could be parsed or derived
    pub invoice_date: Option<NaiveDate>,
    pub net_amount: BigDecimal,
    pub gross_amount: BigDecimal,
    pub items: Vec<NormalizedLineItem>,
}

impl NormalizedRow {
    pub fn city(&self) -> Option<&str> {
        self.address
            .as_ref()
            .map(|a| a.location.as_str())
            .filter(|l| !l.is_empty() && *l != crate::service::address::UNKNOWN_LOCATION)
    }

    pub fn street(&self) -> Option<&str> {
        self.address
            .as_ref()
            .map(|a| a.street.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn contact_fields(&self) -> ContactFields {
        let address = self.address.as_ref();
        ContactFields {
            address: self.street().map(str::to_string),
            postal_code: address
                .map(|a| a.postal_code.clone())
                .filter(|p| !p.is_empty()),
            city: self.city().map(str::to_string),
            country: self
                .country
                .clone()
                .or_else(|| address.and_then(|a| a.country.clone())),
            email: self.email.clone(),
            phone: self.phone.clone(),
            vat_id: self.vat_id.clone(),
        }
    }
}

/// Row that failed the strict parse step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub row_number: usize,
    pub invoice_number: String,
    pub customer_name: String,
    pub missing_field: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DuplicateInvoiceNumber,
    CustomerAmbiguous,
    MissingData,
}

/// Reporting artifact for a row that needs human attention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub invoice_number: String,
    pub customer_name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ImportWarning {
    pub fn duplicate(invoice_number: &str, customer_name: &str, existing_id: i64) -> Self {
        Self {
            kind: WarningKind::DuplicateInvoiceNumber,
            invoice_number: invoice_number.to_string(),
            customer_name: customer_name.to_string(),
            message: format!("Rechnungsnummer {} existiert bereits", invoice_number),
            details: Some(json!({ "existingInvoiceId": existing_id })),
        }
    }

    pub fn ambiguous(
        invoice_number: &str,
        customer_name: &str,
        candidates: &[Customer],
        chosen: Option<&Customer>,
    ) -> Self {
        let list: Vec<Value> = candidates
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "name": c.name,
                    "address": c.address,
                    "postalCode": c.postal_code,
                    "city": c.city,
                })
            })
            .collect();
        let message = match chosen {
            Some(c) => format!(
                "{} Kunden mit dem Namen \"{}\" gefunden, Rechnung wurde Kunde #{} zugeordnet",
                candidates.len(),
                customer_name,
                c.id
            ),
            None => format!(
                "{} Kunden mit dem Namen \"{}\" gefunden, Rechnung nicht zugeordnet",
                candidates.len(),
                customer_name
            ),
        };
        Self {
            kind: WarningKind::CustomerAmbiguous,
            invoice_number: invoice_number.to_string(),
            customer_name: customer_name.to_string(),
            message,
            details: Some(json!({
                "candidates": list,
                "chosenCustomerId": chosen.map(|c| c.id),
            })),
        }
    }

    pub fn missing_data(
        invoice_number: &str,
        customer_name: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: WarningKind::MissingData,
            invoice_number: invoice_number.to_string(),
            customer_name: customer_name.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Aggregate outcome of one import invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<ImportWarning>,
}

impl ImportResult {
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &ImportWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// What to do with a row whose invoice number already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// count as skipped
    #[default]
    Skip,
    /// keep existing data, report a duplicate warning
    Warn,
}

/// What to do when several customers share a name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    #[default]
    FirstCandidate,
    Reject,
}

/// Audit record written once per batch (`import_logs`)
#[derive(Debug, Clone, Serialize)]
pub struct NewImportLog {
    pub import_type: String,
    pub file_name: Option<String>,
    pub total_rows: i64,
    pub successful: i64,
    pub failed: i64,
    pub skipped: i64,
    pub errors: Vec<String>,
    pub warnings: Vec<ImportWarning>,
}

impl NewImportLog {
    pub fn from_result(import_type: &str, file_name: Option<&str>, result: &ImportResult) -> Self {
        Self {
            import_type: import_type.to_string(),
            file_name: file_name.map(str::to_string),
            total_rows: result.processed as i64,
            successful: result.successful as i64,
            failed: result.failed as i64,
            skipped: result.skipped as i64,
            errors: result.errors.clone(),
            warnings: result.warnings.clone(),
        }
    }
}
