use serde::{Deserialize, Serialize};

use super::customer::ContactFields;

/// Externally supplied table splitting one over-merged customer
/// into location-specific customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionTable {
    /// Name of the customer the invoices are currently attached to
    #[serde(alias = "source_customer")]
    pub source_customer: String,
    pub corrections: Vec<CorrectionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionEntry {
    pub target: TargetCustomer,
    #[serde(alias = "invoice_numbers")]
    pub invoice_numbers: Vec<String>,
}

/// Corrected entity with its canonical address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCustomer {
    pub name: String,
    pub address: Option<String>,
    #[serde(alias = "postal_code")]
    pub postal_code: Option<String>,
    pub city: String,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl TargetCustomer {
    pub fn contact_fields(&self) -> ContactFields {
        ContactFields {
            address: self.address.clone(),
            postal_code: self.postal_code.clone(),
            city: Some(self.city.clone()),
            country: self.country.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            vat_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignResult {
    pub success: bool,
    pub moved: usize,
    pub unchanged: usize,
    pub missing: Vec<String>,
    pub customers_created: usize,
    pub customers_recalculated: usize,
    pub errors: Vec<String>,
}
