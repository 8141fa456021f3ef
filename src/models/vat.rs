use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Why a rate applies to an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatTreatment {
    Domestic,
    ReverseCharge,
    Export,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatCorrection {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub customer_name: String,
    pub treatment: VatTreatment,
    pub old_rate: BigDecimal,
    pub new_rate: BigDecimal,
    pub old_total: BigDecimal,
    pub new_total: BigDecimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatCorrectionResult {
    pub success: bool,
    pub dry_run: bool,
    pub checked: usize,
    pub corrected: usize,
    pub failed: usize,
    /// truncated for display, `corrected` stays exact
    pub corrections: Vec<VatCorrection>,
    pub errors: Vec<String>,
}
