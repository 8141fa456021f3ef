use bigdecimal::BigDecimal;
use std::sync::Arc;

use super::normalize::round_money;
use super::report::truncated;
use crate::config::{ImportConfig, ReportConfig};
use crate::db::ReconcileStore;
use crate::error::Result;
use crate::models::{InvoiceTaxView, VatCorrection, VatCorrectionResult, VatTreatment};

const EU_MEMBERS: [&str; 27] = [
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU", "IE",
    "IT", "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK",
];

/// Country names seen in customer data, mapped to ISO codes
const COUNTRY_NAMES: [(&str, &str); 22] = [
    ("deutschland", "DE"),
    ("germany", "DE"),
    ("österreich", "AT"),
    ("austria", "AT"),
    ("schweiz", "CH"),
    ("switzerland", "CH"),
    ("niederlande", "NL"),
    ("netherlands", "NL"),
    ("belgien", "BE"),
    ("belgium", "BE"),
    ("frankreich", "FR"),
    ("france", "FR"),
    ("italien", "IT"),
    ("italy", "IT"),
    ("luxemburg", "LU"),
    ("dänemark", "DK"),
    ("polen", "PL"),
    ("spanien", "ES"),
    ("tschechien", "CZ"),
    ("großbritannien", "GB"),
    ("vereinigtes königreich", "GB"),
    ("norwegen", "NO"),
];

/// ISO 3166 alpha-2 code for a stored country value.
/// Blank or unrecognised names yield None.
pub fn country_code(raw: Option<&str>) -> Option<String> {
    let value = raw.map(str::trim).filter(|v| !v.is_empty())?;
    if value.len() == 2 && value.chars().all(|c| c.is_ascii_alphabetic()) {
        let code = value.to_ascii_uppercase();
        // GR is the ISO code, VAT ids use EL
        return Some(if code == "EL" { "GR".to_string() } else { code });
    }
    let lower = value.to_lowercase();
    COUNTRY_NAMES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, code)| code.to_string())
}

pub fn is_eu_member(code: &str) -> bool {
    EU_MEMBERS.contains(&code)
}

/// Jurisdiction rules for the home country
#[derive(Debug, Clone)]
pub struct VatRules {
    pub home_country: String,
    pub standard_rate: u32,
}

impl VatRules {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            home_country: config.home_country.to_ascii_uppercase(),
            standard_rate: config.default_tax_rate,
        }
    }

    /// Treatment and rate for a customer location. Unknown country counts as domestic.
    pub fn classify(&self, country: Option<&str>, vat_id: Option<&str>) -> (VatTreatment, u32) {
        let has_vat_id = vat_id.map_or(false, |v| !v.trim().is_empty());
        match country_code(country) {
            None => (VatTreatment::Domestic, self.standard_rate),
            Some(code) if code == self.home_country => (VatTreatment::Domestic, self.standard_rate),
            Some(code) if is_eu_member(&code) && has_vat_id => (VatTreatment::ReverseCharge, 0),
            Some(code) if is_eu_member(&code) => (VatTreatment::Domestic, self.standard_rate),
            Some(_) => (VatTreatment::Export, 0),
        }
    }

    /// Correction for one stored invoice, None when its rate is already right.
    pub fn correction_for(&self, view: &InvoiceTaxView) -> Option<VatCorrection> {
        let (treatment, rate) = self.classify(view.country.as_deref(), view.vat_id.as_deref());
        let new_rate = BigDecimal::from(rate as i64);
        if view.tax_rate == new_rate {
            return None;
        }
        let tax = round_money(&(&view.subtotal * &new_rate / BigDecimal::from(100i64)));
        let new_total = round_money(&(&view.subtotal + &tax));
        Some(VatCorrection {
            invoice_id: view.invoice_id,
            invoice_number: view.invoice_number.clone(),
            customer_name: view.customer_name.clone(),
            treatment,
            old_rate: view.tax_rate.clone(),
            new_rate,
            old_total: view.total_amount.clone(),
            new_total,
        })
    }
}

/// Later-run pass that fixes the placeholder rates written by the importer
pub struct VatCorrector {
    store: Arc<dyn ReconcileStore>,
    rules: VatRules,
}

impl VatCorrector {
    pub fn new(store: Arc<dyn ReconcileStore>, rules: VatRules) -> Self {
        Self { store, rules }
    }

    pub async fn run(&self, dry_run: bool, limits: &ReportConfig) -> Result<VatCorrectionResult> {
        let views = self.store.list_invoice_tax_views().await?;
        tracing::info!(
            "VAT correction started: {} invoices, home {}, dry_run={}",
            views.len(),
            self.rules.home_country,
            dry_run
        );

        let mut result = VatCorrectionResult {
            dry_run,
            checked: views.len(),
            ..Default::default()
        };
        let mut corrections = Vec::new();

        for view in &views {
            let Some(correction) = self.rules.correction_for(view) else {
                continue;
            };
            if !dry_run {
                let tax = &correction.new_total - &view.subtotal;
                if let Err(e) = self
                    .store
                    .update_invoice_tax(
                        view.invoice_id,
                        &correction.new_rate,
                        &tax,
                        &correction.new_total,
                    )
                    .await
                {
                    tracing::warn!("VAT correction of {} failed: {}", view.invoice_number, e);
                    result.failed += 1;
                    result
                        .errors
                        .push(format!("Rechnung {}: {}", view.invoice_number, e.row_detail()));
                    continue;
                }
            }
            corrections.push(correction);
        }

        result.corrected = corrections.len();
        result.corrections = truncated(&corrections, limits.max_warnings);
        result.errors = truncated(&result.errors, limits.max_errors);
        result.success = result.failed == 0;

        // totals changed, customer aggregates follow
        if !dry_run && result.corrected > 0 {
            let mut customers: Vec<i64> = views.iter().map(|v| v.customer_id).collect();
            customers.sort_unstable();
            customers.dedup();
            for id in customers {
                if let Err(e) = self.store.recalculate_customer_totals(id).await {
                    tracing::error!("Failed to recalculate totals for customer {}: {}", id, e);
                }
            }
        }

        tracing::info!(
            "VAT correction finished: checked {}, corrected {}, failed {}",
            result.checked,
            result.corrected,
            result.failed
        );
        Ok(result)
    }
}
