use config::{Config, File};
use indexmap::IndexSet;
use std::sync::Arc;

use crate::db::ReconcileStore;
use crate::error::{AppError, Result};
use crate::models::{CorrectionTable, Customer, NewCustomer, ReassignResult, TargetCustomer};

/// Load a correction table from a JSON or TOML file (format by extension).
/// Keys are snake_case: `source_customer`, `invoice_numbers`, `postal_code`.
pub fn load_correction_table(path: &str) -> Result<CorrectionTable> {
    let table = Config::builder()
        .add_source(File::with_name(path))
        .build()?
        .try_deserialize::<CorrectionTable>()?;
    validate(&table)?;
    Ok(table)
}

fn validate(table: &CorrectionTable) -> Result<()> {
    if table.source_customer.trim().is_empty() {
        return Err(AppError::InvalidInput("source_customer fehlt".to_string()));
    }
    if table.corrections.is_empty() {
        return Err(AppError::InvalidInput("Korrekturtabelle ist leer".to_string()));
    }
    if let Some(entry) = table
        .corrections
        .iter()
        .find(|e| e.target.name.trim().is_empty() || e.target.city.trim().is_empty())
    {
        return Err(AppError::InvalidInput(format!(
            "Zielkunde ohne Name oder Ort: \"{}\"",
            entry.target.name
        )));
    }
    Ok(())
}

/// Splits an over-merged customer into location-specific customers
/// and re-points historical invoices accordingly.
pub struct Reassigner {
    store: Arc<dyn ReconcileStore>,
}

impl Reassigner {
    pub fn new(store: Arc<dyn ReconcileStore>) -> Self {
        Self { store }
    }

    /// Load a correction table from disk and apply it
    pub async fn apply_file(&self, path: &str) -> Result<ReassignResult> {
        let table = load_correction_table(path)?;
        tracing::info!(
            "Loaded correction table {}: {} targets for \"{}\"",
            path,
            table.corrections.len(),
            table.source_customer
        );
        self.apply(&table).await
    }

    pub async fn apply(&self, table: &CorrectionTable) -> Result<ReassignResult> {
        validate(table)?;
        self.store.ping().await?;

        let mut result = ReassignResult::default();
        let mut affected: IndexSet<i64> = IndexSet::new();

        for source in self.store.find_customers_by_name(&table.source_customer).await? {
            affected.insert(source.id);
        }
        if affected.is_empty() {
            tracing::warn!("Source customer \"{}\" not found", table.source_customer);
        }

        for entry in &table.corrections {
            let target = match self.ensure_target(&entry.target, &mut result).await {
                Ok(target) => target,
                Err(e) => {
                    tracing::error!("Target customer \"{}\" failed: {}", entry.target.name, e);
                    result.errors.push(format!(
                        "Kunde {} ({}): {}",
                        entry.target.name, entry.target.city, e
                    ));
                    continue;
                }
            };
            affected.insert(target.id);

            for number in &entry.invoice_numbers {
                let number = number.trim();
                match self.move_invoice(number, &target).await {
                    Ok(Some(previous)) if previous == target.id => result.unchanged += 1,
                    Ok(Some(previous)) => {
                        affected.insert(previous);
                        result.moved += 1;
                    }
                    Ok(None) => {
                        tracing::warn!("Invoice {} not found", number);
                        result.missing.push(number.to_string());
                    }
                    Err(e) => result
                        .errors
                        .push(format!("Rechnung {}: {}", number, e.row_detail())),
                }
            }
        }

        for &customer_id in &affected {
            match self.store.recalculate_customer_totals(customer_id).await {
                Ok(_) => result.customers_recalculated += 1,
                Err(e) => result
                    .errors
                    .push(format!("Kunde #{}: Summen nicht aktualisiert: {}", customer_id, e)),
            }
        }

        result.success = result.errors.is_empty();
        tracing::info!(
            "Reassignment of \"{}\": moved {}, unchanged {}, missing {}, created {}, errors {}",
            table.source_customer,
            result.moved,
            result.unchanged,
            result.missing.len(),
            result.customers_created,
            result.errors.len()
        );
        Ok(result)
    }

    /// Existing customer with the same name and city (back-filled), or a new one.
    async fn ensure_target(
        &self,
        target: &TargetCustomer,
        result: &mut ReassignResult,
    ) -> Result<Customer> {
        let existing = self
            .store
            .find_customers_by_name(&target.name)
            .await?
            .into_iter()
            .find(|c| c.city_matches(&target.city));

        let contact = target.contact_fields();
        if let Some(customer) = existing {
            let patch = customer.backfill_from(&contact);
            if !patch.is_empty() {
                self.store.backfill_customer(customer.id, &patch).await?;
            }
            return Ok(customer);
        }

        let created = self
            .store
            .create_customer(&NewCustomer {
                name: target.name.trim().to_string(),
                contact,
            })
            .await?;
        tracing::info!("Created customer {} ({}, {})", created.id, created.name, target.city);
        result.customers_created += 1;
        Ok(created)
    }

    /// Previous owner of the invoice, or None when the number is unknown.
    async fn move_invoice(&self, invoice_number: &str, target: &Customer) -> Result<Option<i64>> {
        let Some(invoice) = self.store.find_invoice_by_number(invoice_number).await? else {
            return Ok(None);
        };
        if invoice.customer_id != target.id {
            self.store.reassign_invoice(invoice.id, target.id).await?;
            tracing::debug!(
                "Invoice {} moved from customer {} to {}",
                invoice_number,
                invoice.customer_id,
                target.id
            );
        }
        Ok(Some(invoice.customer_id))
    }

    /// Recompute aggregates for every customer; returns how many were updated.
    pub async fn recalculate_all_totals(&self) -> Result<usize> {
        let ids = self.store.list_customer_ids().await?;
        let mut updated = 0;
        for id in ids {
            match self.store.recalculate_customer_totals(id).await {
                Ok(_) => updated += 1,
                Err(e) => {
                    tracing::error!("Failed to recalculate totals for customer {}: {}", id, e)
                }
            }
        }
        tracing::info!("Recalculated totals for {} customers", updated);
        Ok(updated)
    }
}
