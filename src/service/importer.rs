use bigdecimal::{BigDecimal, One, ToPrimitive, Zero};
use indexmap::IndexSet;
use std::sync::Arc;

use super::normalize::{normalize_row, round_money};
use super::report::{self, RowOutcome, RowReport};
use super::resolver::{assign_customer, CustomerAssignment, CustomerQuery};
use crate::config::ImportConfig;
use crate::db::ReconcileStore;
use crate::error::{AppError, Result};
use crate::models::{
    AmbiguityPolicy, DuplicatePolicy, ImportResult, ImportWarning, NewImportLog, NewInvoice,
    NewInvoiceItem, NormalizedRow, RawImportRow, RowRejection,
};

/// Per-invocation settings
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub import_type: String,
    pub file_name: Option<String>,
    pub target_year: Option<i32>,
    pub duplicate_policy: DuplicatePolicy,
    pub ambiguity_policy: AmbiguityPolicy,
    pub default_tax_rate: u32,
    pub invoice_status: String,
    pub max_errors_logged: usize,
}

impl ImportOptions {
    pub fn from_config(import_type: &str, config: &ImportConfig) -> Self {
        Self {
            import_type: import_type.to_string(),
            file_name: None,
            target_year: None,
            duplicate_policy: config.duplicate_policy,
            ambiguity_policy: config.ambiguity_policy,
            default_tax_rate: config.default_tax_rate,
            invoice_status: config.invoice_status.clone(),
            max_errors_logged: 20,
        }
    }
}

/// Subtotal/tax/total of one invoice; `subtotal + tax_amount == total_amount`
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceAmounts {
    pub subtotal: BigDecimal,
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub missing: bool,
}

/// `round(tax / subtotal * 100)` for a positive subtotal, else the default
pub fn derive_tax_rate(subtotal: &BigDecimal, tax_amount: &BigDecimal, default_rate: u32) -> i64 {
    if *subtotal <= BigDecimal::zero() {
        return default_rate as i64;
    }
    match (tax_amount.to_f64(), subtotal.to_f64()) {
        (Some(tax), Some(sub)) if sub > 0.0 => (tax / sub * 100.0).round() as i64,
        _ => default_rate as i64,
    }
}

/// Fill in whichever of net/gross is missing using the default rate.
pub fn derive_amounts(net: &BigDecimal, gross: &BigDecimal, default_rate: u32) -> InvoiceAmounts {
    let factor = BigDecimal::from(100 + default_rate as i64) / BigDecimal::from(100i64);
    let default = BigDecimal::from(default_rate as i64);

    let (subtotal, total_amount, tax_rate, missing) = match (net.is_zero(), gross.is_zero()) {
        (false, false) => {
            let rate = derive_tax_rate(net, &(gross - net), default_rate);
            (net.clone(), gross.clone(), BigDecimal::from(rate), false)
        }
        (false, true) => (net.clone(), round_money(&(net * &factor)), default, false),
        (true, false) => (round_money(&(gross / &factor)), gross.clone(), default, false),
        (true, true) => (BigDecimal::zero(), BigDecimal::zero(), default, true),
    };

    let subtotal = round_money(&subtotal);
    let total_amount = round_money(&total_amount);
    InvoiceAmounts {
        tax_amount: &total_amount - &subtotal,
        subtotal,
        tax_rate,
        total_amount,
        missing,
    }
}

fn line_items(row: &NormalizedRow, amounts: &InvoiceAmounts) -> Vec<NewInvoiceItem> {
    if row.items.is_empty() {
        return vec![NewInvoiceItem {
            description: format!("Importierte Rechnung {}", row.invoice_number),
            quantity: BigDecimal::one(),
            unit_price: amounts.subtotal.clone(),
            total_price: amounts.subtotal.clone(),
        }];
    }
    row.items
        .iter()
        .map(|item| NewInvoiceItem {
            description: item.description.clone(),
            quantity: item.quantity.clone(),
            unit_price: item.unit_price.clone(),
            total_price: item.total.clone(),
        })
        .collect()
}

/// State owned by one batch invocation
struct BatchContext<'a> {
    store: &'a dyn ReconcileStore,
    options: &'a ImportOptions,
    touched_customers: IndexSet<i64>,
}

impl<'a> BatchContext<'a> {
    fn duplicate_outcome(&self) -> RowOutcome {
        match self.options.duplicate_policy {
            DuplicatePolicy::Skip => RowOutcome::Skipped,
            DuplicatePolicy::Warn => RowOutcome::Duplicate,
        }
    }

    async fn process_row(&mut self, row: &NormalizedRow) -> RowReport {
        let mut report = RowReport::new(row.row_number, &row.invoice_number);
        match self.try_process_row(row, &mut report).await {
            Ok(outcome) => report.finish(outcome),
            Err(e) => {
                tracing::warn!(
                    "Row {} (invoice {}) failed: {}",
                    row.row_number,
                    row.invoice_number,
                    e
                );
                let message = format!("Rechnung {}: {}", row.invoice_number, e.row_detail());
                report.finish(RowOutcome::Failed(message))
            }
        }
    }

    async fn try_process_row(
        &mut self,
        row: &NormalizedRow,
        report: &mut RowReport,
    ) -> Result<RowOutcome> {
        if let Some(existing) = self.store.find_invoice_by_number(&row.invoice_number).await? {
            report.warn(ImportWarning::duplicate(
                &row.invoice_number,
                &row.customer_name,
                existing.id,
            ));
            return Ok(self.duplicate_outcome());
        }

        let contact = row.contact_fields();
        let query = CustomerQuery {
            name: &row.customer_name,
            city: row.city(),
            street: row.street(),
        };
        let assignment =
            assign_customer(self.store, &query, &contact, self.options.ambiguity_policy).await?;

        let customer = match &assignment {
            CustomerAssignment::Matched(c) => c,
            CustomerAssignment::Created(c) => {
                if !contact.has_location() {
                    report.warn(ImportWarning::missing_data(
                        &row.invoice_number,
                        &row.customer_name,
                        format!(
                            "Neuer Kunde \"{}\" ohne Adresse und Ort angelegt",
                            row.customer_name
                        ),
                    ));
                }
                c
            }
            CustomerAssignment::Ambiguous { chosen, candidates } => {
                report.warn(ImportWarning::ambiguous(
                    &row.invoice_number,
                    &row.customer_name,
                    candidates,
                    Some(chosen),
                ));
                chosen
            }
            CustomerAssignment::Unassigned { candidates } => {
                report.warn(ImportWarning::ambiguous(
                    &row.invoice_number,
                    &row.customer_name,
                    candidates,
                    None,
                ));
                return Ok(RowOutcome::Skipped);
            }
        };

        if row.invoice_date.is_none() {
            report.warn(ImportWarning::missing_data(
                &row.invoice_number,
                &row.customer_name,
                "Rechnungsdatum fehlt und konnte nicht abgeleitet werden",
            ));
        }

        let amounts = derive_amounts(
            &row.net_amount,
            &row.gross_amount,
            self.options.default_tax_rate,
        );
        if amounts.missing {
            report.warn(ImportWarning::missing_data(
                &row.invoice_number,
                &row.customer_name,
                "Weder Netto- noch Bruttobetrag angegeben",
            ));
        }

        let invoice = NewInvoice {
            invoice_number: row.invoice_number.clone(),
            customer_id: customer.id,
            invoice_date: row.invoice_date,
            status: self.options.invoice_status.clone(),
            subtotal: amounts.subtotal.clone(),
            tax_rate: amounts.tax_rate.clone(),
            tax_amount: amounts.tax_amount.clone(),
            total_amount: amounts.total_amount.clone(),
        };
        let items = line_items(row, &amounts);

        let created = match self.store.create_invoice(&invoice, &items).await {
            Ok(created) => created,
            // written by someone else between our lookup and insert
            Err(e) if e.is_unique_violation() => {
                let existing_id = self
                    .store
                    .find_invoice_by_number(&row.invoice_number)
                    .await?
                    .map_or(0, |i| i.id);
                report.warn(ImportWarning::duplicate(
                    &row.invoice_number,
                    &row.customer_name,
                    existing_id,
                ));
                return Ok(self.duplicate_outcome());
            }
            Err(e) => return Err(e),
        };

        self.touched_customers.insert(customer.id);
        Ok(RowOutcome::Imported {
            invoice_id: created.id,
            customer_id: customer.id,
        })
    }
}

fn rejection_report(rejection: RowRejection) -> RowReport {
    let mut report = RowReport::new(rejection.row_number, &rejection.invoice_number);
    report.warn(ImportWarning::missing_data(
        &rejection.invoice_number,
        &rejection.customer_name,
        format!(
            "Zeile {}: Pflichtfeld {} fehlt, Zeile übersprungen",
            rejection.row_number, rejection.missing_field
        ),
    ));
    report.finish(RowOutcome::Skipped)
}

/// Batch import of historical invoices.
/// Rows are processed strictly in order; one failing row never aborts the batch.
pub struct InvoiceImporter {
    store: Arc<dyn ReconcileStore>,
}

impl InvoiceImporter {
    pub fn new(store: Arc<dyn ReconcileStore>) -> Self {
        Self { store }
    }

    pub async fn import(
        &self,
        rows: &[RawImportRow],
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        if rows.is_empty() {
            return Err(AppError::InvalidInput("Keine Zeilen zum Import übergeben".to_string()));
        }
        // fatal before the loop: nothing is written if the store is unreachable
        self.store.ping().await?;

        tracing::info!(
            "Import [{}] started: {} rows, duplicates={:?}, ambiguity={:?}",
            options.import_type,
            rows.len(),
            options.duplicate_policy,
            options.ambiguity_policy
        );

        let mut ctx = BatchContext {
            store: self.store.as_ref(),
            options,
            touched_customers: IndexSet::new(),
        };

        let total = rows.len();
        let mut reports = Vec::with_capacity(total);
        for (idx, raw) in rows.iter().enumerate() {
            let row_number = idx + 1;
            let report = match normalize_row(raw, row_number, options.target_year) {
                Ok(row) => ctx.process_row(&row).await,
                Err(rejection) => rejection_report(rejection),
            };
            reports.push(report);

            if row_number % 100 == 0 || row_number == 1 {
                tracing::info!(
                    "Import [{}] progress: {}/{}",
                    options.import_type,
                    row_number,
                    total
                );
            }
        }

        let touched = std::mem::take(&mut ctx.touched_customers);
        let result = report::aggregate(reports);

        self.refresh_totals(&touched).await;

        let log = NewImportLog::from_result(
            &options.import_type,
            options.file_name.as_deref(),
            &result,
        );
        if let Err(e) = self.store.insert_import_log(&log).await {
            tracing::error!("Failed to write import log for [{}]: {}", options.import_type, e);
        }

        report::log_summary(&options.import_type, &result, options.max_errors_logged);
        Ok(result)
    }

    async fn refresh_totals(&self, customer_ids: &IndexSet<i64>) {
        for &customer_id in customer_ids {
            if let Err(e) = self.store.recalculate_customer_totals(customer_id).await {
                tracing::error!("Failed to recalculate totals for customer {}: {}", customer_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{
        ContactFields, Customer, CustomerTotals, Invoice, InvoiceTaxView, NewCustomer, RawCell,
        WarningKind,
    };
    use async_trait::async_trait;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn raw(name: &str, number: &str, net: &str, gross: &str) -> RawImportRow {
        RawImportRow {
            name: Some(RawCell::from(name)),
            invoice_number: Some(RawCell::from(number)),
            net_amount: Some(RawCell::from(net)),
            gross_amount: Some(RawCell::from(gross)),
            ..Default::default()
        }
    }

    fn options() -> ImportOptions {
        ImportOptions::from_config("test", &ImportConfig::default())
    }

    #[test]
    fn tax_rate_from_net_and_gross() {
        let amounts = derive_amounts(&dec("850.00"), &dec("1011.50"), 19);
        assert_eq!(amounts.tax_rate, BigDecimal::from(19i64));
        assert_eq!(amounts.tax_amount, dec("161.50"));
        assert_eq!(&amounts.subtotal + &amounts.tax_amount, amounts.total_amount);

        let reduced = derive_amounts(&dec("100"), &dec("107"), 19);
        assert_eq!(reduced.tax_rate, BigDecimal::from(7i64));
    }

    #[test]
    fn missing_side_is_derived_with_default_rate() {
        let only_net = derive_amounts(&dec("100"), &BigDecimal::zero(), 19);
        assert_eq!(only_net.total_amount, dec("119.00"));
        assert_eq!(only_net.tax_amount, dec("19.00"));

        let only_gross = derive_amounts(&BigDecimal::zero(), &dec("119"), 19);
        assert_eq!(only_gross.subtotal, dec("100.00"));

        let none = derive_amounts(&BigDecimal::zero(), &BigDecimal::zero(), 19);
        assert!(none.missing);
        assert_eq!(none.tax_rate, BigDecimal::from(19i64));
    }

    #[test]
    fn non_positive_subtotal_uses_default_rate() {
        assert_eq!(derive_tax_rate(&BigDecimal::zero(), &dec("5"), 19), 19);
        assert_eq!(derive_tax_rate(&dec("-10"), &dec("-1.9"), 19), 19);
    }

    #[tokio::test]
    async fn duplicate_in_same_batch_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let importer = InvoiceImporter::new(store.clone());
        let rows = vec![
            raw("Eisdiele Sommer", "RE-100", "100", "119"),
            raw("Eisdiele Sommer", "RE-100", "100", "119"),
        ];
        let result = importer.import(&rows, &options()).await.unwrap();
        assert_eq!(result.successful, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(store.invoices().len(), 1);
        assert_eq!(result.warnings_of(WarningKind::DuplicateInvoiceNumber).count(), 1);
    }

    #[tokio::test]
    async fn warn_policy_counts_duplicates_only_as_processed() {
        let store = Arc::new(MemoryStore::new());
        let importer = InvoiceImporter::new(store.clone());
        let mut opts = options();
        opts.duplicate_policy = DuplicatePolicy::Warn;
        let rows = vec![raw("A", "RE-1", "10", "11.9"), raw("A", "RE-1", "10", "11.9")];
        let result = importer.import(&rows, &opts).await.unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!((result.successful, result.skipped, result.failed), (1, 0, 0));
        assert_eq!(result.warnings_of(WarningKind::DuplicateInvoiceNumber).count(), 1);
    }

    #[tokio::test]
    async fn later_row_sees_customer_created_by_earlier_row() {
        let store = Arc::new(MemoryStore::new());
        let importer = InvoiceImporter::new(store.clone());
        let rows = vec![raw("Kiosk", "RE-1", "10", "11.90"), raw("kiosk", "RE-2", "20", "23.80")];
        let result = importer.import(&rows, &options()).await.unwrap();
        assert_eq!(result.successful, 2);
        assert_eq!(store.customers().len(), 1);
        let customer = &store.customers()[0];
        assert_eq!(customer.total_orders, 2);
        assert_eq!(customer.total_spent, dec("35.70"));
    }

    #[tokio::test]
    async fn rows_missing_required_fields_are_skipped_with_warning() {
        let store = Arc::new(MemoryStore::new());
        let importer = InvoiceImporter::new(store.clone());
        let rows = vec![raw("", "RE-1", "10", "11.9"), raw("Kiosk", "", "10", "11.9")];
        let result = importer.import(&rows, &options()).await.unwrap();
        assert_eq!(result.skipped, 2);
        assert_eq!(result.warnings_of(WarningKind::MissingData).count(), 2);
        assert!(store.customers().is_empty());
    }

    #[tokio::test]
    async fn new_customer_without_location_is_flagged() {
        let store = Arc::new(MemoryStore::new());
        let importer = InvoiceImporter::new(store.clone());
        let mut row = raw("Kiosk", "RE-1", "10", "11.9");
        row.invoice_date = Some(RawCell::from("01.02.2020"));
        let result = importer.import(&[row], &options()).await.unwrap();
        assert_eq!(result.successful, 1);
        let warnings: Vec<_> = result.warnings_of(WarningKind::MissingData).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("ohne Adresse"));
    }

    #[tokio::test]
    async fn ambiguous_customer_under_reject_policy_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..2 {
            store
                .create_customer(&NewCustomer {
                    name: "Eiscafé Venezia".into(),
                    contact: ContactFields::default(),
                })
                .await
                .unwrap();
        }
        let importer = InvoiceImporter::new(store.clone());
        let mut opts = options();
        opts.ambiguity_policy = AmbiguityPolicy::Reject;
        let result = importer
            .import(&[raw("Eiscafé Venezia", "RE-9", "10", "11.9")], &opts)
            .await
            .unwrap();
        assert_eq!(result.skipped, 1);
        assert!(store.invoices().is_empty());
        let warning = result.warnings_of(WarningKind::CustomerAmbiguous).next().unwrap();
        assert_eq!(warning.details.as_ref().unwrap()["candidates"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn import_log_written_per_batch() {
        let store = Arc::new(MemoryStore::new());
        let importer = InvoiceImporter::new(store.clone());
        importer
            .import(&[raw("Kiosk", "RE-1", "10", "11.9")], &options())
            .await
            .unwrap();
        let logs = store.import_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].import_type, "test");
        assert_eq!(logs[0].successful, 1);
    }

    #[tokio::test]
    async fn empty_batch_is_a_fatal_error() {
        let importer = InvoiceImporter::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            importer.import(&[], &options()).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn ambiguous_customer_under_first_candidate_policy_takes_the_first() {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for _ in 0..2 {
            let customer = store
                .create_customer(&NewCustomer {
                    name: "Eiscafé Venezia".into(),
                    contact: ContactFields::default(),
                })
                .await
                .unwrap();
            ids.push(customer.id);
        }
        let importer = InvoiceImporter::new(store.clone());
        let mut opts = options();
        opts.ambiguity_policy = AmbiguityPolicy::FirstCandidate;
        let result = importer
            .import(&[raw("Eiscafé Venezia", "RE-10", "10", "11.9")], &opts)
            .await
            .unwrap();
        assert_eq!(result.successful, 1);
        let invoices = store.invoices();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].customer_id, ids[0]);

        let warning = result.warnings_of(WarningKind::CustomerAmbiguous).next().unwrap();
        let details = warning.details.as_ref().unwrap();
        assert_eq!(details["candidates"].as_array().unwrap().len(), 2);
        assert_eq!(details["chosenCustomerId"], ids[0]);
        assert_eq!(store.customers().len(), 2);
    }

    #[tokio::test]
    async fn missing_invoice_date_is_warned_once() {
        let store = Arc::new(MemoryStore::new());
        let importer = InvoiceImporter::new(store.clone());
        let mut row = raw("Kiosk", "RE-77", "10", "11.9");
        row.address = Some(RawCell::from("Sonnenallee 10, 10999 Berlin"));
        let result = importer.import(&[row], &options()).await.unwrap();
        assert_eq!(result.successful, 1);
        let warnings: Vec<_> = result.warnings_of(WarningKind::MissingData).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("Rechnungsdatum"));
        assert_eq!(store.invoices()[0].invoice_date, None);
    }

    /// MemoryStore that refuses to write one invoice number and lets a
    /// concurrent writer win the insert of another
    struct FailingStore {
        inner: MemoryStore,
        poison: &'static str,
        raced: &'static str,
        reachable: bool,
    }

    #[async_trait]
    impl ReconcileStore for FailingStore {
        async fn ping(&self) -> Result<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(AppError::Store("connection refused".into()))
            }
        }
        async fn find_customers_by_name(&self, name: &str) -> Result<Vec<Customer>> {
            self.inner.find_customers_by_name(name).await
        }
        async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
            self.inner.create_customer(customer).await
        }
        async fn backfill_customer(&self, id: i64, patch: &ContactFields) -> Result<()> {
            self.inner.backfill_customer(id, patch).await
        }
        async fn find_invoice_by_number(&self, number: &str) -> Result<Option<Invoice>> {
            self.inner.find_invoice_by_number(number).await
        }
        async fn create_invoice(
            &self,
            invoice: &NewInvoice,
            items: &[NewInvoiceItem],
        ) -> Result<Invoice> {
            if invoice.invoice_number == self.poison {
                return Err(AppError::Store(
                    "value too long for type character varying(50)".into(),
                ));
            }
            if invoice.invoice_number == self.raced {
                self.inner.create_invoice(invoice, items).await?;
            }
            self.inner.create_invoice(invoice, items).await
        }
        async fn reassign_invoice(&self, invoice_id: i64, customer_id: i64) -> Result<()> {
            self.inner.reassign_invoice(invoice_id, customer_id).await
        }
        async fn recalculate_customer_totals(&self, id: i64) -> Result<CustomerTotals> {
            self.inner.recalculate_customer_totals(id).await
        }
        async fn list_customer_ids(&self) -> Result<Vec<i64>> {
            self.inner.list_customer_ids().await
        }
        async fn list_invoice_tax_views(&self) -> Result<Vec<InvoiceTaxView>> {
            self.inner.list_invoice_tax_views().await
        }
        async fn update_invoice_tax(
            &self,
            id: i64,
            rate: &BigDecimal,
            tax: &BigDecimal,
            total: &BigDecimal,
        ) -> Result<()> {
            self.inner.update_invoice_tax(id, rate, tax, total).await
        }
        async fn insert_import_log(&self, log: &NewImportLog) -> Result<i64> {
            self.inner.insert_import_log(log).await
        }
    }

    #[tokio::test]
    async fn failing_row_is_isolated_and_reported() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            poison: "RE-2",
            raced: "",
            reachable: true,
        });
        let importer = InvoiceImporter::new(store.clone());
        let rows = vec![
            raw("A", "RE-1", "10", "11.9"),
            raw("B", "RE-2", "10", "11.9"),
            raw("C", "RE-3", "10", "11.9"),
        ];
        let result = importer.import(&rows, &options()).await.unwrap();
        assert_eq!((result.successful, result.failed, result.skipped), (2, 1, 0));
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("RE-2"));
        assert!(result.errors[0].contains("character varying"));
        assert!(!result.success);
    }

    #[tokio::test]
    async fn unreachable_store_fails_whole_batch() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            poison: "",
            raced: "",
            reachable: false,
        });
        let importer = InvoiceImporter::new(store.clone());
        let outcome = importer.import(&[raw("A", "RE-1", "10", "11.9")], &options()).await;
        assert!(outcome.is_err());
        assert!(store.inner.customers().is_empty());
    }

    #[tokio::test]
    async fn insert_losing_a_race_is_reported_as_duplicate() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            poison: "",
            raced: "RE-5",
            reachable: true,
        });
        let importer = InvoiceImporter::new(store.clone());
        let result = importer
            .import(&[raw("A", "RE-5", "10", "11.9")], &options())
            .await
            .unwrap();
        assert_eq!((result.successful, result.skipped, result.failed), (0, 1, 0));
        assert!(result.errors.is_empty());

        let invoices = store.inner.invoices();
        assert_eq!(invoices.len(), 1);
        let warnings: Vec<_> = result.warnings_of(WarningKind::DuplicateInvoiceNumber).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].details.as_ref().unwrap()["existingInvoiceId"], invoices[0].id);
    }
}
