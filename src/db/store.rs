use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;

use super::queries;
use crate::error::{AppError, Result};
use crate::models::{
    ContactFields, Customer, CustomerTotals, Invoice, InvoiceTaxView, NewCustomer, NewImportLog,
    NewInvoice, NewInvoiceItem,
};

/// Everything the reconciliation services need from the data store.
///
/// Every call is a fresh round trip; callers never cache results across rows,
/// so a customer created by one row is visible to the next.
#[async_trait]
pub trait ReconcileStore: Send + Sync {
    /// Cheap connectivity check run before a batch starts.
    async fn ping(&self) -> Result<()>;

    /// Case-insensitive exact name match, in creation order.
    async fn find_customers_by_name(&self, name: &str) -> Result<Vec<Customer>>;

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer>;

    /// Fill empty columns only; populated columns stay untouched.
    async fn backfill_customer(&self, customer_id: i64, patch: &ContactFields) -> Result<()>;

    async fn find_invoice_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>>;

    /// Invoice and items are written together or not at all.
    async fn create_invoice(
        &self,
        invoice: &NewInvoice,
        items: &[NewInvoiceItem],
    ) -> Result<Invoice>;

    async fn reassign_invoice(&self, invoice_id: i64, customer_id: i64) -> Result<()>;

    async fn recalculate_customer_totals(&self, customer_id: i64) -> Result<CustomerTotals>;

    async fn list_customer_ids(&self) -> Result<Vec<i64>>;

    async fn list_invoice_tax_views(&self) -> Result<Vec<InvoiceTaxView>>;

    async fn update_invoice_tax(
        &self,
        invoice_id: i64,
        tax_rate: &BigDecimal,
        tax_amount: &BigDecimal,
        total_amount: &BigDecimal,
    ) -> Result<()>;

    async fn insert_import_log(&self, log: &NewImportLog) -> Result<i64>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReconcileStore for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_customers_by_name(&self, name: &str) -> Result<Vec<Customer>> {
        Ok(queries::find_customers_by_name(&self.pool, name).await?)
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        Ok(queries::insert_customer(&self.pool, customer).await?)
    }

    async fn backfill_customer(&self, customer_id: i64, patch: &ContactFields) -> Result<()> {
        let affected = queries::backfill_customer(&self.pool, customer_id, patch).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("customer {}", customer_id)));
        }
        Ok(())
    }

    async fn find_invoice_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>> {
        Ok(queries::find_invoice_by_number(&self.pool, invoice_number).await?)
    }

    async fn create_invoice(
        &self,
        invoice: &NewInvoice,
        items: &[NewInvoiceItem],
    ) -> Result<Invoice> {
        Ok(queries::insert_invoice_with_items(&self.pool, invoice, items).await?)
    }

    async fn reassign_invoice(&self, invoice_id: i64, customer_id: i64) -> Result<()> {
        let affected = queries::update_invoice_customer(&self.pool, invoice_id, customer_id).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("invoice {}", invoice_id)));
        }
        Ok(())
    }

    async fn recalculate_customer_totals(&self, customer_id: i64) -> Result<CustomerTotals> {
        queries::recalculate_customer_totals(&self.pool, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("customer {}", customer_id)))
    }

    async fn list_customer_ids(&self) -> Result<Vec<i64>> {
        Ok(queries::list_customer_ids(&self.pool).await?)
    }

    async fn list_invoice_tax_views(&self) -> Result<Vec<InvoiceTaxView>> {
        Ok(queries::list_invoice_tax_views(&self.pool).await?)
    }

    async fn update_invoice_tax(
        &self,
        invoice_id: i64,
        tax_rate: &BigDecimal,
        tax_amount: &BigDecimal,
        total_amount: &BigDecimal,
    ) -> Result<()> {
        let affected =
            queries::update_invoice_tax(&self.pool, invoice_id, tax_rate, tax_amount, total_amount)
                .await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!("invoice {}", invoice_id)));
        }
        Ok(())
    }

    async fn insert_import_log(&self, log: &NewImportLog) -> Result<i64> {
        Ok(queries::insert_import_log(&self.pool, log).await?)
    }
}
