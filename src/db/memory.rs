use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::store::ReconcileStore;
use crate::error::{AppError, Result};
use crate::models::{
    customer::is_blank, ContactFields, Customer, CustomerTotals, Invoice, InvoiceItem,
    InvoiceTaxView, NewCustomer, NewImportLog, NewInvoice, NewInvoiceItem,
};

/// In-process store used for `memory://` dry runs and for tests.
/// Mirrors the constraints of the Postgres schema that the services rely on:
/// unique invoice numbers, customer foreign keys, items created with their invoice.
#[derive(Default)]
pub struct MemoryStore {
    seq: AtomicI64,
    customers: DashMap<i64, Customer>,
    invoices: DashMap<i64, Invoice>,
    invoice_numbers: DashMap<String, i64>,
    items: DashMap<i64, InvoiceItem>,
    import_logs: DashMap<i64, NewImportLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn customers(&self) -> Vec<Customer> {
        let mut all: Vec<Customer> = self.customers.iter().map(|c| c.value().clone()).collect();
        all.sort_by_key(|c| c.id);
        all
    }

    pub fn customer(&self, id: i64) -> Option<Customer> {
        self.customers.get(&id).map(|c| c.value().clone())
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        let mut all: Vec<Invoice> = self.invoices.iter().map(|i| i.value().clone()).collect();
        all.sort_by_key(|i| i.id);
        all
    }

    pub fn invoice_items(&self, invoice_id: i64) -> Vec<InvoiceItem> {
        let mut all: Vec<InvoiceItem> = self
            .items
            .iter()
            .filter(|i| i.invoice_id == invoice_id)
            .map(|i| i.value().clone())
            .collect();
        all.sort_by_key(|i| i.id);
        all
    }

    pub fn import_logs(&self) -> Vec<NewImportLog> {
        let mut all: Vec<(i64, NewImportLog)> = self
            .import_logs
            .iter()
            .map(|l| (*l.key(), l.value().clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all.into_iter().map(|(_, log)| log).collect()
    }
}

fn fill(slot: &mut Option<String>, value: &Option<String>) {
    if is_blank(slot) {
        if let Some(v) = value {
            *slot = Some(v.clone());
        }
    }
}

#[async_trait]
impl ReconcileStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_customers_by_name(&self, name: &str) -> Result<Vec<Customer>> {
        let wanted = name.trim().to_lowercase();
        let mut found: Vec<Customer> = self
            .customers
            .iter()
            .filter(|c| c.name.trim().to_lowercase() == wanted)
            .map(|c| c.value().clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        if customer.name.trim().is_empty() {
            return Err(AppError::Store("customers.name must not be empty".to_string()));
        }
        let c = &customer.contact;
        let created = Customer {
            id: self.next_id(),
            name: customer.name.trim().to_string(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            address: c.address.clone(),
            postal_code: c.postal_code.clone(),
            city: c.city.clone(),
            country: c.country.clone(),
            vat_id: c.vat_id.clone(),
            total_spent: BigDecimal::zero(),
            total_orders: 0,
            created_at: Utc::now(),
        };
        self.customers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn backfill_customer(&self, customer_id: i64, patch: &ContactFields) -> Result<()> {
        let mut customer = self
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| AppError::NotFound(format!("customer {}", customer_id)))?;
        fill(&mut customer.address, &patch.address);
        fill(&mut customer.postal_code, &patch.postal_code);
        fill(&mut customer.city, &patch.city);
        fill(&mut customer.country, &patch.country);
        fill(&mut customer.email, &patch.email);
        fill(&mut customer.phone, &patch.phone);
        fill(&mut customer.vat_id, &patch.vat_id);
        Ok(())
    }

    async fn find_invoice_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>> {
        let id = match self.invoice_numbers.get(invoice_number.trim()) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.invoices.get(&id).map(|i| i.value().clone()))
    }

    async fn create_invoice(
        &self,
        invoice: &NewInvoice,
        items: &[NewInvoiceItem],
    ) -> Result<Invoice> {
        if !self.customers.contains_key(&invoice.customer_id) {
            return Err(AppError::Store(format!(
                "invoices.customer_id {} references no customer",
                invoice.customer_id
            )));
        }

        let id = self.next_id();
        match self.invoice_numbers.entry(invoice.invoice_number.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!(
                    "invoice_number {} already exists",
                    invoice.invoice_number
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let created = Invoice {
            id,
            invoice_number: invoice.invoice_number.clone(),
            customer_id: invoice.customer_id,
            invoice_date: invoice.invoice_date,
            status: invoice.status.clone(),
            subtotal: invoice.subtotal.clone(),
            tax_rate: invoice.tax_rate.clone(),
            tax_amount: invoice.tax_amount.clone(),
            total_amount: invoice.total_amount.clone(),
            created_at: Utc::now(),
        };
        self.invoices.insert(id, created.clone());

        for item in items {
            let item_id = self.next_id();
            self.items.insert(
                item_id,
                InvoiceItem {
                    id: item_id,
                    invoice_id: id,
                    description: item.description.clone(),
                    quantity: item.quantity.clone(),
                    unit_price: item.unit_price.clone(),
                    total_price: item.total_price.clone(),
                },
            );
        }

        Ok(created)
    }

    async fn reassign_invoice(&self, invoice_id: i64, customer_id: i64) -> Result<()> {
        if !self.customers.contains_key(&customer_id) {
            return Err(AppError::NotFound(format!("customer {}", customer_id)));
        }
        let mut invoice = self
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| AppError::NotFound(format!("invoice {}", invoice_id)))?;
        invoice.customer_id = customer_id;
        Ok(())
    }

    async fn recalculate_customer_totals(&self, customer_id: i64) -> Result<CustomerTotals> {
        let (total_spent, total_orders) = self
            .invoices
            .iter()
            .filter(|i| i.customer_id == customer_id && i.status == "paid")
            .fold((BigDecimal::zero(), 0i64), |(sum, count), i| {
                (sum + &i.total_amount, count + 1)
            });

        let mut customer = self
            .customers
            .get_mut(&customer_id)
            .ok_or_else(|| AppError::NotFound(format!("customer {}", customer_id)))?;
        customer.total_spent = total_spent.clone();
        customer.total_orders = total_orders;

        Ok(CustomerTotals {
            customer_id,
            total_spent,
            total_orders,
        })
    }

    async fn list_customer_ids(&self) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = self.customers.iter().map(|c| *c.key()).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn list_invoice_tax_views(&self) -> Result<Vec<InvoiceTaxView>> {
        let mut invoices = self.invoices();
        invoices.sort_by(|a, b| match (a.invoice_date, b.invoice_date) {
            (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });

        let mut views = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let Some(customer) = self.customer(invoice.customer_id) else {
                continue;
            };
            views.push(InvoiceTaxView {
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number,
                customer_id: customer.id,
                customer_name: customer.name,
                country: customer.country,
                vat_id: customer.vat_id,
                subtotal: invoice.subtotal,
                tax_rate: invoice.tax_rate,
                tax_amount: invoice.tax_amount,
                total_amount: invoice.total_amount,
            });
        }
        Ok(views)
    }

    async fn update_invoice_tax(
        &self,
        invoice_id: i64,
        tax_rate: &BigDecimal,
        tax_amount: &BigDecimal,
        total_amount: &BigDecimal,
    ) -> Result<()> {
        let mut invoice = self
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| AppError::NotFound(format!("invoice {}", invoice_id)))?;
        invoice.tax_rate = tax_rate.clone();
        invoice.tax_amount = tax_amount.clone();
        invoice.total_amount = total_amount.clone();
        Ok(())
    }

    async fn insert_import_log(&self, log: &NewImportLog) -> Result<i64> {
        let id = self.next_id();
        self.import_logs.insert(id, log.clone());
        Ok(id)
    }
}
