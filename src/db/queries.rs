use crate::models::{
    ContactFields, Customer, CustomerTotals, Invoice, InvoiceTaxView, NewCustomer, NewImportLog,
    NewInvoice, NewInvoiceItem,
};
use bigdecimal::BigDecimal;
use sqlx::types::Json;
use sqlx::PgPool;

/// Customers whose name equals `name` case-insensitively, oldest first
pub async fn find_customers_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Vec<Customer>, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, address, postal_code, city, country, vat_id,
               total_spent, total_orders, created_at
        FROM customers
        WHERE lower(trim(name)) = lower(trim($1))
        ORDER BY created_at, id
        "#,
    )
    .bind(name)
    .fetch_all(pool)
    .await
}

pub async fn insert_customer(
    pool: &PgPool,
    customer: &NewCustomer,
) -> Result<Customer, sqlx::Error> {
    let c = &customer.contact;
    sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (name, address, postal_code, city, country, email, phone, vat_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, name, email, phone, address, postal_code, city, country, vat_id,
                  total_spent, total_orders, created_at
        "#,
    )
    .bind(customer.name.trim())
    .bind(&c.address)
    .bind(&c.postal_code)
    .bind(&c.city)
    .bind(&c.country)
    .bind(&c.email)
    .bind(&c.phone)
    .bind(&c.vat_id)
    .fetch_one(pool)
    .await
}

/// Fill only columns that are currently NULL or blank
pub async fn backfill_customer(
    pool: &PgPool,
    customer_id: i64,
    patch: &ContactFields,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE customers SET
            address = CASE WHEN coalesce(trim(address), '') = ''
                THEN coalesce($2, address) ELSE address END,
            postal_code = CASE WHEN coalesce(trim(postal_code), '') = ''
                THEN coalesce($3, postal_code) ELSE postal_code END,
            city = CASE WHEN coalesce(trim(city), '') = ''
                THEN coalesce($4, city) ELSE city END,
            country = CASE WHEN coalesce(trim(country), '') = ''
                THEN coalesce($5, country) ELSE country END,
            email = CASE WHEN coalesce(trim(email), '') = ''
                THEN coalesce($6, email) ELSE email END,
            phone = CASE WHEN coalesce(trim(phone), '') = ''
                THEN coalesce($7, phone) ELSE phone END,
            vat_id = CASE WHEN coalesce(trim(vat_id), '') = ''
                THEN coalesce($8, vat_id) ELSE vat_id END,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(customer_id)
    .bind(&patch.address)
    .bind(&patch.postal_code)
    .bind(&patch.city)
    .bind(&patch.country)
    .bind(&patch.email)
    .bind(&patch.phone)
    .bind(&patch.vat_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn find_invoice_by_number(
    pool: &PgPool,
    invoice_number: &str,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, invoice_number, customer_id, invoice_date, status,
               subtotal, tax_rate, tax_amount, total_amount, created_at
        FROM invoices
        WHERE invoice_number = $1
        "#,
    )
    .bind(invoice_number.trim())
    .fetch_optional(pool)
    .await
}

/// Insert an invoice and its line items in one transaction
pub async fn insert_invoice_with_items(
    pool: &PgPool,
    invoice: &NewInvoice,
    items: &[NewInvoiceItem],
) -> Result<Invoice, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let created = sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices (invoice_number, customer_id, invoice_date, status,
                              subtotal, tax_rate, tax_amount, total_amount)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, invoice_number, customer_id, invoice_date, status,
                  subtotal, tax_rate, tax_amount, total_amount, created_at
        "#,
    )
    .bind(&invoice.invoice_number)
    .bind(invoice.customer_id)
    .bind(invoice.invoice_date)
    .bind(&invoice.status)
    .bind(&invoice.subtotal)
    .bind(&invoice.tax_rate)
    .bind(&invoice.tax_amount)
    .bind(&invoice.total_amount)
    .fetch_one(&mut *tx)
    .await?;

    if !items.is_empty() {
        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO invoice_items \
             (invoice_id, description, quantity, unit_price, total_price) ",
        );
        query_builder.push_values(items, |mut b, item| {
            b.push_bind(created.id)
                .push_bind(&item.description)
                .push_bind(&item.quantity)
                .push_bind(&item.unit_price)
                .push_bind(&item.total_price);
        });
        query_builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(created)
}

pub async fn update_invoice_customer(
    pool: &PgPool,
    invoice_id: i64,
    customer_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invoices SET customer_id = $2, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .bind(customer_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Recompute total_spent / total_orders from paid invoices
pub async fn recalculate_customer_totals(
    pool: &PgPool,
    customer_id: i64,
) -> Result<Option<CustomerTotals>, sqlx::Error> {
    sqlx::query_as::<_, CustomerTotals>(
        r#"
        WITH paid AS (
            SELECT coalesce(sum(total_amount), 0) AS total_spent,
                   count(*) AS total_orders
            FROM invoices
            WHERE customer_id = $1 AND status = 'paid'
        )
        UPDATE customers c
        SET total_spent = paid.total_spent,
            total_orders = paid.total_orders,
            updated_at = now()
        FROM paid
        WHERE c.id = $1
        RETURNING c.id AS customer_id, c.total_spent, c.total_orders
        "#,
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_customer_ids(pool: &PgPool) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM customers ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn list_invoice_tax_views(pool: &PgPool) -> Result<Vec<InvoiceTaxView>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceTaxView>(
        r#"
        SELECT i.id AS invoice_id,
               i.invoice_number,
               i.customer_id,
               c.name AS customer_name,
               c.country,
               c.vat_id,
               i.subtotal,
               i.tax_rate,
               i.tax_amount,
               i.total_amount
        FROM invoices i
        INNER JOIN customers c ON c.id = i.customer_id
        ORDER BY i.invoice_date NULLS LAST, i.id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn update_invoice_tax(
    pool: &PgPool,
    invoice_id: i64,
    tax_rate: &BigDecimal,
    tax_amount: &BigDecimal,
    total_amount: &BigDecimal,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET tax_rate = $2, tax_amount = $3, total_amount = $4, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(invoice_id)
    .bind(tax_rate)
    .bind(tax_amount)
    .bind(total_amount)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_import_log(pool: &PgPool, log: &NewImportLog) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO import_logs (import_type, file_name, total_rows, successful, failed, skipped,
                                 errors, warnings)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&log.import_type)
    .bind(&log.file_name)
    .bind(log.total_rows)
    .bind(log.successful)
    .bind(log.failed)
    .bind(log.skipped)
    .bind(Json(&log.errors))
    .bind(Json(&log.warnings))
    .fetch_one(pool)
    .await
}
