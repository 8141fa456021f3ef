use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use invoice_reconcile::config::ImportConfig;
use invoice_reconcile::models::{ContactFields, NewCustomer, RawCell, RawImportRow, WarningKind};
use invoice_reconcile::service::parse_spreadsheet;
use invoice_reconcile::{ImportOptions, InvoiceImporter, MemoryStore, ReconcileStore};
use std::str::FromStr;
use std::sync::Arc;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn options() -> ImportOptions {
    ImportOptions::from_config("historical", &ImportConfig::default())
}

fn row(name: &str, address: Option<&str>, number: &str, net: &str, gross: &str) -> RawImportRow {
    RawImportRow {
        name: Some(RawCell::from(name)),
        address: address.map(RawCell::from),
        invoice_number: Some(RawCell::from(number)),
        net_amount: Some(RawCell::from(net)),
        gross_amount: Some(RawCell::from(gross)),
        ..Default::default()
    }
}

#[tokio::test]
async fn historical_row_is_imported_with_derived_date_and_tax() {
    let store = Arc::new(MemoryStore::new());
    let importer = InvoiceImporter::new(store.clone());
    let rows = vec![row(
        "Eisdiele Sommer",
        Some("Sonnenallee 10, 10999 Berlin"),
        "01/2020/001",
        "850,00",
        "1.011,50",
    )];

    let result = importer.import(&rows, &options()).await.unwrap();

    assert!(result.success);
    assert_eq!((result.successful, result.failed, result.skipped), (1, 0, 0));
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let invoices = store.invoices();
    assert_eq!(invoices.len(), 1);
    let invoice = &invoices[0];
    assert_eq!(invoice.invoice_date, NaiveDate::from_ymd_opt(2020, 1, 15));
    assert_eq!(invoice.subtotal, dec("850.00"));
    assert_eq!(invoice.total_amount, dec("1011.50"));
    assert_eq!(invoice.tax_amount, dec("161.50"));
    assert_eq!(invoice.tax_rate, dec("19"));

    let items = store.invoice_items(invoice.id);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "Importierte Rechnung 01/2020/001");

    let customer = store.customer(invoice.customer_id).unwrap();
    assert_eq!(customer.city.as_deref(), Some("Berlin"));
    assert_eq!(customer.postal_code.as_deref(), Some("10999"));
    assert_eq!(customer.address.as_deref(), Some("Sonnenallee 10"));
    assert_eq!(customer.total_orders, 1);
    assert_eq!(customer.total_spent, dec("1011.50"));
}

#[tokio::test]
async fn rerunning_a_batch_creates_nothing_new() {
    let store = Arc::new(MemoryStore::new());
    let importer = InvoiceImporter::new(store.clone());
    let rows: Vec<RawImportRow> = (1..=5)
        .map(|n| {
            row(
                &format!("Kunde {}", n),
                Some("Hauptstraße 1, 50667 Köln"),
                &format!("0{}/2021/{:03}", n, n),
                "100",
                "119",
            )
        })
        .collect();

    let first = importer.import(&rows, &options()).await.unwrap();
    assert_eq!(first.successful, 5);

    let second = importer.import(&rows, &options()).await.unwrap();
    assert_eq!(second.successful, 0);
    assert_eq!(second.skipped, 5);
    assert_eq!(second.warnings_of(WarningKind::DuplicateInvoiceNumber).count(), 5);
    assert_eq!(store.invoices().len(), 5);
    assert_eq!(store.customers().len(), 5);
    assert_eq!(store.import_logs().len(), 2);
}

#[tokio::test]
async fn city_in_address_disambiguates_same_named_customers() {
    let store = Arc::new(MemoryStore::new());
    for city in ["Köln", "Bonn"] {
        store
            .create_customer(&NewCustomer {
                name: "Eiscafé Venezia".to_string(),
                contact: ContactFields {
                    city: Some(city.to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
    }
    let bonn_id = store.customers()[1].id;

    let importer = InvoiceImporter::new(store.clone());
    let rows = vec![row(
        "eiscafé venezia",
        Some("Markt 3, 53111 Bonn"),
        "RE-2020-17",
        "100",
        "119",
    )];
    let result = importer.import(&rows, &options()).await.unwrap();

    assert_eq!(result.successful, 1);
    assert_eq!(result.warnings_of(WarningKind::CustomerAmbiguous).count(), 0);
    assert_eq!(store.invoices()[0].customer_id, bonn_id);
    assert_eq!(store.customers().len(), 2);
}

#[tokio::test]
async fn uploaded_csv_flows_through_the_importer() {
    let csv = "Name;Adresse;Rechnungsnummer;Rechnungsdatum;Nettosumme;Bruttosumme\n\
               Eisdiele Sommer;Sonnenallee 10, 10999 Berlin;01/2020/001;;850,00;1.011,50\n\
               Kiosk am See;Seeweg 2, 14467 Potsdam;RE-7;2019-07-01;;119,00\n";
    let sheet = parse_spreadsheet(csv.as_bytes(), "rechnungen.csv").unwrap();

    let store = Arc::new(MemoryStore::new());
    let mut opts = options();
    opts.file_name = Some("rechnungen.csv".to_string());
    opts.target_year = Some(2020);
    let result = InvoiceImporter::new(store.clone())
        .import(&sheet.rows, &opts)
        .await
        .unwrap();

    assert_eq!(result.successful, 2);
    let kiosk = store
        .invoices()
        .into_iter()
        .find(|i| i.invoice_number == "RE-7")
        .unwrap();
    assert_eq!(kiosk.invoice_date, NaiveDate::from_ymd_opt(2020, 7, 1));
    assert_eq!(kiosk.subtotal, dec("100.00"));
    assert_eq!(store.import_logs()[0].file_name.as_deref(), Some("rechnungen.csv"));
}
