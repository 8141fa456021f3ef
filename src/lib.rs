pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, open_store, MemoryStore, PgStore, ReconcileStore};
pub use error::{AppError, Result};
pub use service::{ImportOptions, InvoiceImporter, Reassigner, VatCorrector, VatRules};
