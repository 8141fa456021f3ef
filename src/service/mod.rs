pub mod address;
pub mod importer;
pub mod normalize;
pub mod reassign;
pub mod report;
pub mod resolver;
pub mod spreadsheet;
pub mod vat;

pub use address::parse_address;
pub use importer::{ImportOptions, InvoiceImporter};
pub use normalize::normalize_row;
pub use reassign::{load_correction_table, Reassigner};
pub use resolver::{resolve_customer, CustomerQuery, Resolution};
pub use spreadsheet::{parse_spreadsheet, ParsedSheet};
pub use vat::{VatCorrector, VatRules};
