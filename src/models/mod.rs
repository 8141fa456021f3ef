pub mod correction;
pub mod customer;
pub mod import;
pub mod invoice;
pub mod vat;

pub use correction::{CorrectionEntry, CorrectionTable, ReassignResult, TargetCustomer};
pub use customer::{ContactFields, Customer, CustomerTotals, NewCustomer, ParsedAddress};
pub use import::{
    AmbiguityPolicy, DuplicatePolicy, ImportResult, ImportWarning, NewImportLog,
    NormalizedLineItem, NormalizedRow, RawCell, RawImportRow, RawLineItem, RowRejection,
    WarningKind,
};
pub use invoice::{Invoice, InvoiceItem, InvoiceTaxView, NewInvoice, NewInvoiceItem};
pub use vat::{VatCorrection, VatCorrectionResult, VatTreatment};
