use crate::models::{ImportResult, ImportWarning};

/// Final state of one import row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Imported { invoice_id: i64, customer_id: i64 },
    /// structurally invalid, rejected by policy, or duplicate under `skip`
    Skipped,
    /// duplicate under `warn`: counted as processed only
    Duplicate,
    Failed(String),
}

/// Per-row result collected by the orchestrator
#[derive(Debug, Clone)]
pub struct RowReport {
    pub row_number: usize,
    pub invoice_number: String,
    pub outcome: RowOutcome,
    pub warnings: Vec<ImportWarning>,
}

impl RowReport {
    pub fn new(row_number: usize, invoice_number: &str) -> Self {
        Self {
            row_number,
            invoice_number: invoice_number.to_string(),
            outcome: RowOutcome::Skipped,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: ImportWarning) {
        self.warnings.push(warning);
    }

    pub fn finish(mut self, outcome: RowOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Fold per-row reports into the batch result. Pure: no I/O.
pub fn aggregate(rows: Vec<RowReport>) -> ImportResult {
    let mut result = ImportResult {
        processed: rows.len(),
        ..Default::default()
    };

    for row in rows {
        match row.outcome {
            RowOutcome::Imported { .. } => result.successful += 1,
            RowOutcome::Skipped => result.skipped += 1,
            RowOutcome::Duplicate => {}
            RowOutcome::Failed(message) => {
                result.failed += 1;
                result.errors.push(message);
            }
        }
        result.warnings.extend(row.warnings);
    }

    result.success = result.failed == 0;
    result
}

/// First `max` entries, for display; callers keep the full counts.
pub fn truncated<T: Clone>(items: &[T], max: usize) -> Vec<T> {
    items.iter().take(max).cloned().collect()
}

/// Log a batch summary, listing at most `max_errors` error lines
pub fn log_summary(import_type: &str, result: &ImportResult, max_errors: usize) {
    tracing::info!(
        "Import [{}] finished: processed {}, successful {}, failed {}, skipped {}, warnings {}",
        import_type,
        result.processed,
        result.successful,
        result.failed,
        result.skipped,
        result.warnings.len()
    );
    for error in truncated(&result.errors, max_errors) {
        tracing::warn!("Import [{}] error: {}", import_type, error);
    }
    if result.errors.len() > max_errors {
        tracing::warn!(
            "Import [{}]: {} further errors not shown",
            import_type,
            result.errors.len() - max_errors
        );
    }
}
