use crate::config::AppConfig;
use crate::db::ReconcileStore;
use crate::error::AppError;
use crate::models::{
    AmbiguityPolicy, CorrectionTable, DuplicatePolicy, ImportResult, RawImportRow,
};
use crate::service::{
    parse_spreadsheet, ImportOptions, InvoiceImporter, ParsedSheet, Reassigner, VatCorrector,
    VatRules,
};
use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReconcileStore>,
    pub config: AppConfig,
}

impl AppState {
    fn import_options(
        &self,
        import_type: &str,
        target_year: Option<i32>,
        duplicate_policy: Option<DuplicatePolicy>,
        ambiguity_policy: Option<AmbiguityPolicy>,
    ) -> ImportOptions {
        let mut options = ImportOptions::from_config(import_type, &self.config.import);
        options.target_year = target_year;
        options.max_errors_logged = self.config.report.max_errors;
        if let Some(policy) = duplicate_policy {
            options.duplicate_policy = policy;
        }
        if let Some(policy) = ambiguity_policy {
            options.ambiguity_policy = policy;
        }
        options
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub import_type: String,
    pub rows: Vec<RawImportRow>,
    pub target_year: Option<i32>,
    pub duplicate_policy: Option<DuplicatePolicy>,
    pub ambiguity_policy: Option<AmbiguityPolicy>,
}

/// Query string of the file upload
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
    pub import_type: Option<String>,
    pub target_year: Option<i32>,
    pub duplicate_policy: Option<DuplicatePolicy>,
    pub ambiguity_policy: Option<AmbiguityPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VatCorrectionRequest {
    #[serde(default)]
    pub dry_run: bool,
}

/// Import result of an upload plus what the sheet reader noticed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(flatten)]
    pub result: ImportResult,
    pub sheet_warnings: Vec<String>,
    pub empty_rows_skipped: usize,
}

impl UploadResponse {
    pub fn new(result: ImportResult, sheet: ParsedSheet) -> Self {
        Self {
            result,
            sheet_warnings: sheet.warnings,
            empty_rows_skipped: sheet.empty_rows_skipped,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub success: bool,
    pub customers: usize,
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// Batch import of rows sent as JSON
pub async fn import_invoices(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Response {
    let options = state.import_options(
        &req.import_type,
        req.target_year,
        req.duplicate_policy,
        req.ambiguity_policy,
    );
    let importer = InvoiceImporter::new(state.store.clone());
    match importer.import(&req.rows, &options).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!("Import [{}] aborted: {}", req.import_type, e);
            e.into_response()
        }
    }
}

/// Batch import of an uploaded xlsx/xls/csv file (raw body)
pub async fn upload_invoices(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let sheet = match parse_spreadsheet(&body, &params.filename) {
        Ok(sheet) => sheet,
        Err(e) => return e.into_response(),
    };
    for warning in &sheet.warnings {
        tracing::warn!("{}: {}", params.filename, warning);
    }

    let import_type = params.import_type.as_deref().unwrap_or("spreadsheet");
    let mut options = state.import_options(
        import_type,
        params.target_year,
        params.duplicate_policy,
        params.ambiguity_policy,
    );
    options.file_name = Some(params.filename.clone());

    let importer = InvoiceImporter::new(state.store.clone());
    match importer.import(&sheet.rows, &options).await {
        Ok(result) => (StatusCode::OK, Json(UploadResponse::new(result, sheet))).into_response(),
        Err(e) => {
            tracing::error!("Import of {} aborted: {}", params.filename, e);
            e.into_response()
        }
    }
}

pub async fn reassign_invoices(
    State(state): State<AppState>,
    Json(table): Json<CorrectionTable>,
) -> Response {
    match Reassigner::new(state.store.clone()).apply(&table).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn recalculate_totals(State(state): State<AppState>) -> Response {
    match Reassigner::new(state.store.clone()).recalculate_all_totals().await {
        Ok(customers) => (
            StatusCode::OK,
            Json(RecalculateResponse {
                success: true,
                customers,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn vat_correction(
    State(state): State<AppState>,
    body: Option<Json<VatCorrectionRequest>>,
) -> Response {
    let Json(req) = body.unwrap_or_default();
    let rules = VatRules::from_config(&state.config.import);
    match VatCorrector::new(state.store.clone(), rules)
        .run(req.dry_run, &state.config.report)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Fallback for unknown paths
pub async fn not_found() -> Response {
    AppError::NotFound("Route".to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::spreadsheet::SheetFormat;

    #[test]
    fn upload_response_carries_sheet_warnings() {
        let sheet = ParsedSheet {
            format: SheetFormat::Csv,
            rows: Vec::new(),
            empty_rows_skipped: 3,
            warnings: vec!["Spalte \"Rabatt\" wird ignoriert".to_string()],
        };
        let result = ImportResult {
            success: true,
            processed: 2,
            successful: 2,
            ..Default::default()
        };
        let body = serde_json::to_value(UploadResponse::new(result, sheet)).unwrap();
        assert_eq!(body["successful"], 2);
        assert_eq!(body["emptyRowsSkipped"], 3);
        assert_eq!(body["sheetWarnings"][0], "Spalte \"Rabatt\" wird ignoriert");
        assert!(body.get("result").is_none());
    }
}
