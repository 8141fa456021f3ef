use invoice_reconcile::{api, open_store, AppConfig};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    let store = open_store(&config.database).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = api::AppState { store, config };
    let app = api::router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/import/invoices                 - JSON rows");
    info!("  POST /api/import/upload?filename=..       - xlsx/xls/csv file");
    info!("  POST /api/maintenance/reassign            - correction table");
    info!("  POST /api/maintenance/recalculate-totals");
    info!("  POST /api/maintenance/vat-correction");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
