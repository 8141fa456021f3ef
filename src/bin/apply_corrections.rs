// Re-points invoices of an over-merged customer from correction table files.
// Usage: cargo run --bin apply-corrections -- corrections/venezia.toml [more.json ...]

use invoice_reconcile::{open_store, AppConfig, Reassigner};
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        return Err("usage: apply-corrections <table.json|table.toml>...".into());
    }

    let config = AppConfig::from_env()?;
    let reassigner = Reassigner::new(open_store(&config.database).await?);

    let mut failed = 0;
    for path in &paths {
        match reassigner.apply_file(path).await {
            Ok(result) => {
                for missing in &result.missing {
                    tracing::warn!("{}: invoice {} not found", path, missing);
                }
                for error in &result.errors {
                    tracing::error!("{}: {}", path, error);
                }
                if !result.success {
                    failed += 1;
                }
            }
            Err(e) => {
                tracing::error!("{}: {}", path, e);
                failed += 1;
            }
        }
    }

    tracing::info!("Applied {} of {} correction tables", paths.len() - failed, paths.len());
    if failed > 0 {
        return Err(format!("{} correction tables failed", failed).into());
    }
    Ok(())
}
