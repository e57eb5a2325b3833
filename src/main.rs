use anyhow::Result;
use housing_etl::{pipeline, HousingConfig, VERSION};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// One sequential batch; a single-threaded runtime drives the store I/O
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "housing_etl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run_import().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run_import() -> Result<()> {
    info!(version = VERSION, "starting housing import");

    let config = HousingConfig::from_env()?;
    info!(
        dump = %config.dump_path.display(),
        csv = %config.csv_path.display(),
        spreadsheet = %config.spreadsheet_path.display(),
        store = %config.store,
        "configuration loaded"
    );

    let report = pipeline::run(&config).await?;
    info!("{}", report.summary());

    Ok(())
}
