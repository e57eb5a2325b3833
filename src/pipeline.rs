// 🔁 Pipeline - extract → reconcile → reset schema → load
//
// Strictly sequential: each stage consumes the complete output of the
// previous one. Any error stops the run; nothing is retried.

use crate::config::HousingConfig;
use crate::db::{self, LoadReport, DEFAULT_SCHEMA};
use crate::merge::MergeEngine;
use crate::records::{HousePriceRecord, HouseRecord};
use crate::sources::{
    ensure_source_kind, DumpExtract, HouseCsvReader, PriceSpreadsheetReader, SourceReader,
    SqlDumpReader,
};
use anyhow::{bail, Context, Result};
use sqlx::{AnyConnection, Connection};
use std::collections::BTreeSet;
use tracing::info;

/// Partial records from all three sources
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub dump: DumpExtract,
    pub csv_houses: Vec<HouseRecord>,
    pub sheet_prices: Vec<HousePriceRecord>,
}

/// Complete records ready to load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub houses: Vec<HouseRecord>,
    pub prices: Vec<HousePriceRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub dump_rows: usize,
    pub csv_rows: usize,
    pub spreadsheet_rows: usize,
    pub load: LoadReport,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "read {} dump / {} csv / {} spreadsheet rows, loaded {} houses and {} prices",
            self.dump_rows, self.csv_rows, self.spreadsheet_rows, self.load.houses, self.load.prices
        )
    }
}

pub fn extract(config: &HousingConfig) -> Result<Extracted> {
    let dump_reader = SqlDumpReader::new();
    let csv_reader = HouseCsvReader::new();
    let sheet_reader = PriceSpreadsheetReader::new();

    ensure_source_kind(&dump_reader, &config.dump_path)?;
    ensure_source_kind(&csv_reader, &config.csv_path)?;
    ensure_source_kind(&sheet_reader, &config.spreadsheet_path)?;

    Ok(Extracted {
        dump: dump_reader.read(&config.dump_path)?,
        csv_houses: csv_reader.read(&config.csv_path)?,
        sheet_prices: sheet_reader.read(&config.spreadsheet_path)?,
    })
}

/// Merge each entity's two views; the dump is the preferred source
pub fn reconcile(extracted: Extracted, broken_rows: &BTreeSet<i64>) -> Result<Reconciled> {
    let engine = MergeEngine::with_drop_set(broken_rows.clone());

    let houses = engine
        .merge(extracted.dump.houses, extracted.csv_houses)
        .context("Failed to merge house records")?;
    info!("{}", houses.summary());

    let prices = engine
        .merge(extracted.dump.prices, extracted.sheet_prices)
        .context("Failed to merge house price records")?;
    info!("{}", prices.summary());

    Ok(Reconciled {
        houses: houses.records,
        prices: prices.records,
    })
}

/// Schema script named by the configuration, or the shipped one
pub fn schema_script(config: &HousingConfig) -> Result<String> {
    match &config.schema_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display())),
        None => Ok(DEFAULT_SCHEMA.to_string()),
    }
}

/// Reset the schema, load, then check the row counts
pub async fn load(
    conn: &mut AnyConnection,
    schema: &str,
    reconciled: &Reconciled,
) -> Result<LoadReport> {
    db::reset_schema(conn, schema).await?;
    let report = db::load_db(conn, &reconciled.houses, &reconciled.prices).await?;

    let houses = db::count_rows(conn, "house_data").await?;
    let prices = db::count_rows(conn, "house_price_data").await?;
    if houses != report.houses as i64 || prices != report.prices as i64 {
        bail!(
            "Store holds {} houses and {} prices after loading {} and {}",
            houses,
            prices,
            report.houses,
            report.prices
        );
    }

    Ok(report)
}

/// Sources are read with blocking I/O; only the store is awaited
pub async fn run(config: &HousingConfig) -> Result<RunReport> {
    info!("extracting sources");
    let extracted = extract(config)?;
    let dump_rows = extracted.dump.len();
    let csv_rows = extracted.csv_houses.len();
    let spreadsheet_rows = extracted.sheet_prices.len();

    info!(broken_rows = ?config.broken_rows, "reconciling records");
    let reconciled = reconcile(extracted, &config.broken_rows)?;

    let schema = schema_script(config)?;
    let mut conn = db::open_store(&config.store).await?;
    let load = load(&mut conn, &schema, &reconciled).await?;
    conn.close().await?;

    Ok(RunReport {
        dump_rows,
        csv_rows,
        spreadsheet_rows,
        load,
    })
}
