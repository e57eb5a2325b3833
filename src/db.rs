// 🗄️ Store - Schema reset + bulk load over one owned connection
//
// Order of a run:
//   1. drop_all_tables        (tolerates missing tables)
//   2. execute_schema_script  (one statement at a time)
//   3. load_db                (houses, prices, furnishing lookup)
//
// Loading is not idempotent: a second load without a reset hits the
// primary keys of house_data and furnishing_status.
//
// The store is reached through sqlx's Any driver: MySQL in production,
// SQLite for local runs and tests. SQL here sticks to what both accept.

use crate::config::StoreConfig;
use crate::records::{FurnishingStatus, HousePriceRecord, HouseRecord};
use anyhow::{bail, Context, Result};
use sqlx::{AnyConnection, Connection};
use std::path::Path;
use tracing::{debug, info};

/// Schema shipped with the crate (sql/create_tables.sql)
pub const DEFAULT_SCHEMA: &str = include_str!("../sql/create_tables.sql");

/// Destination tables, dependents first
pub const TABLES_IN_DROP_ORDER: [&str; 3] = ["house_price_data", "furnishing_status", "house_data"];

/// Rows written by one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub houses: usize,
    pub prices: usize,
    pub furnishing_statuses: usize,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.houses + self.prices + self.furnishing_statuses
    }
}

// ============================================================================
// CONNECTION
// ============================================================================

/// Open the single connection used for the whole run
pub async fn open_store(store: &StoreConfig) -> Result<AnyConnection> {
    sqlx::any::install_default_drivers();

    let conn = AnyConnection::connect(&store.url())
        .await
        .with_context(|| format!("Failed to connect to store {}", store))?;

    info!(store = %store, backend = conn.backend_name(), "connected to store");
    Ok(conn)
}

// ============================================================================
// SCHEMA
// ============================================================================

pub async fn drop_all_tables(conn: &mut AnyConnection) -> Result<()> {
    for table in TABLES_IN_DROP_ORDER {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to drop table {}", table))?;
    }
    info!("dropped all tables");
    Ok(())
}

/// Split a script on `;` into executable statements.
///
/// `--` comment lines are removed first so that comment-only fragments
/// never reach the database.
pub fn split_statements(script: &str) -> Vec<String> {
    let without_comments: String = script
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

/// Execute every statement of `script` in order; returns how many ran
pub async fn execute_schema_script(conn: &mut AnyConnection, script: &str) -> Result<usize> {
    let statements = split_statements(script);
    for (index, statement) in statements.iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to execute schema statement {}", index + 1))?;
    }
    Ok(statements.len())
}

pub async fn execute_sql_file(conn: &mut AnyConnection, sql_path: &Path) -> Result<usize> {
    let script = std::fs::read_to_string(sql_path)
        .with_context(|| format!("Failed to read SQL file: {}", sql_path.display()))?;

    let executed = execute_schema_script(conn, &script)
        .await
        .with_context(|| format!("Failed to execute SQL file: {}", sql_path.display()))?;

    info!(file = %sql_path.display(), statements = executed, "executed sql file");
    Ok(executed)
}

/// Drop every destination table, then recreate them from `script`
pub async fn reset_schema(conn: &mut AnyConnection, script: &str) -> Result<usize> {
    drop_all_tables(conn).await?;
    let executed = execute_schema_script(conn, script).await?;
    info!(statements = executed, "schema recreated");
    Ok(executed)
}

// ============================================================================
// BULK LOAD
// ============================================================================

pub async fn insert_house_records(conn: &mut AnyConnection, houses: &[HouseRecord]) -> Result<usize> {
    let mut tx = conn.begin().await?;

    for house in houses {
        sqlx::query(
            "INSERT INTO house_data (
                house_id, n_bedroom, n_bathroom, n_stories, n_parking_slot,
                is_mainroad, has_guestroom, has_basement, has_hot_water,
                has_air_conditioning, is_pref_area, furnishing_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(house.house_id)
        .bind(house.n_bedroom)
        .bind(house.n_bathroom)
        .bind(house.n_stories)
        .bind(house.n_parking_slot)
        .bind(house.is_mainroad)
        .bind(house.has_guestroom)
        .bind(house.has_basement)
        .bind(house.has_hot_water)
        .bind(house.has_air_conditioning)
        .bind(house.is_pref_area)
        .bind(house.furnishing_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert house {}", house.house_id))?;
    }
    tx.commit().await?;

    debug!(rows = houses.len(), "inserted house_data batch");
    Ok(houses.len())
}

pub async fn insert_house_price_records(
    conn: &mut AnyConnection,
    prices: &[HousePriceRecord],
) -> Result<usize> {
    let mut tx = conn.begin().await?;

    for price in prices {
        sqlx::query("INSERT INTO house_price_data (house_id, price, area) VALUES (?, ?, ?)")
            .bind(price.house_id)
            .bind(price.price)
            .bind(price.area)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert price for house {}", price.house_id))?;
    }
    tx.commit().await?;

    debug!(rows = prices.len(), "inserted house_price_data batch");
    Ok(prices.len())
}

/// Seed the furnishing lookup table with every known status
pub async fn seed_furnishing_status(conn: &mut AnyConnection) -> Result<usize> {
    let mut tx = conn.begin().await?;

    for status in FurnishingStatus::ALL {
        sqlx::query("INSERT INTO furnishing_status (furnishing_id, furnishing_status) VALUES (?, ?)")
            .bind(status.code())
            .bind(status.label())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert furnishing status {}", status.label()))?;
    }
    tx.commit().await?;

    Ok(FurnishingStatus::ALL.len())
}

/// Write merged records and the lookup table, one commit per batch
pub async fn load_db(
    conn: &mut AnyConnection,
    houses: &[HouseRecord],
    prices: &[HousePriceRecord],
) -> Result<LoadReport> {
    let report = LoadReport {
        houses: insert_house_records(conn, houses).await?,
        prices: insert_house_price_records(conn, prices).await?,
        furnishing_statuses: seed_furnishing_status(conn).await?,
    };

    info!(
        houses = report.houses,
        prices = report.prices,
        furnishing_statuses = report.furnishing_statuses,
        "successfully loaded data into the store"
    );
    Ok(report)
}

pub async fn count_rows(conn: &mut AnyConnection, table: &str) -> Result<i64> {
    if !TABLES_IN_DROP_ORDER.contains(&table) {
        bail!("Unknown table: {}", table);
    }
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
