// Housing ETL - Core Library
// Readers, merge engine and store loader, wired together by the pipeline

pub mod config;
pub mod db;
pub mod merge;
pub mod pipeline;
pub mod records;
pub mod sources;

// Re-export commonly used types
pub use config::{ConfigError, HousingConfig, StoreConfig};
pub use db::{
    count_rows, drop_all_tables, execute_schema_script, execute_sql_file, load_db, open_store,
    reset_schema, seed_furnishing_status, LoadReport, DEFAULT_SCHEMA,
};
pub use merge::{merge_records, AnyRecord, MergeEngine, MergeError, MergeReport};
pub use pipeline::{run, Extracted, Reconciled, RunReport};
pub use records::{FurnishingStatus, HousePriceRecord, HouseRecord, Record};
pub use sources::{
    detect_source, extract_from_dump, read_house_csv, DumpExtract, HouseCsvReader,
    PriceSpreadsheetReader, SourceKind, SourceReader, SqlDumpReader,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
