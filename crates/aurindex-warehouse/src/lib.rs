//! # Aurindex Warehouse
//!
//! DuckDB-based storage layer for Aurindex.
//!
//! ## Overview
//!
//! This crate persists computed index values, generated insights, and index
//! definitions using DuckDB as the analytical database engine.
//!
//! ### Features
//!
//! - 🔒 **Secure SQL**: Parameterized queries prevent SQL injection
//! - 🔄 **Connection Pooling**: Efficient connection management per access mode
//! - 🧾 **Idempotent Writes**: Value upserts are keyed by (time, index name)
//! - ⚙️ **Versioned Schema**: Migrations applied once, tracked in-database
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aurindex_warehouse::{IndexWarehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = IndexWarehouse::open_default()?;
//!
//!     if let Some(latest) = warehouse.get_latest_index("GSOC")? {
//!         println!("GSOC = {:.2}", latest.index_value);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `index_values` | Computed values, upsert key (time, index_name) |
//! | `index_insights` | Generated insights, append-only |
//! | `index_configs` | Index definitions keyed by name |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod migrations;
mod store;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use thiserror::Error;

use aurindex_core::{
    IndexCalculator, IndexConfig, IndexMethod, IndexResult, InsightRecord, InsightResponse,
    Sentiment, Symbol, UtcDateTime,
};
use indexmap::IndexMap;

pub use duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};
pub use store::WarehouseStore;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON column could not be encoded or decoded.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// A stored row no longer satisfies the domain invariants.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for aurindex data.
    pub aurindex_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of connections in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let aurindex_home = resolve_aurindex_home();
        let db_path = aurindex_home.join("data").join("aurindex.duckdb");
        Self {
            aurindex_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// The main warehouse interface for index data storage.
#[derive(Clone)]
pub struct IndexWarehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl IndexWarehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Initialize the database schema.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Root data directory backing this warehouse.
    pub fn home(&self) -> &Path {
        self.config.aurindex_home.as_path()
    }

    /// Upsert one computed index value.
    ///
    /// A retried write with the same (time, index name) leaves exactly one
    /// row carrying the latest payload.
    ///
    /// # Security
    /// Uses parameterized queries to prevent SQL injection.
    pub fn store_index_value(&self, result: &IndexResult) -> Result<(), WarehouseError> {
        let time = result.timestamp.format_rfc3339();
        let method = result.method.as_str();
        let payload = serde_json::to_string(&result.payload)?;

        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let params: [&dyn ToSql; 6] = [
            &time,
            &result.index_name,
            &result.index_value,
            &method,
            &result.delta_24h_pct,
            &payload,
        ];
        connection.execute(
            "INSERT OR REPLACE INTO index_values \
             (time, index_name, value, method, delta_24h_pct, payload, updated_at) \
             VALUES (TRY_CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Most recent value for `index_name`, if any.
    pub fn get_latest_index(&self, index_name: &str) -> Result<Option<IndexResult>, WarehouseError> {
        let rows = self.index_history(index_name, 1)?;
        Ok(rows.into_iter().next())
    }

    /// Up to `limit` recent values for `index_name`, newest first.
    pub fn index_history(
        &self,
        index_name: &str,
        limit: usize,
    ) -> Result<Vec<IndexResult>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let sql = format!(
            "SELECT CAST(time AS VARCHAR), value, method, delta_24h_pct, payload \
             FROM index_values WHERE index_name = ? \
             ORDER BY time DESC LIMIT {limit}"
        );
        let mut statement = connection.prepare(sql.as_str())?;
        let params: [&dyn ToSql; 1] = [&index_name];
        let mut rows = statement.query(params.as_slice())?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let time: String = row.get(0)?;
            let value: f64 = row.get(1)?;
            let method: String = row.get(2)?;
            let delta_24h_pct: Option<f64> = row.get(3)?;
            let payload: String = row.get(4)?;

            results.push(IndexResult {
                index_name: index_name.to_string(),
                index_value: value,
                timestamp: parse_db_timestamp(&time)?,
                method: IndexMethod::parse(&method)
                    .map_err(|error| WarehouseError::CorruptRow(format!("index_values.method: {error}")))?,
                delta_24h_pct,
                payload: serde_json::from_str(&payload)?,
            });
        }

        Ok(results)
    }

    /// 24-hour percentage change for `index_name`: the latest persisted
    /// value against the newest value at least 24 hours old. `None` until
    /// both exist; a non-positive past level also yields `None` rather than
    /// a division error.
    pub fn get_index_delta_24h(&self, index_name: &str) -> Result<Option<f64>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;

        let params: [&dyn ToSql; 1] = [&index_name];
        let current = connection.query_row(
            "SELECT value FROM index_values \
             WHERE index_name = ? \
             ORDER BY time DESC LIMIT 1",
            params.as_slice(),
            |row| row.get::<_, f64>(0),
        );
        let current = match current {
            Ok(value) => value,
            Err(::duckdb::Error::QueryReturnedNoRows) => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let cutoff = UtcDateTime::now().minus_hours(24).format_rfc3339();
        let params: [&dyn ToSql; 2] = [&index_name, &cutoff];
        let past = connection.query_row(
            "SELECT value FROM index_values \
             WHERE index_name = ? AND time <= TRY_CAST(? AS TIMESTAMP) \
             ORDER BY time DESC LIMIT 1",
            params.as_slice(),
            |row| row.get::<_, f64>(0),
        );

        match past {
            Ok(past) if past > 0.0 => Ok(Some(IndexCalculator::compute_delta_24h(current, past))),
            Ok(_) => Ok(None),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Stored definition for `name`, if one exists.
    pub fn get_index_config(&self, name: &str) -> Result<Option<IndexConfig>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let params: [&dyn ToSql; 1] = [&name];
        let raw = connection.query_row(
            "SELECT name, base_level, weights, base_prices, base_date \
             FROM index_configs WHERE name = ?",
            params.as_slice(),
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        );

        match raw {
            Ok(raw) => Ok(Some(config_from_row(raw)?)),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Create or replace one index definition.
    ///
    /// # Security
    /// Uses parameterized queries to prevent SQL injection.
    pub fn upsert_index_config(&self, config: &IndexConfig) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        insert_config(&connection, config)
    }

    /// Store several definitions in one transaction, typically at startup.
    pub fn seed_configs(&self, configs: &[IndexConfig]) -> Result<(), WarehouseError> {
        if configs.is_empty() {
            return Ok(());
        }

        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for config in configs {
                insert_config(&connection, config)?;
            }
            Ok(())
        })();

        finalize_transaction(&connection, result)
    }

    /// All stored definitions, ordered by name.
    pub fn list_index_configs(&self) -> Result<Vec<IndexConfig>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let mut statement = connection.prepare(
            "SELECT name, base_level, weights, base_prices, base_date \
             FROM index_configs ORDER BY name",
        )?;
        let mut rows = statement.query([] as [&dyn ToSql; 0])?;

        let mut configs = Vec::new();
        while let Some(row) = rows.next()? {
            let raw = (
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            );
            configs.push(config_from_row(raw)?);
        }

        Ok(configs)
    }

    /// Append one generated insight. Rows are never overwritten.
    ///
    /// # Security
    /// Uses parameterized queries to prevent SQL injection.
    pub fn store_insights(&self, record: &InsightRecord) -> Result<(), WarehouseError> {
        let generated_at = record.generated_at.format_rfc3339();
        let notable_events = serde_json::to_string(&record.response.notable_events)?;
        let sentiment = serde_json::to_string(&record.response.sentiment)?;

        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        let params: [&dyn ToSql; 5] = [
            &record.index_name,
            &generated_at,
            &record.response.summary,
            &notable_events,
            &sentiment,
        ];
        connection.execute(
            "INSERT INTO index_insights \
             (index_name, generated_at, summary, notable_events, sentiment, created_at) \
             VALUES (?, TRY_CAST(? AS TIMESTAMP), ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Newest insight for `index_name`, if any has been generated.
    pub fn get_latest_insights(
        &self,
        index_name: &str,
    ) -> Result<Option<InsightRecord>, WarehouseError> {
        let rows = self.recent_insights(index_name, 1)?;
        Ok(rows.into_iter().next())
    }

    /// Up to `limit` recent insights for `index_name`, newest first.
    pub fn recent_insights(
        &self,
        index_name: &str,
        limit: usize,
    ) -> Result<Vec<InsightRecord>, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        let sql = format!(
            "SELECT CAST(generated_at AS VARCHAR), summary, notable_events, sentiment \
             FROM index_insights WHERE index_name = ? \
             ORDER BY generated_at DESC LIMIT {limit}"
        );
        let mut statement = connection.prepare(sql.as_str())?;
        let params: [&dyn ToSql; 1] = [&index_name];
        let mut rows = statement.query(params.as_slice())?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let generated_at: String = row.get(0)?;
            let summary: String = row.get(1)?;
            let notable_events: String = row.get(2)?;
            let sentiment: String = row.get(3)?;

            let notable_events: Vec<String> = serde_json::from_str(&notable_events)?;
            let sentiment: IndexMap<Symbol, Sentiment> = serde_json::from_str(&sentiment)?;
            let response = InsightResponse::new(summary, notable_events, sentiment)
                .map_err(|error| WarehouseError::CorruptRow(format!("index_insights: {error}")))?;

            records.push(InsightRecord::new(
                index_name,
                parse_db_timestamp(&generated_at)?,
                response,
            ));
        }

        Ok(records)
    }
}

fn insert_config(connection: &Connection, config: &IndexConfig) -> Result<(), WarehouseError> {
    let weights = serde_json::to_string(&config.weights)?;
    let base_prices = serde_json::to_string(&config.base_prices)?;

    let params: [&dyn ToSql; 5] = [
        &config.name,
        &config.base_level,
        &weights,
        &base_prices,
        &config.base_date,
    ];
    connection.execute(
        "INSERT OR REPLACE INTO index_configs \
         (name, base_level, weights, base_prices, base_date, updated_at) \
         VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
        params.as_slice(),
    )?;
    Ok(())
}

/// Rebuild a validated config from its stored columns. Re-runs the weight
/// invariants so a hand-edited row cannot smuggle in a bad basket.
fn config_from_row(
    (name, base_level, weights, base_prices, base_date): (String, f64, String, String, String),
) -> Result<IndexConfig, WarehouseError> {
    let weights: IndexMap<Symbol, f64> = serde_json::from_str(&weights)?;
    let base_prices: IndexMap<Symbol, f64> = serde_json::from_str(&base_prices)?;

    IndexConfig::new(name, base_level, weights, base_prices, base_date)
        .map_err(|error| WarehouseError::CorruptRow(format!("index_configs: {error}")))
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// `CAST(ts AS VARCHAR)` yields `YYYY-MM-DD HH:MM:SS[.ffffff]` in UTC; bring
/// it back to RFC 3339 before handing it to the domain parser.
fn parse_db_timestamp(value: &str) -> Result<UtcDateTime, WarehouseError> {
    let mut normalized = if value.contains('T') {
        value.to_string()
    } else {
        value.replacen(' ', "T", 1)
    };
    if !normalized.ends_with('Z') && !normalized.contains('+') {
        normalized.push('Z');
    }

    UtcDateTime::parse(&normalized)
        .map_err(|error| WarehouseError::CorruptRow(format!("timestamp '{value}': {error}")))
}

/// Resolve the aurindex home directory from environment or default.
fn resolve_aurindex_home() -> PathBuf {
    if let Some(path) = env::var_os("AURINDEX_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".aurindex");
    }

    PathBuf::from(".aurindex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurindex_core::AuditPayload;
    use tempfile::tempdir;

    fn open_temp_warehouse(temp: &tempfile::TempDir) -> IndexWarehouse {
        let aurindex_home = temp.path().join("aurindex-home");
        let db_path = aurindex_home.join("data").join("aurindex.duckdb");
        IndexWarehouse::open(WarehouseConfig {
            aurindex_home,
            db_path,
            max_pool_size: 2,
        })
        .expect("warehouse open")
    }

    fn sample_result(name: &str, value: f64, timestamp: &str) -> IndexResult {
        let symbol = Symbol::parse("GOLD").expect("symbol");
        IndexResult::new(
            name,
            value,
            UtcDateTime::parse(timestamp).expect("timestamp"),
            IndexMethod::LevelNormalized,
            Some(22.07),
            AuditPayload {
                prices: IndexMap::from([(symbol.clone(), 1900.12)]),
                weights: IndexMap::from([(symbol.clone(), 1.0)]),
                base_prices: IndexMap::from([(symbol, 1800.0)]),
            },
        )
        .expect("result")
    }

    #[test]
    fn stored_value_round_trips() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        let result = sample_result("GSOC", 1220.72, "2026-01-15T10:00:00Z");
        warehouse.store_index_value(&result).expect("store");

        let read_back = warehouse
            .get_latest_index("GSOC")
            .expect("read")
            .expect("row");
        assert_eq!(read_back.index_value, 1220.72);
        assert_eq!(read_back.method, IndexMethod::LevelNormalized);
        assert_eq!(read_back.timestamp, result.timestamp);
        assert_eq!(read_back.delta_24h_pct, Some(22.07));
        assert_eq!(read_back.payload, result.payload);
    }

    #[test]
    fn store_index_value_is_idempotent() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        warehouse
            .store_index_value(&sample_result("GSOC", 1216.84, "2026-01-15T10:00:00Z"))
            .expect("first store");
        warehouse
            .store_index_value(&sample_result("GSOC", 1220.72, "2026-01-15T10:00:00Z"))
            .expect("second store");

        let history = warehouse.index_history("GSOC", 10).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].index_value, 1220.72);
    }

    #[test]
    fn history_is_newest_first() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        for (value, ts) in [
            (1000.0, "2026-01-15T08:00:00Z"),
            (1010.0, "2026-01-15T09:00:00Z"),
            (1020.0, "2026-01-15T10:00:00Z"),
        ] {
            warehouse
                .store_index_value(&sample_result("GSOC", value, ts))
                .expect("store");
        }

        let history = warehouse.index_history("GSOC", 2).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].index_value, 1020.0);
        assert_eq!(history[1].index_value, 1010.0);
    }

    #[test]
    fn delta_requires_day_old_value() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        let mut recent = sample_result("GSOC", 1220.72, "2026-01-15T10:00:00Z");
        recent.timestamp = UtcDateTime::now();
        warehouse.store_index_value(&recent).expect("store");

        assert_eq!(warehouse.get_index_delta_24h("GSOC").expect("read"), None);

        let mut old = sample_result("GSOC", 1000.0, "2026-01-15T10:00:00Z");
        old.timestamp = UtcDateTime::now().minus_hours(25);
        warehouse.store_index_value(&old).expect("store");

        assert_eq!(
            warehouse.get_index_delta_24h("GSOC").expect("read"),
            Some(22.07)
        );
    }

    #[test]
    fn config_round_trip_preserves_symbol_order() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        let config = IndexConfig::default_commodity_crypto();
        warehouse.upsert_index_config(&config).expect("upsert");

        let read_back = warehouse
            .get_index_config("GSOC")
            .expect("read")
            .expect("config");
        assert_eq!(read_back, config);

        let stored_order: Vec<&str> = read_back.symbols().map(Symbol::as_str).collect();
        assert_eq!(stored_order, ["GOLD", "SILVER", "OIL", "BTC", "ETH"]);
    }

    #[test]
    fn missing_config_is_absent_not_an_error() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        assert!(warehouse.get_index_config("NOPE").expect("read").is_none());
    }

    #[test]
    fn seeded_configs_are_listed_by_name() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        let gsoc = IndexConfig::default_commodity_crypto();
        let weights = IndexMap::from([
            (Symbol::parse("BTC").expect("symbol"), 0.5),
            (Symbol::parse("ETH").expect("symbol"), 0.5),
        ]);
        let base_prices = IndexMap::from([
            (Symbol::parse("BTC").expect("symbol"), 20000.0),
            (Symbol::parse("ETH").expect("symbol"), 1000.0),
        ]);
        let crypto = IndexConfig::new("CRYPTO2", 500.0, weights, base_prices, "2024-06-01")
            .expect("config");

        warehouse
            .seed_configs(&[crypto.clone(), gsoc.clone()])
            .expect("seed");

        let listed = warehouse.list_index_configs().expect("list");
        assert_eq!(listed, vec![crypto, gsoc]);
    }

    #[test]
    fn insights_are_append_only_newest_first() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp_warehouse(&temp);

        let btc = Symbol::parse("BTC").expect("symbol");
        for (summary, ts) in [
            ("Basket steady on metals strength.", "2026-01-15T09:00:00Z"),
            ("Crypto legs drive the basket higher.", "2026-01-15T10:00:00Z"),
        ] {
            let response = InsightResponse::new(
                summary,
                vec!["BTC up sharply".to_string()],
                IndexMap::from([(btc.clone(), Sentiment::Positive)]),
            )
            .expect("response");
            warehouse
                .store_insights(&InsightRecord::new(
                    "GSOC",
                    UtcDateTime::parse(ts).expect("timestamp"),
                    response,
                ))
                .expect("store");
        }

        let latest = warehouse
            .get_latest_insights("GSOC")
            .expect("read")
            .expect("record");
        assert_eq!(latest.response.summary, "Crypto legs drive the basket higher.");
        assert_eq!(latest.response.sentiment.get(&btc), Some(&Sentiment::Positive));

        let recent = warehouse.recent_insights("GSOC", 10).expect("read");
        assert_eq!(recent.len(), 2);
        assert_eq!(
            recent[1].response.summary,
            "Basket steady on metals strength."
        );
    }
}
