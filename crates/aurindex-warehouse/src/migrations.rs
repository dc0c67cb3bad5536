use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_index_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS index_values (
    time TIMESTAMP NOT NULL,
    index_name TEXT NOT NULL,
    value DOUBLE NOT NULL,
    method TEXT NOT NULL,
    delta_24h_pct DOUBLE,
    payload TEXT NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(time, index_name)
);

CREATE TABLE IF NOT EXISTS index_insights (
    index_name TEXT NOT NULL,
    generated_at TIMESTAMP NOT NULL,
    summary TEXT NOT NULL,
    notable_events TEXT NOT NULL,
    sentiment TEXT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS index_configs (
    name TEXT PRIMARY KEY,
    base_level DOUBLE NOT NULL,
    weights TEXT NOT NULL,
    base_prices TEXT NOT NULL,
    base_date TEXT NOT NULL,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_index_values_name_time ON index_values(index_name, time);
CREATE INDEX IF NOT EXISTS idx_index_insights_name_generated ON index_insights(index_name, generated_at);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            escape_sql_string(migration.version)
        );
        let applied_count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                escape_sql_string(migration.version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
