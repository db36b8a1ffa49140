use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::common::{IngestError, IngestResult};
use crate::transaction::{RecordSet, TransactionRecord};

/// pfinance binary version
const PFINANCE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bumped whenever the layout of the tables below changes. Stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

const BUNDLED_SCHEMA: &str = include_str!("../../schema/schema.sql");

/// Tables the schema must create, in an order they can be dropped in
const STORE_TABLES: [&str; 4] = ["ledger_entries", "imports", "ledgers", "metadata"];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StoreState {
    /// The file is new, empty, or was written with a different schema
    Uninitialized,
    Initialized,
}

/// Where an import came from, recorded together with the table it was merged into
#[derive(Debug, Clone)]
pub(crate) struct ImportReceipt {
    pub(crate) file_name: String,
    pub(crate) file_md5: String,
    pub(crate) record_count: usize,
}

/// SQLite backed store of named ledger tables.
/// The connection is closed when the database is dropped, or explicitly through `close`.
pub(crate) struct Database {
    conn: Connection,
    path: PathBuf,
    schema_file: Option<PathBuf>,
    state: StoreState,
}

impl Database {
    /// Open the database at `path`, creating the file if needed. The schema is not applied
    /// until the first write or an explicit `ensure_initialized`.
    pub(crate) fn open(path: &Path, schema_file: Option<PathBuf>) -> IngestResult<Database> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;

        let state = if has_schema(&conn) { StoreState::Initialized } else { StoreState::Uninitialized };
        if state == StoreState::Initialized {
            let version: Option<String> = conn
                .query_row("SELECT value FROM metadata WHERE key = 'version'", [], |row| row.get(0))
                .optional()?;
            info!("Database version {}", version.as_deref().unwrap_or("unknown"));
        }

        Ok(Database {
            conn,
            path: path.to_path_buf(),
            schema_file,
            state,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn state(&self) -> StoreState {
        self.state
    }

    /// Whether the schema has been applied to the database file
    pub(crate) fn exists(&self) -> bool {
        self.state == StoreState::Initialized
    }

    /// Create the schema in a database file that holds none of our tables yet.
    /// Tables written with another schema are kept until `replace` rebuilds them,
    /// so they are only dropped together with a successful write.
    pub(crate) fn ensure_initialized(&mut self) -> IngestResult<()> {
        if self.exists() {
            return Ok(());
        }
        if holds_store_tables(&self.conn)? {
            info!("Database {} has an outdated schema, it is rebuilt on the next write", self.path.display());
            return Ok(());
        }

        info!("Initialising database {}", self.path.display());
        let schema = self.schema_sql()?;
        let tx = self.conn.transaction()?;
        apply_schema(&tx, &schema)?;
        tx.commit()?;

        self.state = StoreState::Initialized;
        Ok(())
    }

    /// Names of every table, in alphabetical order
    pub(crate) fn tables(&self) -> IngestResult<Vec<String>> {
        if !self.exists() {
            return Ok(vec![]);
        }

        let mut stmt = self.conn.prepare("SELECT name FROM ledgers ORDER BY name")?;
        let names = stmt.query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Read every record of `table` in stored order.
    /// Returns `None` when the table does not exist or cannot be decoded.
    pub(crate) fn read(&self, table: &str) -> Option<RecordSet> {
        if !self.exists() {
            info!("Database {} has no tables yet", self.path.display());
            return None;
        }

        match self.query_entries(table) {
            Ok(records) => records,
            Err(e) => {
                warn!("Unable to read table '{}', treating it as absent: {}", table, e);
                None
            }
        }
    }

    fn query_entries(&self, table: &str) -> rusqlite::Result<Option<RecordSet>> {
        let found = self.conn
            .query_row("SELECT 1 FROM ledgers WHERE name = ?1", params![table], |_| Ok(()))
            .optional()?;
        if found.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT transaction_date, category, description, amount, balance
             FROM ledger_entries WHERE ledger = ?1 ORDER BY position")?;
        let records = stmt.query_map(params![table], decode_entry)?
            .collect::<rusqlite::Result<Vec<TransactionRecord>>>()?;

        Ok(Some(RecordSet::new(records)))
    }

    /// Overwrite `table` with `records` in one transaction, creating the table if needed.
    /// A mismatched schema is rebuilt first. On failure the database is left untouched.
    pub(crate) fn replace(&mut self, table: &str, records: &RecordSet, receipt: Option<&ImportReceipt>) -> IngestResult<()> {
        let schema = match self.state {
            StoreState::Initialized => None,
            StoreState::Uninitialized => Some(self.schema_sql()?),
        };

        let tx = self.conn.transaction()?;
        if let Some(schema) = schema {
            info!("Applying schema to {}", self.path.display());
            apply_schema(&tx, &schema)?;
        }

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO ledgers (name, created_at, updated_at) VALUES (?1, ?2, ?2)
             ON CONFLICT (name) DO UPDATE SET updated_at = excluded.updated_at",
            params![table, now])?;
        let removed = tx.execute("DELETE FROM ledger_entries WHERE ledger = ?1", params![table])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO ledger_entries (ledger, position, transaction_date, category, description, amount, balance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")?;
            for (position, r) in records.iter().enumerate() {
                stmt.execute(params![
                    table,
                    position as i64,
                    r.transaction_date.format(DATE_FORMAT).to_string(),
                    r.category,
                    r.description,
                    r.amount.to_string(),
                    r.balance.map(|b| b.to_string()),
                ])?;
            }
        }

        if let Some(receipt) = receipt {
            tx.execute(
                "INSERT INTO imports (ledger, file_name, file_md5, record_count, imported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![table, receipt.file_name, receipt.file_md5, receipt.record_count as i64, now])?;
        }

        tx.commit()?;
        self.state = StoreState::Initialized;
        info!("Replaced {} entries of table '{}' with {}", removed, table, records.len());

        Ok(())
    }

    /// When a file with this checksum was last imported into `table`
    pub(crate) fn previous_import(&self, table: &str, file_md5: &str) -> Option<String> {
        if !self.exists() {
            return None;
        }

        self.conn
            .query_row(
                "SELECT imported_at FROM imports WHERE ledger = ?1 AND file_md5 = ?2 ORDER BY id DESC LIMIT 1",
                params![table, file_md5],
                |row| row.get(0))
            .optional()
            .unwrap_or_else(|e| {
                warn!("Unable to read import history: {}", e);
                None
            })
    }

    pub(crate) fn close(self) -> IngestResult<()> {
        self.conn.close().map_err(|(_, e)| IngestError::Store(e))
    }

    fn schema_sql(&self) -> IngestResult<String> {
        match &self.schema_file {
            Some(path) => fs::read_to_string(path)
                .map_err(|source| IngestError::Schema { path: path.clone(), source }),
            None => Ok(BUNDLED_SCHEMA.to_string()),
        }
    }
}

fn count_store_tables(conn: &Connection) -> rusqlite::Result<i64> {
    let sql = format!(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN ({})",
        STORE_TABLES.iter().map(|t| format!("'{t}'")).collect::<Vec<String>>().join(", "));
    conn.query_row(&sql, [], |row| row.get(0))
}

fn holds_store_tables(conn: &Connection) -> rusqlite::Result<bool> {
    Ok(count_store_tables(conn)? > 0)
}

fn has_schema(conn: &Connection) -> bool {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0));
    let tables = count_store_tables(conn);

    matches!((version, tables), (Ok(SCHEMA_VERSION), Ok(n)) if n == STORE_TABLES.len() as i64)
}

/// Drop whatever is left of a previous schema and create the tables from `schema`
fn apply_schema(conn: &Connection, schema: &str) -> IngestResult<()> {
    for table in STORE_TABLES {
        conn.execute(&format!("DROP TABLE IF EXISTS {table}"), [])?;
    }
    conn.execute_batch(schema)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    if !has_schema(conn) {
        return Err(IngestError::SchemaIncomplete(STORE_TABLES.join(", ")));
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('version', ?1)",
        params![PFINANCE_VERSION])?;
    Ok(())
}

fn decode_entry(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let date: String = row.get(0)?;
    let transaction_date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| conversion_error(0, e))?;
    let amount: String = row.get(3)?;
    let amount = Decimal::from_str(&amount).map_err(|e| conversion_error(3, e))?;
    let balance = row.get::<_, Option<String>>(4)?
        .map(|b| Decimal::from_str(&b))
        .transpose()
        .map_err(|e| conversion_error(4, e))?;

    Ok(TransactionRecord {
        transaction_date,
        category: row.get(1)?,
        description: row.get(2)?,
        amount,
        balance,
    })
}

fn conversion_error<E: std::error::Error + Send + Sync + 'static>(column: usize, e: E) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}
