//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `cases` - Case resolution, status and listing
//! - `statements` - Statement metadata
//! - `transactions` - Deduplicated transaction writes, case queries, bulk recategorization
//! - `aggregates` - EOD grid, summary, opportunity-to-earn, failed-statement audit rows

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod aggregates;
mod cases;
mod statements;
mod transactions;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "CASEFILE_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"casefile-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_bytes = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_bytes.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `CASEFILE_DB_KEY` to be set. The database is encrypted with
    /// SQLCipher using a key derived from the passphrase via Argon2.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool (development/testing only)
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = match passphrase {
            Some(pass) => Some(format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?)),
            None => None,
        };

        // Key and foreign keys are per-connection settings
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(pragma) = &key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "casefile_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().into_owned();

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path, suffix));
        }

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // SQLCipher sets cipher_version if encryption is active
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the ingest writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Cases (client engagements), unique by name
            CREATE TABLE IF NOT EXISTS cases (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                owner_id INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'Pending',   -- Pending, Success, Failed
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            -- One row per uploaded statement file per ingestion run
            CREATE TABLE IF NOT EXISTS statements (
                id INTEGER PRIMARY KEY,
                case_id INTEGER NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
                account_number TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                ifsc_code TEXT,
                bank_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_statements_case ON statements(case_id);

            -- statement_id is a string-typed foreign key
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                statement_id TEXT NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
                date TEXT NOT NULL,                       -- YYYY-MM-DD
                description TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount >= 0),
                type TEXT NOT NULL,                       -- credit, debit
                category TEXT NOT NULL DEFAULT 'uncategorized',
                balance REAL NOT NULL DEFAULT 0,
                bank TEXT NOT NULL DEFAULT 'unknown',
                entity TEXT NOT NULL DEFAULT 'unknown'
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_dedup
                ON transactions(statement_id, date, amount, description);
            CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category);

            -- Per-case aggregates: at most one live row per case
            CREATE TABLE IF NOT EXISTS eod (
                id INTEGER PRIMARY KEY,
                case_id INTEGER NOT NULL UNIQUE REFERENCES cases(id) ON DELETE CASCADE,
                data TEXT NOT NULL,                       -- JSON: [{"Day": 1, "Apr-2023": 1200.0}, ...]
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            CREATE TABLE IF NOT EXISTS summary (
                id INTEGER PRIMARY KEY,
                case_id INTEGER NOT NULL UNIQUE REFERENCES cases(id) ON DELETE CASCADE,
                data TEXT NOT NULL,                       -- JSON: four summary buckets
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            CREATE TABLE IF NOT EXISTS opportunity_to_earn (
                id INTEGER PRIMARY KEY,
                case_id INTEGER NOT NULL UNIQUE REFERENCES cases(id) ON DELETE CASCADE,
                home_loan_value REAL NOT NULL DEFAULT 0,
                loan_against_property REAL NOT NULL DEFAULT 0,
                business_loan REAL NOT NULL DEFAULT 0,
                term_plan REAL NOT NULL DEFAULT 0,
                general_insurance REAL NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME
            );

            -- Append-only audit trail of extraction failures
            CREATE TABLE IF NOT EXISTS failed_statements (
                id INTEGER PRIMARY KEY,
                case_id INTEGER NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
                data TEXT NOT NULL,                       -- JSON: unresolved paths + request context
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_failed_statements_case ON failed_statements(case_id);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
