//! SQLite implementation of the token store

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filter::blacklist::{BlacklistEntry, BlacklistKind};

use super::{TokenRecord, TokenStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL,
    name TEXT NOT NULL,
    symbol TEXT NOT NULL,
    developer TEXT NOT NULL,
    price REAL NOT NULL,
    market_cap REAL NOT NULL,
    liquidity REAL NOT NULL,
    volume REAL NOT NULL,
    price_change_24h REAL NOT NULL,
    is_rugged INTEGER NOT NULL DEFAULT 0,
    has_fake_volume INTEGER NOT NULL DEFAULT 0,
    rugcheck_status TEXT NOT NULL,
    is_bundled_supply INTEGER NOT NULL DEFAULT 0,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tokens_address ON tokens(address);

CREATE TABLE IF NOT EXISTS blacklist (
    kind TEXT NOT NULL,
    value TEXT NOT NULL,
    gate TEXT NOT NULL,
    reason TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (kind, value)
);
"#;

/// Token history and blacklist in a single SQLite file
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;
        info!("Opened token store at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("connection mutex poisoned".to_string()))
    }
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<TokenRecord> {
    Ok(TokenRecord {
        id: Some(row.get("id")?),
        address: row.get("address")?,
        name: row.get("name")?,
        symbol: row.get("symbol")?,
        developer: row.get("developer")?,
        price: row.get("price")?,
        market_cap: row.get("market_cap")?,
        liquidity: row.get("liquidity")?,
        volume: row.get("volume")?,
        price_change_24h: row.get("price_change_24h")?,
        is_rugged: row.get("is_rugged")?,
        has_fake_volume: row.get("has_fake_volume")?,
        rugcheck_status: row.get("rugcheck_status")?,
        is_bundled_supply: row.get("is_bundled_supply")?,
        recorded_at: row.get("recorded_at")?,
    })
}

impl TokenStore for SqliteStore {
    fn append(&self, records: &[TokenRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO tokens (
                    address, name, symbol, developer,
                    price, market_cap, liquidity, volume, price_change_24h,
                    is_rugged, has_fake_volume, rugcheck_status, is_bundled_supply,
                    recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )?;

            for r in records {
                stmt.execute(params![
                    r.address,
                    r.name,
                    r.symbol,
                    r.developer,
                    r.price,
                    r.market_cap,
                    r.liquidity,
                    r.volume,
                    r.price_change_24h,
                    r.is_rugged,
                    r.has_fake_volume,
                    r.rugcheck_status,
                    r.is_bundled_supply,
                    r.recorded_at,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Appended {} token records", records.len());
        Ok(records.len())
    }

    fn history(&self) -> Result<Vec<TokenRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM tokens ORDER BY id")?;
        let records = stmt
            .query_map([], token_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn save_blacklist(&self, entries: &[BlacklistEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO blacklist (kind, value, gate, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for e in entries {
                stmt.execute(params![
                    e.kind.as_str(),
                    e.value,
                    e.gate,
                    e.reason,
                    e.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_blacklist(&self) -> Result<Vec<BlacklistEntry>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT kind, value, gate, reason, created_at FROM blacklist ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, DateTime<Utc>>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (kind, value, gate, reason, created_at) = row?;
            let kind = BlacklistKind::parse(&kind)
                .ok_or_else(|| Error::Storage(format!("unknown blacklist kind {:?}", kind)))?;
            entries.push(BlacklistEntry {
                kind,
                value,
                gate,
                reason,
                created_at,
            });
        }
        Ok(entries)
    }
}
