//! Snapshot store for auction quotes, backed by SQLite.
//!
//! One table keyed by `(fetch_date, tenor_days)`. Each successful fetch
//! upserts its rows in a single transaction; rows are never deleted. The
//! "latest" view is the row set for the maximum fetch date; "history" is the
//! whole table.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::types::{AuctionQuote, Snapshot, SnapshotLabel, FETCH_DATE_FORMAT, UNKNOWN_SESSION_DATE};

/// Table holding every stored quote.
pub const TABLE_NAME: &str = "auction_quotes";

/// Seed tenors and placeholder yields served while the store is empty.
pub const SEED_QUOTES: [(u32, f64); 4] = [(91, 26.914), (182, 27.151), (273, 26.534), (364, 24.994)];

/// Quote store on a single SQLite connection (single writer).
pub struct QuoteStore {
    db: Connection,
}

impl QuoteStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(path)?;
        // WAL lets readers see the last committed snapshot while a write is in flight.
        let mode: String = db.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("opened quote store at {} (journal_mode={mode})", path.display());
        Self::init(db)
    }

    /// An in-memory store; nothing survives the process.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self, StoreError> {
        db.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                fetch_date TEXT NOT NULL,
                tenor_days INTEGER NOT NULL,
                yield_percent REAL NOT NULL,
                session_date TEXT NOT NULL,
                PRIMARY KEY (fetch_date, tenor_days)
            );"
        ))?;
        Ok(Self { db })
    }

    /// Insert or replace `quotes` atomically.
    ///
    /// Rows are validated first; if any is invalid nothing is written. A row
    /// sharing `(fetch_date, tenor_days)` with an existing one replaces it,
    /// and within `quotes` a later row replaces an earlier one.
    pub fn upsert(&mut self, quotes: &[AuctionQuote]) -> Result<usize, StoreError> {
        if let Some(bad) = quotes.iter().find(|q| !q.is_valid()) {
            return Err(StoreError::InvalidQuote {
                tenor_days: bad.tenor_days,
                yield_percent: bad.yield_percent,
            });
        }
        if quotes.is_empty() {
            warn!("upsert called with no rows; nothing to store");
            return Ok(0);
        }

        let tx = self.db.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {TABLE_NAME} (fetch_date, tenor_days, yield_percent, session_date)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (fetch_date, tenor_days) DO UPDATE SET
                    yield_percent = excluded.yield_percent,
                    session_date = excluded.session_date"
            ))?;
            for quote in quotes {
                stmt.execute(params![
                    quote.fetch_date.format(FETCH_DATE_FORMAT).to_string(),
                    quote.tenor_days,
                    quote.yield_percent,
                    quote.session_date,
                ])?;
            }
        }
        tx.commit()?;

        info!(rows = quotes.len(), "stored auction quotes");
        Ok(quotes.len())
    }

    /// Rows for the most recent fetch date, or the seed set if the store is empty.
    pub fn latest(&self) -> Result<Snapshot, StoreError> {
        let latest: Option<String> = self
            .db
            .query_row(&format!("SELECT MAX(fetch_date) FROM {TABLE_NAME}"), [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();

        let Some(raw_date) = latest else {
            debug!("store is empty; serving seed data");
            return Ok(seed_snapshot());
        };
        let fetch_date = parse_fetch_date(&raw_date)?;

        let quotes = self.query(
            &format!(
                "SELECT fetch_date, tenor_days, yield_percent, session_date FROM {TABLE_NAME}
                 WHERE fetch_date = ?1 ORDER BY tenor_days"
            ),
            params![raw_date],
        )?;

        Ok(Snapshot {
            quotes,
            label: SnapshotLabel::Fetched(fetch_date),
        })
    }

    /// Every stored row, ordered by fetch date then tenor.
    pub fn history(&self) -> Result<Vec<AuctionQuote>, StoreError> {
        self.query(
            &format!(
                "SELECT fetch_date, tenor_days, yield_percent, session_date FROM {TABLE_NAME}
                 ORDER BY fetch_date, tenor_days"
            ),
            [],
        )
    }

    /// Distinct fetch dates, oldest first.
    pub fn fetch_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT DISTINCT fetch_date FROM {TABLE_NAME} ORDER BY fetch_date"
        ))?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter().map(|d| parse_fetch_date(d)).collect()
    }

    pub fn row_count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .db
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<AuctionQuote>, StoreError> {
        let mut stmt = self.db.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(fetch_date, tenor_days, yield_percent, session_date)| {
                Ok(AuctionQuote {
                    tenor_days,
                    yield_percent,
                    session_date,
                    fetch_date: parse_fetch_date(&fetch_date)?,
                })
            })
            .collect()
    }
}

fn parse_fetch_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, FETCH_DATE_FORMAT)
        .map_err(|e| StoreError::Corrupt(format!("fetch_date {raw:?}: {e}")))
}

/// The fallback snapshot: fixed tenors with placeholder yields.
pub fn seed_snapshot() -> Snapshot {
    Snapshot {
        quotes: SEED_QUOTES
            .iter()
            .map(|&(tenor, yield_percent)| {
                AuctionQuote::new(tenor, yield_percent, UNKNOWN_SESSION_DATE, NaiveDate::default())
            })
            .collect(),
        label: SnapshotLabel::Seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn quote(date: NaiveDate, tenor: u32, yield_percent: f64) -> AuctionQuote {
        AuctionQuote::new(tenor, yield_percent, "06/07/2025", date)
    }

    #[test]
    fn test_empty_store_serves_seed() {
        let store = QuoteStore::open_in_memory().unwrap();
        let snapshot = store.latest().unwrap();
        assert_eq!(snapshot.label, SnapshotLabel::Seed);
        assert!(snapshot.label.to_string().contains("[seed]"));
        assert_eq!(snapshot.tenors(), vec![91, 182, 273, 364]);
        assert!(snapshot.quotes.iter().all(|q| q.yield_percent > 0.0));
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_idempotent() {
        let mut store = QuoteStore::open_in_memory().unwrap();
        let rows = vec![quote(day(6), 91, 27.5), quote(day(6), 182, 27.1)];

        store.upsert(&rows).unwrap();
        let once = store.latest().unwrap();
        store.upsert(&rows).unwrap();
        let twice = store.latest().unwrap();

        assert_eq!(once, twice);
        assert_eq!(store.row_count().unwrap(), 2);
    }

    #[test]
    fn test_replace_on_conflict() {
        let mut store = QuoteStore::open_in_memory().unwrap();
        store.upsert(&[quote(day(6), 91, 25.0)]).unwrap();
        store.upsert(&[quote(day(6), 91, 26.0)]).unwrap();

        let snapshot = store.latest().unwrap();
        assert_eq!(snapshot.quotes.len(), 1);
        assert_eq!(snapshot.yield_for(91), Some(26.0));
    }

    #[test]
    fn test_later_row_in_batch_wins() {
        let mut store = QuoteStore::open_in_memory().unwrap();
        store
            .upsert(&[quote(day(6), 91, 27.0), quote(day(6), 91, 27.9)])
            .unwrap();
        assert_eq!(store.latest().unwrap().yield_for(91), Some(27.9));
    }

    #[test]
    fn test_latest_uses_max_fetch_date_and_history_keeps_all() {
        let mut store = QuoteStore::open_in_memory().unwrap();
        store
            .upsert(&[quote(day(6), 91, 27.0), quote(day(6), 182, 27.2)])
            .unwrap();
        store.upsert(&[quote(day(8), 91, 26.5)]).unwrap();

        let snapshot = store.latest().unwrap();
        assert_eq!(snapshot.label, SnapshotLabel::Fetched(day(8)));
        assert_eq!(snapshot.quotes.len(), 1);

        let history = store.history().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].fetch_date, day(6));
        assert_eq!(history[2].fetch_date, day(8));
        assert_eq!(store.fetch_dates().unwrap(), vec![day(6), day(8)]);
    }

    #[test]
    fn test_invalid_row_writes_nothing() {
        let mut store = QuoteStore::open_in_memory().unwrap();
        let err = store
            .upsert(&[quote(day(6), 91, 27.0), quote(day(6), 182, 0.0)])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuote { tenor_days: 182, .. }));
        assert_eq!(store.row_count().unwrap(), 0);
        assert!(store.latest().unwrap().label.is_seed());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quotes.db");
        {
            let mut store = QuoteStore::open(&path).unwrap();
            store.upsert(&[quote(day(6), 364, 25.043)]).unwrap();
        }
        let store = QuoteStore::open(&path).unwrap();
        let snapshot = store.latest().unwrap();
        assert_eq!(snapshot.label, SnapshotLabel::Fetched(day(6)));
        assert_eq!(snapshot.yield_for(364), Some(25.043));
    }

    #[test]
    fn test_schema_columns() {
        let store = QuoteStore::open_in_memory().unwrap();
        let mut stmt = store
            .db
            .prepare(&format!("SELECT name, pk FROM pragma_table_info('{TABLE_NAME}') ORDER BY cid"))
            .unwrap();
        let columns: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            columns,
            vec![
                ("fetch_date".to_string(), 1),
                ("tenor_days".to_string(), 2),
                ("yield_percent".to_string(), 0),
                ("session_date".to_string(), 0),
            ]
        );
    }
}
