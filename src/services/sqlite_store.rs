//! SQLite persistence for daily completion records.
//!
//! One row per `(date, timeframe)`. The primary key makes a completion
//! write-once, so concurrent runs (including separate processes sharing
//! the file) cannot both claim the same timeframe for a day.
//!
//! Queries run on tokio's blocking pool; a busy database never stalls
//! an async worker thread.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::services::completion_store::CompletionStore;
use crate::types::{DailyExecutionRecord, MarkOutcome, Timeframe};

/// Attempts before a busy database is reported as a conflict.
const MAX_BUSY_RETRIES: u32 = 3;
const BUSY_TIMEOUT: Duration = Duration::from_secs(1);
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed [`CompletionStore`].
pub struct SqliteCompletionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCompletionStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        info!("SQLite completion store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        debug!("In-memory SQLite completion store initialized");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS timeframe_completions (
                date TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                completed_at INTEGER NOT NULL,
                PRIMARY KEY (date, timeframe)
            )",
            [],
        )?;

        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::TaskPanicked(e.to_string()))?
    }
}

fn try_mark(
    conn: &mut Connection,
    date: NaiveDate,
    timeframe: Timeframe,
    at: DateTime<Utc>,
) -> Result<MarkOutcome, StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(busy_as_conflict)?;

    let inserted = tx
        .execute(
            "INSERT OR IGNORE INTO timeframe_completions (date, timeframe, completed_at)
             VALUES (?1, ?2, ?3)",
            params![
                date.format(DATE_FORMAT).to_string(),
                timeframe.as_str(),
                at.timestamp_millis()
            ],
        )
        .map_err(busy_as_conflict)?;
    tx.commit().map_err(busy_as_conflict)?;

    Ok(if inserted == 1 {
        MarkOutcome::Marked
    } else {
        MarkOutcome::AlreadyComplete
    })
}

fn read_record(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Option<DailyExecutionRecord>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT timeframe, completed_at FROM timeframe_completions WHERE date = ?1")?;
    let rows = stmt.query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut record = DailyExecutionRecord::new(date);
    for row in rows {
        let (timeframe, millis) = row?;
        let timeframe: Timeframe = timeframe
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown timeframe {:?}", timeframe)))?;
        let at = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| StoreError::Corrupt(format!("bad timestamp {}", millis)))?;
        record.mark(timeframe, at);
    }

    if record.completed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(record))
    }
}

fn busy_as_conflict(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            StoreError::Conflict
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CompletionStore for SqliteCompletionStore {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyExecutionRecord>, StoreError> {
        self.with_conn(move |conn| read_record(conn, date)).await
    }

    async fn mark_complete(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, StoreError> {
        let mut attempt = 1;
        loop {
            let result = self
                .with_conn(move |conn| try_mark(conn, date, timeframe, at))
                .await;
            match result {
                Err(StoreError::Conflict) if attempt < MAX_BUSY_RETRIES => {
                    debug!(
                        "Completion store busy marking {} for {} (attempt {})",
                        timeframe, date, attempt
                    );
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Ok(MarkOutcome::AlreadyComplete) => {
                    debug!("{} already complete for {}", timeframe, date);
                    return Ok(MarkOutcome::AlreadyComplete);
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[tokio::test]
    async fn test_mark_and_read_back() {
        let store = SqliteCompletionStore::new_in_memory().unwrap();
        assert!(store.get(date()).await.unwrap().is_none());

        let at = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let outcome = store
            .mark_complete(date(), Timeframe::MidTerm, at)
            .await
            .unwrap();
        assert_eq!(outcome, MarkOutcome::Marked);

        let record = store.get(date()).await.unwrap().unwrap();
        assert_eq!(record.completed.get(&Timeframe::MidTerm), Some(&at));
        assert!(!record.is_complete(Timeframe::ShortTerm));
    }

    #[tokio::test]
    async fn test_second_mark_keeps_first_timestamp() {
        let store = SqliteCompletionStore::new_in_memory().unwrap();
        let first = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();

        store
            .mark_complete(date(), Timeframe::ShortTerm, first)
            .await
            .unwrap();
        let outcome = store
            .mark_complete(date(), Timeframe::ShortTerm, later)
            .await
            .unwrap();

        assert_eq!(outcome, MarkOutcome::AlreadyComplete);
        let record = store.get(date()).await.unwrap().unwrap();
        assert_eq!(record.completed[&Timeframe::ShortTerm], first);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completions.db");

        {
            let store = SqliteCompletionStore::new(&path).unwrap();
            store
                .mark_complete(date(), Timeframe::LongTerm, Utc::now())
                .await
                .unwrap();
        }

        let reopened = SqliteCompletionStore::new(&path).unwrap();
        let record = reopened.get(date()).await.unwrap().unwrap();
        assert_eq!(
            record.completed_timeframes().into_iter().collect::<Vec<_>>(),
            vec![Timeframe::LongTerm]
        );
    }

    #[tokio::test]
    async fn test_busy_database_does_not_stall_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completions.db");
        let store = Arc::new(SqliteCompletionStore::new(&path).unwrap());

        // Another writer holds the lock
        let mut holder = Connection::open(&path).unwrap();
        let tx = holder
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();

        let marking = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .mark_complete(date(), Timeframe::ShortTerm, Utc::now())
                    .await
            })
        };

        // Single-threaded runtime: timers only fire if the mark is off-thread
        let started = std::time::Instant::now();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_millis(500));

        drop(tx);
        assert_eq!(marking.await.unwrap().unwrap(), MarkOutcome::Marked);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let store = SqliteCompletionStore::new_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO timeframe_completions (date, timeframe, completed_at)
                 VALUES ('2026-03-10', 'weekly', 0)",
                [],
            )
            .unwrap();
        }

        assert!(matches!(
            store.get(date()).await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
