//! Per-day timeframe completion tracking.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::StoreError;
use crate::types::{DailyExecutionRecord, MarkOutcome, Timeframe};

/// Persistence for daily completion records.
///
/// `mark_complete` must be an atomic read-modify-write keyed by date: when
/// two callers race on the same timeframe, exactly one sees
/// [`MarkOutcome::Marked`] and the other [`MarkOutcome::AlreadyComplete`].
#[async_trait]
pub trait CompletionStore: Send + Sync {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyExecutionRecord>, StoreError>;

    async fn mark_complete(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, StoreError>;
}

/// In-process store; the dashmap shard lock makes each mark atomic.
#[derive(Debug, Default)]
pub struct MemoryCompletionStore {
    records: DashMap<NaiveDate, DailyExecutionRecord>,
}

impl MemoryCompletionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of days with at least one completion.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CompletionStore for MemoryCompletionStore {
    async fn get(&self, date: NaiveDate) -> Result<Option<DailyExecutionRecord>, StoreError> {
        Ok(self.records.get(&date).map(|r| r.value().clone()))
    }

    async fn mark_complete(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, StoreError> {
        let mut entry = self
            .records
            .entry(date)
            .or_insert_with(|| DailyExecutionRecord::new(date));

        if entry.mark(timeframe, at) {
            Ok(MarkOutcome::Marked)
        } else {
            debug!("{} already complete for {}", timeframe, date);
            Ok(MarkOutcome::AlreadyComplete)
        }
    }
}
