//! Indicator snapshot sources.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{AppError, ProviderError};
use crate::types::{IndicatorSnapshot, Timeframe};

/// Abstract interface for fetching indicator snapshots.
#[async_trait]
pub trait IndicatorProvider: Send + Sync {
    /// Fetch the current indicator snapshot for a symbol on a timeframe.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot, ProviderError>;
}

/// Provider backed by a fixed set of snapshots.
///
/// Used by the binary (loaded from a JSON file produced upstream) and by tests.
#[derive(Debug, Default, Clone)]
pub struct StaticIndicatorProvider {
    snapshots: HashMap<(String, Timeframe), IndicatorSnapshot>,
}

impl StaticIndicatorProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = IndicatorSnapshot>) -> Self {
        let mut provider = Self::new();
        for snapshot in snapshots {
            provider.insert(snapshot);
        }
        provider
    }

    /// Load a JSON array of snapshots.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let snapshots: Vec<IndicatorSnapshot> = serde_json::from_str(&raw)?;
        info!(
            "Loaded {} indicator snapshots from {}",
            snapshots.len(),
            path.as_ref().display()
        );
        Ok(Self::from_snapshots(snapshots))
    }

    pub fn insert(&mut self, snapshot: IndicatorSnapshot) {
        let key = (snapshot.symbol.to_uppercase(), snapshot.timeframe);
        self.snapshots.insert(key, snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl IndicatorProvider for StaticIndicatorProvider {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot, ProviderError> {
        self.snapshots
            .get(&(symbol.to_uppercase(), timeframe))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("{} ({})", symbol, timeframe)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_is_case_insensitive() {
        let provider = StaticIndicatorProvider::from_snapshots([IndicatorSnapshot::new(
            "aapl",
            Timeframe::ShortTerm,
            190.0,
        )]);

        let snap = provider.fetch("AAPL", Timeframe::ShortTerm).await.unwrap();
        assert_eq!(snap.price, 190.0);

        let missing = provider.fetch("AAPL", Timeframe::LongTerm).await;
        assert!(matches!(missing, Err(ProviderError::NotFound(_))));
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"symbol": "BTC", "timeframe": "mid_term", "assetClass": "crypto",
                  "price": 64000.0, "rsi": 28.5, "atr": 1200.0,
                  "macd": {{"line": 12.0, "signal": 8.0, "histogram": 4.0}}}},
                {{"symbol": "AAPL", "timeframe": "long_term", "price": 190.0}}
            ]"#
        )
        .unwrap();

        let provider = StaticIndicatorProvider::from_json_file(file.path()).unwrap();
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(
            StaticIndicatorProvider::from_json_file(file.path()),
            Err(AppError::SerdeJson(_))
        ));
    }
}
