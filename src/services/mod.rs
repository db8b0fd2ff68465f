pub mod calendar;
pub mod clock;
pub mod completion_store;
pub mod pipeline;
pub mod provider;
pub mod rate_limiter;
pub mod scheduler;
pub mod signals;
pub mod sqlite_store;

pub use calendar::{HolidayCalendar, MarketCalendar};
pub use clock::{Clock, FixedClock, SystemClock};
pub use completion_store::{CompletionStore, MemoryCompletionStore};
pub use pipeline::{CycleOutcome, SignalPipeline};
pub use provider::{IndicatorProvider, StaticIndicatorProvider};
pub use rate_limiter::TokenBucket;
pub use scheduler::{auto_select, DayStatus, ExchangeConfig, TimeframeScheduler};
pub use signals::{
    evaluate, ScanFailure, ScanReport, ScannerConfig, SelectionConstraint, SignalScanner,
    SignalSelector, UniverseEntry,
};
pub use sqlite_store::SqliteCompletionStore;
