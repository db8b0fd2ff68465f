use chrono::NaiveTime;
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::scheduler::ExchangeConfig;
use crate::services::signals::{ScannerConfig, UniverseEntry};
use crate::types::{AssetClass, AssetProfile, AssetProfiles, Timeframe};

const DEFAULT_UNIVERSE: &str = "AAPL:equity,MSFT:equity,BTC:crypto";

/// Provider rate limiting.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Sustained provider calls per second.
    pub rate_per_sec: f64,
    /// Calls allowed back-to-back before throttling kicks in.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: 5.0,
            burst: 5,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Exchange session and calendar behaviour.
    pub exchange: ExchangeConfig,
    /// Scan worker pool and timeouts.
    pub scanner: ScannerConfig,
    pub rate_limit: RateLimitConfig,
    /// Scoring thresholds, multipliers and strength bars per asset class.
    pub profiles: AssetProfiles,
    /// SQLite file for daily completion records.
    pub completion_db_path: PathBuf,
    /// JSON snapshot file for the static indicator provider.
    pub snapshot_file: Option<PathBuf>,
    /// Symbols to scan.
    pub universe: Vec<UniverseEntry>,
    /// Explicit timeframe; `None` lets the scheduler pick.
    pub requested_timeframe: Option<Timeframe>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timezone = match var("EXCHANGE_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::UnknownTimezone(name.clone()))?,
            None => chrono_tz::America::New_York,
        };

        let defaults = ExchangeConfig::default();
        let exchange = ExchangeConfig {
            timezone,
            market_open: parse_time("MARKET_OPEN", var("MARKET_OPEN"))?
                .unwrap_or(defaults.market_open),
            market_close: parse_time("MARKET_CLOSE", var("MARKET_CLOSE"))?
                .unwrap_or(defaults.market_close),
            open_grace_minutes: parse_or("OPEN_GRACE_MINUTES", var("OPEN_GRACE_MINUTES"), 30)?,
            block_on_unknown_calendar: parse_bool(
                "BLOCK_ON_UNKNOWN_CALENDAR",
                var("BLOCK_ON_UNKNOWN_CALENDAR"),
            )?,
        };
        match exchange.checked_window_start() {
            None => {
                return Err(ConfigError::InvalidValue {
                    key: "OPEN_GRACE_MINUTES".to_string(),
                    value: format!(
                        "{} minutes after {} runs past midnight",
                        exchange.open_grace_minutes, exchange.market_open
                    ),
                });
            }
            Some(start) if start >= exchange.market_close => {
                return Err(ConfigError::InvalidValue {
                    key: "MARKET_CLOSE".to_string(),
                    value: format!(
                        "{} is not after the signal window start {}",
                        exchange.market_close, start
                    ),
                });
            }
            Some(_) => {}
        }

        let scan_deadline_ms: u64 = parse_or("SCAN_DEADLINE_MS", var("SCAN_DEADLINE_MS"), 120_000)?;
        let scanner = ScannerConfig {
            concurrency: parse_or("SCAN_CONCURRENCY", var("SCAN_CONCURRENCY"), 4usize)?.max(1),
            per_call_timeout: Duration::from_millis(parse_or(
                "PROVIDER_TIMEOUT_MS",
                var("PROVIDER_TIMEOUT_MS"),
                10_000u64,
            )?),
            // 0 disables the whole-scan deadline
            scan_deadline: (scan_deadline_ms > 0).then(|| Duration::from_millis(scan_deadline_ms)),
        };

        let rate_limit = RateLimitConfig {
            rate_per_sec: parse_or("PROVIDER_RATE_PER_SEC", var("PROVIDER_RATE_PER_SEC"), 5.0)?,
            burst: parse_or("PROVIDER_BURST", var("PROVIDER_BURST"), 5u32)?,
        };
        if !(rate_limit.rate_per_sec.is_finite() && rate_limit.rate_per_sec > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "PROVIDER_RATE_PER_SEC".to_string(),
                value: rate_limit.rate_per_sec.to_string(),
            });
        }

        let mut equity = AssetProfile::equity();
        equity.min_strength = parse_strength(
            "MIN_STRENGTH_EQUITY",
            var("MIN_STRENGTH_EQUITY"),
            equity.min_strength,
        )?;
        let mut crypto = AssetProfile::crypto();
        crypto.min_strength = parse_strength(
            "MIN_STRENGTH_CRYPTO",
            var("MIN_STRENGTH_CRYPTO"),
            crypto.min_strength,
        )?;

        let universe = parse_universe(var("UNIVERSE").as_deref().unwrap_or(DEFAULT_UNIVERSE))?;

        let requested_timeframe = var("REQUESTED_TIMEFRAME")
            .map(|tf| tf.parse::<Timeframe>())
            .transpose()?;

        Ok(Self {
            exchange,
            scanner,
            rate_limit,
            profiles: AssetProfiles::new([equity, crypto]),
            completion_db_path: var("COMPLETION_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tipster.db")),
            snapshot_file: var("SNAPSHOT_FILE").map(PathBuf::from),
            universe,
            requested_timeframe,
        })
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.trim().parse().map_err(|_| invalid(key, &v)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, &v)),
        },
    }
}

fn parse_time(key: &str, raw: Option<String>) -> Result<Option<NaiveTime>, ConfigError> {
    raw.map(|v| NaiveTime::parse_from_str(v.trim(), "%H:%M").map_err(|_| invalid(key, &v)))
        .transpose()
}

fn parse_strength(key: &str, raw: Option<String>, default: f64) -> Result<f64, ConfigError> {
    let value = parse_or(key, raw, default)?;
    if (0.0..=crate::types::MAX_STRENGTH).contains(&value) {
        Ok(value)
    } else {
        Err(invalid(key, &value.to_string()))
    }
}

/// Parse `SYMBOL:class,SYMBOL:class`. A bare symbol trades as equity.
pub fn parse_universe(raw: &str) -> Result<Vec<UniverseEntry>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (symbol, class) = match item.split_once(':') {
                Some((symbol, class)) => (symbol.trim(), class.parse::<AssetClass>()?),
                None => (item, AssetClass::Equity),
            };
            if symbol.is_empty() {
                return Err(invalid("UNIVERSE", item));
            }
            Ok(UniverseEntry::new(symbol.to_uppercase(), class))
        })
        .collect()
}
