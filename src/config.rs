use crate::adapters::RetryPolicy;
use crate::domain::policy::{DatePolicy, Immediate, RandomBackdate};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 乱数で遡らせる場合の最大幅（貸出期間と同じ）
const BACKDATE_MAX_OFFSET_DAYS: i64 = 14;

/// 設定読み込みのエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be at least 1 millisecond")]
    ZeroTimeout { name: &'static str },

    #[error("DATE_POLICY must be `immediate` or `backdate:<seed>`, got {0:?}")]
    InvalidDatePolicy(String),
}

/// 日時決定方針の設定値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePolicyKind {
    Immediate,
    Backdate { seed: u64 },
}

impl DatePolicyKind {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("immediate") {
            return Ok(DatePolicyKind::Immediate);
        }
        raw.strip_prefix("backdate:")
            .and_then(|seed| seed.trim().parse().ok())
            .map(|seed| DatePolicyKind::Backdate { seed })
            .ok_or_else(|| ConfigError::InvalidDatePolicy(raw.to_string()))
    }

    pub fn build(&self) -> Arc<dyn DatePolicy> {
        match *self {
            DatePolicyKind::Immediate => Arc::new(Immediate),
            DatePolicyKind::Backdate { seed } => Arc::new(RandomBackdate::new(
                seed,
                ChronoDuration::days(BACKDATE_MAX_OFFSET_DAYS),
            )),
        }
    }
}

/// アプリケーション設定
///
/// すべて環境変数から読み込む。未設定の項目は既定値。
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub lock_timeout: Duration,
    pub retry: RetryPolicy,
    pub date_policy: DatePolicyKind,
}

impl Config {
    /// 環境変数から設定を読み込む
    ///
    /// - `DATABASE_URL` (postgres://localhost/library)
    /// - `DB_MAX_CONNECTIONS` (5)
    /// - `DB_ACQUIRE_TIMEOUT_MS` (3000)
    /// - `STORE_LOCK_TIMEOUT_MS` (2000)
    /// - `STORE_MAX_ATTEMPTS` (3)
    /// - `STORE_RETRY_BACKOFF_MS` (50)
    /// - `DATE_POLICY` (immediate)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の取得関数から設定を組み立てる
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { name, value }),
            }
        };

        // 0 はPostgreSQLで「待ち上限なし」を意味するため受け付けない
        let timeout = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match number(name, default)? {
                0 => Err(ConfigError::ZeroTimeout { name }),
                millis => Ok(Duration::from_millis(millis)),
            }
        };

        let max_attempts = number("STORE_MAX_ATTEMPTS", 3)?;
        let max_connections = number("DB_MAX_CONNECTIONS", 5)?;

        let date_policy = match lookup("DATE_POLICY") {
            None => DatePolicyKind::Immediate,
            Some(raw) => DatePolicyKind::parse(&raw)?,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/library".to_string()),
            max_connections: u32::try_from(max_connections).map_err(|_| {
                ConfigError::InvalidNumber {
                    name: "DB_MAX_CONNECTIONS",
                    value: max_connections.to_string(),
                }
            })?,
            acquire_timeout: timeout("DB_ACQUIRE_TIMEOUT_MS", 3000)?,
            lock_timeout: timeout("STORE_LOCK_TIMEOUT_MS", 2000)?,
            retry: RetryPolicy::new(
                u32::try_from(max_attempts).unwrap_or(u32::MAX),
                Duration::from_millis(number("STORE_RETRY_BACKOFF_MS", 50)?),
            ),
            date_policy,
        })
    }
}
