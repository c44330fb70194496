//! Board configuration loaded from the environment.
//!
//! # 環境変数
//! - `TASKBOARD_RESYNC`: settle のたびに全件 resync するか（default: true）
//! - `TASKBOARD_COMPENSATE_MOVES`: move の reorder が失敗したとき completed を戻すか（default: true）
//! - `TASKBOARD_SORT`: 初期の表示ソート（未設定なら手動順）
//! - `TASKBOARD_CATEGORIES`: カテゴリ候補（カンマ区切り）
//! - `TASKBOARD_LATENCY_MS`: 参照ゲートウェイの応答遅延

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::domain::SortMode;

pub const DEFAULT_CATEGORIES: [&str; 4] = ["Work", "Personal", "Home", "Study"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub resync_after_settle: bool,
    pub compensate_partial_move: bool,
    pub sort: Option<SortMode>,
    pub categories: Vec<String>,
    pub latency: Duration,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            resync_after_settle: true,
            compensate_partial_move: true,
            sort: None,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            latency: Duration::ZERO,
        }
    }
}

impl BoardConfig {
    /// Read `TASKBOARD_*` variables. Unset variables take their defaults.
    ///
    /// # Errors
    /// `ConfigError::InvalidValue` when a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`BoardConfig::from_env`] with an explicit source of values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let resync_after_settle = match get("TASKBOARD_RESYNC") {
            Some(raw) => parse_bool("TASKBOARD_RESYNC", &raw)?,
            None => defaults.resync_after_settle,
        };
        let compensate_partial_move = match get("TASKBOARD_COMPENSATE_MOVES") {
            Some(raw) => parse_bool("TASKBOARD_COMPENSATE_MOVES", &raw)?,
            None => defaults.compensate_partial_move,
        };
        let sort = get("TASKBOARD_SORT")
            .map(|raw| raw.parse::<SortMode>())
            .transpose()
            .map_err(|message| ConfigError::invalid("TASKBOARD_SORT", message))?;
        let categories = match get("TASKBOARD_CATEGORIES") {
            Some(raw) => parse_categories(&raw)?,
            None => defaults.categories,
        };
        let latency = match get("TASKBOARD_LATENCY_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::invalid("TASKBOARD_LATENCY_MS", e.to_string()))?,
            None => defaults.latency,
        };

        Ok(Self {
            resync_after_settle,
            compensate_partial_move,
            sort,
            categories,
            latency,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("expected a boolean, got {other:?}"))),
    }
}

fn parse_categories(raw: &str) -> Result<Vec<String>, ConfigError> {
    let categories: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if categories.is_empty() {
        return Err(ConfigError::invalid("TASKBOARD_CATEGORIES", "no categories given"));
    }
    Ok(categories)
}
