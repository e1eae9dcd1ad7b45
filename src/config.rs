use std::path::PathBuf;

use chrono::NaiveTime;

use crate::confirm::LlmConfig;
use crate::model::WorkingHours;

/// Server settings, read from `SLOTBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub metrics_port: Option<u16>,
    pub working_hours: WorkingHours,
    pub static_dir: PathBuf,
    /// Load the two reference meetings on 2025-10-22 at startup.
    pub seed_demo: bool,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidTime { var: &'static str, value: String },
    EmptyWorkingHours { start: NaiveTime, end: NaiveTime },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidTime { var, value } => {
                write!(f, "{var}: expected HH:MM, got {value:?}")
            }
            ConfigError::EmptyWorkingHours { start, end } => {
                write!(f, "working hours start {start} must be before end {end}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = WorkingHours::default();
        let start = parse_time(&get, "SLOTBOOK_WORK_START", defaults.start)?;
        let end = parse_time(&get, "SLOTBOOK_WORK_END", defaults.end)?;
        let working_hours =
            WorkingHours::new(start, end).ok_or(ConfigError::EmptyWorkingHours { start, end })?;

        let llm = LlmConfig {
            api_key: get("OPENROUTER_API_KEY").filter(|k| !k.trim().is_empty()),
            url: get("SLOTBOOK_LLM_URL").unwrap_or_else(|| crate::confirm::DEFAULT_LLM_URL.into()),
            model: get("SLOTBOOK_LLM_MODEL")
                .unwrap_or_else(|| crate::confirm::DEFAULT_LLM_MODEL.into()),
            timeout_secs: get("SLOTBOOK_LLM_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        };

        Ok(Self {
            bind: get("SLOTBOOK_BIND").unwrap_or_else(|| "0.0.0.0".into()),
            port: get("SLOTBOOK_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            metrics_port: get("SLOTBOOK_METRICS_PORT").and_then(|s| s.parse().ok()),
            working_hours,
            static_dir: get("SLOTBOOK_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./static")),
            seed_demo: get("SLOTBOOK_SEED_DEMO")
                .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes")),
            llm,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_time(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: NaiveTime,
) -> Result<NaiveTime, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map_err(|_| ConfigError::InvalidTime { var, value }),
    }
}
