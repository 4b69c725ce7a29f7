use crate::attendance::dates::parse_date;
use crate::attendance::Clock;
use anyhow::anyhow;
use std::path::PathBuf;

pub const ENV_LOG: &str = "ATTENDANCED_LOG";
pub const ENV_TODAY: &str = "ATTENDANCED_TODAY";
pub const ENV_WORKSPACE: &str = "ATTENDANCED_WORKSPACE";

const DEFAULT_LOG_FILTER: &str = "info";

/// Process-level settings. Workspace-level settings live in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub log_filter: String,
    pub clock: Clock,
    pub workspace: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_filter = non_empty(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let clock = match non_empty(ENV_TODAY) {
            Some(raw) => Clock::Fixed(
                parse_date(&raw)
                    .ok_or_else(|| anyhow!("{} must be YYYY-MM-DD, got {:?}", ENV_TODAY, raw))?,
            ),
            None => Clock::System,
        };
        let workspace = non_empty(ENV_WORKSPACE).map(PathBuf::from);

        Ok(Self {
            log_filter,
            clock,
            workspace,
        })
    }
}
