use std::path::PathBuf;

pub const DEFAULT_CACHE_PREFIX: &str = "ayatiin";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Process configuration read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
    /// Prefix of every local snapshot cache key.
    pub cache_prefix: String,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            workspace: non_empty("SCHOOLD_WORKSPACE").map(PathBuf::from),
            cache_prefix: non_empty("SCHOOLD_CACHE_PREFIX")
                .unwrap_or_else(|| DEFAULT_CACHE_PREFIX.to_string()),
            log_filter: non_empty("SCHOOLD_LOG")
                .or_else(|| non_empty("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}
