use std::str::FromStr;

use crate::logging::LoggingConfig;
use crate::services::analysis_cache::CacheConfig;
use crate::services::llm_service::LlmConfig;
use crate::services::significance::DEFAULT_THRESHOLD_PERCENT;

/// Read `key` and parse it, falling back to `default` when unset or invalid.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct TrendProviderConfig {
    pub api_key: Option<String>,
    pub geo: String,
    pub date_range: String,
    pub timeout_secs: u64,
}

impl TrendProviderConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_opt("SERPAPI_API_KEY"),
            geo: env_or("TRENDS_GEO", "ID".to_string()),
            date_range: env_or("TRENDS_DATE_RANGE", "today 3-m".to_string()),
            timeout_secs: env_or("TRENDS_TIMEOUT_SECS", 20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bearer token required by the worker endpoints. Unset disables them.
    pub secret: Option<String>,
    pub concurrency: usize,
    pub scheduler_enabled: bool,
    pub scheduler_test_mode: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            secret: None,
            concurrency: 4,
            scheduler_enabled: true,
            scheduler_test_mode: false,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret: env_opt("WORKER_SECRET"),
            concurrency: env_or("WORKER_CONCURRENCY", defaults.concurrency),
            scheduler_enabled: env_or("JOB_SCHEDULER_ENABLED", defaults.scheduler_enabled),
            scheduler_test_mode: env_or("JOB_SCHEDULER_TEST_MODE", defaults.scheduler_test_mode),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub significance_threshold_percent: f64,
    pub trends: TrendProviderConfig,
    pub llm: LlmConfig,
    pub worker: WorkerConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string()),
            database_url: env_opt("DATABASE_URL"),
            significance_threshold_percent: env_or(
                "SIGNIFICANCE_THRESHOLD_PERCENT",
                DEFAULT_THRESHOLD_PERCENT,
            ),
            trends: TrendProviderConfig::from_env(),
            llm: LlmConfig::from_env(),
            worker: WorkerConfig::from_env(),
            cache: CacheConfig::from_env(),
            logging: LoggingConfig::from_env(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.logging.validate()?;

        if !self.significance_threshold_percent.is_finite()
            || self.significance_threshold_percent <= 0.0
        {
            return Err(format!(
                "SIGNIFICANCE_THRESHOLD_PERCENT must be positive, got {}",
                self.significance_threshold_percent
            ));
        }
        if self.worker.concurrency == 0 {
            return Err("WORKER_CONCURRENCY must be at least 1".to_string());
        }
        if self.cache.capacity == 0 {
            return Err("ANALYSIS_CACHE_CAPACITY must be at least 1".to_string());
        }
        if self.llm.max_retries == 0 {
            return Err("LLM_MAX_RETRIES must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        std::env::set_var("UMKM_TEST_ENV_OR", "not-a-number");
        assert_eq!(env_or("UMKM_TEST_ENV_OR", 7usize), 7);
        std::env::set_var("UMKM_TEST_ENV_OR", " 12 ");
        assert_eq!(env_or("UMKM_TEST_ENV_OR", 7usize), 12);
        std::env::remove_var("UMKM_TEST_ENV_OR");
    }

    #[test]
    fn test_env_opt_ignores_blank() {
        std::env::set_var("UMKM_TEST_ENV_OPT", "   ");
        assert_eq!(env_opt("UMKM_TEST_ENV_OPT"), None);
        std::env::set_var("UMKM_TEST_ENV_OPT", " rahasia\n");
        assert_eq!(env_opt("UMKM_TEST_ENV_OPT").as_deref(), Some("rahasia"));
        std::env::remove_var("UMKM_TEST_ENV_OPT");
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = AppConfig::from_env();
        config.logging.loki_enabled = false;
        config.worker.concurrency = 0;
        assert!(config.validate().is_err());
    }
}
