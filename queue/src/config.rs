#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_concurrent: usize,
    pub job_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_concurrent: 5,
            job_timeout_ms: 30_000,
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_retries: std::env::var("EMBEDDING_QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_retries),
            base_delay_ms: std::env::var("EMBEDDING_QUEUE_BASE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.base_delay_ms),
            max_concurrent: std::env::var("EMBEDDING_QUEUE_MAX_CONCURRENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_concurrent),
            job_timeout_ms: std::env::var("EMBEDDING_QUEUE_JOB_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.job_timeout_ms),
        }
    }

    /// `base_delay_ms × 2^(attempt-1)`, attempt is 1-based.
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        self.base_delay_ms * 2u64.pow(attempt.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_matches_default_schedule() {
        let config = QueueConfig::default();
        assert_eq!(config.backoff_delay_ms(1), 1000);
        assert_eq!(config.backoff_delay_ms(2), 2000);
        assert_eq!(config.backoff_delay_ms(3), 4000);
    }
}
