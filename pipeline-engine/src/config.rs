use std::env;
use std::time::Duration;

use common::error::EmResult;
use sqlx::postgres::PgConnectOptions;

/// Process configuration, read once at start-up from environment variables via runtime
/// `std::env::var` lookups, so tests can override it per-process.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub worker_count: usize,
    pub job_lease_seconds: u64,
    pub heartbeat_seconds: u64,
    pub notify_channel_prefix: String,
    /// Opaque secret handed to the external auth collaborator; never parsed by the core.
    pub session_secret: String,
    pub http_port: u16,
}

impl Config {
    /// Load configuration from the process environment. Returns an error naming the first missing
    /// or malformed variable encountered.
    pub fn from_env() -> EmResult<Self> {
        Ok(Self {
            db_host: env::var("PE_DB_HOST")?,
            db_port: env::var("PE_DB_PORT")?.parse()?,
            db_name: env::var("PE_DB_NAME")?,
            db_user: env::var("PE_DB_USER")?,
            db_password: env::var("PE_DB_PASSWORD")?,
            db_max_connections: env::var("PE_DB_MAX_CONNECTIONS")?.parse()?,
            db_min_connections: env::var("PE_DB_MIN_CONNECTIONS")?.parse()?,
            worker_count: env::var("PE_WORKER_COUNT")?.parse()?,
            job_lease_seconds: env::var("PE_JOB_LEASE_SECONDS")?.parse()?,
            heartbeat_seconds: env::var("PE_HEARTBEAT_SECONDS")?.parse()?,
            notify_channel_prefix: env::var("PE_NOTIFY_CHANNEL_PREFIX")?,
            session_secret: env::var("PE_SESSION_SECRET")?,
            http_port: env::var("PE_HTTP_PORT")?.parse()?,
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .database(&self.db_name)
            .username(&self.db_user)
            .password(&self.db_password)
    }

    pub fn job_lease(&self) -> Duration {
        Duration::from_secs(self.job_lease_seconds)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_seconds)
    }

    /// Name of the single database async-notification channel every `PipelineRunTask` state
    /// change is published on; subscribers filter by `run_id` client-side, not by channel (spec.md
    /// §4.4, §6).
    pub fn channel_name(&self) -> &str {
        &self.notify_channel_prefix
    }
}

#[cfg(test)]
mod test {
    use super::Config;

    fn set_all_vars() {
        for (key, value) in [
            ("PE_DB_HOST", "localhost"),
            ("PE_DB_PORT", "5432"),
            ("PE_DB_NAME", "pipeline"),
            ("PE_DB_USER", "pipeline"),
            ("PE_DB_PASSWORD", "password"),
            ("PE_DB_MAX_CONNECTIONS", "10"),
            ("PE_DB_MIN_CONNECTIONS", "1"),
            ("PE_WORKER_COUNT", "4"),
            ("PE_JOB_LEASE_SECONDS", "30"),
            ("PE_HEARTBEAT_SECONDS", "10"),
            ("PE_NOTIFY_CHANNEL_PREFIX", "pr_task"),
            ("PE_SESSION_SECRET", "secret"),
            ("PE_HTTP_PORT", "8080"),
        ] {
            std::env::set_var(key, value);
        }
    }

    #[test]
    fn from_env_reads_every_variable() {
        set_all_vars();
        let config = Config::from_env().expect("config loads");
        assert_eq!(config.db_host, "localhost");
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.job_lease_seconds, 30);
    }

    #[test]
    fn from_env_fails_when_a_variable_is_missing() {
        set_all_vars();
        std::env::remove_var("PE_DB_HOST");
        assert!(Config::from_env().is_err());
        std::env::set_var("PE_DB_HOST", "localhost");
    }
}
