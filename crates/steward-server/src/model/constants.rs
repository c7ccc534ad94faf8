// Configuration keys and defaults

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";
pub const ENV_PREFIX: &str = "STEWARD";
pub const ENV_SEPARATOR: &str = "__";

pub const PERSISTENCE_MODE: &str = "steward.persistence.mode";

pub const DB_URL: &str = "steward.db.url";
pub const DB_MAX_CONNECTIONS: &str = "steward.db.max_connections";
pub const DB_MIN_CONNECTIONS: &str = "steward.db.min_connections";
pub const DB_CONNECT_TIMEOUT_SECS: &str = "steward.db.connect_timeout_secs";
pub const DB_SQLX_LOGGING: &str = "steward.db.sqlx_logging";
pub const DEFAULT_DB_MAX_CONNECTIONS: i64 = 20;
pub const DEFAULT_DB_MIN_CONNECTIONS: i64 = 1;
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: i64 = 30;

pub const CACHE_TTL_SECS: &str = "steward.cache.ttl_secs";
pub const CACHE_MAX_CAPACITY: &str = "steward.cache.max_capacity";

pub const LOCK_NAMESPACE: &str = "steward.lock.namespace";
pub const LOCK_TTL_MS: &str = "steward.lock.ttl_ms";
pub const LOCK_WAIT_MS: &str = "steward.lock.wait_ms";
pub const LOCK_CLEANUP_INTERVAL_MS: &str = "steward.lock.cleanup_interval_ms";

pub const COORDINATOR_LOCAL_GATE: &str = "steward.coordinator.local_gate";

pub const IDENTITY_CREDENTIALS: &str = "steward.identity.credentials";

pub const LOGS_PATH: &str = "steward.logs.path";
pub const LOGS_LEVEL: &str = "steward.logs.level";
pub const LOGS_CONSOLE: &str = "steward.logs.console";
pub const LOGS_FILE: &str = "steward.logs.file";
