// Metrics for the consistency layer
// Counter names are shared with the process-level exporter

use metrics::{counter, describe_counter, describe_gauge};

pub const USER_CACHE_HITS: &str = "steward_user_cache_hits_total";
pub const USER_CACHE_MISSES: &str = "steward_user_cache_misses_total";
pub const USER_CACHE_ERRORS: &str = "steward_user_cache_errors_total";
pub const USER_STORE_READS: &str = "steward_user_store_reads_total";
pub const USER_INVALIDATIONS: &str = "steward_user_invalidations_total";
pub const USER_LOGINS: &str = "steward_user_logins_total";

/// Register metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    describe_counter!(USER_CACHE_HITS, "User lookups answered from the cache");
    describe_counter!(USER_CACHE_MISSES, "User lookups not found in the cache");
    describe_counter!(
        USER_CACHE_ERRORS,
        "Cache operations that failed and were skipped"
    );
    describe_counter!(USER_STORE_READS, "User rows read from the store by id");
    describe_counter!(
        USER_INVALIDATIONS,
        "Cache entries deleted ahead of a profile commit"
    );
    describe_counter!(USER_LOGINS, "Logins by outcome");
    describe_gauge!("steward_lock_active", "Locks currently held");
    describe_counter!(
        "steward_lock_expired_total",
        "Locks reclaimed after their lease ran out"
    );
}

pub fn record_cache_hit() {
    counter!(USER_CACHE_HITS).increment(1);
}

pub fn record_cache_miss() {
    counter!(USER_CACHE_MISSES).increment(1);
}

pub fn record_cache_error(operation: &'static str) {
    counter!(USER_CACHE_ERRORS, "operation" => operation).increment(1);
}

pub fn record_store_read() {
    counter!(USER_STORE_READS).increment(1);
}

pub fn record_invalidation() {
    counter!(USER_INVALIDATIONS).increment(1);
}

pub fn record_login(outcome: &'static str) {
    counter!(USER_LOGINS, "outcome" => outcome).increment(1);
}
