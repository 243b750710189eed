// Pipeline constants
use std::time::Duration;

/// Sleep duration when no jobs are available (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep duration after worker error before retry (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default retry base delay (1000ms = 1s); countdown is base * 2^attempts
pub const DEFAULT_RETRY_BASE_DELAY_MS: i64 = 1000;

/// Queue carrying the check fan-out
pub const SCREENING_QUEUE: &str = "screening";

/// Job type of a single screening check
pub const CHECK_JOB_TYPE: &str = "screening.check";

/// Screenings scheduled longer ago than this are force-completed (6 hours)
pub const DEFAULT_KILL_AFTER_MS: i64 = 6 * 60 * 60 * 1000;

/// Completed screenings older than this are re-screened (24 hours)
pub const DEFAULT_RESCREEN_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

/// Provider responses are reused for this long (1 hour)
pub const DEFAULT_CACHE_TTL_MS: i64 = 60 * 60 * 1000;

/// Expiry of a cache refresh lock (1 minute)
pub const DEFAULT_CACHE_LOCK_TTL_MS: i64 = 60 * 1000;

/// Rows handled per sweep of the killer, staleness and bulk tasks
pub const SWEEP_BATCH_LIMIT: i64 = 500;

/// Maximum IMOs per bulk request
pub const MAX_BULK_IMOS: usize = 1000;

/// Bulk rows resolved concurrently
pub const BULK_CONCURRENCY: usize = 4;
