/// Application name
pub const APP_NAME: &str = "Pathwise";

/// Feed page size when the caller gives no (or a non-positive) limit
pub const DEFAULT_FEED_LIMIT: u32 = 50;

/// Hard cap on a single feed page
pub const MAX_FEED_LIMIT: u32 = 200;

/// Trending page size when the caller gives no limit
pub const DEFAULT_TRENDING_LIMIT: u32 = 20;

/// Velocity assigned to an item with current signups and no prior-period baseline
pub const COLD_START_VELOCITY: f64 = 10.0;

/// Width of one velocity window in hours
pub const VELOCITY_WINDOW_HOURS: i64 = 24;

/// Highest score a recommendation can carry
pub const MAX_MATCH_SCORE: u8 = 100;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default SQLite busy timeout in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Clamp a requested feed size into `1..=MAX_FEED_LIMIT`.
pub fn feed_limit(requested: Option<i64>) -> u32 {
    match requested {
        Some(n) if n > 0 => n.min(MAX_FEED_LIMIT as i64) as u32,
        _ => DEFAULT_FEED_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_limit_defaults_and_caps() {
        assert_eq!(feed_limit(None), 50);
        assert_eq!(feed_limit(Some(0)), 50);
        assert_eq!(feed_limit(Some(-3)), 50);
        assert_eq!(feed_limit(Some(10)), 10);
        assert_eq!(feed_limit(Some(5_000)), 200);
    }
}
