//! # Stream Configuration

use std::time::Duration;

/// Hard floor on the reconnect interval, in minutes.
///
/// The upstream provider rate-limits connection establishment; configured
/// values below this are clamped up.
pub const MIN_RECONNECT_MINUTES: u64 = 15;

/// Tuning knobs for the stream manager.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Case-insensitive substring a post must contain to be delivered.
    /// Stored lowercased.
    pub keyword: String,
    /// Configured minimum minutes between reconnect attempts; clamped to
    /// [`MIN_RECONNECT_MINUTES`] at the point of use.
    pub reconnect_interval_minutes: u64,
    /// How often the reconnect tick fires.
    pub tick_interval: Duration,
    /// Window after a reconnect during which "connection ended" signals are
    /// treated as transport noise.
    pub grace_period: Duration,
}

impl StreamConfig {
    /// Create a config with the given keyword and default timings.
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
            reconnect_interval_minutes: MIN_RECONNECT_MINUTES,
            tick_interval: Duration::from_secs(10),
            grace_period: Duration::from_secs(5),
        }
    }

    /// The effective wait between reconnect attempts.
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_minutes.max(MIN_RECONNECT_MINUTES) * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_interval_is_floor_clamped() {
        let mut config = StreamConfig::new("#keyword");
        config.reconnect_interval_minutes = 1;
        assert_eq!(config.reconnect_interval(), Duration::from_secs(15 * 60));

        config.reconnect_interval_minutes = 30;
        assert_eq!(config.reconnect_interval(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn keyword_is_lowercased_once() {
        let config = StreamConfig::new("#NintendoSwitch");
        assert_eq!(config.keyword, "#nintendoswitch");
    }
}
