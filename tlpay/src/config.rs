//! Exchange timing and retry configuration

use std::time::Duration;

use tlpay_core::constants::{
    DEFAULT_ACK_WAIT_MS, DEFAULT_FOLLOW_UP_WINDOW_MS, DEFAULT_RESPONSE_WAIT_MS, MAX_RETRIES,
};

/// Client configuration
///
/// Defaults follow the terminal vendor's recommended timings.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tlpay::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_response_wait(Duration::from_secs(10))
///     .with_max_retries(1);
/// assert_eq!(config.ack_wait, Duration::from_secs(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long to wait for ACK/NAK/STX right after sending
    pub ack_wait: Duration,

    /// Fallback wait for a frame start, also bounds the wait after ACK and each body read
    pub response_wait: Duration,

    /// Resends allowed after NAK
    pub max_retries: u32,

    /// Total wait for the final reply once an event or a mismatched reply was seen
    pub follow_up_window: Duration,

    /// How long stale input is discarded before each send
    pub drain_window: Duration,

    /// Granularity of single-byte polling
    pub poll_slice: Duration,

    /// Pause after writing a frame, before reading
    pub post_write_pause: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ack_wait: Duration::from_millis(DEFAULT_ACK_WAIT_MS),
            response_wait: Duration::from_millis(DEFAULT_RESPONSE_WAIT_MS),
            max_retries: MAX_RETRIES,
            follow_up_window: Duration::from_millis(DEFAULT_FOLLOW_UP_WINDOW_MS),
            drain_window: Duration::from_millis(120),
            poll_slice: Duration::from_millis(50),
            post_write_pause: Duration::from_millis(8),
        }
    }
}

impl ClientConfig {
    pub fn with_ack_wait(mut self, wait: Duration) -> Self {
        self.ack_wait = wait;
        self
    }

    pub fn with_response_wait(mut self, wait: Duration) -> Self {
        self.response_wait = wait;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_follow_up_window(mut self, window: Duration) -> Self {
        self.follow_up_window = window;
        self
    }

    pub fn with_drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    /// Set polling granularity (clamped to at least 1 ms)
    pub fn with_poll_slice(mut self, slice: Duration) -> Self {
        self.poll_slice = slice.max(Duration::from_millis(1));
        self
    }

    pub fn with_post_write_pause(mut self, pause: Duration) -> Self {
        self.post_write_pause = pause;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = ClientConfig::default();

        assert_eq!(config.ack_wait, Duration::from_secs(3));
        assert_eq!(config.response_wait, Duration::from_secs(25));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.follow_up_window, Duration::from_secs(180));
        assert_eq!(config.drain_window, Duration::from_millis(120));
    }

    #[test]
    fn test_poll_slice_clamped() {
        let config = ClientConfig::default().with_poll_slice(Duration::ZERO);
        assert_eq!(config.poll_slice, Duration::from_millis(1));
    }
}
