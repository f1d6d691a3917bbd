//! Configuration for the reconciliation engine.

use std::time::{Duration, Instant};

/// Page size used by `list()`.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Size of one upload chunk, and the payload size above which content is
/// uploaded in chunks.
pub const DEFAULT_CHUNK_SIZE: u64 = 512 * 1024;

/// Interval between two task polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Engine-wide settings, fixed for the lifetime of one invocation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Predict outcomes without issuing state-changing calls.
    pub check_mode: bool,
    /// Page size for paginated listings.
    pub page_size: u32,
    /// Size of one upload chunk.
    pub chunk_size: u64,
    /// Payloads larger than this are uploaded in chunks.
    pub upload_threshold: u64,
    /// Task polling behavior.
    pub poll: PollPolicy,
}

impl EngineConfig {
    /// Creates a configuration with the default constants.
    pub fn new() -> Self {
        Self {
            check_mode: false,
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            upload_threshold: DEFAULT_CHUNK_SIZE,
            poll: PollPolicy::default(),
        }
    }

    /// Enables or disables check mode.
    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Sets the chunk size.
    pub fn with_chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sets the size above which payloads are uploaded in chunks.
    pub fn with_upload_threshold(mut self, threshold: u64) -> Self {
        self.upload_threshold = threshold;
        self
    }

    /// Sets the poll policy.
    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How long and how often a task is polled.
///
/// The default polls every two seconds without a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two reads of a non-terminal task.
    pub interval: Duration,
    /// Give up after this much time has passed since the first read.
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    /// Creates a policy polling at `interval` without a deadline.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Creates a policy that re-polls immediately.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns true if the deadline has passed for polling started at `started`.
    pub fn expired(&self, started: Instant) -> bool {
        self.deadline
            .map(|deadline| started.elapsed() >= deadline)
            .unwrap_or(false)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert!(!config.check_mode);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.chunk_size, 524_288);
        assert_eq!(config.upload_threshold, 524_288);
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.deadline, None);
    }

    #[test]
    fn engine_config_builder() {
        let config = EngineConfig::new()
            .with_check_mode(true)
            .with_page_size(0)
            .with_chunk_size(1024)
            .with_upload_threshold(4096)
            .with_poll(PollPolicy::immediate());

        assert!(config.check_mode);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.upload_threshold, 4096);
        assert_eq!(config.poll.interval, Duration::ZERO);
    }

    #[test]
    fn poll_deadline() {
        let unbounded = PollPolicy::default();
        assert!(!unbounded.expired(Instant::now()));

        let bounded = PollPolicy::immediate().with_deadline(Duration::ZERO);
        assert!(bounded.expired(Instant::now()));
    }
}
