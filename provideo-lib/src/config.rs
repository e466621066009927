use std::time::Duration;

/// Timing and buffering parameters shared by every request on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Response timeout for commands without an explicit override.
    pub default_timeout: Duration,
    /// Upper bound of a single channel read while streaming a table.
    pub poll_slice: Duration,
    /// Silence after which a table stream is considered complete even
    /// though no terminal line arrived.
    pub inactivity_threshold: Duration,
    /// Maximum number of unconsumed bytes held while reassembling a table.
    pub max_buffer: usize,
    /// Discard stale input before every request.
    pub flush_before_send: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(200),
            poll_slice: Duration::from_millis(50),
            inactivity_threshold: Duration::from_secs(1),
            max_buffer: 64 * 1024,
            flush_before_send: true,
        }
    }
}

impl TransportConfig {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_inactivity_threshold(mut self, threshold: Duration) -> Self {
        self.inactivity_threshold = threshold;
        self
    }

    pub fn with_poll_slice(mut self, slice: Duration) -> Self {
        self.poll_slice = slice;
        self
    }

    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }
}

/// Explicit timeouts for commands known to be slow on real devices.
pub struct Timeouts;

impl Timeouts {
    /// Saving, loading or resetting the settings flash.
    pub const FLASH: Duration = Duration::from_secs(10);
    /// Persisting or restoring the defect pixel table.
    pub const DPCC_STORAGE: Duration = Duration::from_secs(30);
    /// Device-side automatic defect detection.
    pub const DPCC_AUTO_LOAD: Duration = Duration::from_millis(500);
    /// Single pixel insertion; devices stall briefly under batch load.
    pub const DPCC_ADD_PIXEL: Duration = Duration::from_millis(300);
}

/// Line settings of an RS232/RS485 connection.
#[cfg(feature = "serial")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

#[cfg(feature = "serial")]
impl SerialConfig {
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}
