use std::time::Duration;

/// Configuration for [`Uploader`](crate::Uploader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UploaderConfig {
    /// Ring capacity in bytes (default: 16 MiB)
    pub capacity: usize,
    /// Enable metrics collection
    pub enable_metrics: bool,
    /// How long `upload_blocking` waits for the consumer before giving up
    /// (default: 1s)
    pub wait_timeout: Duration,
}

impl UploaderConfig {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            enable_metrics,
            wait_timeout: Duration::from_secs(1),
        }
    }

    /// Sets the ring capacity in bytes.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the blocking upload timeout.
    pub const fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Enables or disables metrics collection.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self::new(16 << 20, false)
    }
}

/// Small ring for per-frame constants and tiny meshes (1 MiB)
pub const SMALL_UPLOADER_CONFIG: UploaderConfig = UploaderConfig::new(1 << 20, false);

/// Large ring for texture and geometry streaming (64 MiB)
pub const LARGE_UPLOADER_CONFIG: UploaderConfig = UploaderConfig::new(64 << 20, false);
