//! Configuration options for firkin.

use std::time::Duration;

/// Size of a record header on disk (checksum + timestamp + lengths + flag).
pub const HEADER_SIZE: usize = 21;

/// Maximum size of the active segment before rotation (128 MiB, inclusive).
pub const MAX_ACTIVE_FILE_SIZE: u64 = 128 * 1024 * 1024;

/// Cadence of the background flush-then-fsync group commit.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the buffered writer fronting the active segment (64 KiB).
pub const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Store configuration options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Rotation threshold for the active segment. The check is inclusive:
    /// a write that would bring the active size to exactly this value
    /// rotates first.
    pub max_active_file_size: u64,

    /// Interval between background group commits.
    pub sync_interval: Duration,

    /// Capacity of the active segment's buffered writer.
    pub write_buffer_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_active_file_size: MAX_ACTIVE_FILE_SIZE,
            sync_interval: SYNC_INTERVAL,
            write_buffer_size: WRITE_BUFFER_SIZE,
        }
    }
}

impl Options {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the options.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_active_file_size <= HEADER_SIZE as u64 {
            return Err(crate::Error::InvalidConfiguration(format!(
                "max_active_file_size must exceed the record header size ({} bytes)",
                HEADER_SIZE
            )));
        }

        if self.write_buffer_size == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "write_buffer_size must be non-zero".into(),
            ));
        }

        if self.sync_interval.is_zero() {
            return Err(crate::Error::InvalidConfiguration(
                "sync_interval must be non-zero".into(),
            ));
        }

        Ok(())
    }
}

/// Builder for Options.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rotation threshold for the active segment.
    pub fn max_active_file_size(mut self, size: u64) -> Self {
        self.options.max_active_file_size = size;
        self
    }

    /// Set the background group-commit interval.
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.options.sync_interval = interval;
        self
    }

    /// Set the buffered writer capacity.
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.options.write_buffer_size = size;
        self
    }

    /// Build the options.
    pub fn build(self) -> crate::Result<Options> {
        self.options.validate()?;
        Ok(self.options)
    }
}
