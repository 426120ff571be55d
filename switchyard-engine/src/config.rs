//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default minimum body size before compression kicks in, in bytes.
pub const DEFAULT_COMPRESSION_MIN_SIZE: usize = 500;

/// Tunables for one built engine.
///
/// Everything here is fixed at [`crate::EngineBuilder::build`] time; the
/// engine never reconsults ambient state while serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct EngineConfig {
    /// Install the gzip compression middleware.
    pub compression: bool,

    /// Smallest response body, in bytes, that compression will touch.
    pub compression_min_size: usize,

    /// Install the request tracing middleware.
    pub trace: bool,

    /// Wall-clock budget for one whole connection pipeline. `None` means
    /// no timeout; expiry produces a 503.
    pub timeout: Option<Duration>,

    /// Leak fault details into 500 bodies. Off in production; faults are
    /// always logged in full either way.
    pub debug: bool,
}

impl EngineConfig {
    /// Configuration with the stock defaults: compression and tracing on,
    /// no timeout, debug off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compression: true,
            compression_min_size: DEFAULT_COMPRESSION_MIN_SIZE,
            trace: true,
            timeout: None,
            debug: false,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    #[must_use]
    pub fn with_compression_min_size(mut self, bytes: usize) -> Self {
        self.compression_min_size = bytes;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
