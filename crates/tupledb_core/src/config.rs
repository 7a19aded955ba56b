//! Engine and writer configuration.

use std::time::Duration;

/// Configuration for a [`crate::LocalEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether each commit forces its log record onto durable media
    /// (`sync`) rather than only handing it to the OS (`flush`).
    pub sync_on_commit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to sync the commit log on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}

/// Configuration for a [`crate::TupleWriter`].
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Deadline applied to calls whose context carries none.
    pub default_timeout: Option<Duration>,

    /// Largest number of preconditions accepted in one call.
    pub max_preconditions: usize,

    /// Largest number of mutations accepted in one call.
    pub max_mutations: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            max_preconditions: 1_000,
            max_mutations: 1_000,
        }
    }
}

impl WriterConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback deadline.
    #[must_use]
    pub const fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Sets the precondition limit.
    #[must_use]
    pub const fn max_preconditions(mut self, limit: usize) -> Self {
        self.max_preconditions = limit;
        self
    }

    /// Sets the mutation limit.
    #[must_use]
    pub const fn max_mutations(mut self, limit: usize) -> Self {
        self.max_mutations = limit;
        self
    }
}
