//! Registry configuration.

/// Configuration for the [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Largest batch `register_batch_records` accepts. `None` means no limit.
    pub max_batch_size: Option<usize>,
    /// Whether committed operations are reported to event sinks.
    pub emit_events: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            emit_events: true,
        }
    }
}

impl RegistryConfig {
    /// Set the batch size limit.
    pub fn max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = Some(limit);
        self
    }

    /// Disable event emission.
    pub fn without_events(mut self) -> Self {
        self.emit_events = false;
        self
    }
}
