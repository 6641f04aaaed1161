//! Notifier configuration.

/// When the initial delivery of a new subscription happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialDelivery {
    /// Inside `subscribe`, before it returns.
    Immediate,
    /// At the next refresh cycle.
    NextRefresh,
}

/// Configuration for a [`Notifier`](crate::Notifier).
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// When new subscriptions get their initial delivery.
    pub initial_delivery: InitialDelivery,

    /// Number of property hops full-mode subscriptions look through.
    pub full_depth: usize,

    /// Whether subscriptions with the same filter and the same last
    /// delivered snapshot share one diff run.
    pub share_diffs: bool,

    /// Whether interleaved insertions and deletions mark change sets as
    /// resets.
    pub flag_scattered_resets: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            initial_delivery: InitialDelivery::NextRefresh,
            full_depth: 4,
            share_diffs: true,
            flag_scattered_resets: true,
        }
    }
}

impl NotifierConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets when initial deliveries happen.
    #[must_use]
    pub const fn initial_delivery(mut self, value: InitialDelivery) -> Self {
        self.initial_delivery = value;
        self
    }

    /// Sets the full-mode traversal depth.
    #[must_use]
    pub const fn full_depth(mut self, depth: usize) -> Self {
        self.full_depth = depth;
        self
    }

    /// Sets whether identical filters share diff runs.
    #[must_use]
    pub const fn share_diffs(mut self, value: bool) -> Self {
        self.share_diffs = value;
        self
    }

    /// Sets whether scattered insert/delete mixes are flagged as resets.
    #[must_use]
    pub const fn flag_scattered_resets(mut self, value: bool) -> Self {
        self.flag_scattered_resets = value;
        self
    }
}
