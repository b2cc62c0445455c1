//! Outcome of a write or remove pass.

use crate::structure::RewriteAction;

/// What happened to one zone during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneAction {
    /// The zone received real tag data where there was only a placeholder.
    Added,
    /// The zone was reduced to its placeholder.
    Emptied,
    /// The zone's content was replaced.
    Rewritten,
    /// The zone was not touched; only its index headers may have moved.
    Untouched,
}

impl ZoneAction {
    pub(crate) fn from_rewrite(action: RewriteAction) -> Self {
        match action {
            RewriteAction::Add => Self::Added,
            RewriteAction::Delete => Self::Emptied,
            RewriteAction::Edit => Self::Rewritten,
        }
    }
}

/// Per-zone result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneOutcome {
    /// Zone name.
    pub name: String,
    /// Offset of the zone in the edited stream.
    pub offset: u64,
    /// Size before the pass.
    pub old_size: u64,
    /// Size after the pass.
    pub new_size: u64,
    /// What happened to the zone.
    pub action: ZoneAction,
}

impl ZoneOutcome {
    /// Returns the size change in bytes.
    pub fn delta(&self) -> i64 {
        self.new_size as i64 - self.old_size as i64
    }
}

/// Result of a write or remove pass.
#[must_use = "edit report should be checked to verify the pass completed as expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditReport {
    /// Zones in processing order.
    pub zones: Vec<ZoneOutcome>,
    /// Net change of the stream length in bytes.
    pub total_delta: i64,
    /// Number of header fields written.
    pub headers_rewritten: usize,
}

impl EditReport {
    /// Returns the outcome for a zone.
    pub fn zone(&self, name: &str) -> Option<&ZoneOutcome> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// Returns the number of zones whose size changed.
    pub fn zones_resized(&self) -> usize {
        self.zones.iter().filter(|z| z.delta() != 0).count()
    }
}
