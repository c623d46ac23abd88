//! Records which attributes actually changed content.

use indexmap::IndexSet;

/// Content changes observed while applying a patch.
///
/// Appliers report every write; only writes that differ from the previous
/// value are recorded, so replacing a value with an equal one leaves the
/// tracker untouched.
#[derive(Debug, Default, Clone)]
pub struct ChangeTracker {
    changed: IndexSet<String>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write of `attribute` whose content differs from before.
    pub fn mark(&mut self, attribute: &str) {
        if self.changed.insert(attribute.to_string()) {
            tracing::trace!(attribute, "Attribute changed");
        }
    }

    pub fn record(&mut self, attribute: &str, changed: bool) {
        if changed {
            self.mark(attribute);
        }
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Full names of changed attributes, in order of first change.
    pub fn into_changed(self) -> Vec<String> {
        self.changed.into_iter().collect()
    }
}
