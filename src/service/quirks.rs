//! Seedable behavior deviations for harness self-tests.
//!
//! A quirky instance plays the "tested" subject against a faithful model
//! to prove the harness actually detects divergence. All knobs default to
//! off; a default instance is contract-faithful.

use serde::{Deserialize, Serialize};

/// Behavior knobs for one service instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceQuirks {
    /// Match the department prefix with exact case instead of
    /// case-insensitively.
    pub case_sensitive_department: bool,
    /// Answer updates with 200 and the new name without persisting the
    /// write (caught by post-state comparison).
    pub drop_update_writes: bool,
    /// Lowercase the duplicate-create message (caught by failure-message
    /// comparison).
    pub lowercase_conflict_message: bool,
}

impl ServiceQuirks {
    /// A contract-faithful instance.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this instance deviates from the contract at all.
    #[must_use]
    pub const fn is_faithful(&self) -> bool {
        !self.case_sensitive_department
            && !self.drop_update_writes
            && !self.lowercase_conflict_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quirks_are_faithful() {
        assert!(ServiceQuirks::none().is_faithful());
    }

    #[test]
    fn any_knob_marks_the_instance_unfaithful() {
        let quirks = ServiceQuirks {
            drop_update_writes: true,
            ..ServiceQuirks::default()
        };
        assert!(!quirks.is_faithful());
    }
}
