//! Optimistic-concurrency primitive for configuration writes.

use crate::error::{DomainError, DomainResult};

/// Version expectation for a compare-and-swap write.
///
/// Configuration mutations are load → mutate → put; the put carries the
/// version the mutation was based on, so two concurrent mutations for the
/// same tenant cannot interleave; the loser surfaces a conflict.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip the check (forced overwrite; use sparingly).
    Any,
    /// Require the stored record to be at this exact version
    /// (0 for a record that does not exist yet).
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
