//! Exit code logic for the mediafetch process.
//!
//! Single responsibility: map success/failure counts to the process exit outcome.

use crate::ProcessExit;

/// Determines the exit outcome of a retrieval batch.
///
/// A single-URL run that fails is a plain failure, never partial.
pub(crate) fn determine_exit_outcome(succeeded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Info-only runs fail if any lookup failed.
pub(crate) fn determine_info_outcome(failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else {
        ProcessExit::Failure
    }
}
