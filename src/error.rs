//! Internal error type for the heap extender.
//!
//! The public surface (`Allocator::malloc`/`free`/`realloc`) keeps the
//! return-code contract of the design it's modeled on: `null` for a failed
//! allocation, nothing to report for `free`. Internally, though, the
//! extender has exactly one way to fail (`sbrk` refusing to grow the heap),
//! and giving that failure a name makes the call chain between `malloc` and
//! the host read like prose instead of a comparison against a sentinel
//! pointer at every level.

use std::fmt;

/// Failure reason for an internal allocator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// The host refused to grow the heap (`sbrk` returned its failure
  /// sentinel), typically because the process hit `RLIMIT_DATA` or the
  /// system is genuinely out of memory.
  OutOfMemory,
}

impl fmt::Display for AllocError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AllocError::OutOfMemory => write!(f, "sbrk failed to extend the heap"),
    }
  }
}

impl std::error::Error for AllocError {}
