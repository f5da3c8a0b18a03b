//! Arena-specific error and fault types.
//!
//! [`ArenaError`] covers recoverable conditions (the memory pool declined a
//! request). [`ArenaFault`] describes broken stack discipline or memory
//! corruption; faults are logged and then raised as panics, never returned
//! to callers.

use std::error::Error;
use std::fmt;

/// Recoverable errors from memory pools and arena initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The system allocator refused the request.
    AllocationFailed {
        /// Number of bytes requested.
        requested: usize,
    },
    /// A [`LimitedPool`](crate::LimitedPool) would exceed its byte limit.
    PoolLimitExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Configured limit of the pool.
        limit: usize,
        /// Bytes already outstanding when the request was made.
        in_use: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationFailed { requested } => {
                write!(f, "allocation of {requested} bytes failed")
            }
            Self::PoolLimitExceeded {
                requested,
                limit,
                in_use,
            } => {
                write!(
                    f,
                    "pool limit exceeded: requested {requested} bytes with {in_use} of {limit} bytes in use"
                )
            }
        }
    }
}

impl Error for ArenaError {}

/// Which of the two guard words around an allocation was damaged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardPosition {
    /// The word immediately before the payload.
    Leading,
    /// The word immediately after the padded payload.
    Trailing,
}

impl fmt::Display for GuardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leading => f.write_str("leading"),
            Self::Trailing => f.write_str("trailing"),
        }
    }
}

/// A violated arena invariant. Always fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaFault {
    /// An allocation does not fit in the remaining buffer.
    CapacityExceeded {
        /// Payload bytes requested.
        requested: usize,
        /// Bump offset at the time of the request.
        top: usize,
        /// Total buffer size in bytes.
        buffer_size: usize,
    },
    /// A handle was released while it was not the most recent allocation.
    OutOfOrderRelease {
        /// Ordinal of the released allocation.
        ordinal: usize,
        /// Live allocations at the time of release.
        live_count: usize,
        /// End offset of the released region.
        region_end: usize,
        /// Current bump offset.
        top: usize,
    },
    /// A guard word no longer holds its sentinel value.
    GuardCorrupted {
        /// Which guard was damaged.
        position: GuardPosition,
        /// Byte offset of the guard word in the buffer.
        offset: usize,
        /// Sentinel value.
        expected: u64,
        /// Value found in memory.
        observed: u64,
    },
    /// The arena was re-initialized while allocations were still live.
    LiveAllocations {
        /// Number of outstanding allocations.
        live_count: usize,
    },
}

impl fmt::Display for ArenaFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                top,
                buffer_size,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes at offset {top} of {buffer_size}"
                )
            }
            Self::OutOfOrderRelease {
                ordinal,
                live_count,
                region_end,
                top,
            } => {
                write!(
                    f,
                    "out-of-order release: allocation #{ordinal} (ends at {region_end}) with {live_count} live, top at {top}"
                )
            }
            Self::GuardCorrupted {
                position,
                offset,
                expected,
                observed,
            } => {
                write!(
                    f,
                    "{position} guard corrupted at offset {offset}: expected {expected:#018x}, observed {observed:#018x}"
                )
            }
            Self::LiveAllocations { live_count } => {
                write!(f, "arena re-initialized with {live_count} live allocations")
            }
        }
    }
}

impl Error for ArenaFault {}

/// Log `fault` and abort the current operation with a panic.
#[track_caller]
pub(crate) fn raise(fault: ArenaFault) -> ! {
    log::error!("{fault}");
    panic!("{fault}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_fault_reports_both_values() {
        let fault = ArenaFault::GuardCorrupted {
            position: GuardPosition::Trailing,
            offset: 88,
            expected: 0x0577_2156_6490_1532,
            observed: 0x0577_2156_6490_15aa,
        };
        let text = fault.to_string();
        assert!(text.starts_with("trailing guard corrupted at offset 88"));
        assert!(text.contains("0x0577215664901532"));
        assert!(text.contains("0x05772156649015aa"));
    }

    #[test]
    fn limit_error_mentions_limit() {
        let err = ArenaError::PoolLimitExceeded {
            requested: 10,
            limit: 100,
            in_use: 95,
        };
        assert_eq!(
            err.to_string(),
            "pool limit exceeded: requested 10 bytes with 95 of 100 bytes in use"
        );
    }

    #[test]
    #[should_panic(expected = "re-initialized with 2 live allocations")]
    fn raise_panics_with_display_text() {
        raise(ArenaFault::LiveAllocations { live_count: 2 });
    }
}
