//! Arena configuration parameters.

use crate::stack::TempVectorArena;

/// Configuration for a [`TempVectorArena`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Usable capacity in bytes, before padding and guard overhead.
    ///
    /// Size this as the sum of
    /// [`TempVectorArena::estimated_allocation_size`] over the allocations
    /// that will be live at the same time.
    pub capacity_bytes: usize,

    /// Byte written over the whole buffer at initialization.
    ///
    /// Default: `0xFF`, so reads of never-written scratch memory stand out.
    pub poison_byte: u8,
}

impl ArenaConfig {
    /// Default poison byte.
    pub const DEFAULT_POISON_BYTE: u8 = 0xFF;

    /// Create a config with the given capacity and the default poison byte.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            poison_byte: Self::DEFAULT_POISON_BYTE,
        }
    }

    /// Create a config large enough to hold all of `sizes` at once.
    pub fn for_allocations(sizes: &[usize]) -> Self {
        let capacity_bytes = sizes
            .iter()
            .map(|&n| TempVectorArena::estimated_allocation_size(n))
            .sum();
        Self::new(capacity_bytes)
    }

    /// Replace the poison byte.
    pub fn with_poison_byte(mut self, poison_byte: u8) -> Self {
        self.poison_byte = poison_byte;
        self
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
