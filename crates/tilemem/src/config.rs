//! Heap configuration parameters.

use crate::error::HeapError;
use crate::header::HEADER_SIZE;

/// How a free run's capacity is compared against a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitPolicy {
    /// Accept a run whose capacity is at least the requested size.
    #[default]
    Exact,
    /// Accept a run only if its capacity is strictly greater than the
    /// requested size. A request that exactly matches the largest free run
    /// fails.
    Headroom,
}

impl FitPolicy {
    /// Whether a free run of `capacity` bytes can serve `requested` bytes.
    pub fn accepts(self, capacity: usize, requested: usize) -> bool {
        match self {
            Self::Exact => capacity >= requested,
            Self::Headroom => capacity > requested,
        }
    }
}

/// Configuration for a [`Heap`](crate::Heap).
///
/// Validated at construction; immutable for the lifetime of the heap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Total arena size in bytes, headers included.
    ///
    /// Must be at least [`HEADER_SIZE`] and at most `u32::MAX`.
    pub capacity: usize,

    /// Capacity comparison used by the allocation search.
    pub fit_policy: FitPolicy,

    /// Smallest payload a split remainder may have.
    ///
    /// When carving a request out of a larger run would leave a remainder
    /// smaller than this, the whole run is handed out instead. Default: 1.
    pub min_split_remainder: usize,
}

impl HeapConfig {
    /// Default arena size: 64 KiB.
    pub const DEFAULT_CAPACITY: usize = 65_536;

    /// Default minimum split remainder payload.
    pub const DEFAULT_MIN_SPLIT_REMAINDER: usize = 1;

    /// Largest arena a header's 32-bit size field can describe.
    pub const MAX_CAPACITY: usize = u32::MAX as usize;

    /// Create a config for an arena of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            fit_policy: FitPolicy::default(),
            min_split_remainder: Self::DEFAULT_MIN_SPLIT_REMAINDER,
        }
    }

    /// Replace the fit policy.
    pub fn with_fit_policy(mut self, fit_policy: FitPolicy) -> Self {
        self.fit_policy = fit_policy;
        self
    }

    /// Replace the minimum split remainder.
    pub fn with_min_split_remainder(mut self, min_split_remainder: usize) -> Self {
        self.min_split_remainder = min_split_remainder;
        self
    }

    /// Check structural constraints.
    pub fn validate(&self) -> Result<(), HeapError> {
        if self.capacity < HEADER_SIZE {
            return Err(HeapError::Misconfigured {
                reason: format!(
                    "capacity {} is smaller than one {HEADER_SIZE}-byte header",
                    self.capacity
                ),
            });
        }
        if self.capacity > Self::MAX_CAPACITY {
            return Err(HeapError::Misconfigured {
                reason: format!(
                    "capacity {} exceeds the maximum of {}",
                    self.capacity,
                    Self::MAX_CAPACITY
                ),
            });
        }
        if self.min_split_remainder == 0 {
            return Err(HeapError::Misconfigured {
                reason: "min_split_remainder must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
