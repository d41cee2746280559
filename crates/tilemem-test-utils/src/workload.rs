//! Seeded allocate/free workloads.
//!
//! [`random_ops`] produces a deterministic operation list from a seed
//! (ChaCha8, so the same seed gives the same list on every platform).
//! [`replay`] applies it to a heap through a [`LiveSet`], checking the
//! heap invariants after every step.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tilemem::{Heap, HeapError};

use crate::{assert_tiled, LiveSet};

/// One workload step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate this many bytes.
    Alloc(usize),
    /// Free the live allocation at `index % live.len()`, if any.
    Free(usize),
}

/// What happened during a [`replay`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub allocations: usize,
    pub frees: usize,
    pub out_of_memory: usize,
    /// Live allocations left when the workload ended.
    pub live: usize,
}

/// Generate `steps` operations with allocation sizes in `0..=max_size`.
///
/// Roughly 60% of steps allocate, the rest free.
pub fn random_ops(seed: u64, steps: usize, max_size: usize) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..steps)
        .map(|_| {
            let roll = rng.next_u32() % 10;
            if roll < 6 {
                Op::Alloc(rng.next_u32() as usize % (max_size + 1))
            } else {
                Op::Free(rng.next_u32() as usize)
            }
        })
        .collect()
}

/// Apply `ops` to `heap`, verifying invariants after each step.
///
/// Out-of-memory is counted, not treated as failure. Any other error
/// panics, since a well-formed workload never produces one.
pub fn replay(heap: &mut Heap, ops: &[Op]) -> Outcome {
    replay_into(heap, &mut LiveSet::new(), ops)
}

/// Like [`replay`], but tracks allocations in a caller-owned [`LiveSet`]
/// so they can be inspected afterwards.
pub fn replay_into(heap: &mut Heap, live: &mut LiveSet, ops: &[Op]) -> Outcome {
    let mut outcome = Outcome::default();

    for &op in ops {
        match op {
            Op::Alloc(size) => match live.allocate(heap, size) {
                Ok(_) => outcome.allocations += 1,
                Err(HeapError::OutOfMemory { largest_free, .. }) => {
                    assert!(
                        !heap.config().fit_policy.accepts(largest_free, size),
                        "allocate({size}) failed although a {largest_free}-byte run was free"
                    );
                    outcome.out_of_memory += 1;
                }
                Err(err) => panic!("allocate({size}) failed unexpectedly: {err}"),
            },
            Op::Free(index) => {
                if live.is_empty() {
                    continue;
                }
                let index = index % live.len();
                if let Some(result) = live.free_nth(heap, index) {
                    result.unwrap_or_else(|e| panic!("free of live block failed: {e}"));
                    outcome.frees += 1;
                }
            }
        }
        assert_tiled(heap);
        live.verify(heap);
    }

    outcome.live = live.len();
    outcome
}
