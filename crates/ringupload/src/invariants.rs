//! Debug assertion macros for ring allocator invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`), so release builds
//! pay nothing for them.

// =============================================================================
// Bounded Claim
// =============================================================================

/// Assert that claimed bytes never exceed capacity.
///
/// **Invariant**: `0 ≤ claimed_size ≤ capacity`
///
/// Used in: `reserve()` after committing the claim
macro_rules! debug_assert_bounded_claim {
    ($claimed:expr, $capacity:expr) => {
        debug_assert!(
            $claimed <= $capacity,
            "bounded claim violated: claimed {} exceeds capacity {}",
            $claimed,
            $capacity
        )
    };
}

/// Assert that the region start stays inside the ring.
///
/// **Invariant**: `0 ≤ region_start < capacity`
///
/// Used in: `reclaim()` after advancing the region start
macro_rules! debug_assert_region_start_in_ring {
    ($start:expr, $capacity:expr) => {
        debug_assert!(
            $start < $capacity,
            "region start {} outside ring of capacity {}",
            $start,
            $capacity
        )
    };
}

// =============================================================================
// Claim Accounting
// =============================================================================

/// Assert that the claimed total equals the open batch plus all closed batches.
///
/// **Invariant**: `claimed_size == open.size + Σ closed.size`
///
/// Used in: `reserve()`, `close_batch()`, `reclaim()`
macro_rules! debug_assert_claim_accounting {
    ($claimed:expr, $open:expr, $closed:expr) => {
        debug_assert!(
            {
                let closed_total: usize = $closed.iter().map(|b| b.size).sum();
                $claimed == $open + closed_total
            },
            "claim accounting violated: claimed {} != open {} + closed batches",
            $claimed,
            $open
        )
    };
}

// =============================================================================
// Token Ordering
// =============================================================================

/// Assert that a newly closed batch's token is greater than the newest one.
///
/// **Invariant**: tokens strictly increase in closing order
///
/// Used in: `close_batch()` before appending to the FIFO
macro_rules! debug_assert_token_increasing {
    ($last:expr, $new:expr) => {
        debug_assert!(
            match $last {
                Some(last) => $new > last,
                None => true,
            },
            "token ordering violated: closing token {} after {:?}",
            $new,
            $last
        )
    };
}

/// Assert that a batch being reclaimed has actually completed.
///
/// **Invariant**: a batch is freed only when `token ≤ completed_counter`
///
/// Used in: `reclaim()` before popping the front batch
macro_rules! debug_assert_completed {
    ($token:expr, $completed:expr) => {
        debug_assert!(
            $token <= $completed,
            "premature reclamation: token {} not reached (counter at {})",
            $token,
            $completed
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_bounded_claim;
pub(crate) use debug_assert_claim_accounting;
pub(crate) use debug_assert_completed;
pub(crate) use debug_assert_region_start_in_ring;
pub(crate) use debug_assert_token_increasing;
