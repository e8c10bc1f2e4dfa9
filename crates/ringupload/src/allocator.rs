use crate::invariants::{
    debug_assert_bounded_claim, debug_assert_claim_accounting, debug_assert_completed,
    debug_assert_region_start_in_ring, debug_assert_token_increasing,
};
use crate::{AllocError, RingRegion};
use std::collections::VecDeque;

// =============================================================================
// RING ACCOUNTING
// =============================================================================
//
// The ring is described by two numbers:
//
//   region_start  offset of the oldest byte still claimed, in [0, capacity)
//   claimed_size  bytes claimed from region_start onwards, in [0, capacity]
//
// The next reservation starts at (region_start + claimed_size) % capacity.
// Space is freed only from region_start, one closed batch at a time, so the
// claimed part of the ring is always a single (possibly wrapped) run of bytes:
//
//   [ closed batch 1 | closed batch 2 | ... | open batch | free ... ]
//   ^ region_start                                       ^ next offset
//
// Batches leave the FIFO strictly front-to-back. A batch whose token is
// already satisfied still waits for every batch closed before it, because
// freeing it early would punch a hole into the middle of the claimed run.
//
// The open batch has no token yet. It receives `next_token` when closed and
// cannot be reclaimed before that.
//
// =============================================================================

/// A closed batch waiting for the consumer to reach its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Batch {
    pub(crate) token: u64,
    pub(crate) size: usize,
}

/// Descriptor of a closed batch, handed to the consumer side.
///
/// Once the completion counter reaches `token`, the batch's bytes may be
/// reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchDescriptor {
    /// Counter value the consumer signals when the batch's work is finished.
    pub token: u64,
    /// Bytes claimed by the batch.
    pub size: usize,
}

/// Ring-buffer upload allocator with FIFO batch reclamation.
///
/// Pure bookkeeping over a circular byte range of fixed capacity. Backing
/// storage, copy execution and the completion counter all live outside.
///
/// # Example
///
/// ```
/// use ringupload_rs::RingAllocator;
///
/// let mut ring = RingAllocator::new(100).unwrap();
/// let offset = ring.reserve(60).unwrap();
/// assert_eq!(offset, 0);
///
/// let batch = ring.close_batch(0);
/// assert_eq!(batch.token, 1);
/// assert!(ring.reserve(50).is_err());
///
/// // Consumer reports token 1 as finished
/// ring.reclaim(1);
/// assert_eq!(ring.reserve(50).unwrap(), 60);
/// ```
#[derive(Debug)]
pub struct RingAllocator {
    capacity: usize,
    region_start: usize,
    claimed_size: usize,
    /// Bytes claimed by the open batch.
    open_size: usize,
    /// Closed batches, oldest first.
    closed: VecDeque<Batch>,
    /// Token assigned to the open batch when it is closed.
    next_token: u64,
}

impl RingAllocator {
    /// First token handed out; a fresh completion counter starts below it.
    pub const FIRST_TOKEN: u64 = 1;

    /// Creates an allocator for a ring of `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        if capacity == 0 {
            return Err(AllocError::InvalidCapacity);
        }

        Ok(Self {
            capacity,
            region_start: 0,
            claimed_size: 0,
            open_size: 0,
            closed: VecDeque::new(),
            next_token: Self::FIRST_TOKEN,
        })
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns the ring capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes claimed by open and in-flight batches.
    #[inline]
    pub fn claimed_size(&self) -> usize {
        self.claimed_size
    }

    /// Returns the number of bytes that can still be reserved.
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity - self.claimed_size
    }

    /// Returns the ring offset of the oldest claimed byte.
    #[inline]
    pub fn region_start(&self) -> usize {
        self.region_start
    }

    /// Returns the bytes reserved since the last close.
    #[inline]
    pub fn open_batch_size(&self) -> usize {
        self.open_size
    }

    /// Returns the bytes held by closed batches, i.e. what consumer progress
    /// alone could free.
    #[inline]
    pub fn in_flight_size(&self) -> usize {
        self.claimed_size - self.open_size
    }

    /// Returns the number of closed batches not yet reclaimed.
    #[inline]
    pub fn in_flight_batches(&self) -> usize {
        self.closed.len()
    }

    /// Returns the token the open batch will receive.
    #[inline]
    pub fn next_token(&self) -> u64 {
        self.next_token
    }

    /// Returns the token of the oldest closed batch, if any.
    #[inline]
    pub fn oldest_pending_token(&self) -> Option<u64> {
        self.closed.front().map(|b| b.token)
    }

    /// Returns true if no bytes are claimed.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.claimed_size == 0
    }

    /// Ring offset where the next reservation starts.
    #[inline]
    fn write_offset(&self) -> usize {
        wrap_add(self.region_start, self.claimed_size, self.capacity)
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Claims `size` bytes for the open batch and returns their ring offset.
    ///
    /// The reservation is never split: if it runs past the end of the ring,
    /// byte `i` lives at `(offset + i) % capacity`. Use
    /// [`reserve_region`](Self::reserve_region) to get the flat spans.
    ///
    /// Fails with [`AllocError::CapacityExceeded`] if the bytes do not fit in
    /// the unclaimed part of the ring; state is left untouched in that case.
    pub fn reserve(&mut self, size: usize) -> Result<usize, AllocError> {
        let available = self.available();
        if size > available {
            return Err(AllocError::CapacityExceeded {
                requested: size,
                available,
                capacity: self.capacity,
            });
        }

        let offset = self.write_offset();
        self.claimed_size += size;
        self.open_size += size;

        debug_assert_bounded_claim!(self.claimed_size, self.capacity);
        debug_assert_claim_accounting!(self.claimed_size, self.open_size, self.closed);

        Ok(offset)
    }

    /// Same as [`reserve`](Self::reserve), returning the region descriptor.
    pub fn reserve_region(&mut self, size: usize) -> Result<RingRegion, AllocError> {
        let offset = self.reserve(size)?;
        Ok(RingRegion::new(offset, size, self.capacity))
    }

    /// Closes the open batch and opens a fresh one.
    ///
    /// Completed batches are reclaimed first using `completed_counter`, which
    /// must be a fresh read of the consumer's completion counter. The closed
    /// batch is freed once the counter reaches the returned token.
    pub fn close_batch(&mut self, completed_counter: u64) -> BatchDescriptor {
        self.reclaim(completed_counter);

        let batch = Batch {
            token: self.next_token,
            size: self.open_size,
        };

        debug_assert_token_increasing!(self.closed.back().map(|b| b.token), batch.token);

        self.closed.push_back(batch);
        self.open_size = 0;
        self.next_token += 1;

        debug_assert_claim_accounting!(self.claimed_size, self.open_size, self.closed);

        BatchDescriptor {
            token: batch.token,
            size: batch.size,
        }
    }

    // ---------------------------------------------------------------------
    // RECLAMATION
    // ---------------------------------------------------------------------

    /// Frees closed batches whose token is `<= completed_counter`.
    ///
    /// Walks the FIFO from the oldest batch and stops at the first one the
    /// consumer has not finished. The open batch is never touched. Returns
    /// the number of bytes freed.
    pub fn reclaim(&mut self, completed_counter: u64) -> usize {
        let mut freed = 0;

        while let Some(front) = self.closed.front().copied() {
            if front.token > completed_counter {
                break;
            }
            debug_assert_completed!(front.token, completed_counter);

            self.region_start = wrap_add(self.region_start, front.size, self.capacity);
            self.claimed_size -= front.size;
            freed += front.size;
            self.closed.pop_front();

            debug_assert_region_start_in_ring!(self.region_start, self.capacity);
        }

        debug_assert_claim_accounting!(self.claimed_size, self.open_size, self.closed);

        freed
    }
}

/// `(a + b) % capacity` for `a < capacity`, `b <= capacity`, without overflow.
#[inline]
fn wrap_add(a: usize, b: usize, capacity: usize) -> usize {
    let room = capacity - a;
    if b >= room {
        b - room
    } else {
        a + b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(RingAllocator::new(0).unwrap_err(), AllocError::InvalidCapacity);
    }

    #[test]
    fn test_sequential_offsets() {
        let mut ring = RingAllocator::new(64).unwrap();
        assert_eq!(ring.reserve(8).unwrap(), 0);
        assert_eq!(ring.reserve(16).unwrap(), 8);
        assert_eq!(ring.reserve(4).unwrap(), 24);
        assert_eq!(ring.claimed_size(), 28);
        assert_eq!(ring.open_batch_size(), 28);
        assert_eq!(ring.available(), 36);
    }

    #[test]
    fn test_reserve_exact_capacity() {
        let mut ring = RingAllocator::new(32).unwrap();
        assert_eq!(ring.reserve(32).unwrap(), 0);
        assert_eq!(ring.available(), 0);
        assert!(ring.reserve(1).is_err());
        // Zero-byte reservations always fit
        assert_eq!(ring.reserve(0).unwrap(), 0);
    }

    #[test]
    fn test_failed_reserve_leaves_state_untouched() {
        let mut ring = RingAllocator::new(100).unwrap();
        ring.reserve(70).unwrap();

        let err = ring.reserve(31).unwrap_err();
        assert_eq!(
            err,
            AllocError::CapacityExceeded {
                requested: 31,
                available: 30,
                capacity: 100
            }
        );
        assert_eq!(ring.claimed_size(), 70);
        assert_eq!(ring.open_batch_size(), 70);
        assert_eq!(ring.reserve(30).unwrap(), 70);
    }

    #[test]
    fn test_oversized_reserve_fails() {
        let mut ring = RingAllocator::new(16).unwrap();
        assert!(ring.reserve(usize::MAX).is_err());
        assert!(ring.reserve(17).is_err());
        assert!(ring.is_idle());
    }

    #[test]
    fn test_close_assigns_increasing_tokens() {
        let mut ring = RingAllocator::new(16).unwrap();
        assert_eq!(ring.next_token(), RingAllocator::FIRST_TOKEN);

        ring.reserve(4).unwrap();
        let a = ring.close_batch(0);
        let b = ring.close_batch(0);
        assert_eq!(a, BatchDescriptor { token: 1, size: 4 });
        assert_eq!(b, BatchDescriptor { token: 2, size: 0 });
        assert_eq!(ring.in_flight_batches(), 2);
        assert_eq!(ring.oldest_pending_token(), Some(1));
    }

    #[test]
    fn test_reclaim_stops_at_unfinished_batch() {
        let mut ring = RingAllocator::new(64).unwrap();
        ring.reserve(10).unwrap();
        ring.close_batch(0); // token 1
        ring.reserve(20).unwrap();
        ring.close_batch(0); // token 2
        ring.reserve(5).unwrap();
        ring.close_batch(0); // token 3

        assert_eq!(ring.reclaim(0), 0);
        assert_eq!(ring.reclaim(2), 30);
        assert_eq!(ring.region_start(), 30);
        assert_eq!(ring.claimed_size(), 5);
        assert_eq!(ring.oldest_pending_token(), Some(3));

        // Idempotent
        assert_eq!(ring.reclaim(2), 0);
    }

    #[test]
    fn test_open_batch_survives_reclaim() {
        let mut ring = RingAllocator::new(64).unwrap();
        ring.reserve(12).unwrap();

        // The open batch would receive token 1; a huge counter must not free it
        assert_eq!(ring.reclaim(u64::MAX), 0);
        assert_eq!(ring.claimed_size(), 12);
        assert_eq!(ring.open_batch_size(), 12);
    }

    #[test]
    fn test_close_reclaims_before_closing() {
        let mut ring = RingAllocator::new(64).unwrap();
        ring.reserve(40).unwrap();
        ring.close_batch(0);
        ring.reserve(8).unwrap();

        let batch = ring.close_batch(1);
        assert_eq!(batch.token, 2);
        assert_eq!(ring.claimed_size(), 8);
        assert_eq!(ring.region_start(), 40);
        assert_eq!(ring.in_flight_batches(), 1);
    }

    #[test]
    fn test_wrapping_offsets() {
        let mut ring = RingAllocator::new(16).unwrap();
        assert_eq!(ring.reserve(10).unwrap(), 0);
        ring.close_batch(0);
        ring.reclaim(1);
        assert!(ring.is_idle());
        assert_eq!(ring.region_start(), 10);

        let region = ring.reserve_region(10).unwrap();
        assert_eq!(region.offset(), 10);
        assert_eq!(region.spans(), (10..16, Some(0..4)));

        ring.close_batch(0);
        ring.reclaim(2);
        assert_eq!(ring.region_start(), 4);
    }

    #[test]
    fn test_wrap_add() {
        assert_eq!(wrap_add(3, 4, 16), 7);
        assert_eq!(wrap_add(12, 4, 16), 0);
        assert_eq!(wrap_add(12, 16, 16), 12);
        assert_eq!(wrap_add(usize::MAX - 1, 2, usize::MAX), 1);
    }
}
