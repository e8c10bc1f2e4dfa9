use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of truth for how far the consumer has progressed.
///
/// Implementations must be monotonically non-decreasing and may only report
/// a value once all copy work tagged with that token has finished. The
/// allocator trusts this absolutely.
pub trait CompletionOracle {
    /// Returns the latest completed token.
    fn completed(&self) -> u64;
}

impl<T: CompletionOracle + ?Sized> CompletionOracle for &T {
    #[inline]
    fn completed(&self) -> u64 {
        (**self).completed()
    }
}

impl<T: CompletionOracle + ?Sized> CompletionOracle for Arc<T> {
    #[inline]
    fn completed(&self) -> u64 {
        (**self).completed()
    }
}

impl CompletionOracle for AtomicU64 {
    #[inline]
    fn completed(&self) -> u64 {
        self.load(Ordering::Acquire)
    }
}

/// Monotonic completion counter shared between producer and consumer.
///
/// The consumer calls [`signal`](Self::signal) after finishing the copies of a
/// batch; the producer reads it through [`CompletionOracle`].
///
/// Memory ordering: `signal` is an AcqRel `fetch_max`, reads are Acquire, so
/// a producer that observes token `t` also observes every consumer-side read
/// of the staging bytes that happened before `t` was signalled.
#[derive(Debug, Default)]
pub struct Timeline {
    value: CachePadded<AtomicU64>,
}

impl Timeline {
    /// Creates a timeline starting at `initial`.
    pub fn new(initial: u64) -> Self {
        Self {
            value: CachePadded::new(AtomicU64::new(initial)),
        }
    }

    /// Returns the latest signalled value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Advances the timeline to `value`. Lower values are ignored.
    ///
    /// Returns the value before the call.
    #[inline]
    pub fn signal(&self, value: u64) -> u64 {
        self.value.fetch_max(value, Ordering::AcqRel)
    }

    /// Returns true if the consumer has finished `token`.
    #[inline]
    pub fn has_reached(&self, token: u64) -> bool {
        self.value() >= token
    }
}

impl CompletionOracle for Timeline {
    #[inline]
    fn completed(&self) -> u64 {
        self.value()
    }
}
