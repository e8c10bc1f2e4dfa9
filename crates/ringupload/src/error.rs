//! Error types for ring allocation and upload orchestration.

use thiserror::Error;

/// Errors returned by [`RingAllocator`](crate::RingAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The ring was created with zero capacity.
    #[error("ring capacity must be greater than zero")]
    InvalidCapacity,

    /// The reservation does not fit into the unclaimed part of the ring.
    ///
    /// Space is freed by reclaiming completed batches. If `requested` exceeds
    /// `capacity` the reservation can never succeed; increase the ring size.
    #[error(
        "exceeded ring capacity: requested {requested} bytes, {available} of {capacity} available \
         (reclaim completed batches or increase the ring capacity)"
    )]
    CapacityExceeded {
        /// Number of bytes asked for.
        requested: usize,
        /// Unclaimed bytes at the time of the request.
        available: usize,
        /// Total ring capacity.
        capacity: usize,
    },
}

impl AllocError {
    /// Returns `true` if retrying after reclamation may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidCapacity => false,
            Self::CapacityExceeded {
                requested, capacity, ..
            } => requested <= capacity,
        }
    }
}

/// Errors returned by [`StagingBuffer`](crate::StagingBuffer) accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StagingError {
    /// Payload length differs from the reserved region size.
    #[error("payload of {actual} bytes does not match region of {expected} bytes")]
    LengthMismatch {
        /// Size of the reserved region.
        expected: usize,
        /// Length of the provided slice.
        actual: usize,
    },

    /// The region was reserved from a ring with a different capacity.
    #[error("region belongs to a ring of {region_capacity} bytes, staging buffer holds {capacity}")]
    ForeignRegion {
        /// Capacity recorded in the region.
        region_capacity: usize,
        /// Capacity of this staging buffer.
        capacity: usize,
    },

    /// The region starts outside the ring or is larger than the ring.
    #[error("region at offset {offset} of {size} bytes does not fit a ring of {capacity} bytes")]
    OutOfBounds {
        /// Ring offset of the first byte.
        offset: usize,
        /// Number of bytes in the region.
        size: usize,
        /// Capacity of this staging buffer.
        capacity: usize,
    },
}

/// Errors returned by [`Uploader`](crate::Uploader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UploadError {
    /// The underlying ring allocation failed.
    #[error(transparent)]
    Alloc(#[from] AllocError),

    /// Staging storage rejected the write.
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Waiting for the consumer cannot free enough space.
    ///
    /// Either the request is larger than the ring, or the space is held by the
    /// batch that has not been submitted yet.
    #[error("upload of {requested} bytes would stall: only {reclaimable} bytes can be freed by consumer progress")]
    WouldStall {
        /// Number of bytes asked for.
        requested: usize,
        /// Bytes that completion of submitted batches could free.
        reclaimable: usize,
    },

    /// Backoff was exhausted before the consumer released enough space.
    #[error("timed out waiting for token {waited_for} to free {requested} bytes")]
    Timeout {
        /// Number of bytes asked for.
        requested: usize,
        /// Token of the oldest in-flight batch at the time of giving up.
        waited_for: u64,
    },
}

impl UploadError {
    /// Returns `true` if retrying later may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Alloc(e) => e.is_recoverable(),
            Self::Timeout { .. } => true,
            Self::Staging(_) | Self::WouldStall { .. } => false,
        }
    }
}
