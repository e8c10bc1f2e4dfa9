//! RingUpload - Ring-Buffer Upload Allocator
//!
//! Hands out scratch regions of a fixed-capacity staging ring for
//! host-to-device transfers, groups them into batches tagged with a
//! completion token, and reclaims a batch's bytes only after the consumer
//! reports that token as finished.
//!
//! # Key Features
//!
//! - Strict FIFO reclamation (space is freed contiguously from the tail)
//! - Backpressure as an error, never a silent overwrite
//! - Logical wrap-around with explicit two-span access for flat writes
//! - Bookkeeping core with no device objects; the completion counter is a trait
//!
//! # Layers
//!
//! - [`RingAllocator`]: offsets and tokens only
//! - [`StagingBuffer`]: host bytes addressed by [`RingRegion`]
//! - [`Timeline`] / [`CompletionOracle`]: the consumer's progress counter
//! - [`Uploader`]: records [`CopyCommand`]s and produces [`UploadSubmission`]s
//!
//! # Example
//!
//! ```
//! use ringupload_rs::RingAllocator;
//!
//! let mut ring = RingAllocator::new(16).unwrap();
//! assert_eq!(ring.reserve(10).unwrap(), 0);
//! let batch = ring.close_batch(0);
//!
//! // Consumer finished the batch
//! ring.reclaim(batch.token);
//!
//! // The next region wraps: bytes 10..16 and 0..4
//! let region = ring.reserve_region(10).unwrap();
//! assert_eq!(region.spans(), (10..16, Some(0..4)));
//! ```

mod allocator;
mod config;
mod error;
mod invariants;
mod metrics;
mod region;
mod staging;
mod timeline;
mod uploader;

pub use allocator::{BatchDescriptor, RingAllocator};
pub use config::{UploaderConfig, LARGE_UPLOADER_CONFIG, SMALL_UPLOADER_CONFIG};
pub use error::{AllocError, StagingError, UploadError};
pub use metrics::UploadMetrics;
pub use region::RingRegion;
pub use staging::StagingBuffer;
pub use timeline::{CompletionOracle, Timeline};
pub use uploader::{BufferId, CopyCommand, UploadSubmission, Uploader};
