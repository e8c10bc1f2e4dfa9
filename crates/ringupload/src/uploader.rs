use crate::{
    AllocError, BatchDescriptor, CompletionOracle, RingAllocator, RingRegion, StagingBuffer,
    StagingError, UploadError, UploadMetrics, UploaderConfig,
};
use crossbeam_utils::Backoff;
use std::mem;
use std::thread;
use std::time::Instant;

/// Handle of a device-side destination buffer.
///
/// Opaque to the uploader; it is only carried through to the copy commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferId(pub u64);

/// One recorded copy from the staging ring into a destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCommand {
    /// Source bytes in the staging ring.
    pub src: RingRegion,
    /// Destination buffer.
    pub dst: BufferId,
    /// Byte offset inside the destination buffer.
    pub dst_offset: usize,
}

impl CopyCommand {
    /// Number of bytes copied.
    #[inline]
    pub fn size(&self) -> usize {
        self.src.size()
    }

    /// Performs the copy on the host, writing into `dst` (the full contents of
    /// the destination buffer).
    ///
    /// Stands in for the device executing the command; used by consumers that
    /// live on the host, such as tests and simulations.
    pub fn execute(&self, staging: &StagingBuffer, dst: &mut [u8]) -> Result<(), StagingError> {
        let end = self.dst_offset.saturating_add(self.size());
        if end > dst.len() {
            return Err(StagingError::LengthMismatch {
                expected: end,
                actual: dst.len(),
            });
        }
        staging.read_into(&self.src, &mut dst[self.dst_offset..end])
    }
}

/// Everything the consumer needs to process one closed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSubmission {
    /// Closed batch; signal `batch.token` once all commands have finished.
    pub batch: BatchDescriptor,
    /// Copies recorded while the batch was open, in upload order.
    pub commands: Vec<CopyCommand>,
}

impl UploadSubmission {
    /// Completion counter value to signal after executing the commands.
    #[inline]
    pub fn token(&self) -> u64 {
        self.batch.token
    }

    /// Returns true if the batch carries no copies.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Debug name for the command list executing this submission.
    pub fn label(&self) -> String {
        format!("upload batch #{}", self.batch.token)
    }
}

/// Streams host data to device buffers through a staging ring.
///
/// Wraps a [`RingAllocator`] with its backing [`StagingBuffer`], records a
/// [`CopyCommand`] per upload and hands them out per batch on
/// [`submit`](Self::submit). Ring space is reclaimed as the `oracle` reports
/// finished batches.
///
/// # Example
///
/// ```
/// use ringupload_rs::{BufferId, Timeline, Uploader, UploaderConfig};
///
/// let timeline = Timeline::new(0);
/// let mut uploader = Uploader::new(UploaderConfig::default().with_capacity(256), &timeline).unwrap();
///
/// uploader.upload(BufferId(1), 0, &[1, 2, 3, 4]).unwrap();
/// let submission = uploader.submit();
/// assert_eq!(submission.commands.len(), 1);
///
/// // The consumer executes the copies, then signals the batch token
/// timeline.signal(submission.token());
/// assert_eq!(uploader.reclaim(), 4);
/// ```
#[derive(Debug)]
pub struct Uploader<O> {
    allocator: RingAllocator,
    staging: StagingBuffer,
    /// Copies recorded for the open batch.
    commands: Vec<CopyCommand>,
    oracle: O,
    metrics: UploadMetrics,
    config: UploaderConfig,
}

impl<O: CompletionOracle> Uploader<O> {
    /// Creates an uploader with a ring of `config.capacity` bytes.
    pub fn new(config: UploaderConfig, oracle: O) -> Result<Self, UploadError> {
        let allocator = RingAllocator::new(config.capacity)?;
        Ok(Self {
            allocator,
            staging: StagingBuffer::new(config.capacity),
            commands: Vec::new(),
            oracle,
            metrics: UploadMetrics::new(),
            config,
        })
    }

    // ---------------------------------------------------------------------
    // ACCESSORS
    // ---------------------------------------------------------------------

    /// Returns the ring bookkeeping.
    #[inline]
    pub fn allocator(&self) -> &RingAllocator {
        &self.allocator
    }

    /// Returns the staging storage.
    #[inline]
    pub fn staging(&self) -> &StagingBuffer {
        &self.staging
    }

    /// Returns the completion oracle.
    #[inline]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Returns the collected metrics (all zero unless enabled).
    #[inline]
    pub fn metrics(&self) -> &UploadMetrics {
        &self.metrics
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Returns the copies recorded since the last submit.
    #[inline]
    pub fn pending_commands(&self) -> &[CopyCommand] {
        &self.commands
    }

    // ---------------------------------------------------------------------
    // UPLOADS
    // ---------------------------------------------------------------------

    /// Stages `data` and records a copy to `dst` at `dst_offset`.
    ///
    /// Fails with [`AllocError::CapacityExceeded`] if the ring is full; the
    /// caller decides whether to submit, wait, or drop the upload.
    pub fn upload(
        &mut self,
        dst: BufferId,
        dst_offset: usize,
        data: &[u8],
    ) -> Result<RingRegion, UploadError> {
        let region = self.reserve(data.len())?;
        self.staging.write(&region, data)?;
        self.record(region, dst, dst_offset);
        Ok(region)
    }

    /// Reserves `size` bytes and lets `fill` write them in place.
    ///
    /// `fill` receives the two flat spans of the region; the second is empty
    /// unless the region wraps around the end of the ring.
    pub fn upload_with<F>(
        &mut self,
        dst: BufferId,
        dst_offset: usize,
        size: usize,
        fill: F,
    ) -> Result<RingRegion, UploadError>
    where
        F: FnOnce(&mut [u8], &mut [u8]),
    {
        let region = self.reserve(size)?;
        let (head, tail) = self.staging.spans_mut(&region)?;
        fill(head, tail);
        self.record(region, dst, dst_offset);
        Ok(region)
    }

    /// Like [`upload`](Self::upload), but waits for the consumer when the
    /// ring is full.
    ///
    /// Polls the oracle with adaptive backoff (spin, then yield) until enough
    /// submitted batches complete or `config.wait_timeout` elapses. Fails
    /// immediately with [`UploadError::WouldStall`] when consumer progress
    /// cannot free enough space, e.g. when the open batch itself fills the
    /// ring and has to be submitted first.
    pub fn upload_blocking(
        &mut self,
        dst: BufferId,
        dst_offset: usize,
        data: &[u8],
    ) -> Result<RingRegion, UploadError> {
        let requested = data.len();
        let backoff = Backoff::new();
        let mut deadline = None;

        loop {
            self.reclaim();
            match self.allocator.reserve_region(requested) {
                Ok(region) => {
                    self.staging.write(&region, data)?;
                    self.record(region, dst, dst_offset);
                    return Ok(region);
                }
                Err(AllocError::CapacityExceeded { available, .. }) => {
                    let reclaimable = self.allocator.in_flight_size();
                    if requested > available + reclaimable {
                        return Err(UploadError::WouldStall {
                            requested,
                            reclaimable,
                        });
                    }

                    let give_up_at =
                        *deadline.get_or_insert_with(|| self.start_waiting(requested));
                    if backoff.is_completed() {
                        if Instant::now() >= give_up_at {
                            let waited_for = self.allocator.oldest_pending_token().unwrap_or(0);
                            log::warn!(
                                "gave up waiting for token {} to free {} bytes",
                                waited_for,
                                requested
                            );
                            return Err(UploadError::Timeout {
                                requested,
                                waited_for,
                            });
                        }
                        thread::yield_now();
                    } else {
                        backoff.snooze();
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // ---------------------------------------------------------------------
    // SUBMISSION & RECLAMATION
    // ---------------------------------------------------------------------

    /// Closes the open batch and returns its copies.
    ///
    /// Finished batches are reclaimed first using a fresh oracle read. The
    /// returned submission's token must be signalled through the oracle once
    /// all its commands have executed.
    pub fn submit(&mut self) -> UploadSubmission {
        let completed = self.oracle.completed();
        let batches_before = self.allocator.in_flight_batches();
        let claimed_before = self.allocator.claimed_size();

        let batch = self.allocator.close_batch(completed);
        let commands = mem::take(&mut self.commands);

        // close_batch pushed one batch after reclaiming
        let reclaimed = batches_before + 1 - self.allocator.in_flight_batches();
        let freed = claimed_before - self.allocator.claimed_size();
        self.note_reclaimed(reclaimed, freed, completed);

        log::debug!(
            "submitted batch {} with {} copies ({} bytes, {} of {} bytes in flight)",
            batch.token,
            commands.len(),
            batch.size,
            self.allocator.claimed_size(),
            self.allocator.capacity()
        );
        if self.config.enable_metrics {
            self.metrics.batches_submitted += 1;
        }

        UploadSubmission { batch, commands }
    }

    /// Reclaims every batch the oracle reports as finished.
    ///
    /// Returns the number of bytes freed.
    pub fn reclaim(&mut self) -> usize {
        let completed = self.oracle.completed();
        let batches_before = self.allocator.in_flight_batches();
        let freed = self.allocator.reclaim(completed);
        let reclaimed = batches_before - self.allocator.in_flight_batches();
        self.note_reclaimed(reclaimed, freed, completed);
        freed
    }

    // ---------------------------------------------------------------------
    // INTERNALS
    // ---------------------------------------------------------------------

    fn reserve(&mut self, size: usize) -> Result<RingRegion, UploadError> {
        self.allocator.reserve_region(size).map_err(|e| {
            if let AllocError::CapacityExceeded {
                requested,
                available,
                capacity,
            } = e
            {
                if requested > capacity {
                    log::warn!(
                        "upload of {} bytes exceeds ring capacity of {} bytes",
                        requested,
                        capacity
                    );
                } else {
                    log::warn!(
                        "upload ring full: requested {} bytes, {} of {} available",
                        requested,
                        available,
                        capacity
                    );
                    if self.config.enable_metrics {
                        self.metrics.backpressure_events += 1;
                    }
                }
            }
            e.into()
        })
    }

    fn record(&mut self, src: RingRegion, dst: BufferId, dst_offset: usize) {
        self.commands.push(CopyCommand {
            src,
            dst,
            dst_offset,
        });
        if self.config.enable_metrics {
            self.metrics
                .record_upload(src.size(), self.allocator.claimed_size());
        }
    }

    fn start_waiting(&mut self, requested: usize) -> Instant {
        log::warn!(
            "upload ring full, waiting for token {:?} to free {} bytes",
            self.allocator.oldest_pending_token(),
            requested
        );
        if self.config.enable_metrics {
            self.metrics.backpressure_events += 1;
        }
        Instant::now() + self.config.wait_timeout
    }

    fn note_reclaimed(&mut self, batches: usize, bytes: usize, completed: u64) {
        if batches == 0 {
            return;
        }
        log::trace!(
            "reclaimed {} batches ({} bytes) up to token {}",
            batches,
            bytes,
            completed
        );
        if self.config.enable_metrics {
            self.metrics.record_reclaim(batches, bytes);
        }
    }
}
