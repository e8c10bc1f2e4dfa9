/// Optional counters for monitoring an uploader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UploadMetrics {
    pub uploads: u64,
    pub bytes_uploaded: u64,
    pub batches_submitted: u64,
    pub batches_reclaimed: u64,
    pub bytes_reclaimed: u64,
    /// Uploads that found the ring full at least once.
    pub backpressure_events: u64,
    /// High-water mark of claimed bytes.
    pub peak_claimed: usize,
}

impl UploadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_upload(&mut self, bytes: usize, claimed: usize) {
        self.uploads += 1;
        self.bytes_uploaded += bytes as u64;
        self.peak_claimed = self.peak_claimed.max(claimed);
    }

    pub(crate) fn record_reclaim(&mut self, batches: usize, bytes: usize) {
        self.batches_reclaimed += batches as u64;
        self.bytes_reclaimed += bytes as u64;
    }
}
