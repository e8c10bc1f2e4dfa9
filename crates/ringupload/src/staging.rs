use crate::{RingRegion, StagingError};

/// Host-side backing storage for the ring.
///
/// Addresses bytes by ring offset and handles the split of wrapped regions,
/// so callers never compute addresses themselves.
pub struct StagingBuffer {
    /// Fixed-size allocation; never grows or shrinks.
    bytes: Box<[u8]>,
}

impl StagingBuffer {
    /// Allocates zeroed storage for a ring of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Returns the storage size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the whole backing storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn check_region(&self, region: &RingRegion) -> Result<(), StagingError> {
        if region.capacity() != self.capacity() {
            return Err(StagingError::ForeignRegion {
                region_capacity: region.capacity(),
                capacity: self.capacity(),
            });
        }
        if !region.is_in_bounds() {
            return Err(StagingError::OutOfBounds {
                offset: region.offset(),
                size: region.size(),
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    fn check_len(region: &RingRegion, len: usize) -> Result<(), StagingError> {
        if region.size() != len {
            return Err(StagingError::LengthMismatch {
                expected: region.size(),
                actual: len,
            });
        }
        Ok(())
    }

    /// Returns the flat spans of `region` for in-place writes.
    ///
    /// The second slice is empty unless the region wraps.
    pub fn spans_mut(&mut self, region: &RingRegion) -> Result<(&mut [u8], &mut [u8]), StagingError> {
        self.check_region(region)?;
        let (first, second) = region.spans();
        match second {
            Some(second) => {
                // second always starts at 0 and ends before first.start
                let (low, high) = self.bytes.split_at_mut(first.start);
                Ok((high, &mut low[second]))
            }
            None => {
                let empty: &mut [u8] = &mut [];
                Ok((&mut self.bytes[first], empty))
            }
        }
    }

    /// Copies `data` into `region`, splitting at the wrap point.
    pub fn write(&mut self, region: &RingRegion, data: &[u8]) -> Result<(), StagingError> {
        Self::check_len(region, data.len())?;
        let (head, tail) = self.spans_mut(region)?;
        let (data_head, data_tail) = data.split_at(head.len());
        head.copy_from_slice(data_head);
        tail.copy_from_slice(data_tail);
        Ok(())
    }

    /// Copies the bytes of `region` into `out`.
    pub fn read_into(&self, region: &RingRegion, out: &mut [u8]) -> Result<(), StagingError> {
        self.check_region(region)?;
        Self::check_len(region, out.len())?;
        let (first, second) = region.spans();
        let (out_head, out_tail) = out.split_at_mut(first.len());
        out_head.copy_from_slice(&self.bytes[first]);
        if let Some(second) = second {
            out_tail.copy_from_slice(&self.bytes[second]);
        }
        Ok(())
    }

    /// Returns a copy of the bytes of `region`.
    pub fn read(&self, region: &RingRegion) -> Result<Vec<u8>, StagingError> {
        let mut out = vec![0u8; region.size()];
        self.read_into(region, &mut out)?;
        Ok(out)
    }
}

impl std::fmt::Debug for StagingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingBuffer")
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_write_read() {
        let mut staging = StagingBuffer::new(16);
        let region = RingRegion::new(2, 4, 16);
        staging.write(&region, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&staging.as_bytes()[2..6], &[1, 2, 3, 4]);
        assert_eq!(staging.read(&region).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_wrapped_write_splits_at_ring_end() {
        let mut staging = StagingBuffer::new(8);
        let region = RingRegion::new(6, 5, 8);
        staging.write(&region, &[10, 11, 12, 13, 14]).unwrap();

        assert_eq!(&staging.as_bytes()[6..8], &[10, 11]);
        assert_eq!(&staging.as_bytes()[0..3], &[12, 13, 14]);
        assert_eq!(staging.read(&region).unwrap(), vec![10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_spans_mut_lengths() {
        let mut staging = StagingBuffer::new(8);
        let region = RingRegion::new(5, 6, 8);
        let (head, tail) = staging.spans_mut(&region).unwrap();
        assert_eq!(head.len(), 3);
        assert_eq!(tail.len(), 3);

        let flat = RingRegion::new(0, 8, 8);
        let (head, tail) = staging.spans_mut(&flat).unwrap();
        assert_eq!(head.len(), 8);
        assert!(tail.is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut staging = StagingBuffer::new(8);
        let region = RingRegion::new(0, 4, 8);
        assert_eq!(
            staging.write(&region, &[1, 2]),
            Err(StagingError::LengthMismatch {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_foreign_region_rejected() {
        let staging = StagingBuffer::new(8);
        let region = RingRegion::new(0, 4, 16);
        assert!(matches!(
            staging.read(&region),
            Err(StagingError::ForeignRegion { .. })
        ));
    }

    #[test]
    fn test_offset_past_ring_end_rejected() {
        let mut staging = StagingBuffer::new(16);
        let region = RingRegion::new(20, 4, 16);
        assert_eq!(
            staging.write(&region, &[1, 2, 3, 4]),
            Err(StagingError::OutOfBounds {
                offset: 20,
                size: 4,
                capacity: 16
            })
        );
        assert!(staging.spans_mut(&region).is_err());
    }

    #[test]
    fn test_region_larger_than_ring_rejected() {
        let mut staging = StagingBuffer::new(16);
        staging.write(&RingRegion::new(0, 16, 16), &[7; 16]).unwrap();

        // Would otherwise read bytes 0..4 twice
        let region = RingRegion::new(0, 20, 16);
        assert_eq!(
            staging.read(&region),
            Err(StagingError::OutOfBounds {
                offset: 0,
                size: 20,
                capacity: 16
            })
        );
    }
}
