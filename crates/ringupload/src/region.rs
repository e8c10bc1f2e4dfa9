use std::ops::Range;

/// A reserved byte range of the ring.
///
/// The range is logical: byte `i` of the reservation lives at ring offset
/// `(offset + i) % capacity`. A region that runs past the end of the ring is
/// *wrapped* and maps onto two flat spans of the backing storage.
///
/// # Example
///
/// ```
/// use ringupload_rs::RingRegion;
///
/// let region = RingRegion::new(10, 10, 16);
/// assert!(region.is_wrapped());
/// assert_eq!(region.spans(), (10..16, Some(0..4)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingRegion {
    offset: usize,
    size: usize,
    capacity: usize,
}

impl RingRegion {
    /// Creates a region descriptor.
    ///
    /// Arguments are not validated; see [`is_in_bounds`](Self::is_in_bounds).
    /// Regions returned by the allocator are always in bounds.
    pub const fn new(offset: usize, size: usize, capacity: usize) -> Self {
        Self {
            offset,
            size,
            capacity,
        }
    }

    /// Returns true if `offset` lies inside the ring and `size` does not
    /// exceed `capacity`, so the region covers each ring byte at most once.
    #[inline]
    pub const fn is_in_bounds(&self) -> bool {
        self.offset < self.capacity && self.size <= self.capacity
    }

    /// Ring offset of the first byte.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Number of reserved bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Capacity of the ring the region was reserved from.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true for a zero-byte reservation.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Ring offset one past the last byte, wrapped into `[0, capacity)`.
    #[inline]
    pub const fn end_offset(&self) -> usize {
        let tail_room = self.capacity - self.offset;
        if self.size >= tail_room {
            self.size - tail_room
        } else {
            self.offset + self.size
        }
    }

    /// Returns true if the region crosses the end of the ring.
    #[inline]
    pub const fn is_wrapped(&self) -> bool {
        self.size > self.capacity - self.offset
    }

    /// Splits the region into flat spans of the backing storage.
    ///
    /// The second span is present only for wrapped regions and always starts
    /// at offset 0.
    pub fn spans(&self) -> (Range<usize>, Option<Range<usize>>) {
        if self.is_wrapped() {
            let head = self.capacity - self.offset;
            (self.offset..self.capacity, Some(0..self.size - head))
        } else {
            (self.offset..self.offset + self.size, None)
        }
    }

    /// Returns true if the ring offset `pos` belongs to this region.
    pub fn contains(&self, pos: usize) -> bool {
        if pos >= self.capacity {
            return false;
        }
        let distance = if pos >= self.offset {
            pos - self.offset
        } else {
            self.capacity - self.offset + pos
        };
        distance < self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_region() {
        let region = RingRegion::new(4, 8, 16);
        assert!(!region.is_wrapped());
        assert_eq!(region.end_offset(), 12);
        assert_eq!(region.spans(), (4..12, None));
        assert!(region.contains(4));
        assert!(region.contains(11));
        assert!(!region.contains(12));
        assert!(!region.contains(3));
    }

    #[test]
    fn test_region_ending_exactly_at_ring_end() {
        let region = RingRegion::new(10, 6, 16);
        assert!(!region.is_wrapped());
        assert_eq!(region.end_offset(), 0);
        assert_eq!(region.spans(), (10..16, None));
    }

    #[test]
    fn test_wrapped_region() {
        let region = RingRegion::new(10, 10, 16);
        assert!(region.is_wrapped());
        assert_eq!(region.end_offset(), 4);
        assert_eq!(region.spans(), (10..16, Some(0..4)));
        assert!(region.contains(15));
        assert!(region.contains(0));
        assert!(region.contains(3));
        assert!(!region.contains(4));
        assert!(!region.contains(9));
    }

    #[test]
    fn test_full_ring_region() {
        let region = RingRegion::new(5, 16, 16);
        assert!(region.is_wrapped());
        assert_eq!(region.end_offset(), 5);
        assert_eq!(region.spans(), (5..16, Some(0..5)));
        assert!((0..16).all(|pos| region.contains(pos)));
    }

    #[test]
    fn test_empty_region() {
        let region = RingRegion::new(7, 0, 16);
        assert!(region.is_empty());
        assert!(!region.is_wrapped());
        assert_eq!(region.spans(), (7..7, None));
        assert!(!region.contains(7));
    }

    #[test]
    fn test_bounds_check() {
        assert!(RingRegion::new(15, 16, 16).is_in_bounds());
        assert!(!RingRegion::new(16, 1, 16).is_in_bounds());
        assert!(!RingRegion::new(0, 17, 16).is_in_bounds());
    }
}
