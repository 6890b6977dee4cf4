/// Sectors 0 and 1 hold the offset and timestamp tables.
pub const HEADER_SECTORS: u32 = 2;

/// In-memory record of which 4 KiB sectors of a region file are in use.
///
/// Never persisted; rebuilt from the offset table on every load.
#[derive(Clone, Debug)]
pub struct SectorBitmap {
    used: Vec<bool>,
}

impl Default for SectorBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl SectorBitmap {
    pub fn new() -> Self {
        Self {
            used: vec![true; HEADER_SECTORS as usize],
        }
    }

    pub fn is_used(&self, sector: u32) -> bool {
        self.used.get(sector as usize).copied().unwrap_or(false)
    }

    /// Number of sectors currently marked, header included.
    pub fn used_count(&self) -> usize {
        self.used.iter().filter(|used| **used).count()
    }

    /// Marks `start..start + count` as used. Returns the first sector that was
    /// already taken, leaving the bitmap unchanged in that case.
    pub fn claim(&mut self, start: u32, count: u32) -> Result<(), u32> {
        if let Some(taken) = (start..start + count).find(|sector| self.is_used(*sector)) {
            return Err(taken);
        }
        self.mark(start, count);
        Ok(())
    }

    /// Releases a range. Header sectors stay reserved.
    pub fn free(&mut self, start: u32, count: u32) {
        for sector in start.max(HEADER_SECTORS)..start + count {
            if let Some(used) = self.used.get_mut(sector as usize) {
                *used = false;
            }
        }
    }

    /// First fit: the start of the lowest run of `count` free sectors at or
    /// after the header. Sectors in `released` count as free. Nothing is
    /// marked.
    pub fn find_free(&self, count: u32, released: Option<(u32, u32)>) -> u32 {
        let is_free = |sector: u32| {
            !self.is_used(sector)
                || released.is_some_and(|(start, len)| (start..start + len).contains(&sector))
        };
        let mut start = HEADER_SECTORS;
        let mut run = 0;
        let mut sector = HEADER_SECTORS;
        while run < count {
            if is_free(sector) {
                run += 1;
            } else {
                run = 0;
                start = sector + 1;
            }
            sector += 1;
        }
        start
    }

    pub fn clear(&mut self) {
        self.used.clear();
        self.used.resize(HEADER_SECTORS as usize, true);
    }

    pub(super) fn mark(&mut self, start: u32, count: u32) {
        let end = (start + count) as usize;
        if self.used.len() < end {
            self.used.resize(end, false);
        }
        self.used[start as usize..end].fill(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_reserved() {
        let mut bitmap = SectorBitmap::new();
        assert!(bitmap.is_used(0));
        assert!(bitmap.is_used(1));
        bitmap.free(0, 4);
        assert!(bitmap.is_used(0) && bitmap.is_used(1));
        assert_eq!(bitmap.claim(1, 1), Err(1));
        bitmap.clear();
        assert_eq!(bitmap.used_count(), 2);
    }

    fn allocate(bitmap: &mut SectorBitmap, count: u32) -> u32 {
        let start = bitmap.find_free(count, None);
        bitmap.claim(start, count).unwrap();
        start
    }

    #[test]
    fn test_sequential_first_fit() {
        let mut bitmap = SectorBitmap::new();
        assert_eq!(allocate(&mut bitmap, 1), 2);
        assert_eq!(allocate(&mut bitmap, 3), 3);
        assert_eq!(allocate(&mut bitmap, 1), 6);
    }

    #[test]
    fn test_first_fit_reuses_holes() {
        let mut bitmap = SectorBitmap::new();
        let a = allocate(&mut bitmap, 2);
        let b = allocate(&mut bitmap, 1);
        let c = allocate(&mut bitmap, 2);
        assert_eq!((a, b, c), (2, 4, 5));

        bitmap.free(a, 2);
        // too big for the hole
        assert_eq!(allocate(&mut bitmap, 3), 7);
        // fits exactly
        assert_eq!(allocate(&mut bitmap, 2), 2);
        assert_eq!(allocate(&mut bitmap, 1), 10);
    }

    #[test]
    fn test_find_free_counts_released_range() {
        let mut bitmap = SectorBitmap::new();
        allocate(&mut bitmap, 1);
        allocate(&mut bitmap, 1);
        let used = bitmap.used_count();
        // sector 2 is released and 4 onwards is empty
        assert_eq!(bitmap.find_free(2, Some((2, 1))), 4);
        assert_eq!(bitmap.find_free(2, Some((3, 1))), 3);
        assert_eq!(bitmap.find_free(2, None), 4);
        assert_eq!(bitmap.used_count(), used);
    }

    #[test]
    fn test_claim_overlap() {
        let mut bitmap = SectorBitmap::new();
        assert_eq!(bitmap.claim(5, 3), Ok(()));
        assert_eq!(bitmap.claim(7, 2), Err(7));
        // the failed claim did not mark sector 8
        assert!(!bitmap.is_used(8));
        assert_eq!(bitmap.claim(8, 1), Ok(()));
    }
}
