use std::ops::Deref;
use std::sync::RwLock;

/// On-disk page identifier, minted by the buffer pool's internal allocator.
pub type PageId = i64;

/// Index of a slot in the buffer pool's frame array, in `[0, pool_size)`.
pub type FrameId = usize;

/// Size of a data page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Page id of a frame that holds no page.
pub const INVALID_PAGE_ID: PageId = -1;

/// Frame id that names no frame slot. The pool itself passes frames around
/// as `Option<FrameId>`; this sentinel is for layers that store frame ids
/// inline.
pub const INVALID_FRAME_ID: FrameId = usize::MAX;

/// The actual page data: in-memory metadata like the dirty bit and pin
/// count, plus the page-sized byte buffer mirroring storage.
pub struct PageData {
    pub id: PageId,
    pub data: Vec<u8>,
    pub is_dirty: bool,
    pub pin_count: i32,
}

impl PageData {
    fn new() -> Self {
        Self { id: INVALID_PAGE_ID, data: vec![0; PAGE_SIZE], is_dirty: false, pin_count: 0 }
    }

    /// Reset to the free-frame state: no page, clean, unpinned, zeroed buffer.
    pub fn clear(&mut self) {
        self.id = INVALID_PAGE_ID;
        self.is_dirty = false;
        self.pin_count = 0;
        self.data.fill(0);
    }
}

/// Page acts as the container of the actual page data, providing concurrent
/// access protection for the bytes handed out to callers. Pinning is
/// tracked separately by the buffer pool; the lock here only serializes
/// reads and writes of the page content.
pub struct Page {
    inner: RwLock<PageData>,
}

impl Page {
    /// Allocate a page in memory with PAGE_SIZE zeroed bytes and init the
    /// metadata accordingly.
    pub fn new() -> Self {
        Page { inner: RwLock::new(PageData::new()) }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Page {
    type Target = RwLock<PageData>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[test]
    fn test_page_starts_clear() -> Result<()> {
        let page = Page::new();
        let guard = page.read()?;
        assert_eq!(INVALID_PAGE_ID, guard.id);
        assert_eq!(0, guard.pin_count);
        assert!(!guard.is_dirty);
        assert_eq!(PAGE_SIZE, guard.data.len());
        assert!(guard.data.iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_clear_resets_metadata_and_bytes() -> Result<()> {
        let page = Page::new();
        let mut guard = page.write()?;
        guard.id = 7;
        guard.pin_count = 2;
        guard.is_dirty = true;
        guard.data[0] = 0xab;

        guard.clear();
        assert_eq!(INVALID_PAGE_ID, guard.id);
        assert_eq!(0, guard.pin_count);
        assert!(!guard.is_dirty);
        assert!(guard.data.iter().all(|&b| b == 0));
        Ok(())
    }
}
