use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::page::{FrameId, Page, PageId, INVALID_PAGE_ID};
use crate::storage::{new_disk, DiskManager, LogManager};

use super::replacer::{Replacer, SyncLRUKReplacer};

/// The buffer pool is responsible for moving physical pages back and forth
/// from main memory to disk. It allows a DBMS to support databases that are
/// larger than the amount of memory available to the system.
///
/// The buffer pool's operations are transparent to other parts of the
/// system. For example, the system asks the buffer pool for a page using its
/// unique identifier (page id) and it does not know whether that page is
/// already in memory or whether the system has to retrieve it from disk.
struct BufferPool {
    pool_size: usize,
    /// disk collaborator the pages are read from and written to.
    disk: Box<dyn DiskManager>,
    /// write-ahead log collaborator, held for recovery integration.
    /// nothing on the core path calls into it yet.
    #[allow(dead_code)]
    log_manager: Option<Box<dyn LogManager>>,
    /// array of buffer pool pages. the array index is the FrameId,
    /// i.e., the FrameId is in range: [0, pool_size).
    pages: Vec<Arc<Page>>,
    /// page table for keeping track of resident buffer pool pages.
    page_table: HashMap<PageId, FrameId>,
    /// frames that don't currently hold any page.
    free_list: VecDeque<FrameId>,
    /// Replacer to find unpinned frames for replacement.
    replacer: Box<dyn Replacer>,
    /// The next page id to be allocated.
    next_page_id: PageId,
}

impl BufferPool {
    fn new(
        disk: Box<dyn DiskManager>,
        pool_size: usize,
        replacer_k: usize,
        log_manager: Option<Box<dyn LogManager>>,
    ) -> Self {
        assert!(pool_size > 0, "buffer pool requires at least one frame");
        let mut pages = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        let page_table = HashMap::new();
        let replacer: Box<dyn Replacer> = Box::new(SyncLRUKReplacer::new(replacer_k, pool_size));
        for i in 0..pool_size {
            pages.push(Arc::new(Page::new()));
            // initially, every frame is on the free list
            free_list.push_back(i);
        }
        BufferPool {
            pool_size,
            disk,
            log_manager,
            pages,
            page_table,
            free_list,
            replacer,
            next_page_id: 0,
        }
    }

    /// Take a frame from the free list, or fall back to evicting the
    /// replacer's victim, writing its page back to disk first if dirty. The
    /// free list is preferred so the replacer keeps the access history of
    /// frames that may still be useful.
    ///
    /// The returned frame is clear and is tracked by neither the page table
    /// nor the replacer.
    fn acquire_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(Error::NoAvailableFrame)?;

        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        let old_page_id = guard.id;
        if guard.is_dirty {
            debug!("evicting dirty frame {} holding page {}", frame_id, old_page_id);
            self.disk.write_page(old_page_id, &guard.data)?;
        }
        guard.clear();
        // unlink the evicted page from the page table
        self.page_table.remove(&old_page_id);

        Ok(frame_id)
    }

    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    /// Create a new page in the buffer pool, or return `NoAvailableFrame` if
    /// all frames are currently in use and not evictable (in other words,
    /// pinned).
    ///
    /// The new page never touches disk on this path: its frame is handed out
    /// zeroed, pinned once, with a freshly allocated page id.
    fn new_page(&mut self) -> Result<Arc<Page>> {
        let frame_id = self.acquire_frame()?;
        let page_id = self.allocate_page();

        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        guard.id = page_id;
        guard.pin_count = 1;

        // link the new page with the frame into the page table, and pin the
        // frame so the replacer won't evict it before it is unpinned.
        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        drop(guard);
        Ok(page)
    }

    /// Fetch the requested page from the buffer pool, or return
    /// `NoAvailableFrame` if the page has to come from disk but all frames
    /// are currently in use and not evictable.
    ///
    /// On a hit the frame is re-pinned and the access recorded. On a miss a
    /// replacement frame is taken from either the free list or the replacer
    /// (free list first), the old page is written back if dirty, and the
    /// requested page is read from disk into the frame.
    fn fetch_page(&mut self, page_id: PageId) -> Result<Arc<Page>> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            let page = Arc::clone(&self.pages[frame_id]);
            let mut guard = page.write()?;
            guard.pin_count += 1;
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);

            drop(guard);
            return Ok(page);
        }

        let frame_id = self.acquire_frame()?;

        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        guard.id = page_id;
        guard.pin_count = 1;
        self.disk.read_page(page_id, guard.data.as_mut_slice())?;

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        drop(guard);
        Ok(page)
    }

    /// Unpin the target page. Return false if the page is not resident or
    /// its pin count is already zero, which indicates a caller bug.
    ///
    /// A true `is_dirty` latches the frame's dirty flag; false never clears
    /// it. When the pin count drops to zero the frame becomes evictable.
    fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) -> bool {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };
        let page = &self.pages[frame_id];
        let mut guard = page.write().unwrap();
        if guard.pin_count == 0 {
            return false;
        }
        guard.pin_count -= 1;
        if is_dirty {
            guard.is_dirty = true;
        }
        if guard.pin_count == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Write the target page to disk regardless of the dirty flag and unset
    /// the dirty flag afterwards. Pin state is untouched.
    ///
    /// Return false if the page id is the invalid sentinel or the page is
    /// not resident, true otherwise.
    fn flush_page(&mut self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Ok(false);
        }
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Ok(false),
        };
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        self.disk.write_page(page_id, &guard.data)?;
        guard.is_dirty = false;

        Ok(true)
    }

    /// Write every resident page to disk, clearing the dirty flags.
    fn flush_all_pages(&mut self) -> Result<()> {
        debug!("flushing all {} resident pages", self.page_table.len());
        let frames: Vec<FrameId> = self.page_table.values().copied().collect();
        for frame_id in frames {
            let page = Arc::clone(&self.pages[frame_id]);
            let mut guard = page.write()?;
            self.disk.write_page(guard.id, &guard.data)?;
            guard.is_dirty = false;
        }
        Ok(())
    }

    /// Delete a page from the buffer pool. If the page is not resident, do
    /// nothing and return true. If the page is pinned, return false.
    ///
    /// Otherwise the frame goes back on the free list cleared of data and
    /// metadata, the page table and replacer drop the frame, and the disk
    /// collaborator is told to deallocate the page id.
    fn delete_page(&mut self, page_id: PageId) -> Result<bool> {
        let frame_id = match self.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Ok(true),
        };
        let page = &self.pages[frame_id];
        let mut guard = page.write()?;
        if guard.pin_count > 0 {
            return Ok(false);
        }
        guard.clear();
        drop(guard);

        self.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        self.free_list.push_back(frame_id);
        self.disk.deallocate_page(page_id)?;

        Ok(true)
    }
}

/// Buffer pool manager wraps the buffer pool with a mutex for concurrent
/// access; all the heavy lifting happens in the buffer pool. The latch is
/// held across disk I/O, which serializes I/O across the pool in favor of
/// simple invariants.
pub struct BufferPoolManager {
    /// the actual buffer pool protected by a mutex latch.
    inner: Arc<Mutex<BufferPool>>,
}

impl BufferPoolManager {
    pub fn new(
        disk: Box<dyn DiskManager>,
        pool_size: usize,
        replacer_k: usize,
        log_manager: Option<Box<dyn LogManager>>,
    ) -> Self {
        let inner = BufferPool::new(disk, pool_size, replacer_k, log_manager);
        BufferPoolManager { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Build a manager from configuration, constructing the disk
    /// collaborator via the configured disk type.
    pub fn from_config(config: &Config) -> Result<Self> {
        let disk = new_disk(config.disk_type.clone())?;
        Ok(BufferPoolManager::new(disk, config.pool_size, config.replacer_k, None))
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.pool_size
    }

    /// Create a new page in the buffer pool. The returned page is pinned
    /// once; callers must unpin it when done.
    pub fn new_page(&self) -> Result<Arc<Page>> {
        let mut inner = self.inner.lock()?;
        inner.new_page()
    }

    /// Fetch the requested page with the given page id from the buffer
    /// pool, pinning it. Callers must unpin it when done.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<Page>> {
        let mut inner = self.inner.lock()?;
        inner.fetch_page(page_id)
    }

    /// Unpin the target page from the buffer pool. Return false if the page
    /// is not resident or its pin count is already zero. A true `is_dirty`
    /// latches the dirty flag; false never clears it.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.unpin_page(page_id, is_dirty)
    }

    /// Write the target page to disk regardless of the dirty flag and unset
    /// the dirty flag afterwards.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.flush_page(page_id)
    }

    /// Write every resident page in the buffer pool to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.flush_all_pages()
    }

    /// Delete a page from the buffer pool. A page that is not resident is
    /// trivially deleted; a pinned page cannot be deleted.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.delete_page(page_id)
    }
}
