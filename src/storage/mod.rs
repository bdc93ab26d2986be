use std::fmt::Debug;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::storage::page::PageId;

pub mod buffer;
pub mod file;
pub mod memory;
pub mod page;

/// The disk collaborator moves fixed-size pages between memory and the
/// underlying medium, addressed by page id. All calls are blocking.
/// The DiskManager trait is designed as `trait object` compatible so the
/// buffer pool can hold it behind dynamic dispatch.
pub trait DiskManager: Debug + Send {
    /// Fills `buf` with the on-disk content of the given page. `buf` must be
    /// `PAGE_SIZE` bytes. A page that has never been written reads as zeroes.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persists `buf` as the content of the given page.
    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()>;

    /// Informs the disk layer that the given page id is no longer in use.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()>;
}

/// Write-ahead log collaborator. The buffer pool accepts one at construction
/// so a recovery layer can slot in; the eviction and flush paths do not call
/// into it yet.
pub trait LogManager: Send {
    /// Force log records up to and including `lsn` to stable storage.
    fn flush_to(&mut self, lsn: u64) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DiskType {
    Memory,
    File(PathBuf),
}

pub fn new_disk(typ: DiskType) -> Result<Box<dyn DiskManager>> {
    match typ {
        DiskType::Memory => Ok(Box::new(memory::MemoryDiskManager::new())),
        DiskType::File(path) => Ok(Box::new(file::FileDiskManager::new(&path)?)),
    }
}
