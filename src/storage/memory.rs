use std::collections::BTreeMap;

use crate::error::Result;
use crate::storage::page::PageId;
use crate::storage::DiskManager;

/// An in-memory disk manager, mainly for testing and ephemeral databases.
/// Pages that have never been written read as zeroes.
#[derive(Debug)]
pub struct MemoryDiskManager {
    pages: BTreeMap<PageId, Vec<u8>>,
}

impl MemoryDiskManager {
    pub fn new() -> MemoryDiskManager {
        MemoryDiskManager { pages: BTreeMap::new() }
    }
}

impl Default for MemoryDiskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        match self.pages.get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()> {
        self.pages.insert(page_id, buf.to_vec());
        Ok(())
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        self.pages.remove(&page_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::PAGE_SIZE;

    #[test]
    fn test_unknown_page_reads_zeroed() -> Result<()> {
        let mut disk = MemoryDiskManager::new();
        let mut buf = vec![0xff; PAGE_SIZE];
        disk.read_page(3, &mut buf)?;
        assert!(buf.iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_write_read_roundtrip() -> Result<()> {
        let mut disk = MemoryDiskManager::new();

        let mut data = vec![0; PAGE_SIZE];
        data[0] = 42;
        data[PAGE_SIZE - 1] = 7;
        disk.write_page(0, &data)?;

        let mut buf = vec![0; PAGE_SIZE];
        disk.read_page(0, &mut buf)?;
        assert_eq!(data, buf);
        Ok(())
    }

    #[test]
    fn test_deallocate_drops_content() -> Result<()> {
        let mut disk = MemoryDiskManager::new();

        let data = vec![1; PAGE_SIZE];
        disk.write_page(0, &data)?;
        disk.deallocate_page(0)?;

        let mut buf = vec![0xff; PAGE_SIZE];
        disk.read_page(0, &mut buf)?;
        assert!(buf.iter().all(|&b| b == 0));
        Ok(())
    }
}
