use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::storage::page::{PageId, PAGE_SIZE};
use crate::storage::DiskManager;

/// A disk manager backed by a single file, with the page `id` stored at
/// byte offset `id * PAGE_SIZE`. Reads past the end of the file yield
/// zeroes, so pages can be fetched before their first write reaches disk.
#[derive(Debug)]
pub struct FileDiskManager {
    file: File,
}

impl FileDiskManager {
    pub fn new(path: &Path) -> Result<FileDiskManager> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(FileDiskManager { file })
    }

    fn offset(page_id: PageId) -> Result<u64> {
        if page_id < 0 {
            return Err(Error::internal(format!("invalid page id {}", page_id)));
        }
        Ok(page_id as u64 * PAGE_SIZE as u64)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let offset = Self::offset(page_id)?;
        let len = self.file.metadata()?.len();
        if offset >= len {
            buf.fill(0);
            return Ok(());
        }
        self.file.seek(SeekFrom::Start(offset))?;
        // a short read means the page straddles the end of file; the tail
        // reads as zeroes like a never-written page.
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf[filled..].fill(0);
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()> {
        let offset = Self::offset(page_id)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        self.file.flush()?;
        Ok(())
    }

    fn deallocate_page(&mut self, _page_id: PageId) -> Result<()> {
        // on-disk free-space management lives above this layer; the slot is
        // simply left behind for a future write to the same id.
        Ok(())
    }
}
