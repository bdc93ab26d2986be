//! The page buffer cache: a fixed pool of in-memory frames fronting the
//! disk collaborator. The buffer pool owns the frames, the page table and
//! the free list; the replacer decides which unpinned frame to reclaim
//! when the pool is full.

pub mod bufferpool;
pub mod replacer;
