use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::storage::page::FrameId;

/// Replacer tracks frame usage for replacement in case the buffer pool is full.
pub trait Replacer: Send + Sync {
    /// Record the event that the given frame id is accessed at current timestamp.
    /// Create a new entry for access history if frame id has not been seen before;
    /// a newly tracked frame starts out non-evictable.
    fn record_access(&self, frame_id: FrameId);

    /// Find the frame to evict with the replacement policy (backward k-distance).
    /// Only frames that are marked as evictable are candidates for eviction.
    ///
    /// Successful eviction of a frame should decrement the size of replacer and
    /// remove the frame's access history.
    ///
    /// Return the frame id if a frame is evicted successfully, None if no frames
    /// can be evicted.
    fn evict(&self) -> Option<FrameId>;

    /// Toggle whether a frame is evictable or non-evictable. This function also
    /// controls replacer size. Note that size is equal to number of evictable
    /// entries.
    ///
    /// If a frame was previously evictable and is to be set to non-evictable, then
    /// size should decrement. If a frame was previously non-evictable and is to be
    /// set evictable, then size should increment.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Remove a frame from replacer, along with its access history, regardless of
    /// its backward k-distance. This function should also decrement the replacer
    /// size if removal is successful.
    ///
    /// Removing a non-evictable frame is a programming error and panics. If the
    /// specified frame is not found, do nothing without returning any error.
    fn remove(&self, frame_id: FrameId);

    /// Replacer size, the number of currently evictable frames.
    fn size(&self) -> usize;
}

/// Eviction key of a frame: victims order first by descending backward
/// k-distance, then among ties by the oldest retained access timestamp
/// (classical LRU among the tied set). The minimum element is the victim.
#[derive(Debug, Eq, PartialEq)]
struct KDistance {
    frame_id: FrameId,
    distance: usize,
    oldest_access_at: usize,
}

impl PartialOrd for KDistance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KDistance {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.distance.cmp(&other.distance).reverse() {
            Ordering::Equal => match self.oldest_access_at.cmp(&other.oldest_access_at) {
                Ordering::Equal => self.frame_id.cmp(&other.frame_id),
                other => other,
            },
            other => other,
        }
    }
}

struct LRUKNode {
    k: usize,
    frame_id: FrameId,
    is_evictable: bool,
    /// history of last seen K timestamps of the given frame.
    /// Least recent timestamp stored in front.
    history: VecDeque<usize>,
}

impl LRUKNode {
    fn new(frame_id: FrameId, k: usize) -> Self {
        LRUKNode { history: VecDeque::with_capacity(k), k, frame_id, is_evictable: false }
    }

    fn record_access(&mut self, timestamp: usize) {
        if self.history.len() == self.k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp)
    }

    /// Backward k-distance at time `now`: now minus the k-th most recent
    /// access, or infinity (usize::MAX) for a frame with fewer than k
    /// recorded accesses.
    fn k_distance(&self, now: usize) -> KDistance {
        // record_access always pushes before anything reads the history,
        // so the front is present.
        let oldest = self.history.front().copied().unwrap_or(0);
        if self.history.len() < self.k {
            return KDistance {
                frame_id: self.frame_id,
                distance: usize::MAX,
                oldest_access_at: oldest,
            };
        }
        // history is truncated to k entries, so the front is exactly the
        // k-th most recent access.
        KDistance { frame_id: self.frame_id, distance: now - oldest, oldest_access_at: oldest }
    }
}

/// LRUKReplacer implements the LRU-K replacement policy.
///
/// The LRU-K algorithm evicts the frame whose backward k-distance is the
/// maximum over all evictable frames. Backward k-distance is computed as the
/// difference between the current timestamp and the timestamp of the k-th
/// previous access.
///
/// A frame with fewer than k history references is given +inf as its backward
/// k-distance. When multiple frames tie (at +inf or at a finite maximum), the
/// classical LRU rule over the oldest retained timestamp chooses the victim.
/// A single touch therefore never outranks a frame with a full history, which
/// keeps one-shot scans from flushing the working set.
pub struct LRUKReplacer {
    nodes: HashMap<FrameId, LRUKNode>,
    current_timestamp: usize,
    current_size: usize,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        assert!(k > 0, "replacer k must be larger than zero");
        assert!(size > 0, "replacer must cover at least one frame");
        let nodes = HashMap::new();
        LRUKReplacer { nodes, current_timestamp: 0, current_size: 0, replacer_size: size, k }
    }

    fn record_access(&mut self, frame_id: FrameId) {
        assert!(frame_id < self.replacer_size, "frame id {} out of range", frame_id);
        let k = self.k;
        let node = self.nodes.entry(frame_id).or_insert_with(|| LRUKNode::new(frame_id, k));
        node.record_access(self.current_timestamp);
        self.current_timestamp += 1;
    }

    fn evict(&mut self) -> Option<FrameId> {
        let now = self.current_timestamp;
        let victim = self
            .nodes
            .values()
            .filter(|node| node.is_evictable)
            .map(|node| node.k_distance(now))
            .min()?;

        self.nodes.remove(&victim.frame_id);
        self.current_size -= 1;

        Some(victim.frame_id)
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        let node = match self.nodes.get_mut(&frame_id) {
            Some(node) => node,
            None => return,
        };
        if node.is_evictable == evictable {
            return;
        }

        node.is_evictable = evictable;
        if evictable {
            self.current_size += 1;
        } else {
            self.current_size -= 1;
        }
    }

    fn remove(&mut self, frame_id: FrameId) {
        let node = match self.nodes.get(&frame_id) {
            Some(node) => node,
            None => return,
        };
        assert!(node.is_evictable, "cannot remove non-evictable frame {}", frame_id);
        self.nodes.remove(&frame_id);
        self.current_size -= 1;
    }

    fn size(&self) -> usize {
        self.current_size
    }
}

/// SyncLRUKReplacer implements the thread-safe version of the LRU-K
/// replacement policy; all the heavy lifting happens in the LRUKReplacer.
pub struct SyncLRUKReplacer {
    inner: Mutex<LRUKReplacer>,
}

impl SyncLRUKReplacer {
    pub fn new(k: usize, size: usize) -> Self {
        let inner = Mutex::new(LRUKReplacer::new(k, size));
        SyncLRUKReplacer { inner }
    }
}

impl Replacer for SyncLRUKReplacer {
    fn record_access(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.record_access(frame_id)
    }

    fn evict(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock().unwrap();
        guard.evict()
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut guard = self.inner.lock().unwrap();
        guard.set_evictable(frame_id, evictable)
    }

    fn remove(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.remove(frame_id)
    }

    fn size(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.size()
    }
}
