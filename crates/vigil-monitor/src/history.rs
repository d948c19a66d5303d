//! Process-wide bounded history of risk records.
//!
//! A fixed arena of slots with a head index and a length. Appending to a
//! full buffer overwrites the oldest slot, so eviction is O(1) and the arena
//! never reallocates. Readers clone under a read lock and always see a whole
//! number of appends.

use parking_lot::RwLock;
use vigil_core::{AnalysisResult, SessionId};

/// Default number of records kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Bounded, insertion-ordered store of the most recent risk records
pub struct HistoryBuffer {
    ring: RwLock<Ring>,
}

struct Ring {
    slots: Vec<Option<AnalysisResult>>,
    /// Index of the oldest record
    head: usize,
    len: usize,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, record: AnalysisResult) {
        let cap = self.capacity();
        if self.len < cap {
            let tail = (self.head + self.len) % cap;
            self.slots[tail] = Some(record);
            self.len += 1;
        } else {
            self.slots[self.head] = Some(record);
            self.head = (self.head + 1) % cap;
        }
    }

    /// Oldest to newest.
    fn iter(&self) -> impl DoubleEndedIterator<Item = &AnalysisResult> + '_ {
        let cap = self.capacity();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % cap].as_ref())
    }
}

impl HistoryBuffer {
    /// Create a buffer holding at most `capacity` records (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(capacity.max(1), || None);
        Self {
            ring: RwLock::new(Ring {
                slots,
                head: 0,
                len: 0,
            }),
        }
    }

    /// Fixed capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.read().capacity()
    }

    /// Number of records held
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.read().len
    }

    /// Returns true if nothing has been appended yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a record, silently evicting the oldest when full
    pub fn append(&self, record: AnalysisResult) {
        self.ring.write().push(record);
    }

    /// The last `n` records, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<AnalysisResult> {
        let ring = self.ring.read();
        let skip = ring.len.saturating_sub(n);
        ring.iter().skip(skip).cloned().collect()
    }

    /// Every record held, oldest first
    #[must_use]
    pub fn all(&self) -> Vec<AnalysisResult> {
        self.ring.read().iter().cloned().collect()
    }

    /// The last `n` records of one session, oldest first
    #[must_use]
    pub fn recent_for(&self, session_id: &SessionId, n: usize) -> Vec<AnalysisResult> {
        let ring = self.ring.read();
        let mut records: Vec<AnalysisResult> = ring
            .iter()
            .rev()
            .filter(|r| &r.session_id == session_id)
            .take(n)
            .cloned()
            .collect();
        records.reverse();
        records
    }

    /// Most recent record of one session
    #[must_use]
    pub fn latest_for(&self, session_id: &SessionId) -> Option<AnalysisResult> {
        self.ring
            .read()
            .iter()
            .rev()
            .find(|r| &r.session_id == session_id)
            .cloned()
    }

    /// Number of buffered records for one session
    #[must_use]
    pub fn count_for(&self, session_id: &SessionId) -> usize {
        self.ring
            .read()
            .iter()
            .filter(|r| &r.session_id == session_id)
            .count()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl std::fmt::Debug for HistoryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.read();
        f.debug_struct("HistoryBuffer")
            .field("capacity", &ring.capacity())
            .field("len", &ring.len)
            .finish()
    }
}
