use crate::audio::features::AnalysisFrame;

pub const DEFAULT_CAPACITY: usize = 600;

/// Fixed-capacity rolling history of analysis frames, oldest first.
///
/// Backed by a preallocated arena with head/length indices, so appending
/// never reallocates. Once full, each append evicts the oldest frame.
/// Logical indices (0 = oldest) shift by one on every eviction and are only
/// meaningful within a single tick.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    slots: Vec<AnalysisFrame>,
    head: usize,
    len: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl HistoryBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "HistoryBuffer capacity must be greater than zero");
        Self {
            slots: vec![AnalysisFrame::default(); capacity],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append at the newest end. Returns the evicted frame when full.
    pub fn append(&mut self, frame: AnalysisFrame) -> Option<AnalysisFrame> {
        let capacity = self.capacity();
        if self.len == capacity {
            let evicted = std::mem::replace(&mut self.slots[self.head], frame);
            self.head = (self.head + 1) % capacity;
            Some(evicted)
        } else {
            let idx = (self.head + self.len) % capacity;
            self.slots[idx] = frame;
            self.len += 1;
            None
        }
    }

    /// Frame at logical `index`, 0 being the oldest.
    pub fn get(&self, index: usize) -> Option<&AnalysisFrame> {
        if index >= self.len {
            return None;
        }
        Some(&self.slots[(self.head + index) % self.capacity()])
    }

    pub fn latest(&self) -> Option<&AnalysisFrame> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    /// The two contiguous runs of the ring, oldest run first.
    pub fn as_slices(&self) -> (&[AnalysisFrame], &[AnalysisFrame]) {
        let capacity = self.capacity();
        let first_end = (self.head + self.len).min(capacity);
        let wrapped = self.len - (first_end - self.head);
        (&self.slots[self.head..first_end], &self.slots[..wrapped])
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AnalysisFrame> + '_ {
        let (older, newer) = self.as_slices();
        older.iter().chain(newer.iter())
    }

    /// Frames in `start..end` (logical indices), clamped to what is stored.
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = &AnalysisFrame> + '_ {
        let end = end.min(self.len);
        let start = start.min(end);
        self.iter().skip(start).take(end - start)
    }

    /// Owned copy of the history, newest last.
    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<AnalysisFrame> {
        self.iter().copied().collect()
    }

    pub fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
