//! Fixed-capacity rolling history of recent frames.

/// One stored frame: its normalized spectrum and total energy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistoryEntry {
    /// Normalized magnitude spectrum [0.0, 1.0].
    pub spectrum: Vec<f32>,
    /// Mean normalized magnitude of that frame.
    pub total_energy: f32,
}

/// FIFO ring buffer of recent frames, indexed by a rotating head.
///
/// Never shifts memory and does not allocate until the first append. Once
/// full, each append overwrites the oldest slot and reuses its spectrum
/// allocation.
///
/// # Example
/// ```
/// use sx_engine::history::HistoryBuffer;
/// let mut history = HistoryBuffer::with_capacity(2);
/// history.append(&[0.1], 0.1);
/// history.append(&[0.2], 0.2);
/// history.append(&[0.3], 0.3);
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.latest().map(|e| e.total_energy), Some(0.3));
/// ```
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    slots: Vec<HistoryEntry>,
    /// Index of the oldest entry.
    head: usize,
    len: usize,
    capacity: usize,
}

impl HistoryBuffer {
    /// Creates an empty history holding at most `capacity` frames (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::new(),
            head: 0,
            len: 0,
            capacity,
        }
    }

    /// Number of stored frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when no frame is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fixed capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a frame, evicting the oldest one when full.
    pub fn append(&mut self, spectrum: &[f32], total_energy: f32) {
        let idx = if self.len < self.capacity {
            self.len += 1;
            (self.head + self.len - 1) % self.capacity
        } else {
            let oldest = self.head;
            self.head = (self.head + 1) % self.capacity;
            oldest
        };

        if idx == self.slots.len() {
            if self.slots.capacity() == 0 {
                self.slots.reserve_exact(self.capacity);
            }
            self.slots.push(HistoryEntry {
                spectrum: spectrum.to_vec(),
                total_energy,
            });
        } else {
            let slot = &mut self.slots[idx];
            slot.spectrum.clear();
            slot.spectrum.extend_from_slice(spectrum);
            slot.total_energy = total_energy;
        }
    }

    /// Most recently appended frame.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        if self.len == 0 {
            return None;
        }
        self.get(self.len - 1)
    }

    /// Entry at chronological position `i` (0 = oldest).
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&HistoryEntry> {
        if i >= self.len {
            return None;
        }
        self.slots.get((self.head + i) % self.capacity)
    }

    /// Entries oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Mean total energy over stored frames. 0.0 when empty.
    #[must_use]
    pub fn mean_energy(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        let sum: f64 = self.iter().map(|e| f64::from(e.total_energy)).sum();
        (sum / self.len as f64) as f32
    }

    /// Population standard deviation of total energy. 0.0 when empty.
    #[must_use]
    pub fn energy_stddev(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        let n = self.len as f64;
        let mean = self.iter().map(|e| f64::from(e.total_energy)).sum::<f64>() / n;
        let var = self
            .iter()
            .map(|e| {
                let d = f64::from(e.total_energy) - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        var.sqrt() as f32
    }

    /// Forget every frame. Slot allocations are kept for reuse.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::with_capacity(sx_core::config::DEFAULT_MAX_HISTORY_LENGTH)
    }
}
