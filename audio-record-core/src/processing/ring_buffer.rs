/// Fixed-capacity circular buffer.
///
/// Wrap in `Arc<parking_lot::Mutex<RingBuffer<_>>>` for cross-thread access.
/// Used as the device jitter buffer between a capture callback and the pull
/// side of a sample source.
///
/// Overflow behavior: drops oldest items. When every write, read and the
/// capacity are multiples of one frame, frame alignment is preserved.
#[derive(Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![T::default(); capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write items into the ring buffer.
    ///
    /// Returns how many old items were dropped to make room. If `items` is
    /// larger than capacity, only the last `capacity` items are kept.
    pub fn write(&mut self, items: &[T]) -> usize {
        if items.is_empty() {
            return 0;
        }

        let mut dropped = 0;
        let items = if items.len() > self.capacity {
            dropped += items.len() - self.capacity;
            &items[items.len() - self.capacity..]
        } else {
            items
        };

        let overflow = (self.available + items.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            dropped += overflow;
        }

        for &item in items {
            self.buffer[self.write_index] = item;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += items.len();
        dropped
    }

    /// Move up to `out.len()` items into `out`, returning how many were copied.
    pub fn read_into(&mut self, out: &mut [T]) -> usize {
        let to_read = out.len().min(self.available);
        for (i, slot) in out.iter_mut().take(to_read).enumerate() {
            *slot = self.buffer[(self.read_index + i) % self.capacity];
        }
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        to_read
    }

    /// Number of items currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
