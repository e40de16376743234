use bytes::{Bytes, BytesMut};

/// Append-only accumulator of received bytes, filled one fixed-size chunk at a time.
///
/// Bytes live in one contiguous buffer so the framing layer can parse the
/// header and slice the payload without copying chunks together.
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    data: BytesMut,
    chunks: Vec<Chunk>,
    pending: Option<usize>,
}

/// Bookkeeping for one receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Bytes requested.
    pub capacity: usize,
    /// Bytes actually received.
    pub read: usize,
}

impl ByteAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a writable chunk of `size` bytes at the tail.
    ///
    /// The chunk must be finished with [`commit`](Self::commit) or
    /// [`abandon`](Self::abandon) before the next `add`.
    pub fn add(&mut self, size: usize) -> &mut [u8] {
        self.abandon();
        let start = self.data.len();
        self.data.resize(start + size, 0);
        self.pending = Some(size);
        &mut self.data[start..]
    }

    /// Record how many bytes of the pending chunk were filled.
    pub fn commit(&mut self, read: usize) {
        if let Some(capacity) = self.pending.take() {
            let read = read.min(capacity);
            self.data.truncate(self.data.len() - (capacity - read));
            self.chunks.push(Chunk { capacity, read });
        }
    }

    /// Drop the pending chunk without recording it.
    pub fn abandon(&mut self) {
        if let Some(capacity) = self.pending.take() {
            self.data.truncate(self.data.len() - capacity);
        }
    }

    /// Received bytes.
    pub fn as_slice(&self) -> &[u8] {
        let pending = self.pending.unwrap_or(0);
        &self.data[..self.data.len() - pending]
    }

    /// Number of received bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of chunk capacities requested so far.
    pub fn capacity_used(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.capacity).sum()
    }

    /// Number of committed chunks.
    pub fn items_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Consume the accumulator and return the received bytes.
    pub fn freeze(mut self) -> Bytes {
        self.abandon();
        self.data.freeze()
    }
}
