//! Per-session accumulator for inbound raw audio frames

/// Growable byte accumulator owned by exactly one session.
///
/// The owning session processes messages serially, so no locking is needed:
/// the buffer is never read and written concurrently.
#[derive(Debug, Default)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
}

impl AudioBuffer {
    /// Create an empty buffer
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append a frame to the tail
    pub fn append(&mut self, frame: &[u8]) {
        self.bytes.extend_from_slice(frame);
    }

    /// Return all accumulated bytes and reset to empty
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Accumulated byte count
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been buffered
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
