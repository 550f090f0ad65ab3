//! Fixed-capacity byte region with independent read and write cursors.
//!
//! Writing past capacity or reading past the write cursor is a programming error
//! and panics. Callers decoding untrusted input check [`ByteBuffer::remaining`]
//! before reading.

use byteorder::{BigEndian, ByteOrder};

/// Reusable byte buffer. Only the cursors are reset between uses; the bytes are not zeroed.
pub struct ByteBuffer {
    data: Box<[u8]>,
    read_pos: usize,
    write_pos: usize,
}

impl ByteBuffer {
    /// Creates an empty buffer with a fixed capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: vec![0; capacity].into_boxed_slice(), read_pos: 0, write_pos: 0 }
    }

    /// Creates a buffer holding a copy of `bytes`, ready to be read.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buffer = Self::with_capacity(bytes.len());
        buffer.write_bytes(bytes);
        buffer
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.write_pos
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.write_pos == 0
    }

    /// Number of written bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Room left for writing.
    pub fn free(&self) -> usize {
        self.data.len() - self.write_pos
    }

    /// Resets both cursors to zero.
    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Every written byte, independent of the read cursor.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.write_pos]
    }

    /// Written bytes that have not been read yet.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.read_pos..self.write_pos]
    }

    /// Resets the buffer and exposes its whole capacity for a socket read.
    /// Follow with [`ByteBuffer::set_len`] once the datagram length is known.
    pub fn recv_slot(&mut self) -> &mut [u8] {
        self.reset();
        &mut self.data[..]
    }

    /// Marks `len` bytes as written after a direct fill through [`ByteBuffer::recv_slot`].
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.data.len(), "length {} exceeds capacity {}", len, self.data.len());
        self.read_pos = 0;
        self.write_pos = len;
    }

    fn reserve_write(&mut self, count: usize) -> &mut [u8] {
        assert!(
            count <= self.free(),
            "write of {} bytes overflows buffer ({} of {} used)",
            count,
            self.write_pos,
            self.data.len()
        );
        let start = self.write_pos;
        self.write_pos += count;
        &mut self.data[start..self.write_pos]
    }

    fn consume(&mut self, count: usize) -> &[u8] {
        assert!(
            count <= self.remaining(),
            "read of {} bytes passes the write cursor ({} unread)",
            count,
            self.remaining()
        );
        let start = self.read_pos;
        self.read_pos += count;
        &self.data[start..self.read_pos]
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.reserve_write(1)[0] = value;
    }

    /// Writes a big-endian u16.
    pub fn write_u16(&mut self, value: u16) {
        BigEndian::write_u16(self.reserve_write(2), value);
    }

    /// Writes a big-endian u32.
    pub fn write_u32(&mut self, value: u32) {
        BigEndian::write_u32(self.reserve_write(4), value);
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.reserve_write(bytes.len()).copy_from_slice(bytes);
    }

    /// Appends the unread content of `other`, consuming it.
    pub fn append(&mut self, other: &mut ByteBuffer) {
        let count = other.remaining();
        let bytes = other.consume(count);
        self.reserve_write(count).copy_from_slice(bytes);
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> u8 {
        self.consume(1)[0]
    }

    /// Reads a big-endian u16.
    pub fn read_u16(&mut self) -> u16 {
        BigEndian::read_u16(self.consume(2))
    }

    /// Reads a big-endian u32.
    pub fn read_u32(&mut self) -> u32 {
        BigEndian::read_u32(self.consume(4))
    }

    /// Reads `count` bytes as a slice.
    pub fn read_bytes(&mut self, count: usize) -> &[u8] {
        self.consume(count)
    }

    /// Moves every unread byte to the end of `out`, leaving nothing unread here.
    pub fn extract_remaining(&mut self, out: &mut Vec<u8>) {
        let count = self.remaining();
        out.extend_from_slice(self.consume(count));
    }
}

impl std::fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("capacity", &self.data.len())
            .field("read_pos", &self.read_pos)
            .field("write_pos", &self.write_pos)
            .finish()
    }
}
