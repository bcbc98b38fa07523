//! Bounds-checked byte cursors for the codec compiler.
//!
//! `Reader` walks an input slice and fails with a `Format` error instead of
//! panicking on truncated data. `Writer` owns a growable buffer with a
//! movable position so offset-adjustment nodes can skip forward (zero-fill)
//! or rewind and overwrite.

use crate::error::CodecError;
use crate::shortvec;

/// Read cursor over an input slice.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `len` bytes, failing if the input is too short.
    pub fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::Format(format!(
                "unexpected end of data at `{what}`: need {len} bytes, have {}",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Consume everything left in the input.
    pub fn take_remainder(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    pub fn read_u8(&mut self, what: &str) -> Result<u8, CodecError> {
        Ok(self.take(1, what)?[0])
    }

    /// Read a compact-length count from the current position.
    pub fn read_shortvec(&mut self) -> Result<u32, CodecError> {
        let (value, consumed) = shortvec::decode_shortvec(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    /// Move the cursor by a signed delta. Rewinding before the start or
    /// skipping past the end is a `Format` error.
    pub fn seek_relative(&mut self, delta: i64, what: &str) -> Result<(), CodecError> {
        let target = self.pos as i64 + delta;
        if target < 0 || target > self.data.len() as i64 {
            return Err(CodecError::Format(format!(
                "offset {delta} at `{what}` leaves the input bounds"
            )));
        }
        self.pos = target as usize;
        Ok(())
    }

    /// Skip forward to the next multiple of `boundary` (no-op if aligned).
    pub fn align_to(&mut self, boundary: usize, what: &str) -> Result<(), CodecError> {
        let rem = self.pos % boundary;
        if rem != 0 {
            self.take(boundary - rem, what)?;
        }
        Ok(())
    }
}

/// Write cursor over an owned, growable buffer.
///
/// Writes past the current end extend the buffer; the gap left by a forward
/// seek is zero-filled. `finish` returns the full buffer regardless of the
/// final cursor position.
pub struct Writer {
    buf: Vec<u8>,
    pos: usize,
}

impl Writer {
    pub fn new() -> Self {
        Writer {
            buf: Vec::with_capacity(64),
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn write(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    pub fn write_u8(&mut self, byte: u8) {
        self.write(&[byte]);
    }

    pub fn write_shortvec(&mut self, value: u32) {
        let bytes = shortvec::encode_shortvec(value);
        self.write(&bytes);
    }

    /// Move the cursor by a signed delta, zero-filling any gap created by a
    /// forward move. Rewinding before the start is a `Range` error.
    pub fn seek_relative(&mut self, delta: i64, what: &str) -> Result<(), CodecError> {
        let target = self.pos as i64 + delta;
        if target < 0 {
            return Err(CodecError::Range(format!(
                "offset {delta} at `{what}` rewinds before the buffer start"
            )));
        }
        let target = target as usize;
        if target > self.buf.len() {
            self.buf.resize(target, 0);
        }
        self.pos = target;
        Ok(())
    }

    /// Zero-fill up to the next multiple of `boundary`.
    pub fn align_to(&mut self, boundary: usize) {
        let rem = self.pos % boundary;
        if rem != 0 {
            let pad = vec![0u8; boundary - rem];
            self.write(&pad);
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}
