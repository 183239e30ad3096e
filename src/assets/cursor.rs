//! Bounds-checked walk over JPEG marker structure.
//!
//! All index arithmetic for the asset gate lives here. Every read is checked
//! against the buffer length and reports `None`/`false` instead of panicking.

/// A marker located in the buffer, positioned at its `0xFF` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub code: u8,
    pub offset: usize,
}

pub struct MarkerCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> MarkerCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move forward to the next `0xFF` byte followed by something other than
    /// fill (`0xFF`) or stuffing (`0x00`). The cursor stays on the marker, so
    /// the caller decides how far to advance past it.
    pub fn next_marker(&mut self) -> Option<Marker> {
        while let Some(&[prefix, code]) = self.buf.get(self.pos..self.pos + 2) {
            if prefix == 0xFF && code != 0xFF && code != 0x00 {
                return Some(Marker {
                    code,
                    offset: self.pos,
                });
            }
            self.pos += 1;
        }
        self.pos = self.buf.len();
        None
    }

    /// Big-endian `u16` located `offset` bytes past the current position.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let start = self.pos.checked_add(offset)?;
        let end = start.checked_add(2)?;
        let bytes: [u8; 2] = self.buf.get(start..end)?.try_into().ok()?;
        Some(u16::from_be_bytes(bytes))
    }

    /// Length field of the segment whose marker sits at the current position.
    /// The value counts the two length bytes themselves.
    pub fn segment_length(&self) -> Option<u16> {
        self.read_u16(2)
    }

    /// Advance `n` bytes. Returns `false`, leaving the cursor where it was,
    /// when that would run past the end of the buffer.
    pub fn skip(&mut self, n: usize) -> bool {
        match self.pos.checked_add(n) {
            Some(next) if next <= self.buf.len() => {
                self.pos = next;
                true
            }
            _ => false,
        }
    }

    /// Skip the marker and its length-prefixed payload as one unit.
    pub fn skip_segment(&mut self) -> bool {
        match self.segment_length() {
            Some(length) => self.skip(2 + usize::from(length)),
            None => false,
        }
    }
}
