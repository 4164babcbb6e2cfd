//! Bounds-checked codestream reader.
//!
//! Every read reports [`StreamFault::Truncated`] instead of reading past the
//! end of the source, so a short buffer can never be mistaken for valid data.

use crate::error::StreamFault;
use crate::marker_code::{MARKER_START_BYTE, MarkerCode};

pub struct StreamReader<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.source.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    fn ensure(&self, needed: usize) -> Result<(), StreamFault> {
        if needed > self.remaining() {
            return Err(StreamFault::Truncated {
                offset: self.position,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], StreamFault> {
        self.ensure(count)?;
        let bytes = &self.source[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, StreamFault> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, StreamFault> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, StreamFault> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, StreamFault> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads the next two-byte marker.
    pub fn read_marker(&mut self) -> Result<MarkerCode, StreamFault> {
        let offset = self.position;
        if self.read_u8()? != MARKER_START_BYTE {
            return Err(StreamFault::MarkerStartByteNotFound(offset));
        }
        MarkerCode::from_byte(self.read_u8()?)
    }

    pub fn expect_marker(&mut self, expected: MarkerCode) -> Result<(), StreamFault> {
        let found = self.read_marker()?;
        if found != expected {
            return Err(StreamFault::UnexpectedMarker {
                expected: expected.into(),
                found: found.into(),
            });
        }
        Ok(())
    }

    /// Reads a segment length field and checks that the segment fits in the
    /// remaining source. Returns the number of body bytes that follow.
    pub fn read_segment_length(&mut self) -> Result<usize, StreamFault> {
        let length = self.read_u16()?;
        if (length as usize) < 2 {
            return Err(StreamFault::InvalidSegmentLength(length));
        }
        let body = length as usize - 2;
        self.ensure(body)?;
        Ok(body)
    }
}
