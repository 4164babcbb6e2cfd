//! Codestream writer utilities.
//!
//! `StreamWriter` emits markers, big-endian fields and length-prefixed
//! segments into a growable buffer.

use crate::constants::SEGMENT_MAX_DATA_SIZE;
use crate::marker_code::{MARKER_START_BYTE, MarkerCode};

#[derive(Debug, Default)]
pub struct StreamWriter {
    destination: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.destination.extend_from_slice(bytes);
    }

    pub fn write_marker(&mut self, marker: MarkerCode) {
        self.write_byte(MARKER_START_BYTE);
        self.write_byte(marker.into());
    }

    /// Writes `marker`, then a length field covering itself plus everything
    /// `body` writes.
    pub fn write_segment(&mut self, marker: MarkerCode, body: impl FnOnce(&mut Self)) {
        self.write_marker(marker);
        let length_pos = self.len();
        self.write_u16(0);
        body(self);
        let length = self.len() - length_pos;
        debug_assert!(length - 2 <= SEGMENT_MAX_DATA_SIZE, "segment too large");
        self.patch_u16(length_pos, length as u16);
    }

    /// Overwrites a previously written u16 at `position`.
    pub fn patch_u16(&mut self, position: usize, value: u16) {
        self.destination[position..position + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Overwrites a previously written u32 at `position`.
    pub fn patch_u32(&mut self, position: usize, value: u32) {
        self.destination[position..position + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_segment_patches_length() {
        let mut writer = StreamWriter::new();
        writer.write_segment(MarkerCode::CodingStyle, |w| {
            w.write_byte(5);
            w.write_byte(0);
            w.write_byte(1);
        });
        assert_eq!(writer.into_inner(), vec![0xFF, 0x52, 0x00, 0x05, 5, 0, 1]);
    }

    #[test]
    fn test_big_endian_fields() {
        let mut writer = StreamWriter::new();
        writer.write_u32(0x0102_0304);
        writer.write_f32(1.0);
        assert_eq!(
            writer.into_inner(),
            vec![1, 2, 3, 4, 0x3F, 0x80, 0x00, 0x00]
        );
    }
}
