//! MQ arithmetic coder (ISO/IEC 15444-1 Annex C).
//!
//! The encoder emits bytes with carry propagation and 0xFF bit stuffing; the
//! decoder treats bytes past the end of its input as 0xFF so that a flushed
//! stream with its trailing 0xFF dropped decodes identically.

#[derive(Clone, Copy)]
struct MqState {
    qe: u16,
    nmps: u8,
    nlps: u8,
    switch: bool,
}

const fn state(qe: u16, nmps: u8, nlps: u8, switch: u8) -> MqState {
    MqState {
        qe,
        nmps,
        nlps,
        switch: switch == 1,
    }
}

/// Probability estimation table, Table C.2.
const MQ_TABLE: [MqState; 47] = [
    state(0x5601, 1, 1, 1),
    state(0x3401, 2, 6, 0),
    state(0x1801, 3, 9, 0),
    state(0x0AC1, 4, 12, 0),
    state(0x0521, 5, 29, 0),
    state(0x0221, 38, 33, 0),
    state(0x5601, 7, 6, 1),
    state(0x5401, 8, 14, 0),
    state(0x4801, 9, 14, 0),
    state(0x3801, 10, 14, 0),
    state(0x3001, 11, 17, 0),
    state(0x2401, 12, 18, 0),
    state(0x1C01, 13, 20, 0),
    state(0x1601, 29, 21, 0),
    state(0x5601, 15, 14, 1),
    state(0x5401, 16, 14, 0),
    state(0x5101, 17, 15, 0),
    state(0x4801, 18, 16, 0),
    state(0x3801, 19, 17, 0),
    state(0x3401, 20, 18, 0),
    state(0x3001, 21, 19, 0),
    state(0x2801, 22, 19, 0),
    state(0x2401, 23, 19, 0),
    state(0x2201, 24, 19, 0),
    state(0x1C01, 25, 20, 0),
    state(0x1801, 26, 21, 0),
    state(0x1601, 27, 22, 0),
    state(0x1401, 28, 23, 0),
    state(0x1201, 29, 24, 0),
    state(0x1101, 30, 25, 0),
    state(0x0AC1, 31, 26, 0),
    state(0x09C1, 32, 27, 0),
    state(0x08A1, 33, 28, 0),
    state(0x0521, 34, 29, 0),
    state(0x0441, 35, 30, 0),
    state(0x02A1, 36, 31, 0),
    state(0x0221, 37, 32, 0),
    state(0x0141, 38, 33, 0),
    state(0x0111, 39, 34, 0),
    state(0x0085, 40, 35, 0),
    state(0x0049, 41, 36, 0),
    state(0x0025, 42, 37, 0),
    state(0x0015, 43, 38, 0),
    state(0x0009, 44, 39, 0),
    state(0x0005, 45, 40, 0),
    state(0x0001, 45, 41, 0),
    state(0x5601, 46, 46, 0),
];

/// Index of the non-adapting state used for equiprobable bits.
pub const UNIFORM_STATE: u8 = 46;

/// Adaptive probability state of one coding context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MqContext {
    index: u8,
    mps: u8,
}

impl MqContext {
    /// A context that never adapts and codes both symbols at p = 1/2.
    pub const fn uniform() -> Self {
        Self {
            index: UNIFORM_STATE,
            mps: 0,
        }
    }

    fn state(&self) -> MqState {
        MQ_TABLE[self.index as usize]
    }

    fn on_mps(&mut self) {
        self.index = self.state().nmps;
    }

    fn on_lps(&mut self) {
        let state = self.state();
        if state.switch {
            self.mps ^= 1;
        }
        self.index = state.nlps;
    }
}

pub struct MqEncoder {
    a: u32,
    c: u32,
    ct: u32,
    // First byte is a placeholder that absorbs nothing but keeps `B` defined.
    buffer: Vec<u8>,
}

impl Default for MqEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MqEncoder {
    pub fn new() -> Self {
        Self {
            a: 0x8000,
            c: 0,
            ct: 12,
            buffer: vec![0],
        }
    }

    pub fn encode(&mut self, bit: u8, cx: &mut MqContext) {
        if bit == cx.mps {
            self.code_mps(cx);
        } else {
            self.code_lps(cx);
        }
    }

    fn code_mps(&mut self, cx: &mut MqContext) {
        let qe = u32::from(cx.state().qe);
        self.a -= qe;
        if self.a & 0x8000 == 0 {
            if self.a < qe {
                self.a = qe;
            } else {
                self.c += qe;
            }
            cx.on_mps();
            self.renormalize();
        } else {
            self.c += qe;
        }
    }

    fn code_lps(&mut self, cx: &mut MqContext) {
        let qe = u32::from(cx.state().qe);
        self.a -= qe;
        if self.a < qe {
            self.c += qe;
        } else {
            self.a = qe;
        }
        cx.on_lps();
        self.renormalize();
    }

    fn renormalize(&mut self) {
        loop {
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;
            if self.ct == 0 {
                self.byte_out();
            }
            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    fn last_byte(&self) -> u8 {
        self.buffer.last().copied().unwrap_or(0)
    }

    fn byte_out(&mut self) {
        if self.last_byte() == 0xFF {
            self.emit_stuffed();
        } else if self.c < 0x800_0000 {
            self.emit();
        } else {
            // Carry into the byte already written.
            if let Some(last) = self.buffer.last_mut() {
                *last += 1;
            }
            if self.last_byte() == 0xFF {
                self.c &= 0x7FF_FFFF;
                self.emit_stuffed();
            } else {
                self.emit();
            }
        }
    }

    fn emit(&mut self) {
        self.buffer.push((self.c >> 19) as u8);
        self.c &= 0x7_FFFF;
        self.ct = 8;
    }

    /// After a 0xFF only seven bits go into the next byte.
    fn emit_stuffed(&mut self) {
        self.buffer.push((self.c >> 20) as u8);
        self.c &= 0xF_FFFF;
        self.ct = 7;
    }

    /// Terminates the codeword and returns the coded bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let temp = self.c + self.a;
        self.c |= 0xFFFF;
        if self.c >= temp {
            self.c -= 0x8000;
        }
        self.c <<= self.ct;
        self.byte_out();
        self.c <<= self.ct;
        self.byte_out();
        if self.last_byte() == 0xFF {
            self.buffer.pop();
        }
        self.buffer.remove(0);
        self.buffer
    }
}

pub struct MqDecoder<'a> {
    source: &'a [u8],
    position: usize,
    a: u32,
    c: u32,
    ct: u32,
}

impl<'a> MqDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        let mut decoder = Self {
            source,
            position: 0,
            a: 0x8000,
            c: 0,
            ct: 0,
        };
        decoder.c = u32::from(decoder.byte_at(0)) << 16;
        decoder.byte_in();
        decoder.c = decoder.c.wrapping_shl(7);
        decoder.ct = decoder.ct.saturating_sub(7);
        decoder
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.source.get(index).copied().unwrap_or(0xFF)
    }

    fn byte_in(&mut self) {
        if self.byte_at(self.position) == 0xFF {
            if self.byte_at(self.position + 1) > 0x8F {
                // Marker or end of data: feed ones without advancing.
                self.c = self.c.wrapping_add(0xFF00);
                self.ct = 8;
            } else {
                self.position += 1;
                self.c = self.c.wrapping_add(u32::from(self.byte_at(self.position)) << 9);
                self.ct = 7;
            }
        } else {
            self.position += 1;
            self.c = self.c.wrapping_add(u32::from(self.byte_at(self.position)) << 8);
            self.ct = 8;
        }
    }

    pub fn decode(&mut self, cx: &mut MqContext) -> u8 {
        let qe = u32::from(cx.state().qe);
        self.a = self.a.wrapping_sub(qe);
        let bit;
        if (self.c >> 16) < qe {
            // LPS sub-interval, subject to conditional exchange.
            if self.a < qe {
                bit = cx.mps;
                cx.on_mps();
            } else {
                bit = cx.mps ^ 1;
                cx.on_lps();
            }
            self.a = qe;
            self.renormalize();
        } else {
            self.c = self.c.wrapping_sub(qe << 16);
            if self.a & 0x8000 == 0 {
                if self.a < qe {
                    bit = cx.mps ^ 1;
                    cx.on_lps();
                } else {
                    bit = cx.mps;
                    cx.on_mps();
                }
                self.renormalize();
            } else {
                bit = cx.mps;
            }
        }
        bit
    }

    fn renormalize(&mut self) {
        // `a` is at least 1 here, so the loop ends within 16 rounds.
        loop {
            if self.ct == 0 {
                self.byte_in();
            }
            self.a = self.a.wrapping_shl(1);
            self.c = self.c.wrapping_shl(1);
            self.ct -= 1;
            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(bits: &[u8], contexts: usize) {
        let mut encoder = MqEncoder::new();
        let mut cxs = vec![MqContext::default(); contexts];
        for (i, &bit) in bits.iter().enumerate() {
            encoder.encode(bit, &mut cxs[i % contexts]);
        }
        let data = encoder.finish();

        let mut decoder = MqDecoder::new(&data);
        let mut cxs = vec![MqContext::default(); contexts];
        for (i, &bit) in bits.iter().enumerate() {
            assert_eq!(decoder.decode(&mut cxs[i % contexts]), bit, "bit {}", i);
        }
    }

    #[test]
    fn test_mq_roundtrip_simple() {
        round_trip(&[0, 1, 0, 0, 1, 1, 1, 0, 1, 0], 1);
    }

    #[test]
    fn test_mq_roundtrip_skewed() {
        let bits: Vec<u8> = (0..5000).map(|i| u8::from(i % 17 == 0)).collect();
        round_trip(&bits, 1);
        round_trip(&bits, 3);
    }

    #[test]
    fn test_mq_roundtrip_pseudo_random() {
        let mut seed = 0x1234_5678u32;
        let bits: Vec<u8> = (0..20_000)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed >> 7) as u8 & 1
            })
            .collect();
        round_trip(&bits, 1);
        round_trip(&bits, 5);
    }

    #[test]
    fn test_mq_runs_compress() {
        let mut encoder = MqEncoder::new();
        let mut cx = MqContext::default();
        for _ in 0..10_000 {
            encoder.encode(0, &mut cx);
        }
        assert!(encoder.finish().len() < 16);
    }

    #[test]
    fn test_mq_uniform_context() {
        let bits: Vec<u8> = (0..257).map(|i| ((i * 5) % 3 == 0) as u8).collect();
        let mut encoder = MqEncoder::new();
        let mut cx = MqContext::uniform();
        for &bit in &bits {
            encoder.encode(bit, &mut cx);
        }
        assert_eq!(cx, MqContext::uniform());
        let data = encoder.finish();
        let mut decoder = MqDecoder::new(&data);
        let mut cx = MqContext::uniform();
        for &bit in &bits {
            assert_eq!(decoder.decode(&mut cx), bit);
        }
    }

    #[test]
    fn test_mq_decoder_survives_garbage() {
        for data in [&[][..], &[0xFF; 8][..], &[0x00, 0xFF, 0x90, 0x12][..]] {
            let mut decoder = MqDecoder::new(data);
            let mut cx = MqContext::default();
            for _ in 0..1000 {
                let bit = decoder.decode(&mut cx);
                assert!(bit <= 1);
            }
        }
    }
}
