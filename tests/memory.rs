//! Peak heap use of encoding and decoding a many-tile image.
//!
//! Runs as its own test binary so the counting allocator only sees this test.

mod common;

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use common::gradient;
use jp2codec::jp2::plan_for;
use jp2codec::{Jp2Decoder, Jp2Encoder, PixelFormat, WaveletKernel};

static CURRENT: AtomicUsize = AtomicUsize::new(0);
static PEAK: AtomicUsize = AtomicUsize::new(0);

struct PeakAllocator;

impl PeakAllocator {
    fn grow(by: usize) {
        let now = CURRENT.fetch_add(by, Ordering::Relaxed) + by;
        PEAK.fetch_max(now, Ordering::Relaxed);
    }

    fn shrink(by: usize) {
        CURRENT.fetch_sub(by, Ordering::Relaxed);
    }

    /// Restarts peak tracking and returns the bytes currently allocated.
    fn reset() -> usize {
        let now = CURRENT.load(Ordering::Relaxed);
        PEAK.store(now, Ordering::Relaxed);
        now
    }

    fn peak() -> usize {
        PEAK.load(Ordering::Relaxed)
    }
}

unsafe impl GlobalAlloc for PeakAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            Self::grow(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        Self::shrink(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size > layout.size() {
                Self::grow(new_size - layout.size());
            } else {
                Self::shrink(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

#[global_allocator]
static ALLOCATOR: PeakAllocator = PeakAllocator;

const TILE: u32 = 128;
const TILE_ROWS: u32 = 64;
// Bytes of one tile's coefficients as i32 or f32.
const TILE_PLANE_BYTES: usize = (TILE * TILE) as usize * 4;

#[test]
fn test_tiles_are_coded_one_at_a_time() {
    // 64 tiles; holding all their coefficients at once would take 4 MiB.
    let image = gradient(TILE, TILE * TILE_ROWS, PixelFormat::Gray8);
    let image_bytes = image.byte_count();
    // Basis norms are computed once per kernel and then kept.
    plan_for(85.0, 5, WaveletKernel::Reversible53).unwrap();

    let baseline = PeakAllocator::reset();
    let bytes = Jp2Encoder::new(&image)
        .set_tile_size(TILE, TILE)
        .encode()
        .unwrap();
    let encode_peak = PeakAllocator::peak() - baseline;
    // The output buffer may briefly exist twice while it grows.
    let encode_bound = 3 * bytes.len() + 16 * TILE_PLANE_BYTES;
    assert!(
        encode_peak <= encode_bound,
        "encode peaked at {} bytes, bound {}",
        encode_peak,
        encode_bound
    );

    let baseline = PeakAllocator::reset();
    let decoded = Jp2Decoder::new(&bytes).decode().unwrap();
    let decode_peak = PeakAllocator::peak() - baseline;
    let decode_bound = image_bytes + 16 * TILE_PLANE_BYTES;
    assert!(
        decode_peak <= decode_bound,
        "decode peaked at {} bytes, bound {}",
        decode_peak,
        decode_bound
    );

    assert_eq!(decoded.width(), image.width());
    assert_eq!(decoded.height(), image.height());
}
