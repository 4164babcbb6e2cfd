//! Sub-band identifiers, geometry and the coefficient containers that flow
//! between the transform, the quantizer and the entropy coder.

/// Orientation of a wavelet sub-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubbandOrientation {
    #[default]
    /// Low-Low (base image)
    LL,
    /// High-Low (horizontal details)
    HL,
    /// Low-High (vertical details)
    LH,
    /// High-High (diagonal details)
    HH,
}

impl SubbandOrientation {
    /// Detail orientations in the order they are stored within a level.
    pub const DETAILS: [Self; 3] = [Self::HL, Self::LH, Self::HH];

    /// Position of a detail orientation within its level, `None` for LL.
    pub fn detail_index(self) -> Option<usize> {
        match self {
            Self::LL => None,
            Self::HL => Some(0),
            Self::LH => Some(1),
            Self::HH => Some(2),
        }
    }

    /// True when the band holds the high-pass half of the horizontal filter.
    pub fn is_horizontal_high(self) -> bool {
        matches!(self, Self::HL | Self::HH)
    }

    /// True when the band holds the high-pass half of the vertical filter.
    pub fn is_vertical_high(self) -> bool {
        matches!(self, Self::LH | Self::HH)
    }
}

/// A sub-band tagged by its decomposition level.
///
/// Detail bands use levels `1..=L` where 1 is the finest. The LL band carries
/// the number of decompositions applied to reach it, `0` meaning the tile was
/// not decomposed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubbandId {
    pub level: u8,
    pub orientation: SubbandOrientation,
}

impl SubbandId {
    pub fn ll(level: u8) -> Self {
        Self {
            level,
            orientation: SubbandOrientation::LL,
        }
    }

    pub fn detail(level: u8, orientation: SubbandOrientation) -> Self {
        debug_assert!(level >= 1 && orientation != SubbandOrientation::LL);
        Self { level, orientation }
    }
}

/// Where a sub-band sits inside the in-place (Mallat) coefficient plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubbandGeometry {
    pub id: SubbandId,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl SubbandGeometry {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of decompositions a `width` x `height` plane supports, capped at
/// `requested`. A level is only applied while both dimensions are at least 2.
pub fn decomposition_levels(width: usize, height: usize, requested: u8) -> u8 {
    let (mut w, mut h) = (width, height);
    let mut levels = 0;
    while levels < requested && w >= 2 && h >= 2 {
        w = w.div_ceil(2);
        h = h.div_ceil(2);
        levels += 1;
    }
    levels
}

/// Sub-band geometry for a `width` x `height` plane decomposed `levels` times,
/// in canonical order: the LL band, then HL, LH, HH from the coarsest level
/// down to level 1.
pub fn subband_layout(width: usize, height: usize, levels: u8) -> Vec<SubbandGeometry> {
    // Region size before each level is applied; dims[0] is the full plane.
    let mut dims = Vec::with_capacity(levels as usize + 1);
    dims.push((width, height));
    for _ in 0..levels {
        let (w, h) = dims[dims.len() - 1];
        dims.push((w.div_ceil(2), h.div_ceil(2)));
    }

    let mut layout = Vec::with_capacity(1 + 3 * levels as usize);
    let (ll_w, ll_h) = dims[levels as usize];
    layout.push(SubbandGeometry {
        id: SubbandId::ll(levels),
        x: 0,
        y: 0,
        width: ll_w,
        height: ll_h,
    });

    for level in (1..=levels).rev() {
        let (w, h) = dims[level as usize - 1];
        let (low_w, low_h) = (w.div_ceil(2), h.div_ceil(2));
        let (high_w, high_h) = (w / 2, h / 2);
        for orientation in SubbandOrientation::DETAILS {
            let (x, width) = if orientation.is_horizontal_high() {
                (low_w, high_w)
            } else {
                (0, low_w)
            };
            let (y, height) = if orientation.is_vertical_high() {
                (low_h, high_h)
            } else {
                (0, low_h)
            };
            layout.push(SubbandGeometry {
                id: SubbandId::detail(level, orientation),
                x,
                y,
                width,
                height,
            });
        }
    }
    layout
}

/// Coefficients of one sub-band, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SubbandData<T> {
    pub id: SubbandId,
    pub width: usize,
    pub height: usize,
    pub coefficients: Vec<T>,
}

/// The decomposition of one channel of one tile into sub-bands.
///
/// `f32` blocks come out of the transform stage, `i32` blocks out of the
/// quantizer; the entropy coder only ever sees the latter.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientBlock<T = f32> {
    pub width: usize,
    pub height: usize,
    pub levels: u8,
    pub subbands: Vec<SubbandData<T>>,
}

/// A coefficient block after quantization.
pub type QuantizedBlock = CoefficientBlock<i32>;

impl<T: Copy + Default> CoefficientBlock<T> {
    /// A block of zeroed sub-bands laid out for the given plane size.
    pub fn zeroed(width: usize, height: usize, levels: u8) -> Self {
        let subbands = subband_layout(width, height, levels)
            .into_iter()
            .map(|geometry| SubbandData {
                id: geometry.id,
                width: geometry.width,
                height: geometry.height,
                coefficients: vec![T::default(); geometry.len()],
            })
            .collect();
        Self {
            width,
            height,
            levels,
            subbands,
        }
    }

    /// Cuts sub-bands out of an in-place coefficient plane with row stride `width`.
    pub fn from_plane(plane: &[T], width: usize, height: usize, levels: u8) -> Self {
        let subbands = subband_layout(width, height, levels)
            .into_iter()
            .map(|g| {
                let mut coefficients = Vec::with_capacity(g.len());
                for row in g.y..g.y + g.height {
                    let start = row * width + g.x;
                    coefficients.extend_from_slice(&plane[start..start + g.width]);
                }
                SubbandData {
                    id: g.id,
                    width: g.width,
                    height: g.height,
                    coefficients,
                }
            })
            .collect();
        Self {
            width,
            height,
            levels,
            subbands,
        }
    }

    /// Reassembles the in-place coefficient plane the sub-bands were cut from.
    pub fn to_plane(&self) -> Vec<T> {
        let mut plane = vec![T::default(); self.width * self.height];
        for (g, band) in subband_layout(self.width, self.height, self.levels)
            .iter()
            .zip(&self.subbands)
        {
            for (row, chunk) in band.coefficients.chunks(g.width.max(1)).enumerate() {
                let start = (g.y + row) * self.width + g.x;
                plane[start..start + g.width].copy_from_slice(chunk);
            }
        }
        plane
    }

    pub fn coefficient_count(&self) -> usize {
        self.subbands.iter().map(|s| s.coefficients.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposition_levels() {
        assert_eq!(decomposition_levels(1, 1, 5), 0);
        assert_eq!(decomposition_levels(1, 64, 5), 0);
        assert_eq!(decomposition_levels(2, 2, 5), 1);
        assert_eq!(decomposition_levels(64, 64, 5), 5);
        assert_eq!(decomposition_levels(64, 64, 3), 3);
        // 5 -> 3 -> 2 -> 1
        assert_eq!(decomposition_levels(5, 100, 8), 3);
    }

    #[test]
    fn test_layout_covers_plane_exactly() {
        for &(w, h, levels) in &[(1, 1, 0), (7, 5, 2), (64, 64, 5), (13, 2, 1), (140, 93, 5)] {
            let layout = subband_layout(w, h, levels);
            assert_eq!(layout.len(), 1 + 3 * levels as usize);
            let total: usize = layout.iter().map(|g| g.len()).sum();
            assert_eq!(total, w * h, "{}x{} at {} levels", w, h, levels);

            let mut covered = vec![false; w * h];
            for g in &layout {
                for y in g.y..g.y + g.height {
                    for x in g.x..g.x + g.width {
                        assert!(!covered[y * w + x], "overlap at {},{}", x, y);
                        covered[y * w + x] = true;
                    }
                }
            }
        }
    }

    #[test]
    fn test_layout_order_and_sizes() {
        let layout = subband_layout(7, 5, 2);
        let ids: Vec<SubbandId> = layout.iter().map(|g| g.id).collect();
        assert_eq!(
            ids,
            vec![
                SubbandId::ll(2),
                SubbandId::detail(2, SubbandOrientation::HL),
                SubbandId::detail(2, SubbandOrientation::LH),
                SubbandId::detail(2, SubbandOrientation::HH),
                SubbandId::detail(1, SubbandOrientation::HL),
                SubbandId::detail(1, SubbandOrientation::LH),
                SubbandId::detail(1, SubbandOrientation::HH),
            ]
        );
        // Level 1 splits 7x5 into 4|3 columns and 3|2 rows.
        assert_eq!((layout[4].width, layout[4].height), (3, 3));
        assert_eq!((layout[5].width, layout[5].height), (4, 2));
        assert_eq!((layout[6].x, layout[6].y), (4, 3));
        // Level 2 splits the 4x3 LL into 2|2 columns and 2|1 rows.
        assert_eq!((layout[0].width, layout[0].height), (2, 2));
        assert_eq!((layout[3].width, layout[3].height), (2, 1));
    }

    #[test]
    fn test_plane_round_trip() {
        let (w, h) = (9, 6);
        let plane: Vec<i32> = (0..(w * h) as i32).collect();
        let block = CoefficientBlock::from_plane(&plane, w, h, 2);
        assert_eq!(block.coefficient_count(), w * h);
        assert_eq!(block.to_plane(), plane);
    }
}
