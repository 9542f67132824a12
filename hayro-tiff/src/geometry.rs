//! Where the pixels of a strip or tile come from and where they go.

use crate::error::{FormatError, bail};
use crate::info::ImageInfo;

/// An axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// The left edge.
    pub x: u32,
    /// The top edge.
    pub y: u32,
    /// The width.
    pub width: u32,
    /// The height.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// The sample geometry of a single decompression call.
///
/// The source region is the strip or tile in image coordinates. Source
/// pixel `sx` lands at destination column
/// `(sx - source_x_offset) / subsample_x + dst_x_offset` if the division is
/// exact, and is dropped otherwise. The active source region is the part of
/// the source region that lands inside the destination region, so
/// `active_src_width == (dst_width - 1) * subsample_x + 1` and likewise for
/// the height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// The left edge of the strip or tile.
    pub src_min_x: u32,
    /// The top edge of the strip or tile.
    pub src_min_y: u32,
    /// The width of the strip or tile.
    pub src_width: u32,
    /// The height of the strip or tile.
    pub src_height: u32,
    /// The horizontal subsampling factor.
    pub subsample_x: u32,
    /// The vertical subsampling factor.
    pub subsample_y: u32,
    /// The source column that maps to `dst_x_offset`.
    pub source_x_offset: u32,
    /// The source row that maps to `dst_y_offset`.
    pub source_y_offset: u32,
    /// The destination column of `source_x_offset`.
    pub dst_x_offset: i32,
    /// The destination row of `source_y_offset`.
    pub dst_y_offset: i32,
    /// The left edge of the destination region.
    pub dst_min_x: u32,
    /// The top edge of the destination region.
    pub dst_min_y: u32,
    /// The width of the destination region.
    pub dst_width: u32,
    /// The height of the destination region.
    pub dst_height: u32,
    /// The left edge of the active source region.
    pub active_src_min_x: u32,
    /// The top edge of the active source region.
    pub active_src_min_y: u32,
    /// The width of the active source region.
    pub active_src_width: u32,
    /// The height of the active source region.
    pub active_src_height: u32,
}

struct Axis {
    dst_min: u32,
    dst_len: u32,
    active_min: u32,
    active_len: u32,
}

fn clip_axis(
    src_min: u32,
    src_len: u32,
    roi_min: u32,
    roi_len: u32,
    subsample: u32,
    dst_offset: i32,
    dst_size: u32,
) -> Option<Axis> {
    let ss = subsample as i64;
    let lo = (src_min as i64).max(roi_min as i64);
    let hi = (src_min as i64 + src_len as i64).min(roi_min as i64 + roi_len as i64);

    if subsample == 0 || lo >= hi {
        return None;
    }

    // The first source sample on the subsampling grid.
    let first = roi_min as i64 + (lo - roi_min as i64 + ss - 1) / ss * ss;

    if first >= hi {
        return None;
    }

    let count = (hi - 1 - first) / ss + 1;
    let dst_min = (first - roi_min as i64) / ss + dst_offset as i64;
    let lo_dst = dst_min.max(0);
    let hi_dst = (dst_min + count).min(dst_size as i64);

    if lo_dst >= hi_dst {
        return None;
    }

    let dst_len = hi_dst - lo_dst;

    Some(Axis {
        dst_min: u32::try_from(lo_dst).ok()?,
        dst_len: u32::try_from(dst_len).ok()?,
        active_min: u32::try_from(first + (lo_dst - dst_min) * ss).ok()?,
        active_len: u32::try_from((dst_len - 1) * ss + 1).ok()?,
    })
}

impl Geometry {
    /// Compute the geometry for decoding the strip or tile `src` into an
    /// image of `dst_size`, reading only the region of interest `roi`,
    /// keeping every `subsample`-th pixel of it and placing its origin at
    /// `dst_offset`.
    ///
    /// Returns `None` if no pixel of the strip or tile lands in the
    /// destination.
    pub fn clip(
        src: Rect,
        roi: Rect,
        subsample: (u32, u32),
        dst_offset: (i32, i32),
        dst_size: (u32, u32),
    ) -> Option<Self> {
        let x = clip_axis(
            src.x,
            src.width,
            roi.x,
            roi.width,
            subsample.0,
            dst_offset.0,
            dst_size.0,
        )?;
        let y = clip_axis(
            src.y,
            src.height,
            roi.y,
            roi.height,
            subsample.1,
            dst_offset.1,
            dst_size.1,
        )?;

        Some(Self {
            src_min_x: src.x,
            src_min_y: src.y,
            src_width: src.width,
            src_height: src.height,
            subsample_x: subsample.0,
            subsample_y: subsample.1,
            source_x_offset: roi.x,
            source_y_offset: roi.y,
            dst_x_offset: dst_offset.0,
            dst_y_offset: dst_offset.1,
            dst_min_x: x.dst_min,
            dst_min_y: y.dst_min,
            dst_width: x.dst_len,
            dst_height: y.dst_len,
            active_src_min_x: x.active_min,
            active_src_min_y: y.active_min,
            active_src_width: x.active_len,
            active_src_height: y.active_len,
        })
    }

    /// A geometry that copies the whole strip or tile `src` to the origin
    /// of the destination.
    pub fn unscaled(src: Rect) -> Self {
        Self {
            src_min_x: src.x,
            src_min_y: src.y,
            src_width: src.width,
            src_height: src.height,
            subsample_x: 1,
            subsample_y: 1,
            source_x_offset: src.x,
            source_y_offset: src.y,
            dst_x_offset: 0,
            dst_y_offset: 0,
            dst_min_x: 0,
            dst_min_y: 0,
            dst_width: src.width,
            dst_height: src.height,
            active_src_min_x: src.x,
            active_src_min_y: src.y,
            active_src_width: src.width,
            active_src_height: src.height,
        }
    }

    /// The destination column of source column `sx`.
    #[inline]
    pub fn dst_x(&self, sx: u32) -> i64 {
        (sx as i64 - self.source_x_offset as i64).div_euclid(self.subsample_x as i64)
            + self.dst_x_offset as i64
    }

    /// The destination row of source row `sy`.
    #[inline]
    pub fn dst_y(&self, sy: u32) -> i64 {
        (sy as i64 - self.source_y_offset as i64).div_euclid(self.subsample_y as i64)
            + self.dst_y_offset as i64
    }

    /// The source column of destination column `dx`.
    #[inline]
    pub fn src_x(&self, dx: u32) -> i64 {
        (dx as i64 - self.dst_x_offset as i64) * self.subsample_x as i64
            + self.source_x_offset as i64
    }

    /// The source row of destination row `dy`.
    #[inline]
    pub fn src_y(&self, dy: u32) -> i64 {
        (dy as i64 - self.dst_y_offset as i64) * self.subsample_y as i64
            + self.source_y_offset as i64
    }

    /// Whether the source and destination regions have the same size.
    pub(crate) fn is_unscaled(&self) -> bool {
        self.subsample_x == 1
            && self.subsample_y == 1
            && self.src_width == self.dst_width
            && self.src_height == self.dst_height
    }

    /// Check the geometry for a destination buffer of `width` x `height`.
    pub(crate) fn validate(&self, width: u32, height: u32) -> Result<(), FormatError> {
        let fits = |min: u32, len: u32, size: u32| len > 0 && min as u64 + len as u64 <= size as u64;

        if self.subsample_x == 0 || self.subsample_y == 0 {
            bail!(FormatError::InvalidGeometry);
        }

        if self.src_width == 0 || self.src_height == 0 {
            bail!(FormatError::InvalidGeometry);
        }

        if !fits(self.dst_min_x, self.dst_width, width) || !fits(self.dst_min_y, self.dst_height, height)
        {
            bail!(FormatError::InvalidGeometry);
        }

        let active_w = (self.dst_width as u64 - 1) * self.subsample_x as u64 + 1;
        let active_h = (self.dst_height as u64 - 1) * self.subsample_y as u64 + 1;

        if self.active_src_width as u64 != active_w || self.active_src_height as u64 != active_h {
            bail!(FormatError::InvalidGeometry);
        }

        let inside = |active_min: u32, active_len: u32, src_min: u32, src_len: u32| {
            active_min >= src_min
                && active_min as u64 + active_len as u64 <= src_min as u64 + src_len as u64
        };

        if !inside(
            self.active_src_min_x,
            self.active_src_width,
            self.src_min_x,
            self.src_width,
        ) || !inside(
            self.active_src_min_y,
            self.active_src_height,
            self.src_min_y,
            self.src_height,
        ) {
            bail!(FormatError::InvalidGeometry);
        }

        if self.src_x(self.dst_min_x) != self.active_src_min_x as i64
            || self.src_y(self.dst_min_y) != self.active_src_min_y as i64
        {
            bail!(FormatError::InvalidGeometry);
        }

        Ok(())
    }
}

/// Which raw bands are written to which destination bands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandMapping {
    /// The raw bands to read. For planar images, this is the single band
    /// whose plane is decoded.
    pub source: Vec<usize>,
    /// The destination band of every source band.
    pub destination: Vec<usize>,
}

impl BandMapping {
    /// Create a new band mapping.
    pub fn new(source: Vec<usize>, destination: Vec<usize>) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Map the bands `0..bands` onto themselves.
    pub fn identity(bands: usize) -> Self {
        Self::new((0..bands).collect(), (0..bands).collect())
    }

    /// The mapping for the plane of `band` of a planar image, written to
    /// destination band `destination`.
    pub fn plane(band: usize, destination: usize) -> Self {
        Self::new(vec![band], vec![destination])
    }

    /// The number of mapped bands.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Whether no bands are mapped.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Whether both lists are `0..bands`.
    pub(crate) fn is_identity(&self, bands: usize) -> bool {
        self.source.len() == bands
            && self.destination.len() == bands
            && self.source.iter().enumerate().all(|(i, b)| *b == i)
            && self.destination.iter().enumerate().all(|(i, b)| *b == i)
    }

    pub(crate) fn validate(&self, info: &ImageInfo, dst_bands: usize) -> Result<(), FormatError> {
        if self.source.is_empty() || self.source.len() != self.destination.len() {
            bail!(FormatError::InvalidBandMapping);
        }

        if info.planar {
            if self.source != [info.planar_band as usize] {
                bail!(FormatError::InvalidBandMapping);
            }
        } else if self
            .source
            .iter()
            .any(|b| *b >= info.samples_per_pixel as usize)
        {
            bail!(FormatError::InvalidBandMapping);
        }

        if self.destination.iter().any(|b| *b >= dst_bands) {
            bail!(FormatError::InvalidBandMapping);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::Photometric;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    #[test]
    fn clip_inside() {
        let geometry =
            Geometry::clip(Rect::new(0, 16, 64, 16), Rect::new(0, 0, 64, 64), (1, 1), (0, 0), (64, 64))
                .unwrap();

        assert_eq!(geometry.dst_min_y, 16);
        assert_eq!(geometry.dst_height, 16);
        assert_eq!(geometry.active_src_min_y, 16);
        assert!(geometry.validate(64, 64).is_ok());
    }

    #[test]
    fn clip_subsampled_region() {
        // Every second column of 3..10, on the grid starting at 3.
        let geometry =
            Geometry::clip(Rect::new(4, 0, 8, 1), Rect::new(3, 0, 7, 1), (2, 1), (0, 0), (4, 1))
                .unwrap();

        assert_eq!(geometry.active_src_min_x, 5);
        assert_eq!(geometry.active_src_width, 5);
        assert_eq!(geometry.dst_min_x, 1);
        assert_eq!(geometry.dst_width, 3);
        assert_eq!(geometry.dst_x(5), 1);
        assert_eq!(geometry.src_x(3), 9);
        assert!(geometry.validate(4, 1).is_ok());
    }

    #[test]
    fn clip_outside() {
        let roi = Rect::new(0, 0, 10, 10);
        assert!(Geometry::clip(Rect::new(10, 0, 4, 4), roi, (1, 1), (0, 0), (10, 10)).is_none());
        assert!(Geometry::clip(Rect::new(0, 0, 4, 4), roi, (1, 1), (-4, 0), (10, 10)).is_none());
        // Only column 1 of the tile, which is not on the grid.
        assert!(Geometry::clip(Rect::new(1, 0, 1, 4), roi, (2, 1), (0, 0), (10, 10)).is_none());
    }

    #[test]
    fn clip_properties() {
        let mut rng = XorShiftRng::seed_from_u64(7);

        for _ in 0..2000 {
            let src = Rect::new(
                rng.random_range(0..50),
                rng.random_range(0..50),
                rng.random_range(1..40),
                rng.random_range(1..40),
            );
            let roi = Rect::new(
                rng.random_range(0..50),
                rng.random_range(0..50),
                rng.random_range(1..60),
                rng.random_range(1..60),
            );
            let subsample = (rng.random_range(1..5), rng.random_range(1..5));
            let offset = (rng.random_range(-10..10), rng.random_range(-10..10));
            let size = (rng.random_range(1..40), rng.random_range(1..40));

            let Some(g) = Geometry::clip(src, roi, subsample, offset, size) else {
                continue;
            };

            assert!(g.validate(size.0, size.1).is_ok(), "{g:?}");

            for dx in g.dst_min_x..g.dst_min_x + g.dst_width {
                let sx = g.src_x(dx);
                assert!(sx >= src.x as i64 && sx < (src.x + src.width) as i64);
                assert!(sx >= roi.x as i64 && sx < (roi.x + roi.width) as i64);
                assert_eq!(g.dst_x(sx as u32), dx as i64);
            }

            for dy in g.dst_min_y..g.dst_min_y + g.dst_height {
                let sy = g.src_y(dy);
                assert!(sy >= src.y as i64 && sy < (src.y + src.height) as i64);
                assert_eq!(g.dst_y(sy as u32), dy as i64);
            }
        }
    }

    #[test]
    fn invalid_geometry() {
        let mut geometry = Geometry::unscaled(Rect::new(0, 0, 8, 8));
        assert!(geometry.validate(8, 8).is_ok());
        assert_eq!(geometry.validate(7, 8), Err(FormatError::InvalidGeometry));

        geometry.active_src_width = 7;
        assert_eq!(geometry.validate(8, 8), Err(FormatError::InvalidGeometry));
    }

    #[test]
    fn band_mapping() {
        let info = ImageInfo::new(3, 8, Photometric::Rgb);
        assert!(BandMapping::identity(3).validate(&info, 3).is_ok());
        assert!(BandMapping::new(vec![2, 0], vec![0, 1]).validate(&info, 2).is_ok());
        assert_eq!(
            BandMapping::new(vec![3], vec![0]).validate(&info, 3),
            Err(FormatError::InvalidBandMapping)
        );
        assert_eq!(
            BandMapping::new(vec![0, 1], vec![0]).validate(&info, 3),
            Err(FormatError::InvalidBandMapping)
        );
        assert_eq!(
            BandMapping::identity(3).validate(&info, 2),
            Err(FormatError::InvalidBandMapping)
        );

        let mut planar = info.clone();
        planar.planar = true;
        planar.planar_band = 1;
        assert!(BandMapping::plane(1, 1).validate(&planar, 3).is_ok());
        assert_eq!(
            BandMapping::plane(0, 0).validate(&planar, 3),
            Err(FormatError::InvalidBandMapping)
        );
    }
}
