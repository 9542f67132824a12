//! Rescaling of samples whose bit depth differs from the destination's.

use crate::buffer::PixelBuffer;
use crate::geometry::BandMapping;
use crate::info::{ImageInfo, SampleFormat};
use crate::log::ltrace;

/// Sources up to this depth get a lookup table, deeper ones are scaled
/// arithmetically.
const MAX_TABLE_BITS: u32 = 16;

fn max_value(bits: u32) -> u64 {
    if bits >= 32 {
        u32::MAX as u64
    } else {
        (1 << bits) - 1
    }
}

#[inline]
fn scale(sample: u64, max_in: u64, max_out: u64) -> u32 {
    if max_in == 0 {
        return 0;
    }

    ((sample * max_out + max_in / 2) / max_in) as u32
}

/// Build the table that maps every `in_bits` sample onto the range of
/// `out_bits`, rounding to the nearest value.
pub fn scale_table(in_bits: u32, out_bits: u32) -> Vec<u32> {
    let max_in = max_value(in_bits);
    let max_out = max_value(out_bits);

    (0..=max_in).map(|s| scale(s, max_in, max_out)).collect()
}

#[derive(Debug, Clone, PartialEq)]
enum BandScale {
    Table(Vec<u32>),
    Arithmetic { max_in: u64, max_out: u64 },
}

/// Per-band rescaling of mapped samples.
#[derive(Debug, Clone, PartialEq)]
pub struct RescaleTable {
    bands: Vec<BandScale>,
}

impl RescaleTable {
    /// Create a table for mapped bands with the given source and
    /// destination depths.
    pub fn new(depths: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let bands = depths
            .into_iter()
            .map(|(in_bits, out_bits)| {
                if in_bits <= MAX_TABLE_BITS {
                    BandScale::Table(scale_table(in_bits, out_bits))
                } else {
                    BandScale::Arithmetic {
                        max_in: max_value(in_bits),
                        max_out: max_value(out_bits),
                    }
                }
            })
            .collect();

        Self { bands }
    }

    /// Rescale a sample of the `index`-th mapped band. Samples out of the
    /// source range are clamped.
    #[inline]
    pub fn get(&self, index: usize, sample: u32) -> u32 {
        match &self.bands[index] {
            BandScale::Table(table) => table[(sample as usize).min(table.len() - 1)],
            BandScale::Arithmetic { max_in, max_out } => {
                scale((sample as u64).min(*max_in), *max_in, *max_out)
            }
        }
    }
}

/// Everything a rescale table depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RescaleKey {
    planar: bool,
    dst_bits: Vec<u32>,
    source: Vec<usize>,
    src_bits: Vec<u16>,
    destination: Vec<usize>,
}

/// Caches the rescale table between calls with the same parameters.
#[derive(Debug, Default, Clone)]
pub(crate) struct RescaleCache {
    key: Option<RescaleKey>,
    table: Option<RescaleTable>,
}

impl RescaleCache {
    /// Return the rescale table for decoding into `dst`, or `None` if all
    /// mapped bands already have the destination depth or either side holds
    /// floating point samples.
    pub(crate) fn update(
        &mut self,
        info: &ImageInfo,
        mapping: &BandMapping,
        dst: &PixelBuffer,
    ) -> Option<&RescaleTable> {
        let dst_bits: Vec<u32> = if info.planar {
            vec![dst.sample_bits(0); info.samples_per_pixel as usize]
        } else {
            (0..dst.bands()).map(|b| dst.sample_bits(b)).collect()
        };

        let depths: Vec<(u32, u32)> = mapping
            .source
            .iter()
            .zip(&mapping.destination)
            .map(|(s, d)| (info.bits(*s), dst_bits.get(*d).copied().unwrap_or(dst_bits[0])))
            .collect();

        let float = dst.kind().is_float()
            || mapping
                .source
                .iter()
                .any(|s| info.sample_format.get(*s) == Some(&SampleFormat::Float));

        if float || depths.iter().all(|(s, d)| s == d) {
            self.key = None;
            self.table = None;

            return None;
        }

        let key = RescaleKey {
            planar: info.planar,
            dst_bits,
            source: mapping.source.clone(),
            src_bits: info.bits_per_sample.clone(),
            destination: mapping.destination.clone(),
        };

        if self.key.as_ref() != Some(&key) || self.table.is_none() {
            ltrace!("building rescale table for {:?}", depths);
            self.table = Some(RescaleTable::new(depths));
            self.key = Some(key);
        }

        self.table.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{ElementKind, SampleModel};
    use crate::info::Photometric;

    #[test]
    fn table_end_points() {
        for in_bits in 1..=12 {
            for out_bits in 1..=16 {
                let table = scale_table(in_bits, out_bits);
                assert_eq!(table.len(), 1 << in_bits);
                assert_eq!(table[0], 0);
                assert_eq!(*table.last().unwrap(), (1 << out_bits) - 1);
                assert!(table.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn sixteen_to_eight_bits() {
        let table = RescaleTable::new([(16, 8)]);
        assert_eq!(table.get(0, 32768), 128);
        assert_eq!(table.get(0, 65535), 255);
        assert_eq!(table.get(0, 70000), 255);
    }

    #[test]
    fn one_to_eight_bits() {
        assert_eq!(scale_table(1, 8), [0, 255]);
        assert_eq!(scale_table(2, 8), [0, 85, 170, 255]);
    }

    #[test]
    fn deep_sources_are_computed() {
        let table = RescaleTable::new([(24, 8)]);
        assert_eq!(table.get(0, 0), 0);
        assert_eq!(table.get(0, 0xFF_FFFF), 255);
        assert_eq!(table.get(0, 0x80_0000), 128);
        assert_eq!(table.get(0, u32::MAX), 255);
    }

    #[test]
    fn cache() {
        let info = ImageInfo::new(1, 16, Photometric::BlackIsZero);
        let mapping = BandMapping::identity(1);
        let mut cache = RescaleCache::default();

        let u8_buffer =
            PixelBuffer::new(1, 1, ElementKind::U8, SampleModel::Interleaved { bands: 1 }).unwrap();
        let table = cache.update(&info, &mapping, &u8_buffer).cloned().unwrap();
        assert_eq!(table.get(0, 32768), 128);
        assert!(cache.key.is_some());

        let u16_buffer =
            PixelBuffer::new(1, 1, ElementKind::U16, SampleModel::Interleaved { bands: 1 }).unwrap();
        assert!(cache.update(&info, &mapping, &u16_buffer).is_none());
        assert!(cache.key.is_none() && cache.table.is_none());

        assert!(cache.update(&info, &mapping, &u8_buffer).is_some());
    }

    #[test]
    fn float_samples_are_not_rescaled() {
        let mapping = BandMapping::identity(1);
        let mut cache = RescaleCache::default();
        let buffer = |kind| {
            PixelBuffer::new(1, 1, kind, SampleModel::Interleaved { bands: 1 }).unwrap()
        };

        let mut info = ImageInfo::new(1, 32, Photometric::BlackIsZero);
        info.sample_format = vec![SampleFormat::Float];
        assert!(cache.update(&info, &mapping, &buffer(ElementKind::F64)).is_none());
        assert!(cache.update(&info, &mapping, &buffer(ElementKind::U8)).is_none());

        info.bits_per_sample = vec![64];
        assert!(cache.update(&info, &mapping, &buffer(ElementKind::F32)).is_none());

        let info = ImageInfo::new(1, 8, Photometric::BlackIsZero);
        assert!(cache.update(&info, &mapping, &buffer(ElementKind::F32)).is_none());
        assert!(cache.key.is_none() && cache.table.is_none());
    }
}
