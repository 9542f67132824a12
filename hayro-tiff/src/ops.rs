//! In-place operations on the pixels of a buffer.

use crate::buffer::{Element, ElementKind, PixelBuffer, SampleModel, dispatch};

fn invert_slice<T: Element>(data: &mut [T]) {
    for v in data {
        *v = v.invert();
    }
}

/// Invert the photometric polarity of the pixels in a region.
///
/// `bits` holds the significant bits of each band. Unsigned samples
/// narrower than their element are inverted within their own range,
/// everything else element by element. Packed elements are inverted as a
/// whole, so the region should start on an element boundary.
pub(crate) fn invert(
    buffer: &mut PixelBuffer,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    bits: &[u32],
) {
    let kind = buffer.kind();
    let narrow = matches!(buffer.model(), SampleModel::Interleaved { .. })
        && matches!(kind, ElementKind::U8 | ElementKind::U16)
        && bits.iter().any(|b| *b < kind.bits());

    if narrow {
        invert_samples(buffer, x, y, width, height, bits);
    } else {
        invert_elements(buffer, x, y, width, height);
    }
}

fn invert_samples(
    buffer: &mut PixelBuffer,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    bits: &[u32],
) {
    let x_end = x.saturating_add(width).min(buffer.width());
    let y_end = y.saturating_add(height).min(buffer.height());
    let element_bits = buffer.kind().bits();
    let max: Vec<u32> = bits
        .iter()
        .take(buffer.bands())
        .map(|b| (1 << (*b).min(element_bits)) - 1)
        .collect();

    for row in y..y_end {
        for col in x..x_end {
            for (band, max) in max.iter().enumerate() {
                let value = buffer.sample(col, row, band);
                buffer.set_sample(col, row, band, max - value.min(*max));
            }
        }
    }
}

fn invert_elements(buffer: &mut PixelBuffer, x: u32, y: u32, width: u32, height: u32) {
    let element_bits = buffer.kind().bits() as usize;
    let pixel_bits = buffer.model().pixel_bits(buffer.kind()) as usize;
    let stride = buffer.stride();

    let start = x as usize * pixel_bits / element_bits;
    let len = (width as usize * pixel_bits).div_ceil(element_bits);
    let rows = height.min(buffer.height().saturating_sub(y));

    dispatch!(buffer.storage_mut(), data => {
        for row in 0..rows as usize {
            let offset = (y as usize + row) * stride + start;

            if let Some(elements) = data.get_mut(offset..offset + len) {
                invert_slice(elements);
            }
        }
    });
}
