//! Conversion of decoded color samples to RGB.

use crate::buffer::{PixelBuffer, SampleModel};

/// Converts the first three bands of a pixel to RGB.
pub trait ColorConverter {
    /// Convert a color to RGB samples in the same range as the input.
    fn to_rgb(&self, x0: f32, x1: f32, x2: f32) -> [f32; 3];
}

/// Converts YCbCr to RGB with the coefficients of the `YCbCrCoefficients`
/// and `ReferenceBlackWhite` fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YCbCrConverter {
    luma: [f32; 3],
    reference: [f32; 6],
}

impl Default for YCbCrConverter {
    fn default() -> Self {
        Self {
            luma: [0.299, 0.587, 0.114],
            reference: [0.0, 255.0, 128.0, 255.0, 128.0, 255.0],
        }
    }
}

impl YCbCrConverter {
    /// Create a converter. Missing fields take their TIFF defaults.
    pub fn new(luma: Option<[f32; 3]>, reference: Option<[f32; 6]>) -> Self {
        let default = Self::default();

        Self {
            luma: luma.unwrap_or(default.luma),
            reference: reference.unwrap_or(default.reference),
        }
    }
}

impl ColorConverter for YCbCrConverter {
    fn to_rgb(&self, x0: f32, x1: f32, x2: f32) -> [f32; 3] {
        let [lr, lg, lb] = self.luma;
        let [by, wy, bcb, wcb, bcr, wcr] = self.reference;

        let y = (x0 - by) * 255.0 / (wy - by);
        let cb = (x1 - bcb) * 127.0 / (wcb - bcb);
        let cr = (x2 - bcr) * 127.0 / (wcr - bcr);

        let r = cr * (2.0 - 2.0 * lr) + y;
        let b = cb * (2.0 - 2.0 * lb) + y;
        let g = (y - lb * b - lr * r) / lg;

        [r, g, b].map(|c| c.clamp(0.0, 255.0))
    }
}

/// Converts 8-bit CIE L*a*b* to linear RGB.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CieLabConverter;

const WHITE_POINT: [f32; 3] = [95.047, 100.0, 108.883];

fn inverse_f(f: f32) -> f32 {
    let cube = f * f * f;

    if cube > 0.008856 {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

impl ColorConverter for CieLabConverter {
    fn to_rgb(&self, x0: f32, x1: f32, x2: f32) -> [f32; 3] {
        let signed = |v: f32| if v > 127.0 { v - 256.0 } else { v };

        let l = 100.0 * x0 / 255.0;
        let a = signed(x1);
        let b = signed(x2);

        let fy = (l + 16.0) / 116.0;
        let fx = fy + a / 500.0;
        let fz = fy - b / 200.0;

        let x = WHITE_POINT[0] * inverse_f(fx);
        let y = WHITE_POINT[1] * inverse_f(fy);
        let z = WHITE_POINT[2] * inverse_f(fz);

        let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
        let g = -0.969256 * x + 1.875992 * y + 0.041556 * z;
        let b = 0.055648 * x - 0.204043 * y + 1.057311 * z;

        [r, g, b].map(|c| (c / 100.0).clamp(0.0, 1.0) * 255.0)
    }
}

/// Convert the pixels of a region of an interleaved buffer with at least
/// three bands in place.
pub(crate) fn convert(
    buffer: &mut PixelBuffer,
    converter: &dyn ColorConverter,
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
) {
    match buffer.model() {
        SampleModel::Interleaved { bands } if bands >= 3 => {}
        _ => return,
    }

    let x1 = (x0 + width).min(buffer.width());
    let y1 = (y0 + height).min(buffer.height());

    for y in y0..y1 {
        for x in x0..x1 {
            let c = [0, 1, 2].map(|b| buffer.sample_f64(x, y, b) as f32);
            let rgb = converter.to_rgb(c[0], c[1], c[2]);

            for (b, v) in rgb.into_iter().enumerate() {
                buffer.set_sample_f64(x, y, b, v as f64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ElementKind;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(a, b)| (a - b).abs() < 0.5)
    }

    #[test]
    fn ycbcr_gray() {
        let rgb = YCbCrConverter::default().to_rgb(128.0, 128.0, 128.0);
        assert!(close(rgb, [128.0, 128.0, 128.0]), "{rgb:?}");
    }

    #[test]
    fn ycbcr_red() {
        // Full red with the default coefficients.
        let rgb = YCbCrConverter::default().to_rgb(76.245, 84.97, 255.0);
        assert!(close(rgb, [254.0, 0.0, 0.0]), "{rgb:?}");
    }

    #[test]
    fn cielab_white_and_black() {
        let white = CieLabConverter.to_rgb(255.0, 0.0, 0.0);
        assert!(close(white, [255.0; 3]), "{white:?}");

        let black = CieLabConverter.to_rgb(0.0, 0.0, 0.0);
        assert!(close(black, [0.0; 3]), "{black:?}");
    }

    #[test]
    fn convert_buffer_region() {
        let mut buffer =
            PixelBuffer::new(2, 1, ElementKind::U8, SampleModel::Interleaved { bands: 4 }).unwrap();

        for b in 0..4 {
            buffer.set_sample(0, 0, b, 128);
            buffer.set_sample(1, 0, b, 128);
        }

        buffer.set_sample(0, 0, 2, 255);
        convert(&mut buffer, &YCbCrConverter::default(), 0, 0, 1, 1);

        let row = buffer.row::<u8>(0).unwrap();
        // Red is saturated, alpha and the second pixel are untouched.
        assert_eq!(row[0], 255);
        assert_eq!(row[3], 128);
        assert_eq!(&row[4..], [128; 4]);
    }
}
