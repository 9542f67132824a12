//! Changing elements of a scanline.
//!
//! A changing element is a pixel whose color differs from the one of the
//! previous pixel on the same line. The first element of every line is
//! the change from the imaginary white pixel to black, so even indices
//! always start black runs and odd indices start white runs.

/// The changing elements of one scanline, terminated by two sentinels
/// equal to the line width.
#[derive(Debug, Clone)]
pub(crate) struct ChangingElements {
    elements: Vec<u32>,
    len: usize,
    width: u32,
    /// The index of the last `b1` found on this line.
    last_changing_element: usize,
}

impl ChangingElements {
    pub(crate) fn new(width: u32) -> Self {
        let capacity = 2 * width as usize + 2;

        Self {
            elements: vec![width; capacity],
            len: 0,
            width,
            last_changing_element: 0,
        }
    }

    /// Start a new coding line.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.last_changing_element = 0;
    }

    #[inline]
    pub(crate) fn push(&mut self, pos: u32) {
        // Zero-length runs can add elements without advancing, keep room
        // for the sentinels.
        if self.len + 2 < self.elements.len() {
            self.elements[self.len] = pos;
            self.len += 1;
        }
    }

    /// Terminate the line with the sentinels.
    #[inline]
    pub(crate) fn finish(&mut self) {
        self.elements[self.len] = self.width;
        self.elements[self.len + 1] = self.width;
        self.last_changing_element = 0;
    }

    pub(crate) fn as_slice(&self) -> &[u32] {
        &self.elements[..self.len]
    }

    /// Find `b1`, the first changing element to the right of `a0` whose
    /// color is opposite to the current color, and `b2`, the element
    /// following it.
    ///
    /// `a0` must not decrease between calls on the same line.
    #[inline]
    pub(crate) fn next_changing_element(&mut self, a0: i64, is_white: bool) -> (u32, u32) {
        let limit = self.len + 2;
        let mut start = self.last_changing_element.saturating_sub(1);

        if is_white {
            start &= !1;
        } else {
            start |= 1;
        }

        let mut i = start;

        while i < limit {
            let element = self.elements[i];

            if element as i64 > a0 {
                self.last_changing_element = i;
                let b2 = if i + 1 < limit {
                    self.elements[i + 1]
                } else {
                    self.width
                };

                return (element, b2);
            }

            i += 2;
        }

        (self.width, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn line(width: u32, changes: &[u32]) -> ChangingElements {
        let mut elements = ChangingElements::new(width);

        for c in changes {
            elements.push(*c);
        }

        elements.finish();
        elements
    }

    /// Scan the whole line from the start.
    fn naive(elements: &[u32], width: u32, a0: i64, is_white: bool) -> (u32, u32) {
        let mut padded = elements.to_vec();
        padded.extend([width, width]);

        let first = if is_white { 0 } else { 1 };

        for i in (first..padded.len()).step_by(2) {
            if padded[i] as i64 > a0 {
                return (padded[i], padded.get(i + 1).copied().unwrap_or(width));
            }
        }

        (width, width)
    }

    #[test]
    fn imaginary_white_line() {
        let mut elements = line(10, &[]);
        assert_eq!(elements.next_changing_element(-1, true), (10, 10));
        assert_eq!(elements.next_changing_element(4, false), (10, 10));
    }

    #[test]
    fn simple_line() {
        // White 0..3, black 3..5, white 5..10.
        let mut elements = line(10, &[3, 5]);
        assert_eq!(elements.next_changing_element(-1, true), (3, 5));
        assert_eq!(elements.next_changing_element(3, false), (5, 10));
        assert_eq!(elements.next_changing_element(5, true), (10, 10));
    }

    #[test]
    fn leading_black_pixel() {
        let mut elements = line(8, &[0, 2]);
        assert_eq!(elements.next_changing_element(-1, true), (0, 2));
        assert_eq!(elements.next_changing_element(0, false), (2, 8));
    }

    #[test]
    fn zero_length_runs_keep_sentinels() {
        let mut elements = ChangingElements::new(2);

        for _ in 0..100 {
            elements.push(0);
        }

        elements.finish();
        assert_eq!(elements.as_slice().len(), 4);
        assert_eq!(elements.next_changing_element(0, true), (2, 2));
    }

    #[test]
    fn reused_line_ignores_stale_elements() {
        let mut elements = line(20, &[1, 2, 3, 4, 5, 6, 7, 8]);
        elements.clear();
        elements.push(4);
        elements.finish();
        assert_eq!(elements.next_changing_element(-1, true), (4, 20));
        assert_eq!(elements.next_changing_element(4, false), (20, 20));
        assert_eq!(elements.next_changing_element(5, true), (20, 20));
    }

    #[test]
    fn cached_search_matches_naive_search() {
        let mut rng = XorShiftRng::seed_from_u64(0);

        for _ in 0..500 {
            let width = rng.random_range(1..200_u32);
            let mut changes = vec![];
            let mut pos = 0;

            while pos < width {
                pos += rng.random_range(0..20_u32);
                changes.push(pos.min(width));
            }

            let mut elements = line(width, &changes);
            let mut a0 = -1_i64;
            let mut is_white = true;

            while a0 < width as i64 {
                let expected = naive(elements.as_slice(), width, a0, is_white);
                assert_eq!(
                    elements.next_changing_element(a0, is_white),
                    expected,
                    "changes {changes:?}, a0 {a0}, white {is_white}"
                );

                a0 += rng.random_range(0..8_i64);

                if rng.random::<bool>() {
                    is_white = !is_white;
                }
            }
        }
    }
}
