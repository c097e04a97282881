//! Clamp to `[lower, upper]`

use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes, Segment};

struct RestrictRange {
    src: *const f32,
    size: usize,
    lower: f32,
    upper: f32,
    dst: *mut f32,
}

impl LaneKernel for RestrictRange {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let lo = L::splat(self.lower);
        let hi = L::splat(self.upper);
        let access = Access::probe::<L>(&[self.src, self.dst.cast_const()], &[]);
        Segment::new(self.size, L::WIDTH).for_each::<L>(access, |c| {
            c.store::<L>(self.dst, L::min(L::max(c.load::<L>(self.src), lo), hi));
        });
    }

    unsafe fn scalar(&self) {
        for i in 0..self.size {
            *self.dst.add(i) = (*self.src.add(i)).max(self.lower).min(self.upper);
        }
    }
}

raw_entry! {
    /// `dst[i] = min(max(src[i], lower), upper)`.
    ///
    /// # Safety
    /// - `src`, `dst` point to `size` floats; `dst` may alias `src`
    /// - `lower <= upper`
    pub unsafe fn restrict_range(
        src: *const f32,
        size: usize,
        lower: f32,
        upper: f32,
        dst: *mut f32,
    ) => {
        debug_assert!(lower <= upper, "empty range [{lower}, {upper}]");
        RestrictRange { src, size, lower, upper, dst }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::dispatch::Dispatch;
    use crate::test_util::*;

    fn run(table: &Dispatch, src: &[f32], lower: f32, upper: f32) -> Vec<f32> {
        let mut dst = vec![f32::NAN; src.len()];
        unsafe {
            restrict_range_with(table, src.as_ptr(), src.len(), lower, upper, dst.as_mut_ptr());
        }
        dst
    }

    #[test]
    fn test_scenario() {
        let src = [-1.0f32, 0.0, 3.0, 6.0, 9.0];
        for (name, table) in tables() {
            assert_eq!(run(&table, &src, 0.0, 6.0), [0.0, 0.0, 3.0, 6.0, 6.0], "{name}");
        }
    }

    #[test]
    fn test_every_width_matches_scalar() {
        for size in boundary_sizes() {
            let src = random_vec(size, size as u64);
            let expected = run(&Dispatch::scalar(), &src, -0.5, 1.25);
            for (name, table) in tables() {
                for shift in [0usize, 3] {
                    let src = Shifted::new(&src, shift);
                    let mut dst = Shifted::new(&vec![0.0; size], shift);
                    unsafe {
                        restrict_range_with(
                            &table,
                            src.as_ptr(),
                            size,
                            -0.5,
                            1.25,
                            dst.as_mut_ptr(),
                        );
                    }
                    assert_eq!(dst.as_slice(), expected, "{name} size={size} shift={shift}");
                }
            }
        }
    }

    #[test]
    fn test_idempotent_in_place() {
        let mut buf = random_vec(45, 4);
        unsafe { restrict_range(buf.as_ptr(), buf.len(), -1.0, 1.0, buf.as_mut_ptr()) };
        let once = buf.clone();
        unsafe { restrict_range(buf.as_ptr(), buf.len(), -1.0, 1.0, buf.as_mut_ptr()) };
        assert_eq!(buf, once);
        assert!(buf.iter().all(|x| (-1.0..=1.0).contains(x)));
    }
}
