//! Softmax over the middle axis of an `[outer, count, inner]` tensor
//!
//! Every `(o, i)` column is shifted by its maximum before exponentiation.
//! Binary softmax over interleaved pairs (`count == 2`, `inner == 1`) has a
//! dedicated kernel that splits the pairs with a deinterleave.

use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes, Segment, math};

struct Softmax {
    src: *const f32,
    outer: usize,
    count: usize,
    inner: usize,
    dst: *mut f32,
}

/// Softmax of one `(a, b)` pair
#[inline]
fn pair(a: f32, b: f32) -> (f32, f32) {
    let max = a.max(b);
    let (ea, eb) = ((a - max).exp(), (b - max).exp());
    let sum = ea + eb;
    (ea / sum, eb / sum)
}

impl Softmax {
    fn is_empty(&self) -> bool {
        self.outer == 0 || self.count == 0 || self.inner == 0
    }

    #[inline(always)]
    unsafe fn pairs<L: Lanes>(&self) {
        let w = L::WIDTH;
        let mut o = 0;
        while o + w <= self.outer {
            let src = self.src.add(2 * o);
            let (x0, x1) = L::deinterleave(L::load(src), L::load(src.add(w)));
            let max = L::max(x0, x1);
            let e0 = math::exp::<L>(L::sub(x0, max));
            let e1 = math::exp::<L>(L::sub(x1, max));
            let sum = L::add(e0, e1);
            let (a, b) = L::interleave(L::div(e0, sum), L::div(e1, sum));
            let dst = self.dst.add(2 * o);
            L::store(dst, a);
            L::store(dst.add(w), b);
            o += w;
        }
        for o in o..self.outer {
            let (a, b) = pair(*self.src.add(2 * o), *self.src.add(2 * o + 1));
            *self.dst.add(2 * o) = a;
            *self.dst.add(2 * o + 1) = b;
        }
    }

    #[inline(always)]
    unsafe fn general<L: Lanes>(&self) {
        let (count, inner) = (self.count, self.inner);
        let mut scratch = vec![0.0f32; 2 * inner];
        let max = scratch.as_mut_ptr();
        let sum = max.add(inner);
        let access = Access::probe::<L>(
            &[self.src, self.dst.cast_const(), max.cast_const(), sum.cast_const()],
            &[inner],
        );
        let seg = Segment::new(inner, L::WIDTH);

        for o in 0..self.outer {
            let src = self.src.add(o * count * inner);
            let dst = self.dst.add(o * count * inner);

            seg.for_each::<L>(access, |c| c.store::<L>(max, c.load::<L>(src)));
            for k in 1..count {
                let row = src.add(k * inner);
                seg.for_each::<L>(access, |c| {
                    c.store::<L>(max, L::max(c.load::<L>(max), c.load::<L>(row)));
                });
            }

            seg.for_each::<L>(access, |c| c.store::<L>(sum, L::zero()));
            for k in 0..count {
                let (s, d) = (src.add(k * inner), dst.add(k * inner));
                seg.for_each::<L>(access, |c| {
                    let e = math::exp::<L>(L::sub(c.load::<L>(s), c.load::<L>(max)));
                    c.store::<L>(d, e);
                    c.store::<L>(sum, L::add(c.load::<L>(sum), e));
                });
            }

            for k in 0..count {
                let d = dst.add(k * inner);
                seg.for_each::<L>(access, |c| {
                    c.store::<L>(d, L::div(c.load::<L>(d), c.load::<L>(sum)));
                });
            }
        }
    }
}

impl LaneKernel for Softmax {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        if self.is_empty() {
            return;
        }
        if self.count == 2 && self.inner == 1 {
            self.pairs::<L>()
        } else {
            self.general::<L>()
        }
    }

    unsafe fn scalar(&self) {
        if self.is_empty() {
            return;
        }
        let (count, inner) = (self.count, self.inner);
        let mut max = vec![0.0f32; inner];
        let mut sum = vec![0.0f32; inner];
        for o in 0..self.outer {
            let src = self.src.add(o * count * inner);
            let dst = self.dst.add(o * count * inner);
            for (i, m) in max.iter_mut().enumerate() {
                *m = (0..count).fold(f32::MIN, |m, k| m.max(*src.add(k * inner + i)));
            }
            sum.fill(0.0);
            for k in 0..count {
                for i in 0..inner {
                    let e = (*src.add(k * inner + i) - max[i]).exp();
                    *dst.add(k * inner + i) = e;
                    sum[i] += e;
                }
            }
            for k in 0..count {
                for (i, s) in sum.iter().enumerate() {
                    *dst.add(k * inner + i) /= s;
                }
            }
        }
    }
}

raw_entry! {
    /// Softmax along `count` for each of `outer × inner` columns.
    ///
    /// # Safety
    /// - `src`, `dst` point to `outer * count * inner` floats; `dst` may
    ///   alias `src`
    pub unsafe fn softmax(
        src: *const f32,
        outer: usize,
        count: usize,
        inner: usize,
        dst: *mut f32,
    ) => Softmax { src, outer, count, inner, dst }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::dispatch::Dispatch;
    use crate::test_util::*;

    fn run(table: &Dispatch, src: &[f32], outer: usize, count: usize, inner: usize) -> Vec<f32> {
        let mut dst = vec![f32::NAN; src.len()];
        unsafe { softmax_with(table, src.as_ptr(), outer, count, inner, dst.as_mut_ptr()) };
        dst
    }

    #[test]
    fn test_scenarios() {
        for (name, table) in tables() {
            assert_allclose(&run(&table, &[0.0, 0.0], 1, 2, 1), &[0.5, 0.5], 1e-6, 1e-7, &name);
            assert_allclose(
                &run(&table, &[0.0, 3.0f32.ln()], 1, 2, 1),
                &[0.25, 0.75],
                1e-5,
                1e-6,
                &name,
            );
            assert_allclose(
                &run(&table, &[1.0, 2.0, 3.0], 1, 3, 1),
                &[0.090_030_57, 0.244_728_48, 0.665_240_94],
                1e-5,
                1e-6,
                &name,
            );
        }
    }

    #[test]
    fn test_every_width_matches_scalar() {
        let shapes = [
            (1usize, 2usize, 1usize),
            (3, 2, 1),
            (16, 2, 1),
            (37, 2, 1),
            (5, 1, 7),
            (4, 3, 1),
            (2, 10, 17),
            (3, 7, 33),
        ];
        for (outer, count, inner) in shapes {
            let src = random_vec(outer * count * inner, (outer * count + inner) as u64);
            let expected = run(&Dispatch::scalar(), &src, outer, count, inner);
            for (name, table) in tables() {
                assert_allclose(
                    &run(&table, &src, outer, count, inner),
                    &expected,
                    1e-4,
                    1e-6,
                    &format!("{name} outer={outer} count={count} inner={inner}"),
                );
            }
        }
    }

    #[test]
    fn test_empty_axes_touch_nothing() {
        // a dangling pointer faults if any row is read
        let dangling = std::ptr::NonNull::<f32>::dangling().as_ptr();
        for (name, table) in tables() {
            for (outer, count, inner) in [(1usize, 0usize, 1usize << 22), (0, 3, 64), (4, 5, 0)] {
                unsafe { softmax_with(&table, dangling, outer, count, inner, dangling) };
            }
            assert!(run(&table, &[], 1, 0, 1 << 22).is_empty(), "{name}");
        }
    }

    #[test]
    fn test_columns_sum_to_one() {
        let (outer, count, inner) = (3usize, 6usize, 5usize);
        let src: Vec<f32> = random_vec(outer * count * inner, 8).iter().map(|x| x * 20.0).collect();
        let dst = run(Dispatch::global(), &src, outer, count, inner);
        for o in 0..outer {
            for i in 0..inner {
                let total: f32 = (0..count).map(|k| dst[(o * count + k) * inner + i]).sum();
                assert!((total - 1.0).abs() < 1e-5, "o={o} i={i}: {total}");
            }
        }
        assert!(dst.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }
}
