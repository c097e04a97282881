//! Eltwise combine of `count >= 2` equally sized inputs
//!
//! Product, max and min combine `src[0]` with `src[1]` and then fold the
//! remaining inputs into `dst`. The weighted sum starts from
//! `src[0]·w[0] + src[1]·w[1]` and accumulates `fma(src[i], w[i], dst)`, so
//! vector results differ from the scalar reference by FMA rounding.

use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes, Segment};

/// Combine rule for [`eltwise`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EltwiseOp {
    /// `Π src[i]`
    Product,
    /// `Σ src[i]·weight[i]`
    Sum,
    /// `max src[i]`
    Max,
    /// `min src[i]`
    Min,
}

struct Eltwise<'a> {
    src: &'a [*const f32],
    weight: *const f32,
    size: usize,
    op: EltwiseOp,
    dst: *mut f32,
}

impl Eltwise<'_> {
    #[inline(always)]
    unsafe fn fold<L: Lanes>(&self, f: impl Fn(L::V, L::V) -> L::V) {
        let access = self.access::<L>();
        let seg = Segment::new(self.size, L::WIDTH);
        let (src0, src1) = (self.src[0], self.src[1]);
        seg.for_each::<L>(access, |k| {
            k.store::<L>(self.dst, f(k.load::<L>(src0), k.load::<L>(src1)));
        });
        for &src in &self.src[2..] {
            seg.for_each::<L>(access, |k| {
                k.store::<L>(self.dst, f(k.load::<L>(self.dst), k.load::<L>(src)));
            });
        }
    }

    #[inline(always)]
    unsafe fn weighted_sum<L: Lanes>(&self) {
        let access = self.access::<L>();
        let seg = Segment::new(self.size, L::WIDTH);
        let (src0, src1) = (self.src[0], self.src[1]);
        let w0 = L::splat(*self.weight);
        let w1 = L::splat(*self.weight.add(1));
        seg.for_each::<L>(access, |k| {
            let s1 = L::mul(k.load::<L>(src1), w1);
            k.store::<L>(self.dst, L::fmadd(k.load::<L>(src0), w0, s1));
        });
        for (i, &src) in self.src.iter().enumerate().skip(2) {
            let w = L::splat(*self.weight.add(i));
            seg.for_each::<L>(access, |k| {
                let acc = k.load::<L>(self.dst);
                k.store::<L>(self.dst, L::fmadd(k.load::<L>(src), w, acc));
            });
        }
    }

    fn access<L: Lanes>(&self) -> Access {
        let mut bases: smallvec::SmallVec<[*const f32; 8]> = self.src.iter().copied().collect();
        bases.push(self.dst.cast_const());
        Access::probe::<L>(&bases, &[])
    }

    unsafe fn scalar_fold(&self, f: impl Fn(f32, f32) -> f32) {
        for j in 0..self.size {
            *self.dst.add(j) = f(*self.src[0].add(j), *self.src[1].add(j));
        }
        for &src in &self.src[2..] {
            for j in 0..self.size {
                *self.dst.add(j) = f(*self.dst.add(j), *src.add(j));
            }
        }
    }
}

impl LaneKernel for Eltwise<'_> {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        match self.op {
            EltwiseOp::Product => self.fold::<L>(|a, b| L::mul(a, b)),
            EltwiseOp::Max => self.fold::<L>(|a, b| L::max(a, b)),
            EltwiseOp::Min => self.fold::<L>(|a, b| L::min(a, b)),
            EltwiseOp::Sum => self.weighted_sum::<L>(),
        }
    }

    unsafe fn scalar(&self) {
        match self.op {
            EltwiseOp::Product => self.scalar_fold(|a, b| a * b),
            EltwiseOp::Max => self.scalar_fold(f32::max),
            EltwiseOp::Min => self.scalar_fold(f32::min),
            EltwiseOp::Sum => {
                let (w0, w1) = (*self.weight, *self.weight.add(1));
                for j in 0..self.size {
                    *self.dst.add(j) = *self.src[0].add(j) * w0 + *self.src[1].add(j) * w1;
                }
                for (i, &src) in self.src.iter().enumerate().skip(2) {
                    let w = *self.weight.add(i);
                    for j in 0..self.size {
                        *self.dst.add(j) += *src.add(j) * w;
                    }
                }
            }
        }
    }
}

raw_entry! {
    /// Combine `src.len()` inputs of `size` floats into `dst`.
    ///
    /// # Safety
    /// - `src` holds at least two pointers, each to `size` floats
    /// - `weight` points to `src.len()` floats when `op` is
    ///   [`EltwiseOp::Sum`] and is ignored otherwise
    /// - `dst` points to `size` floats and may alias `src[0]`
    pub unsafe fn eltwise(
        src: &[*const f32],
        weight: *const f32,
        size: usize,
        op: EltwiseOp,
        dst: *mut f32,
    ) => {
        debug_assert!(src.len() >= 2, "eltwise needs at least two inputs");
        debug_assert!(op != EltwiseOp::Sum || !weight.is_null());
        Eltwise { src, weight, size, op, dst }
    }
}
