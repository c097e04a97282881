//! Local response normalization across channels
//!
//! `dst = src · (k0 + k1·Σ src²)^k2`, the sum running over the `2·half + 1`
//! channels centred on each output channel. Channels outside `[0, count)`
//! contribute zero.
//!
//! The spatial-major vector kernel computes each window sum directly from
//! five shifted loads and is specialized for `half == 2`; the first and last
//! chunk of a row use masked loads so nothing outside the row is read.
//! Other windows walk down to narrower widths and finally to the scalar
//! running sum.

use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes, Segment, math};

struct Lrn {
    src: *const f32,
    half: usize,
    count: usize,
    size: usize,
    k: [f32; 3],
    dst: *mut f32,
    trans: bool,
}

/// Window sum of squares for lanes whose window is entirely inside the row
#[inline(always)]
unsafe fn body_square_sum<L: Lanes>(src: *const f32) -> L::V {
    let s0 = L::load(src.sub(2));
    let s1 = L::load(src.sub(1));
    let s2 = L::load(src);
    let s3 = L::load(src.add(1));
    let s4 = L::load(src.add(2));
    square_sum::<L>(s0, s1, s2, s3, s4)
}

/// Window sum for the first `W` channels of a row
#[inline(always)]
unsafe fn nose_square_sum<L: Lanes>(src: *const f32) -> L::V {
    let s0 = L::load_masked(src.wrapping_sub(2), 2, L::WIDTH);
    let s1 = L::load_masked(src.wrapping_sub(1), 1, L::WIDTH);
    let s2 = L::load(src);
    let s3 = L::load(src.add(1));
    let s4 = L::load(src.add(2));
    square_sum::<L>(s0, s1, s2, s3, s4)
}

/// Window sum for the last `W` channels of a row
#[inline(always)]
unsafe fn tail_square_sum<L: Lanes>(src: *const f32) -> L::V {
    let s0 = L::load(src.sub(2));
    let s1 = L::load(src.sub(1));
    let s2 = L::load(src);
    let s3 = L::load_masked(src.add(1), 0, L::WIDTH - 1);
    let s4 = L::load_masked(src.add(2), 0, L::WIDTH - 2);
    square_sum::<L>(s0, s1, s2, s3, s4)
}

#[inline(always)]
unsafe fn square_sum<L: Lanes>(s0: L::V, s1: L::V, s2: L::V, s3: L::V, s4: L::V) -> L::V {
    L::add(
        L::fmadd(s0, s0, L::mul(s1, s1)),
        L::fmadd(s2, s2, L::fmadd(s3, s3, L::mul(s4, s4))),
    )
}

impl Lrn {
    #[inline(always)]
    unsafe fn spatial_major<L: Lanes>(&self) {
        let w = L::WIDTH;
        let (half, count) = (self.half, self.count);
        let k0 = L::splat(self.k[0]);
        let k1 = L::splat(self.k[1]);
        let k2 = L::splat(self.k[2]);
        let norm = |src: L::V, sum: L::V| L::mul(src, math::pow::<L>(L::fmadd(k1, sum, k0), k2));
        let access = Access::probe::<L>(&[self.src, self.dst.cast_const()], &[count]);

        for j in 0..self.size {
            let src = self.src.add(j * count);
            let dst = self.dst.add(j * count);

            access.store::<L>(dst, norm(access.load::<L>(src), nose_square_sum::<L>(src)));

            let mut i = w;
            while i + w + half <= count {
                let s = src.add(i);
                access.store::<L>(dst.add(i), norm(access.load::<L>(s), body_square_sum::<L>(s)));
                i += w;
            }
            // At most one channel is left between the last body chunk and
            // the tail chunk
            if i < count - w {
                let i = count - half - w;
                let s = src.add(i);
                L::store(dst.add(i), norm(L::load(s), body_square_sum::<L>(s)));
            }

            let i = count - w;
            let s = src.add(i);
            L::store(dst.add(i), norm(L::load(s), tail_square_sum::<L>(s)));
        }
    }

    #[inline(always)]
    unsafe fn channel_major<L: Lanes>(&self) {
        let (half, count, size) = (self.half, self.count, self.size);
        let k0 = L::splat(self.k[0]);
        let k1 = L::splat(self.k[1]);
        let k2 = L::splat(self.k[2]);
        let mut sum = vec![0.0f32; size];
        let zero = vec![0.0f32; size];
        let sum_ptr = sum.as_mut_ptr();
        let access = Access::probe::<L>(
            &[self.src, self.dst.cast_const(), sum_ptr.cast_const(), zero.as_ptr()],
            &[size],
        );
        let seg = Segment::new(size, L::WIDTH);

        for i in 0..half.min(count) {
            let pos = self.src.add(i * size);
            seg.for_each::<L>(access, |c| {
                let p = c.load::<L>(pos);
                c.store::<L>(sum_ptr, L::fmadd(p, p, c.load::<L>(sum_ptr)));
            });
        }

        for i in 0..count {
            let src = self.src.add(i * size);
            let dst = self.dst.add(i * size);
            let pos = if i + half < count {
                src.add(half * size)
            } else {
                zero.as_ptr()
            };
            let neg = if i > half {
                src.sub((half + 1) * size)
            } else {
                zero.as_ptr()
            };
            seg.for_each::<L>(access, |c| {
                let p = c.load::<L>(pos);
                let n = c.load::<L>(neg);
                let s = L::fmadd(p, p, L::sub(c.load::<L>(sum_ptr), L::mul(n, n)));
                c.store::<L>(sum_ptr, s);
                let scale = math::pow::<L>(L::fmadd(k1, s, k0), k2);
                c.store::<L>(dst, L::mul(c.load::<L>(src), scale));
            });
        }
    }
}

impl LaneKernel for Lrn {
    fn supports(&self, width: usize) -> bool {
        !self.trans || (self.half == 2 && self.count >= width + self.half)
    }

    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        if self.trans {
            self.spatial_major::<L>()
        } else {
            self.channel_major::<L>()
        }
    }

    unsafe fn scalar(&self) {
        let (half, count, size) = (self.half, self.count, self.size);
        let [k0, k1, k2] = self.k;
        // (channel stride, position stride)
        let (cs, ps) = if self.trans { (1, count) } else { (size, 1) };
        let sq = |c: usize, p: usize| {
            let x = *self.src.add(c * cs + p * ps);
            x * x
        };
        for p in 0..size {
            let mut sum: f32 = (0..half.min(count)).map(|c| sq(c, p)).sum();
            for c in 0..count {
                if c + half < count {
                    sum += sq(c + half, p);
                }
                if c > half {
                    sum -= sq(c - half - 1, p);
                }
                let x = *self.src.add(c * cs + p * ps);
                *self.dst.add(c * cs + p * ps) = x * (k0 + k1 * sum).powf(k2);
            }
        }
    }
}

raw_entry! {
    /// Cross-channel LRN over `count` channels of `size` positions.
    ///
    /// `trans` selects the spatial-major layout (channels of a position
    /// contiguous).
    ///
    /// # Safety
    /// - `src` and `dst` point to `count * size` floats and do not overlap
    pub unsafe fn lrn_cross_channels(
        src: *const f32,
        half: usize,
        count: usize,
        size: usize,
        k: [f32; 3],
        dst: *mut f32,
        trans: bool,
    ) => Lrn { src, half, count, size, k, dst, trans }
}
