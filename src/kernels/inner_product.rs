//! Fully connected layer: `dst[i] = Σ_j src[j]·weight[i·size + j] + bias[i]`
//!
//! Rows are processed four at a time so each `src` chunk is loaded once per
//! block; leftover rows run alone with four independent accumulators.

use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes, Segment};

struct InnerProduct {
    src: *const f32,
    weight: *const f32,
    bias: *const f32,
    count: usize,
    size: usize,
    dst: *mut f32,
}

impl InnerProduct {
    #[inline(always)]
    unsafe fn bias_at(&self, i: usize) -> f32 {
        if self.bias.is_null() {
            0.0
        } else {
            *self.bias.add(i)
        }
    }

    #[inline(always)]
    unsafe fn block4<L: Lanes>(&self, access: Access, row: usize) {
        let size = self.size;
        let w0 = self.weight.add(row * size);
        let (w1, w2, w3) = (w0.add(size), w0.add(2 * size), w0.add(3 * size));
        let mut acc = [L::zero(); 4];
        Segment::new(size, L::WIDTH).for_each::<L>(access, |c| {
            let x = c.load::<L>(self.src);
            acc[0] = L::fmadd(x, c.load::<L>(w0), acc[0]);
            acc[1] = L::fmadd(x, c.load::<L>(w1), acc[1]);
            acc[2] = L::fmadd(x, c.load::<L>(w2), acc[2]);
            acc[3] = L::fmadd(x, c.load::<L>(w3), acc[3]);
        });
        for (k, &a) in acc.iter().enumerate() {
            *self.dst.add(row + k) = L::reduce_sum(a) + self.bias_at(row + k);
        }
    }

    #[inline(always)]
    unsafe fn single<L: Lanes>(&self, access: Access, row: usize) {
        let (w, size) = (L::WIDTH, self.size);
        let seg = Segment::new(size, w);
        let weight = self.weight.add(row * size);
        let mut acc = [L::zero(); 4];
        let mut j = 0;
        while j < seg.unrolled {
            for (k, a) in acc.iter_mut().enumerate() {
                let o = j + k * w;
                *a = L::fmadd(
                    access.load::<L>(self.src.add(o)),
                    access.load::<L>(weight.add(o)),
                    *a,
                );
            }
            j += 4 * w;
        }
        while j < seg.vector {
            let x = access.load::<L>(self.src.add(j));
            acc[0] = L::fmadd(x, access.load::<L>(weight.add(j)), acc[0]);
            j += w;
        }
        if j < size {
            let x = L::load_masked(self.src.add(j), 0, size - j);
            acc[0] = L::fmadd(x, L::load_masked(weight.add(j), 0, size - j), acc[0]);
        }
        let total = L::add(L::add(acc[0], acc[1]), L::add(acc[2], acc[3]));
        *self.dst.add(row) = L::reduce_sum(total) + self.bias_at(row);
    }
}

impl LaneKernel for InnerProduct {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let access = Access::probe::<L>(&[self.src, self.weight], &[self.size]);
        let mut row = 0;
        while row + 4 <= self.count {
            self.block4::<L>(access, row);
            row += 4;
        }
        for row in row..self.count {
            self.single::<L>(access, row);
        }
    }

    unsafe fn scalar(&self) {
        let size = self.size;
        let aligned = size / 4 * 4;
        for i in 0..self.count {
            let weight = self.weight.add(i * size);
            let mut sums = [0.0f32; 4];
            for j in (0..aligned).step_by(4) {
                for (k, s) in sums.iter_mut().enumerate() {
                    *s += *self.src.add(j + k) * *weight.add(j + k);
                }
            }
            for j in aligned..size {
                sums[0] += *self.src.add(j) * *weight.add(j);
            }
            *self.dst.add(i) = sums.iter().sum::<f32>() + self.bias_at(i);
        }
    }
}

raw_entry! {
    /// Dot product of `src` with each of `count` weight rows, plus bias.
    ///
    /// `bias` may be null.
    ///
    /// # Safety
    /// - `src` points to `size` floats, `weight` to `count * size` floats
    /// - a non-null `bias` and `dst` point to `count` floats
    pub unsafe fn inner_product(
        src: *const f32,
        weight: *const f32,
        bias: *const f32,
        count: usize,
        size: usize,
        dst: *mut f32,
    ) => InnerProduct { src, weight, bias, count, size, dst }
}
