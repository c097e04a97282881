//! Fused layer-forward activation blocks
//!
//! Every variant works on `count` channels of `size` positions. The
//! spatial-major order is used when `(trans || size == 1) && count != 1`
//! (variant 9: `trans || size == 1`), otherwise channel-major.
//!
//! | Variant | Result (x = src + bias unless noted) |
//! |---------|--------------------------------------|
//! | 0 | `(x - |x|)·scale + max(0, x)` |
//! | 1 | `max(0, -x)·scale1 + bias1 + max(0, x)` |
//! | 2 | `x = src·scale + bias`; `max(0, x) + min(0, x)·slope[0]` |
//! | 3 | `max(0, x) + scale·min(0, x)` |
//! | 4 | `dst0 = max(0, x)`, `dst1 = max(0, x·scale1[0] + bias1[0])` |
//! | 8 | `src0 + src1·src2` |
//! | 9 | `dst0 = max(0, src·scale + bias)`, optional `dst1 = src` |

use super::channel_map::ChannelMap;
use crate::layout::Traversal;
use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes, Segment};

struct Fused0(ChannelMap<2>);

impl LaneKernel for Fused0 {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let zero = L::zero();
        self.0.vector::<L>(|src, [bias, scale]| {
            let x = L::add(src, bias);
            // x - |x| keeps the negative part twice and zeroes the rest
            L::fmadd(L::sub(x, L::abs(x)), scale, L::max(zero, x))
        });
    }

    unsafe fn scalar(&self) {
        self.0.scalar(|src, [bias, scale]| {
            let x = src + bias;
            (x - x.abs()) * scale + x.max(0.0)
        });
    }
}

struct Fused1(ChannelMap<3>);

impl LaneKernel for Fused1 {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let zero = L::zero();
        self.0.vector::<L>(|src, [bias0, scale1, bias1]| {
            let x = L::add(src, bias0);
            let neg = L::max(zero, L::sub(zero, x));
            L::add(L::fmadd(neg, scale1, bias1), L::max(zero, x))
        });
    }

    unsafe fn scalar(&self) {
        self.0.scalar(|src, [bias0, scale1, bias1]| {
            let x = src + bias0;
            (-x).max(0.0) * scale1 + bias1 + x.max(0.0)
        });
    }
}

struct Fused2 {
    map: ChannelMap<2>,
    slope: f32,
}

impl LaneKernel for Fused2 {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let zero = L::zero();
        let slope = L::splat(self.slope);
        self.map.vector::<L>(|src, [scale, bias]| {
            let x = L::fmadd(src, scale, bias);
            L::fmadd(L::min(zero, x), slope, L::max(zero, x))
        });
    }

    unsafe fn scalar(&self) {
        let slope = self.slope;
        self.map.scalar(|src, [scale, bias]| {
            let x = src * scale + bias;
            x.max(0.0) + x.min(0.0) * slope
        });
    }
}

struct Fused3(ChannelMap<2>);

impl LaneKernel for Fused3 {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let zero = L::zero();
        self.0.vector::<L>(|src, [bias, scale]| {
            let x = L::add(src, bias);
            L::fmadd(scale, L::min(zero, x), L::max(zero, x))
        });
    }

    unsafe fn scalar(&self) {
        self.0.scalar(|src, [bias, scale]| {
            let x = src + bias;
            x.max(0.0) + scale * x.min(0.0)
        });
    }
}

struct Fused4 {
    src: *const f32,
    bias0: *const f32,
    scale1: f32,
    bias1: f32,
    count: usize,
    size: usize,
    dst: *mut f32,
    order: Traversal,
}

impl LaneKernel for Fused4 {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let zero = L::zero();
        let scale1 = L::splat(self.scale1);
        let bias1 = L::splat(self.bias1);
        match self.order {
            Traversal::SpatialMajor => {
                let access = Access::probe::<L>(
                    &[self.src, self.bias0, self.dst.cast_const()],
                    &[self.count],
                );
                let seg = Segment::new(self.count, L::WIDTH);
                for j in 0..self.size {
                    let src = self.src.add(j * self.count);
                    let dst0 = self.dst.add(2 * j * self.count);
                    let dst1 = dst0.add(self.count);
                    seg.for_each::<L>(access, |k| {
                        let x = L::add(k.load::<L>(src), k.load::<L>(self.bias0));
                        k.store::<L>(dst0, L::max(zero, x));
                        k.store::<L>(dst1, L::max(zero, L::fmadd(x, scale1, bias1)));
                    });
                }
            }
            _ => {
                let access =
                    Access::probe::<L>(&[self.src, self.dst.cast_const()], &[self.size]);
                let seg = Segment::new(self.size, L::WIDTH);
                for i in 0..self.count {
                    let bias0 = L::splat(*self.bias0.add(i));
                    let src = self.src.add(i * self.size);
                    let dst0 = self.dst.add(i * self.size);
                    let dst1 = dst0.add(self.count * self.size);
                    seg.for_each::<L>(access, |k| {
                        let x = L::add(k.load::<L>(src), bias0);
                        k.store::<L>(dst0, L::max(zero, x));
                        k.store::<L>(dst1, L::max(zero, L::fmadd(x, scale1, bias1)));
                    });
                }
            }
        }
    }

    unsafe fn scalar(&self) {
        let (count, size) = (self.count, self.size);
        let apply = |x: f32, dst0: *mut f32, dst1: *mut f32| {
            *dst0 = x.max(0.0);
            *dst1 = (x * self.scale1 + self.bias1).max(0.0);
        };
        match self.order {
            Traversal::SpatialMajor => {
                for j in 0..size {
                    for i in 0..count {
                        let x = *self.src.add(j * count + i) + *self.bias0.add(i);
                        let dst0 = self.dst.add(2 * j * count + i);
                        apply(x, dst0, dst0.add(count));
                    }
                }
            }
            _ => {
                for i in 0..count {
                    for j in 0..size {
                        let x = *self.src.add(i * size + j) + *self.bias0.add(i);
                        let dst0 = self.dst.add(i * size + j);
                        apply(x, dst0, dst0.add(count * size));
                    }
                }
            }
        }
    }
}

struct Fused8 {
    src0: *const f32,
    src1: *const f32,
    src2: *const f32,
    count: usize,
    size: usize,
    dst: *mut f32,
    order: Traversal,
}

impl LaneKernel for Fused8 {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        match self.order {
            Traversal::SpatialMajor => {
                let access = Access::probe::<L>(
                    &[self.src0, self.src1, self.src2, self.dst.cast_const()],
                    &[self.count],
                );
                let seg = Segment::new(self.count, L::WIDTH);
                for j in 0..self.size {
                    let offset = j * self.count;
                    let (src0, src1) = (self.src0.add(offset), self.src1.add(offset));
                    let dst = self.dst.add(offset);
                    seg.for_each::<L>(access, |k| {
                        let prod = L::mul(k.load::<L>(src1), k.load::<L>(self.src2));
                        k.store::<L>(dst, L::add(k.load::<L>(src0), prod));
                    });
                }
            }
            _ => {
                let access = Access::probe::<L>(
                    &[self.src0, self.src1, self.dst.cast_const()],
                    &[self.size],
                );
                let seg = Segment::new(self.size, L::WIDTH);
                for i in 0..self.count {
                    let src2 = L::splat(*self.src2.add(i));
                    let offset = i * self.size;
                    let (src0, src1) = (self.src0.add(offset), self.src1.add(offset));
                    let dst = self.dst.add(offset);
                    seg.for_each::<L>(access, |k| {
                        let prod = L::mul(k.load::<L>(src1), src2);
                        k.store::<L>(dst, L::add(k.load::<L>(src0), prod));
                    });
                }
            }
        }
    }

    unsafe fn scalar(&self) {
        for i in 0..self.count {
            for j in 0..self.size {
                let offset = match self.order {
                    Traversal::SpatialMajor => j * self.count + i,
                    _ => i * self.size + j,
                };
                *self.dst.add(offset) =
                    *self.src0.add(offset) + *self.src1.add(offset) * *self.src2.add(i);
            }
        }
    }
}

/// One of the two channel groups of variant 9
#[derive(Copy, Clone)]
struct Group {
    src: *const f32,
    scale: *const f32,
    bias: *const f32,
    count: usize,
}

struct Fused9 {
    groups: [Group; 2],
    size: usize,
    dst0: *mut f32,
    dst1: *mut f32,
    order: Traversal,
}

impl Fused9 {
    fn channels(&self) -> usize {
        self.groups[0].count + self.groups[1].count
    }
}

impl LaneKernel for Fused9 {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let zero = L::zero();
        let copy = !self.dst1.is_null();
        let [g0, g1] = self.groups;
        match self.order {
            Traversal::SpatialMajor => {
                let access = Access::probe::<L>(
                    &[
                        g0.src,
                        g1.src,
                        g0.scale,
                        g0.bias,
                        self.dst0.cast_const(),
                        if copy { self.dst1.cast_const() } else { g0.src },
                    ],
                    &[g0.count, g1.count],
                );
                let channels = self.channels();
                for j in 0..self.size {
                    let mut offset = j * channels;
                    for g in self.groups {
                        let src = g.src.add(j * g.count);
                        let dst0 = self.dst0.add(offset);
                        let dst1 = self.dst1.wrapping_add(offset);
                        Segment::new(g.count, L::WIDTH).for_each::<L>(access, |k| {
                            let s = k.load::<L>(src);
                            let x = L::fmadd(s, k.load::<L>(g.scale), k.load::<L>(g.bias));
                            k.store::<L>(dst0, L::max(zero, x));
                            if copy {
                                k.store::<L>(dst1, s);
                            }
                        });
                        offset += g.count;
                    }
                }
            }
            _ => {
                let access = Access::probe::<L>(
                    &[
                        g0.src,
                        g1.src,
                        self.dst0.cast_const(),
                        if copy { self.dst1.cast_const() } else { g0.src },
                    ],
                    &[self.size],
                );
                let seg = Segment::new(self.size, L::WIDTH);
                let mut row = 0;
                for g in self.groups {
                    for i in 0..g.count {
                        let scale = L::splat(*g.scale.add(i));
                        let bias = L::splat(*g.bias.add(i));
                        let src = g.src.add(i * self.size);
                        let dst0 = self.dst0.add(row * self.size);
                        let dst1 = self.dst1.wrapping_add(row * self.size);
                        seg.for_each::<L>(access, |k| {
                            let s = k.load::<L>(src);
                            k.store::<L>(dst0, L::max(zero, L::fmadd(s, scale, bias)));
                            if copy {
                                k.store::<L>(dst1, s);
                            }
                        });
                        row += 1;
                    }
                }
            }
        }
    }

    unsafe fn scalar(&self) {
        let channels = self.channels();
        let copy = !self.dst1.is_null();
        let mut first = 0;
        for g in self.groups {
            for i in 0..g.count {
                for j in 0..self.size {
                    let (src, dst) = match self.order {
                        Traversal::SpatialMajor => (j * g.count + i, j * channels + first + i),
                        _ => (i * self.size + j, (first + i) * self.size + j),
                    };
                    let s = *g.src.add(src);
                    *self.dst0.add(dst) = (s * *g.scale.add(i) + *g.bias.add(i)).max(0.0);
                    if copy {
                        *self.dst1.add(dst) = s;
                    }
                }
            }
            first += g.count;
        }
    }
}

fn order(trans: bool, count: usize, size: usize) -> Traversal {
    Traversal::from_trans(trans, count, size)
}

raw_entry! {
    /// Variant 0: `x = src + bias; dst = (x - |x|)·scale + max(0, x)`.
    ///
    /// The negative branch is doubled: for `x < 0` the result is
    /// `2·scale·x`, not `scale·x`.
    ///
    /// # Safety
    /// - `src`, `dst` point to `count * size` floats; `dst` may alias `src`
    /// - `bias`, `scale` point to `count` floats
    pub unsafe fn fused_layer_forward0(
        src: *const f32,
        bias: *const f32,
        scale: *const f32,
        count: usize,
        size: usize,
        dst: *mut f32,
        trans: bool,
    ) => Fused0(ChannelMap {
        src,
        params: [bias, scale],
        channels: count,
        spatial: size,
        dst,
        order: order(trans, count, size),
    })
}

raw_entry! {
    /// Variant 1: `x = src + bias0; dst = max(0, -x)·scale1 + bias1 + max(0, x)`.
    ///
    /// # Safety
    /// - `src`, `dst` point to `count * size` floats; `dst` may alias `src`
    /// - `bias0`, `scale1`, `bias1` point to `count` floats
    pub unsafe fn fused_layer_forward1(
        src: *const f32,
        bias0: *const f32,
        scale1: *const f32,
        bias1: *const f32,
        count: usize,
        size: usize,
        dst: *mut f32,
        trans: bool,
    ) => Fused1(ChannelMap {
        src,
        params: [bias0, scale1, bias1],
        channels: count,
        spatial: size,
        dst,
        order: order(trans, count, size),
    })
}

raw_entry! {
    /// Variant 2: `x = src·scale + bias; dst = max(0, x) + min(0, x)·slope[0]`.
    ///
    /// # Safety
    /// - `src`, `dst` point to `count * size` floats; `dst` may alias `src`
    /// - `scale`, `bias` point to `count` floats; `slope` to one float
    pub unsafe fn fused_layer_forward2(
        src: *const f32,
        scale: *const f32,
        bias: *const f32,
        count: usize,
        size: usize,
        slope: *const f32,
        dst: *mut f32,
        trans: bool,
    ) => Fused2 {
        map: ChannelMap {
            src,
            params: [scale, bias],
            channels: count,
            spatial: size,
            dst,
            order: order(trans, count, size),
        },
        slope: *slope,
    }
}

raw_entry! {
    /// Variant 3: `x = src + bias; dst = max(0, x) + scale·min(0, x)`.
    ///
    /// # Safety
    /// - `src`, `dst` point to `count * size` floats; `dst` may alias `src`
    /// - `bias`, `scale` point to `count` floats
    pub unsafe fn fused_layer_forward3(
        src: *const f32,
        bias: *const f32,
        scale: *const f32,
        count: usize,
        size: usize,
        dst: *mut f32,
        trans: bool,
    ) => Fused3(ChannelMap {
        src,
        params: [bias, scale],
        channels: count,
        spatial: size,
        dst,
        order: order(trans, count, size),
    })
}

raw_entry! {
    /// Variant 4: two outputs from `x = src + bias0`.
    ///
    /// `dst` holds `2 * count * size` floats. Spatial-major rows are
    /// `2 * count` wide with `max(0, x)` first and
    /// `max(0, x·scale1[0] + bias1[0])` second; channel-major stores the
    /// second output `count * size` floats after the first.
    ///
    /// # Safety
    /// - `src` points to `count * size` floats, `bias0` to `count` floats
    /// - `scale1`, `bias1` point to one float each
    /// - `dst` points to `2 * count * size` floats and does not overlap `src`
    pub unsafe fn fused_layer_forward4(
        src: *const f32,
        bias0: *const f32,
        scale1: *const f32,
        bias1: *const f32,
        count: usize,
        size: usize,
        dst: *mut f32,
        trans: bool,
    ) => Fused4 {
        src,
        bias0,
        scale1: *scale1,
        bias1: *bias1,
        count,
        size,
        dst,
        order: order(trans, count, size),
    }
}

raw_entry! {
    /// Variant 8: `dst = src0 + src1·src2` with `src2` per channel.
    ///
    /// # Safety
    /// - `src0`, `src1`, `dst` point to `count * size` floats; `dst` may
    ///   alias `src0` or `src1`
    /// - `src2` points to `count` floats
    pub unsafe fn fused_layer_forward8(
        src0: *const f32,
        src1: *const f32,
        src2: *const f32,
        count: usize,
        size: usize,
        dst: *mut f32,
        trans: bool,
    ) => Fused8 {
        src0,
        src1,
        src2,
        count,
        size,
        dst,
        order: order(trans, count, size),
    }
}

raw_entry! {
    /// Variant 9: `dst0 = max(0, src·scale + bias)` over the concatenation
    /// of `src0` (`count0` channels) and `src1` (`count1` channels), with an
    /// optional copy of the concatenated input to `dst1`.
    ///
    /// Spatial-major is used when `trans || size == 1`.
    ///
    /// # Safety
    /// - `src0` points to `count0 * size` floats, `src1` to `count1 * size`
    /// - `scale`, `bias` point to `count0 + count1` floats
    /// - `dst0` and, unless null, `dst1` point to `(count0 + count1) * size`
    ///   floats and do not overlap the sources
    pub unsafe fn fused_layer_forward9(
        src0: *const f32,
        src1: *const f32,
        scale: *const f32,
        bias: *const f32,
        count0: usize,
        count1: usize,
        size: usize,
        dst0: *mut f32,
        dst1: *mut f32,
        trans: bool,
    ) => Fused9 {
        groups: [
            Group {
                src: src0,
                scale,
                bias,
                count: count0,
            },
            Group {
                src: src1,
                scale: scale.wrapping_add(count0),
                bias: bias.wrapping_add(count0),
                count: count1,
            },
        ],
        size,
        dst0,
        dst1,
        order: if trans || size == 1 {
            Traversal::SpatialMajor
        } else {
            Traversal::ChannelMajor
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::dispatch::Dispatch;
    use crate::test_util::*;

    const SHAPES: [(usize, usize); 8] = [
        (1, 1),
        (1, 19),
        (3, 5),
        (7, 1),
        (16, 4),
        (17, 3),
        (33, 2),
        (4, 37),
    ];

    /// Runs `f` once per table and checks it against the scalar reference
    fn check(name: &str, rtol: f32, f: impl Fn(&Dispatch, bool, usize, usize) -> Vec<f32>) {
        for (count, size) in SHAPES {
            for trans in [false, true] {
                let expected = f(&Dispatch::scalar(), trans, count, size);
                for (table_name, table) in tables() {
                    let actual = f(&table, trans, count, size);
                    assert_allclose(
                        &actual,
                        &expected,
                        rtol,
                        1e-5,
                        &format!("{name} {table_name} trans={trans} count={count} size={size}"),
                    );
                }
            }
        }
    }

    #[test]
    fn test_variant0() {
        check("fused0", 1e-5, |table, trans, count, size| {
            let src = random_vec(count * size, 1);
            let bias = random_vec(count, 2);
            let scale = random_vec(count, 3);
            let mut dst = vec![0.0; count * size];
            unsafe {
                fused_layer_forward0_with(
                    table,
                    src.as_ptr(),
                    bias.as_ptr(),
                    scale.as_ptr(),
                    count,
                    size,
                    dst.as_mut_ptr(),
                    trans,
                );
            }
            dst
        });
    }

    #[test]
    fn test_variant0_known_values() {
        // x = -1 -> (-1 - 1)·0.5 + 0 = -1; x = 2 -> 0 + 2 = 2
        let src = [-1.0f32, 2.0];
        let bias = [0.0f32];
        let scale = [0.5f32];
        let mut dst = [0.0f32; 2];
        unsafe {
            fused_layer_forward0(
                src.as_ptr(),
                bias.as_ptr(),
                scale.as_ptr(),
                1,
                2,
                dst.as_mut_ptr(),
                false,
            );
        }
        assert_eq!(dst, [-1.0, 2.0]);
    }

    #[test]
    fn test_variant1() {
        check("fused1", 1e-5, |table, trans, count, size| {
            let src = random_vec(count * size, 4);
            let bias0 = random_vec(count, 5);
            let scale1 = random_vec(count, 6);
            let bias1 = random_vec(count, 7);
            let mut dst = vec![0.0; count * size];
            unsafe {
                fused_layer_forward1_with(
                    table,
                    src.as_ptr(),
                    bias0.as_ptr(),
                    scale1.as_ptr(),
                    bias1.as_ptr(),
                    count,
                    size,
                    dst.as_mut_ptr(),
                    trans,
                );
            }
            dst
        });
    }

    #[test]
    fn test_variant2() {
        check("fused2", 1e-5, |table, trans, count, size| {
            let src = random_vec(count * size, 8);
            let scale = random_vec(count, 9);
            let bias = random_vec(count, 10);
            let slope = [0.25f32];
            let mut dst = vec![0.0; count * size];
            unsafe {
                fused_layer_forward2_with(
                    table,
                    src.as_ptr(),
                    scale.as_ptr(),
                    bias.as_ptr(),
                    count,
                    size,
                    slope.as_ptr(),
                    dst.as_mut_ptr(),
                    trans,
                );
            }
            dst
        });
    }

    #[test]
    fn test_variant3_in_place() {
        check("fused3", 1e-5, |table, trans, count, size| {
            let mut data = random_vec(count * size, 11);
            let bias = random_vec(count, 12);
            let scale = random_vec(count, 13);
            unsafe {
                fused_layer_forward3_with(
                    table,
                    data.as_ptr(),
                    bias.as_ptr(),
                    scale.as_ptr(),
                    count,
                    size,
                    data.as_mut_ptr(),
                    trans,
                );
            }
            data
        });
    }

    #[test]
    fn test_variant4() {
        check("fused4", 1e-5, |table, trans, count, size| {
            let src = random_vec(count * size, 14);
            let bias0 = random_vec(count, 15);
            let scale1 = [-0.5f32];
            let bias1 = [0.3f32];
            let mut dst = vec![f32::NAN; 2 * count * size];
            unsafe {
                fused_layer_forward4_with(
                    table,
                    src.as_ptr(),
                    bias0.as_ptr(),
                    scale1.as_ptr(),
                    bias1.as_ptr(),
                    count,
                    size,
                    dst.as_mut_ptr(),
                    trans,
                );
            }
            dst
        });
    }

    #[test]
    fn test_variant4_layout() {
        // count = 2, size = 1 is spatial-major: [max0(x0), max0(x1), y0, y1]
        let src = [1.0f32, -1.0];
        let bias0 = [0.0f32, 0.0];
        let mut dst = [0.0f32; 4];
        unsafe {
            fused_layer_forward4(
                src.as_ptr(),
                bias0.as_ptr(),
                [-1.0f32].as_ptr(),
                [0.0f32].as_ptr(),
                2,
                1,
                dst.as_mut_ptr(),
                false,
            );
        }
        assert_eq!(dst, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_variant8() {
        check("fused8", 0.0, |table, trans, count, size| {
            let src0 = random_vec(count * size, 16);
            let src1 = random_vec(count * size, 17);
            let src2 = random_vec(count, 18);
            let mut dst = vec![0.0; count * size];
            unsafe {
                fused_layer_forward8_with(
                    table,
                    src0.as_ptr(),
                    src1.as_ptr(),
                    src2.as_ptr(),
                    count,
                    size,
                    dst.as_mut_ptr(),
                    trans,
                );
            }
            dst
        });
    }

    #[test]
    fn test_variant9() {
        for with_copy in [false, true] {
            check("fused9", 1e-5, |table, trans, count, size| {
                let (count0, count1) = (count, count / 2 + 1);
                let channels = count0 + count1;
                let src0 = random_vec(count0 * size, 19);
                let src1 = random_vec(count1 * size, 20);
                let scale = random_vec(channels, 21);
                let bias = random_vec(channels, 22);
                let mut dst0 = vec![0.0; channels * size];
                let mut dst1 = vec![0.0; channels * size];
                let dst1_ptr = if with_copy {
                    dst1.as_mut_ptr()
                } else {
                    std::ptr::null_mut()
                };
                unsafe {
                    fused_layer_forward9_with(
                        table,
                        src0.as_ptr(),
                        src1.as_ptr(),
                        scale.as_ptr(),
                        bias.as_ptr(),
                        count0,
                        count1,
                        size,
                        dst0.as_mut_ptr(),
                        dst1_ptr,
                        trans,
                    );
                }
                dst0.extend_from_slice(&dst1);
                dst0
            });
        }
    }

    #[test]
    fn test_variant9_copy_is_concatenation() {
        let (count0, count1, size) = (3usize, 2usize, 4usize);
        let src0 = random_vec(count0 * size, 23);
        let src1 = random_vec(count1 * size, 24);
        let scale = vec![1.0f32; count0 + count1];
        let bias = vec![0.0f32; count0 + count1];
        let mut dst0 = vec![0.0; (count0 + count1) * size];
        let mut dst1 = vec![0.0; (count0 + count1) * size];
        unsafe {
            fused_layer_forward9(
                src0.as_ptr(),
                src1.as_ptr(),
                scale.as_ptr(),
                bias.as_ptr(),
                count0,
                count1,
                size,
                dst0.as_mut_ptr(),
                dst1.as_mut_ptr(),
                false,
            );
        }
        let concat: Vec<f32> = src0.iter().chain(&src1).copied().collect();
        assert_eq!(dst1, concat);
        let relu: Vec<f32> = concat.iter().map(|x| x.max(0.0)).collect();
        assert_eq!(dst0, relu);
    }
}
