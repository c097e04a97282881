//! Max pooling over `channels` planes
//!
//! The output at `(ph, pw)` is the maximum over the window
//! `[ph·stride_y - pad_y, .. + kernel_y) × [pw·stride_x - pad_x, .. + kernel_x)`
//! clipped to the input. An empty window yields `-f32::MAX`.
//!
//! # Layouts
//!
//! - spatial-major (HWC): channels are swept in batches of 8W, 4W, 2W and W
//!   lanes per window, then one masked batch
//! - channel-major (CHW): dedicated kernels for 3×3/s1/p1 same-size,
//!   2×2/s2/p0 and 3×3/s2/p0; everything else uses the window loop

use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::Lanes;

/// Geometry of a max pooling call
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PoolShape {
    /// Number of channels
    pub channels: usize,
    /// Input height
    pub src_h: usize,
    /// Input width
    pub src_w: usize,
    /// Window height
    pub kernel_y: usize,
    /// Window width
    pub kernel_x: usize,
    /// Vertical stride
    pub stride_y: usize,
    /// Horizontal stride
    pub stride_x: usize,
    /// Rows of implicit padding above the input
    pub pad_y: usize,
    /// Columns of implicit padding left of the input
    pub pad_x: usize,
    /// Output height
    pub dst_h: usize,
    /// Output width
    pub dst_w: usize,
}

impl PoolShape {
    /// Square window, stride and padding with the output size
    /// `(src + 2·pad - kernel) / stride + 1`
    pub fn square(
        channels: usize,
        src_h: usize,
        src_w: usize,
        kernel: usize,
        stride: usize,
        pad: usize,
    ) -> Self {
        let out = |src: usize| (src + 2 * pad).saturating_sub(kernel) / stride.max(1) + 1;
        Self {
            channels,
            src_h,
            src_w,
            kernel_y: kernel,
            kernel_x: kernel,
            stride_y: stride,
            stride_x: stride,
            pad_y: pad,
            pad_x: pad,
            dst_h: out(src_h),
            dst_w: out(src_w),
        }
    }

    /// Number of input floats
    pub const fn src_len(&self) -> usize {
        self.channels * self.src_h * self.src_w
    }

    /// Number of output floats
    pub const fn dst_len(&self) -> usize {
        self.channels * self.dst_h * self.dst_w
    }

    /// Input rows `[begin, end)` covered by output row `ph`
    #[inline]
    pub fn rows(&self, ph: usize) -> (usize, usize) {
        clip(ph, self.stride_y, self.pad_y, self.kernel_y, self.src_h)
    }

    /// Input columns `[begin, end)` covered by output column `pw`
    #[inline]
    pub fn cols(&self, pw: usize) -> (usize, usize) {
        clip(pw, self.stride_x, self.pad_x, self.kernel_x, self.src_w)
    }

    fn is(&self, kernel: usize, stride: usize, pad: usize) -> bool {
        self.kernel_y == kernel
            && self.kernel_x == kernel
            && self.stride_y == stride
            && self.stride_x == stride
            && self.pad_y == pad
            && self.pad_x == pad
    }
}

#[inline]
fn clip(out: usize, stride: usize, pad: usize, kernel: usize, limit: usize) -> (usize, usize) {
    let start = (out * stride) as isize - pad as isize;
    let end = (start + kernel as isize).min(limit as isize);
    let start = start.max(0);
    (start as usize, end.max(start) as usize)
}

struct MaxPooling {
    src: *const f32,
    shape: PoolShape,
    dst: *mut f32,
    trans: bool,
}

/// Max of `B` lane groups across one HWC window
#[inline(always)]
unsafe fn max_hwc<L: Lanes, const B: usize>(
    src: *const f32,
    row_stride: usize,
    pixel_stride: usize,
    kh: usize,
    kw: usize,
    dst: *mut f32,
) {
    let mut acc = [L::splat(-f32::MAX); B];
    for h in 0..kh {
        let row = src.add(h * row_stride);
        for w in 0..kw {
            let p = row.add(w * pixel_stride);
            for (b, a) in acc.iter_mut().enumerate() {
                *a = L::max(*a, L::load(p.add(b * L::WIDTH)));
            }
        }
    }
    for (b, &a) in acc.iter().enumerate() {
        L::store(dst.add(b * L::WIDTH), a);
    }
}

/// Max of the first `lanes < W` channels across one HWC window
#[inline(always)]
unsafe fn max_hwc_masked<L: Lanes>(
    src: *const f32,
    row_stride: usize,
    pixel_stride: usize,
    kh: usize,
    kw: usize,
    dst: *mut f32,
    lanes: usize,
) {
    let mut acc = L::splat(-f32::MAX);
    for h in 0..kh {
        let row = src.add(h * row_stride);
        for w in 0..kw {
            // Inactive lanes load zero and are never stored
            acc = L::max(acc, L::load_masked(row.add(w * pixel_stride), 0, lanes));
        }
    }
    L::store_masked(dst, acc, lanes);
}

/// Scalar max over one window of a single plane (`pixel_stride` apart)
#[inline]
unsafe fn window_max(
    plane: *const f32,
    shape: &PoolShape,
    pixel_stride: usize,
    ph: usize,
    pw: usize,
) -> f32 {
    let (h0, h1) = shape.rows(ph);
    let (w0, w1) = shape.cols(pw);
    let mut max = -f32::MAX;
    for h in h0..h1 {
        for w in w0..w1 {
            max = max.max(*plane.add((h * shape.src_w + w) * pixel_stride));
        }
    }
    max
}

impl MaxPooling {
    #[inline(always)]
    unsafe fn spatial_major<L: Lanes>(&self) {
        let s = &self.shape;
        let c = s.channels;
        let w = L::WIDTH;
        let row_stride = s.src_w * c;
        for ph in 0..s.dst_h {
            let (h0, h1) = s.rows(ph);
            for pw in 0..s.dst_w {
                let (w0, w1) = s.cols(pw);
                let (kh, kw) = (h1 - h0, w1 - w0);
                let dst = self.dst.add((ph * s.dst_w + pw) * c);
                if kh == 0 || kw == 0 {
                    std::slice::from_raw_parts_mut(dst, c).fill(-f32::MAX);
                    continue;
                }
                let src = self.src.add((h0 * s.src_w + w0) * c);

                let mut i = 0;
                while i + 8 * w <= c {
                    max_hwc::<L, 8>(src.add(i), row_stride, c, kh, kw, dst.add(i));
                    i += 8 * w;
                }
                if i + 4 * w <= c {
                    max_hwc::<L, 4>(src.add(i), row_stride, c, kh, kw, dst.add(i));
                    i += 4 * w;
                }
                if i + 2 * w <= c {
                    max_hwc::<L, 2>(src.add(i), row_stride, c, kh, kw, dst.add(i));
                    i += 2 * w;
                }
                if i + w <= c {
                    max_hwc::<L, 1>(src.add(i), row_stride, c, kh, kw, dst.add(i));
                    i += w;
                }
                if i < c {
                    max_hwc_masked::<L>(src.add(i), row_stride, c, kh, kw, dst.add(i), c - i);
                }
            }
        }
    }

    /// 3×3, stride 1, pad 1, same-size output
    #[inline(always)]
    unsafe fn max3x3_s1<L: Lanes>(&self, src: *const f32, dst: *mut f32) {
        let s = &self.shape;
        let (w, width) = (L::WIDTH, s.src_w);
        for y in 0..s.dst_h {
            let (h0, h1) = s.rows(y);
            let out = dst.add(y * s.dst_w);
            let chunk = |x: usize| {
                let mut left = L::splat(-f32::MAX);
                let mut mid = left;
                let mut right = left;
                for h in h0..h1 {
                    let p = src.add(h * width + x);
                    left = L::max(left, L::load(p.sub(1)));
                    mid = L::max(mid, L::load(p));
                    right = L::max(right, L::load(p.add(1)));
                }
                L::store(out.add(x), L::max(L::max(left, mid), right));
            };

            let mut x = 1;
            while x + w < width {
                chunk(x);
                x += w;
            }
            if x < width - 1 {
                if width >= w + 2 {
                    chunk(width - 1 - w);
                } else {
                    for x in x..width - 1 {
                        *out.add(x) = window_max(src, s, 1, y, x);
                    }
                }
            }
            *out = window_max(src, s, 1, y, 0);
            *out.add(width - 1) = window_max(src, s, 1, y, width - 1);
        }
    }

    /// 2×2, stride 2, pad 0
    #[inline(always)]
    unsafe fn max2x2_s2<L: Lanes>(&self, src: *const f32, dst: *mut f32) {
        let s = &self.shape;
        let w = L::WIDTH;
        for y in 0..s.dst_h {
            let (h0, h1) = s.rows(y);
            let out = dst.add(y * s.dst_w);
            let mut x = 0;
            while x + w <= s.dst_w && 2 * (x + w) <= s.src_w {
                let mut lo = L::splat(-f32::MAX);
                let mut hi = lo;
                for h in h0..h1 {
                    let p = src.add(h * s.src_w + 2 * x);
                    lo = L::max(lo, L::load(p));
                    hi = L::max(hi, L::load(p.add(w)));
                }
                let (even, odd) = L::deinterleave(lo, hi);
                L::store(out.add(x), L::max(even, odd));
                x += w;
            }
            for x in x..s.dst_w {
                *out.add(x) = window_max(src, s, 1, y, x);
            }
        }
    }

    /// 3×3, stride 2, pad 0
    #[inline(always)]
    unsafe fn max3x3_s2<L: Lanes>(&self, src: *const f32, dst: *mut f32) {
        let s = &self.shape;
        let w = L::WIDTH;
        for y in 0..s.dst_h {
            let (h0, h1) = s.rows(y);
            let out = dst.add(y * s.dst_w);
            let mut x = 0;
            while x + w <= s.dst_w && 2 * (x + w) + 2 <= s.src_w {
                let mut a = L::splat(-f32::MAX);
                let mut b = a;
                let mut c = a;
                let mut d = a;
                for h in h0..h1 {
                    let p = src.add(h * s.src_w + 2 * x);
                    a = L::max(a, L::load(p));
                    b = L::max(b, L::load(p.add(w)));
                    c = L::max(c, L::load(p.add(2)));
                    d = L::max(d, L::load(p.add(2 + w)));
                }
                // columns 2x and 2x+1, then 2x+2
                let (even, odd) = L::deinterleave(a, b);
                let (next, _) = L::deinterleave(c, d);
                L::store(out.add(x), L::max(L::max(even, odd), next));
                x += w;
            }
            for x in x..s.dst_w {
                *out.add(x) = window_max(src, s, 1, y, x);
            }
        }
    }

    unsafe fn general_plane(&self, src: *const f32, dst: *mut f32) {
        let s = &self.shape;
        for ph in 0..s.dst_h {
            for pw in 0..s.dst_w {
                *dst.add(ph * s.dst_w + pw) = window_max(src, s, 1, ph, pw);
            }
        }
    }
}

impl LaneKernel for MaxPooling {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        if self.trans {
            return self.spatial_major::<L>();
        }
        let s = &self.shape;
        let w = L::WIDTH;
        let same_size = s.src_h == s.dst_h && s.src_w == s.dst_w;
        for c in 0..s.channels {
            let src = self.src.add(c * s.src_h * s.src_w);
            let dst = self.dst.add(c * s.dst_h * s.dst_w);
            if s.is(3, 1, 1) && same_size && s.dst_w > w {
                self.max3x3_s1::<L>(src, dst);
            } else if s.is(2, 2, 0) && s.dst_w >= w {
                self.max2x2_s2::<L>(src, dst);
            } else if s.is(3, 2, 0) && s.dst_w > w {
                self.max3x3_s2::<L>(src, dst);
            } else {
                self.general_plane(src, dst);
            }
        }
    }

    unsafe fn scalar(&self) {
        let s = &self.shape;
        if self.trans {
            let c = s.channels;
            for ph in 0..s.dst_h {
                for pw in 0..s.dst_w {
                    let dst = self.dst.add((ph * s.dst_w + pw) * c);
                    for ch in 0..c {
                        *dst.add(ch) = window_max(self.src.add(ch), s, c, ph, pw);
                    }
                }
            }
        } else {
            for c in 0..s.channels {
                let src = self.src.add(c * s.src_h * s.src_w);
                let dst = self.dst.add(c * s.dst_h * s.dst_w);
                self.general_plane(src, dst);
            }
        }
    }
}

raw_entry! {
    /// Max pooling of `shape.channels` planes.
    ///
    /// `trans` selects HWC storage, otherwise CHW.
    ///
    /// # Safety
    /// - `src` points to `shape.src_len()` floats
    /// - `dst` points to `shape.dst_len()` floats and does not overlap `src`
    pub unsafe fn max_pooling(
        src: *const f32,
        shape: PoolShape,
        dst: *mut f32,
        trans: bool,
    ) => MaxPooling { src, shape, dst, trans }
}
