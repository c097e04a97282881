//! Per-channel affine transform: `dst = src·scale[c] (+ bias[c])`
//!
//! The bias is optional. Spatial-major tensors with exactly three channels
//! (interleaved RGB planes) are swept as one flat row with the
//! scale/bias pattern pre-expanded into three vectors, since every `3W`
//! floats repeat the same lane layout.

use super::channel_map::ChannelMap;
use crate::layout::{TensorFormat, Traversal};
use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes};

struct Scale {
    src: *const f32,
    scale: *const f32,
    bias: *const f32,
    channels: usize,
    spatial: usize,
    dst: *mut f32,
    order: Traversal,
}

impl Scale {
    #[inline(always)]
    unsafe fn bias_at(&self, c: usize) -> f32 {
        if self.bias.is_null() {
            0.0
        } else {
            *self.bias.add(c)
        }
    }

    /// `src·scale + bias` with the bias lanes ignored when there is none
    #[inline(always)]
    unsafe fn affine<L: Lanes>(&self, x: L::V, s: L::V, b: L::V) -> L::V {
        if self.bias.is_null() {
            L::mul(x, s)
        } else {
            L::fmadd(x, s, b)
        }
    }

    #[inline(always)]
    unsafe fn channel_map<L: Lanes>(&self) {
        if self.bias.is_null() {
            ChannelMap {
                src: self.src,
                params: [self.scale],
                channels: self.channels,
                spatial: self.spatial,
                dst: self.dst,
                order: self.order,
            }
            .vector::<L>(|x, [s]| L::mul(x, s));
        } else {
            ChannelMap {
                src: self.src,
                params: [self.scale, self.bias],
                channels: self.channels,
                spatial: self.spatial,
                dst: self.dst,
                order: self.order,
            }
            .vector::<L>(|x, [s, b]| L::fmadd(x, s, b));
        }
    }

    #[inline(always)]
    unsafe fn three_channels<L: Lanes>(&self) {
        let w = L::WIDTH;
        let mut s = [0.0f32; 48];
        let mut b = [0.0f32; 48];
        for i in 0..3 * w {
            s[i] = *self.scale.add(i % 3);
            b[i] = self.bias_at(i % 3);
        }
        let sv = [L::load(s.as_ptr()), L::load(s.as_ptr().add(w)), L::load(s.as_ptr().add(2 * w))];
        let bv = [L::load(b.as_ptr()), L::load(b.as_ptr().add(w)), L::load(b.as_ptr().add(2 * w))];

        let len = 3 * self.spatial;
        let access = Access::probe::<L>(&[self.src, self.dst.cast_const()], &[]);
        let mut i = 0;
        while i + 3 * w <= len {
            for k in 0..3 {
                let o = i + k * w;
                let x = access.load::<L>(self.src.add(o));
                access.store::<L>(self.dst.add(o), self.affine::<L>(x, sv[k], bv[k]));
            }
            i += 3 * w;
        }
        for j in i..len {
            let c = j % 3;
            *self.dst.add(j) = *self.src.add(j) * *self.scale.add(c) + self.bias_at(c);
        }
    }

    #[inline(always)]
    unsafe fn packed<L: Lanes>(&self, n: usize) {
        let w = L::WIDTH;
        let vectors = n / w;
        let access = Access::probe::<L>(&[self.src, self.dst.cast_const()], &[n]);
        for p in 0..self.channels / n {
            let mut s = [L::zero(); 4];
            let mut b = [L::zero(); 4];
            for v in 0..vectors {
                s[v] = L::load(self.scale.add(p * n + v * w));
                if !self.bias.is_null() {
                    b[v] = L::load(self.bias.add(p * n + v * w));
                }
            }
            let base = p * n * self.spatial;
            for pos in 0..self.spatial {
                let o = base + pos * n;
                for v in 0..vectors {
                    let x = access.load::<L>(self.src.add(o + v * w));
                    access.store::<L>(self.dst.add(o + v * w), self.affine::<L>(x, s[v], b[v]));
                }
            }
        }
    }
}

impl LaneKernel for Scale {
    fn supports(&self, width: usize) -> bool {
        self.order.fits_width(width)
    }

    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        match self.order {
            Traversal::Packed(n) => self.packed::<L>(n),
            Traversal::SpatialMajor if self.channels == 3 => self.three_channels::<L>(),
            _ => self.channel_map::<L>(),
        }
    }

    unsafe fn scalar(&self) {
        let (channels, spatial) = (self.channels, self.spatial);
        // index of (c, s) in dst
        let at = |c: usize, s: usize| match self.order {
            Traversal::ChannelMajor => c * spatial + s,
            Traversal::SpatialMajor => s * channels + c,
            Traversal::Packed(n) => ((c / n) * spatial + s) * n + c % n,
        };
        for c in 0..channels {
            let (scale, bias) = (*self.scale.add(c), self.bias_at(c));
            for s in 0..spatial {
                let i = at(c, s);
                *self.dst.add(i) = *self.src.add(i) * scale + bias;
            }
        }
    }
}

raw_entry! {
    /// Scale (and optionally shift) every channel of a tensor.
    ///
    /// `bias` may be null.
    ///
    /// # Safety
    /// - `src`, `dst` point to `channels * spatial` floats laid out as
    ///   `format`; `dst` may alias `src`
    /// - `scale` (and a non-null `bias`) point to `channels` floats
    /// - packed formats require `channels` to be a multiple of the pack
    pub unsafe fn scale(
        src: *const f32,
        scale: *const f32,
        bias: *const f32,
        channels: usize,
        spatial: usize,
        dst: *mut f32,
        format: TensorFormat,
    ) => {
        debug_assert!(format.holds(channels), "{channels} channels in {format:?}");
        Scale {
            src,
            scale,
            bias,
            channels,
            spatial,
            dst,
            order: Traversal::classify(channels, spatial, format),
        }
    }
}
