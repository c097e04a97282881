//! Bias add: `dst[c, s] += bias[c]`
//!
//! # Layouts
//!
//! - channel-major: `bias[c]` broadcast over a row of `spatial` floats
//! - spatial-major: the whole bias vector added to every position row
//! - packed-N: the N bias values of a pack are loaded once and reused for
//!   every position; needs `N % W == 0`, so packed-4 walks down to W = 4

use crate::layout::{TensorFormat, Traversal};
use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::{Access, Lanes, Segment};

struct AddBias {
    bias: *const f32,
    channels: usize,
    spatial: usize,
    dst: *mut f32,
    order: Traversal,
}

impl AddBias {
    fn new(
        bias: *const f32,
        channels: usize,
        spatial: usize,
        dst: *mut f32,
        format: TensorFormat,
    ) -> Self {
        debug_assert!(format.holds(channels), "{channels} channels in {format:?}");
        Self {
            bias,
            channels,
            spatial,
            dst,
            order: Traversal::classify(channels, spatial, format),
        }
    }
}

impl LaneKernel for AddBias {
    fn supports(&self, width: usize) -> bool {
        self.order.fits_width(width)
    }

    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        match self.order {
            Traversal::ChannelMajor => {
                let access = Access::probe::<L>(&[self.dst.cast_const()], &[self.spatial]);
                let seg = Segment::new(self.spatial, L::WIDTH);
                for c in 0..self.channels {
                    let b = L::splat(*self.bias.add(c));
                    let dst = self.dst.add(c * self.spatial);
                    seg.for_each::<L>(access, |k| {
                        k.store::<L>(dst, L::add(k.load::<L>(dst), b));
                    });
                }
            }
            Traversal::SpatialMajor => {
                let access =
                    Access::probe::<L>(&[self.bias, self.dst.cast_const()], &[self.channels]);
                let seg = Segment::new(self.channels, L::WIDTH);
                for s in 0..self.spatial {
                    let dst = self.dst.add(s * self.channels);
                    seg.for_each::<L>(access, |k| {
                        k.store::<L>(dst, L::add(k.load::<L>(dst), k.load::<L>(self.bias)));
                    });
                }
            }
            Traversal::Packed(n) => {
                let access = Access::probe::<L>(&[self.dst.cast_const()], &[n]);
                let vectors = n / L::WIDTH;
                for p in 0..self.channels / n {
                    let mut b = [L::zero(); 4];
                    for (v, slot) in b.iter_mut().enumerate().take(vectors) {
                        *slot = L::load(self.bias.add(p * n + v * L::WIDTH));
                    }
                    let mut dst = self.dst.add(p * n * self.spatial);
                    for _ in 0..self.spatial {
                        for (v, &bv) in b.iter().enumerate().take(vectors) {
                            let d = dst.add(v * L::WIDTH);
                            access.store::<L>(d, L::add(access.load::<L>(d), bv));
                        }
                        dst = dst.add(n);
                    }
                }
            }
        }
    }

    unsafe fn scalar(&self) {
        match self.order {
            Traversal::ChannelMajor => {
                for c in 0..self.channels {
                    let b = *self.bias.add(c);
                    for s in 0..self.spatial {
                        *self.dst.add(c * self.spatial + s) += b;
                    }
                }
            }
            Traversal::SpatialMajor => {
                for s in 0..self.spatial {
                    for c in 0..self.channels {
                        *self.dst.add(s * self.channels + c) += *self.bias.add(c);
                    }
                }
            }
            Traversal::Packed(n) => {
                for c in 0..self.channels {
                    let b = *self.bias.add(c);
                    let (pack, lane) = (c / n, c % n);
                    for s in 0..self.spatial {
                        *self.dst.add((pack * self.spatial + s) * n + lane) += b;
                    }
                }
            }
        }
    }
}

raw_entry! {
    /// Add a per-channel bias to `dst` in place.
    ///
    /// # Safety
    /// - `bias` points to `channels` floats
    /// - `dst` points to `channels * spatial` floats laid out as `format`
    /// - packed formats require `channels` to be a multiple of the pack
    pub unsafe fn add_bias(
        bias: *const f32,
        channels: usize,
        spatial: usize,
        dst: *mut f32,
        format: TensorFormat,
    ) => AddBias::new(bias, channels, spatial, dst, format)
}
