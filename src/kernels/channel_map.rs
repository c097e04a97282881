//! Shared sweep for elementwise kernels with per-channel parameters
//!
//! Channel-major rows broadcast one parameter value per row; spatial-major
//! rows load the parameter vectors chunk by chunk alongside the data.

use smallvec::SmallVec;

use crate::layout::Traversal;
use crate::simd::lanes::{Access, Lanes, Segment};

/// `dst = f(src, params)` over a `[channels, spatial]` tensor with `P`
/// per-channel parameter vectors
///
/// `dst` may alias `src`: every chunk is loaded before it is stored.
pub(crate) struct ChannelMap<const P: usize> {
    pub src: *const f32,
    pub params: [*const f32; P],
    pub channels: usize,
    pub spatial: usize,
    pub dst: *mut f32,
    pub order: Traversal,
}

impl<const P: usize> ChannelMap<P> {
    #[inline(always)]
    pub unsafe fn vector<L: Lanes>(&self, f: impl Fn(L::V, [L::V; P]) -> L::V) {
        match self.order {
            Traversal::SpatialMajor => {
                let mut bases: SmallVec<[*const f32; 6]> = SmallVec::from_slice(&self.params);
                bases.push(self.src);
                bases.push(self.dst.cast_const());
                let access = Access::probe::<L>(&bases, &[self.channels]);
                let seg = Segment::new(self.channels, L::WIDTH);
                for s in 0..self.spatial {
                    let src = self.src.add(s * self.channels);
                    let dst = self.dst.add(s * self.channels);
                    seg.for_each::<L>(access, |c| {
                        let params = std::array::from_fn(|i| c.load::<L>(self.params[i]));
                        c.store::<L>(dst, f(c.load::<L>(src), params));
                    });
                }
            }
            _ => {
                let access =
                    Access::probe::<L>(&[self.src, self.dst.cast_const()], &[self.spatial]);
                let seg = Segment::new(self.spatial, L::WIDTH);
                for ch in 0..self.channels {
                    let params = std::array::from_fn(|i| L::splat(*self.params[i].add(ch)));
                    let src = self.src.add(ch * self.spatial);
                    let dst = self.dst.add(ch * self.spatial);
                    seg.for_each::<L>(access, |c| {
                        c.store::<L>(dst, f(c.load::<L>(src), params));
                    });
                }
            }
        }
    }

    pub unsafe fn scalar(&self, f: impl Fn(f32, [f32; P]) -> f32) {
        match self.order {
            Traversal::SpatialMajor => {
                for s in 0..self.spatial {
                    for ch in 0..self.channels {
                        let i = s * self.channels + ch;
                        let params = std::array::from_fn(|k| *self.params[k].add(ch));
                        *self.dst.add(i) = f(*self.src.add(i), params);
                    }
                }
            }
            _ => {
                for ch in 0..self.channels {
                    let params = std::array::from_fn(|k| *self.params[k].add(ch));
                    for s in 0..self.spatial {
                        let i = ch * self.spatial + s;
                        *self.dst.add(i) = f(*self.src.add(i), params);
                    }
                }
            }
        }
    }
}
