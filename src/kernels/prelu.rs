//! Parametric ReLU: `dst = max(0, x) + slope[c]·min(0, x)`

use super::channel_map::ChannelMap;
use crate::layout::Traversal;
use crate::simd::dispatch::LaneKernel;
use crate::simd::lanes::Lanes;

struct Prelu(ChannelMap<1>);

impl LaneKernel for Prelu {
    #[inline(always)]
    unsafe fn vector<L: Lanes>(&self) {
        let zero = L::zero();
        self.0.vector::<L>(|x, [slope]| L::fmadd(slope, L::min(zero, x), L::max(zero, x)));
    }

    unsafe fn scalar(&self) {
        self.0.scalar(|x, [slope]| x.max(0.0) + slope * x.min(0.0));
    }
}

raw_entry! {
    /// PReLU over `count` channels of `size` positions.
    ///
    /// `trans` selects the spatial-major layout.
    ///
    /// # Safety
    /// - `src`, `dst` point to `count * size` floats; `dst` may alias `src`
    /// - `slope` points to `count` floats
    pub unsafe fn prelu(
        src: *const f32,
        slope: *const f32,
        count: usize,
        size: usize,
        dst: *mut f32,
        trans: bool,
    ) => Prelu(ChannelMap {
        src,
        params: [slope],
        channels: count,
        spatial: size,
        dst,
        order: Traversal::from_trans(trans, count, size),
    })
}
