//! Width-generic vector register abstraction
//!
//! Every kernel in this crate is written once against [`Lanes`] and
//! instantiated per instruction set by the dispatcher. A `Lanes` type is a
//! zero-sized marker; the register itself is the associated type `V`.
//!
//! All methods are `unsafe` and `#[inline(always)]`: they are only sound to
//! call from code compiled with (or running on a CPU that has) the matching
//! target features, which the trampolines in [`super::dispatch`] guarantee.

pub mod math;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
mod avx512;
#[cfg(target_arch = "x86_64")]
mod sse;

#[cfg(target_arch = "aarch64")]
mod aarch64;

#[cfg(target_arch = "x86_64")]
pub use avx2::Avx2;
#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
pub use avx512::Avx512;
#[cfg(target_arch = "x86_64")]
pub use sse::Sse;

#[cfg(target_arch = "aarch64")]
pub use aarch64::Neon;

use super::SimdLevel;

/// A vector register of `WIDTH` f32 lanes
///
/// # Safety
///
/// Implementors promise that every method is correct for the documented
/// lane semantics when the CPU supports `LEVEL`.
pub unsafe trait Lanes: Copy + 'static {
    /// Number of f32 lanes
    const WIDTH: usize;
    /// Capability level this register type requires
    const LEVEL: SimdLevel;

    /// Register type
    type V: Copy;

    /// All lanes zero
    unsafe fn zero() -> Self::V;
    /// All lanes set to `x`
    unsafe fn splat(x: f32) -> Self::V;

    /// Load `WIDTH` floats from any address
    unsafe fn load(p: *const f32) -> Self::V;
    /// Load `WIDTH` floats from a `WIDTH * 4`-byte aligned address
    unsafe fn load_aligned(p: *const f32) -> Self::V;
    /// Store `WIDTH` floats to any address
    unsafe fn store(p: *mut f32, v: Self::V);
    /// Store `WIDTH` floats to a `WIDTH * 4`-byte aligned address
    unsafe fn store_aligned(p: *mut f32, v: Self::V);

    /// Load lanes `[lo, hi)` from `p`, zeroing the rest.
    ///
    /// Memory outside `p[lo..hi]` is never read, so `p` itself may point
    /// before the start of the buffer when `lo > 0`.
    unsafe fn load_masked(p: *const f32, lo: usize, hi: usize) -> Self::V;
    /// Store lanes `[0, n)` of `v` to `p`; memory past `p[n - 1]` is untouched.
    unsafe fn store_masked(p: *mut f32, v: Self::V, n: usize);

    /// Lane-wise `a + b`
    unsafe fn add(a: Self::V, b: Self::V) -> Self::V;
    /// Lane-wise `a - b`
    unsafe fn sub(a: Self::V, b: Self::V) -> Self::V;
    /// Lane-wise `a * b`
    unsafe fn mul(a: Self::V, b: Self::V) -> Self::V;
    /// Lane-wise `a / b`
    unsafe fn div(a: Self::V, b: Self::V) -> Self::V;
    /// Lane-wise `a * b + c`, single rounded where the ISA has FMA
    unsafe fn fmadd(a: Self::V, b: Self::V, c: Self::V) -> Self::V;
    /// Lane-wise maximum
    unsafe fn max(a: Self::V, b: Self::V) -> Self::V;
    /// Lane-wise minimum
    unsafe fn min(a: Self::V, b: Self::V) -> Self::V;
    /// Lane-wise absolute value (sign bit cleared)
    unsafe fn abs(a: Self::V) -> Self::V;
    /// Lanes where `a > b` take `t`, the rest take `f`
    unsafe fn select_gt(a: Self::V, b: Self::V, t: Self::V, f: Self::V) -> Self::V;

    /// Horizontal sum of all lanes
    unsafe fn reduce_sum(v: Self::V) -> f32;

    /// Round every lane to the nearest integer `n` and return `(n, 2^n)`.
    ///
    /// Callers keep `n` within `[-127, 127]`; `n = -127` yields zero.
    unsafe fn round_exp2(y: Self::V) -> (Self::V, Self::V);
    /// Split positive normal floats into `(exponent, mantissa)` with the
    /// mantissa in `[1, 2)`.
    unsafe fn frexp(x: Self::V) -> (Self::V, Self::V);

    /// Split the `WIDTH` interleaved pairs held in `a` (pairs `0..W/2`) and
    /// `b` (the rest) into their first and second members, in pair order.
    unsafe fn deinterleave(a: Self::V, b: Self::V) -> (Self::V, Self::V);
    /// Inverse of [`Lanes::deinterleave`].
    unsafe fn interleave(first: Self::V, second: Self::V) -> (Self::V, Self::V);

    /// Returns true if `p` satisfies the aligned load/store requirement
    #[inline(always)]
    fn is_aligned(p: *const f32) -> bool {
        (p as usize) % (Self::WIDTH * std::mem::size_of::<f32>()) == 0
    }
}

/// How full-width chunks touch memory for one kernel call
///
/// Chosen once per call by [`Access::probe`]; masked chunks ignore it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    /// Every full chunk starts at a `W * 4`-byte boundary
    Aligned,
    /// No alignment guarantee
    Unaligned,
}

impl Access {
    /// Aligned if every base address is aligned for `L` and every row
    /// stride (in floats) is a multiple of `L::WIDTH`.
    #[inline]
    pub fn probe<L: Lanes>(bases: &[*const f32], strides: &[usize]) -> Self {
        let aligned = bases.iter().all(|&p| L::is_aligned(p))
            && strides.iter().all(|&s| s % L::WIDTH == 0);
        if aligned {
            Access::Aligned
        } else {
            Access::Unaligned
        }
    }

    /// Full-width load honoring the access mode
    #[inline(always)]
    pub unsafe fn load<L: Lanes>(self, p: *const f32) -> L::V {
        match self {
            Access::Aligned => {
                debug_assert!(L::is_aligned(p), "misaligned aligned load at {p:p}");
                L::load_aligned(p)
            }
            Access::Unaligned => L::load(p),
        }
    }

    /// Full-width store honoring the access mode
    #[inline(always)]
    pub unsafe fn store<L: Lanes>(self, p: *mut f32, v: L::V) {
        match self {
            Access::Aligned => {
                debug_assert!(L::is_aligned(p), "misaligned aligned store at {p:p}");
                L::store_aligned(p, v)
            }
            Access::Unaligned => L::store(p, v),
        }
    }
}

/// Tail planner: splits a swept length into a 4W-unrolled prefix, single W
/// chunks and a masked remainder.
///
/// `unrolled <= vector <= len` and `len - vector < width` always hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Swept length in floats
    pub len: usize,
    /// Lane width the plan was made for
    pub width: usize,
    /// `floor(len / 4W) * 4W`
    pub unrolled: usize,
    /// `floor(len / W) * W`
    pub vector: usize,
}

impl Segment {
    /// Plan a sweep of `len` floats with `width` lanes
    #[inline]
    pub const fn new(len: usize, width: usize) -> Self {
        Self {
            len,
            width,
            unrolled: align_lo(len, 4 * width),
            vector: align_lo(len, width),
        }
    }

    /// Number of trailing floats handled by the masked chunk
    #[inline]
    pub const fn tail(&self) -> usize {
        self.len - self.vector
    }

    /// Visit the whole length as chunks: four full chunks per step over the
    /// unrolled prefix, single full chunks up to `vector`, then at most one
    /// masked chunk.
    #[inline(always)]
    pub unsafe fn for_each<L: Lanes>(self, access: Access, mut f: impl FnMut(Chunk)) {
        debug_assert_eq!(self.width, L::WIDTH);
        let w = L::WIDTH;
        let mut i = 0;
        while i < self.unrolled {
            f(Chunk::full(i, w, access));
            f(Chunk::full(i + w, w, access));
            f(Chunk::full(i + 2 * w, w, access));
            f(Chunk::full(i + 3 * w, w, access));
            i += 4 * w;
        }
        while i < self.vector {
            f(Chunk::full(i, w, access));
            i += w;
        }
        if i < self.len {
            f(Chunk {
                offset: i,
                lanes: self.len - i,
                access,
            });
        }
    }
}

/// One step of a [`Segment`] sweep: `lanes` floats starting at `offset`
#[derive(Copy, Clone, Debug)]
pub struct Chunk {
    /// Offset in floats from the row start
    pub offset: usize,
    /// Active lanes; equal to the width except for the final masked chunk
    pub lanes: usize,
    access: Access,
}

impl Chunk {
    #[inline(always)]
    const fn full(offset: usize, width: usize, access: Access) -> Self {
        Self {
            offset,
            lanes: width,
            access,
        }
    }

    /// Load this chunk of the row starting at `row`
    #[inline(always)]
    pub unsafe fn load<L: Lanes>(self, row: *const f32) -> L::V {
        let p = row.add(self.offset);
        if self.lanes == L::WIDTH {
            self.access.load::<L>(p)
        } else {
            L::load_masked(p, 0, self.lanes)
        }
    }

    /// Store this chunk of the row starting at `row`
    #[inline(always)]
    pub unsafe fn store<L: Lanes>(self, row: *mut f32, v: L::V) {
        let p = row.add(self.offset);
        if self.lanes == L::WIDTH {
            self.access.store::<L>(p, v)
        } else {
            L::store_masked(p, v, self.lanes)
        }
    }
}

/// Round `n` down to a multiple of `step`
#[inline(always)]
pub const fn align_lo(n: usize, step: usize) -> usize {
    n / step * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_boundaries() {
        for width in [4usize, 8, 16] {
            for len in 0..(5 * width + 3) {
                let seg = Segment::new(len, width);
                assert!(seg.unrolled <= seg.vector && seg.vector <= len);
                assert_eq!(seg.unrolled % (4 * width), 0);
                assert_eq!(seg.vector % width, 0);
                assert!(seg.tail() < width);
                assert_eq!(seg.vector + seg.tail(), len);
            }
        }
    }

    #[test]
    fn test_segment_known_values() {
        let seg = Segment::new(37, 8);
        assert_eq!(seg.unrolled, 32);
        assert_eq!(seg.vector, 32);
        assert_eq!(seg.tail(), 5);

        let seg = Segment::new(15, 4);
        assert_eq!(seg.unrolled, 0);
        assert_eq!(seg.vector, 12);
        assert_eq!(seg.tail(), 3);
    }

    #[test]
    fn test_align_lo() {
        assert_eq!(align_lo(0, 4), 0);
        assert_eq!(align_lo(3, 4), 0);
        assert_eq!(align_lo(4, 4), 4);
        assert_eq!(align_lo(33, 16), 32);
    }
}
