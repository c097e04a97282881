//! SSE2 lanes (W = 4), the x86-64 baseline
//!
//! SSE2 has no masked load/store and no FMA: masked access goes through a
//! stack buffer and `fmadd` is a separate multiply and add.

use std::arch::x86_64::*;

use super::Lanes;
use crate::simd::SimdLevel;

const LANES: usize = 4;

/// 128-bit SSE2 register of four f32 lanes
#[derive(Copy, Clone, Debug)]
pub struct Sse;

unsafe impl Lanes for Sse {
    const WIDTH: usize = LANES;
    const LEVEL: SimdLevel = SimdLevel::Sse2;
    type V = __m128;

    #[inline(always)]
    unsafe fn zero() -> __m128 {
        _mm_setzero_ps()
    }

    #[inline(always)]
    unsafe fn splat(x: f32) -> __m128 {
        _mm_set1_ps(x)
    }

    #[inline(always)]
    unsafe fn load(p: *const f32) -> __m128 {
        _mm_loadu_ps(p)
    }

    #[inline(always)]
    unsafe fn load_aligned(p: *const f32) -> __m128 {
        _mm_load_ps(p)
    }

    #[inline(always)]
    unsafe fn store(p: *mut f32, v: __m128) {
        _mm_storeu_ps(p, v)
    }

    #[inline(always)]
    unsafe fn store_aligned(p: *mut f32, v: __m128) {
        _mm_store_ps(p, v)
    }

    #[inline(always)]
    unsafe fn load_masked(p: *const f32, lo: usize, hi: usize) -> __m128 {
        let mut buf = [0.0f32; LANES];
        for (i, slot) in buf.iter_mut().enumerate().take(hi.min(LANES)).skip(lo) {
            *slot = *p.wrapping_add(i);
        }
        _mm_loadu_ps(buf.as_ptr())
    }

    #[inline(always)]
    unsafe fn store_masked(p: *mut f32, v: __m128, n: usize) {
        let mut buf = [0.0f32; LANES];
        _mm_storeu_ps(buf.as_mut_ptr(), v);
        for (i, &x) in buf.iter().enumerate().take(n.min(LANES)) {
            *p.add(i) = x;
        }
    }

    #[inline(always)]
    unsafe fn add(a: __m128, b: __m128) -> __m128 {
        _mm_add_ps(a, b)
    }

    #[inline(always)]
    unsafe fn sub(a: __m128, b: __m128) -> __m128 {
        _mm_sub_ps(a, b)
    }

    #[inline(always)]
    unsafe fn mul(a: __m128, b: __m128) -> __m128 {
        _mm_mul_ps(a, b)
    }

    #[inline(always)]
    unsafe fn div(a: __m128, b: __m128) -> __m128 {
        _mm_div_ps(a, b)
    }

    #[inline(always)]
    unsafe fn fmadd(a: __m128, b: __m128, c: __m128) -> __m128 {
        _mm_add_ps(_mm_mul_ps(a, b), c)
    }

    #[inline(always)]
    unsafe fn max(a: __m128, b: __m128) -> __m128 {
        _mm_max_ps(a, b)
    }

    #[inline(always)]
    unsafe fn min(a: __m128, b: __m128) -> __m128 {
        _mm_min_ps(a, b)
    }

    #[inline(always)]
    unsafe fn abs(a: __m128) -> __m128 {
        _mm_andnot_ps(_mm_set1_ps(-0.0), a)
    }

    #[inline(always)]
    unsafe fn select_gt(a: __m128, b: __m128, t: __m128, f: __m128) -> __m128 {
        let mask = _mm_cmpgt_ps(a, b);
        _mm_or_ps(_mm_and_ps(mask, t), _mm_andnot_ps(mask, f))
    }

    #[inline(always)]
    unsafe fn reduce_sum(v: __m128) -> f32 {
        let hi = _mm_movehl_ps(v, v);
        let sums = _mm_add_ps(v, hi);
        let shuf = _mm_shuffle_ps::<0b01>(sums, sums);
        _mm_cvtss_f32(_mm_add_ss(sums, shuf))
    }

    #[inline(always)]
    unsafe fn round_exp2(y: __m128) -> (__m128, __m128) {
        // cvtps rounds to nearest-even under the default MXCSR
        let n_i32 = _mm_cvtps_epi32(y);
        let exp_bits = _mm_slli_epi32::<23>(_mm_add_epi32(n_i32, _mm_set1_epi32(127)));
        (_mm_cvtepi32_ps(n_i32), _mm_castsi128_ps(exp_bits))
    }

    #[inline(always)]
    unsafe fn frexp(x: __m128) -> (__m128, __m128) {
        let bits = _mm_castps_si128(x);
        let exp = _mm_sub_epi32(_mm_srli_epi32::<23>(bits), _mm_set1_epi32(127));
        let m_bits = _mm_or_si128(
            _mm_and_si128(bits, _mm_set1_epi32(0x007F_FFFF)),
            _mm_set1_epi32(0x3F80_0000),
        );
        (_mm_cvtepi32_ps(exp), _mm_castsi128_ps(m_bits))
    }

    #[inline(always)]
    unsafe fn deinterleave(a: __m128, b: __m128) -> (__m128, __m128) {
        (_mm_shuffle_ps::<0x88>(a, b), _mm_shuffle_ps::<0xDD>(a, b))
    }

    #[inline(always)]
    unsafe fn interleave(first: __m128, second: __m128) -> (__m128, __m128) {
        (
            _mm_unpacklo_ps(first, second),
            _mm_unpackhi_ps(first, second),
        )
    }
}
