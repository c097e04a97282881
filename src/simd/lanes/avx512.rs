//! AVX-512F lanes (W = 16)
//!
//! Masked access uses `__mmask16` registers directly. Only AVX-512F
//! instructions are used, so no DQ/VL feature checks are needed.

use std::arch::x86_64::*;

use super::Lanes;
use crate::simd::SimdLevel;

const LANES: usize = 16;

/// 512-bit AVX-512 register of sixteen f32 lanes
#[derive(Copy, Clone, Debug)]
pub struct Avx512;

/// Mask with lanes `[lo, hi)` set
#[inline(always)]
fn lane_mask(lo: usize, hi: usize) -> __mmask16 {
    let upto_hi = ((1u32 << hi) - 1) as __mmask16;
    let below_lo = ((1u32 << lo) - 1) as __mmask16;
    upto_hi & !below_lo
}

unsafe impl Lanes for Avx512 {
    const WIDTH: usize = LANES;
    const LEVEL: SimdLevel = SimdLevel::Avx512;
    type V = __m512;

    #[inline(always)]
    unsafe fn zero() -> __m512 {
        _mm512_setzero_ps()
    }

    #[inline(always)]
    unsafe fn splat(x: f32) -> __m512 {
        _mm512_set1_ps(x)
    }

    #[inline(always)]
    unsafe fn load(p: *const f32) -> __m512 {
        _mm512_loadu_ps(p)
    }

    #[inline(always)]
    unsafe fn load_aligned(p: *const f32) -> __m512 {
        _mm512_load_ps(p)
    }

    #[inline(always)]
    unsafe fn store(p: *mut f32, v: __m512) {
        _mm512_storeu_ps(p, v)
    }

    #[inline(always)]
    unsafe fn store_aligned(p: *mut f32, v: __m512) {
        _mm512_store_ps(p, v)
    }

    #[inline(always)]
    unsafe fn load_masked(p: *const f32, lo: usize, hi: usize) -> __m512 {
        _mm512_maskz_loadu_ps(lane_mask(lo, hi), p)
    }

    #[inline(always)]
    unsafe fn store_masked(p: *mut f32, v: __m512, n: usize) {
        _mm512_mask_storeu_ps(p, lane_mask(0, n), v)
    }

    #[inline(always)]
    unsafe fn add(a: __m512, b: __m512) -> __m512 {
        _mm512_add_ps(a, b)
    }

    #[inline(always)]
    unsafe fn sub(a: __m512, b: __m512) -> __m512 {
        _mm512_sub_ps(a, b)
    }

    #[inline(always)]
    unsafe fn mul(a: __m512, b: __m512) -> __m512 {
        _mm512_mul_ps(a, b)
    }

    #[inline(always)]
    unsafe fn div(a: __m512, b: __m512) -> __m512 {
        _mm512_div_ps(a, b)
    }

    #[inline(always)]
    unsafe fn fmadd(a: __m512, b: __m512, c: __m512) -> __m512 {
        _mm512_fmadd_ps(a, b, c)
    }

    #[inline(always)]
    unsafe fn max(a: __m512, b: __m512) -> __m512 {
        _mm512_max_ps(a, b)
    }

    #[inline(always)]
    unsafe fn min(a: __m512, b: __m512) -> __m512 {
        _mm512_min_ps(a, b)
    }

    #[inline(always)]
    unsafe fn abs(a: __m512) -> __m512 {
        _mm512_abs_ps(a)
    }

    #[inline(always)]
    unsafe fn select_gt(a: __m512, b: __m512, t: __m512, f: __m512) -> __m512 {
        _mm512_mask_blend_ps(_mm512_cmp_ps_mask::<_CMP_GT_OQ>(a, b), f, t)
    }

    #[inline(always)]
    unsafe fn reduce_sum(v: __m512) -> f32 {
        _mm512_reduce_add_ps(v)
    }

    #[inline(always)]
    unsafe fn round_exp2(y: __m512) -> (__m512, __m512) {
        let n = _mm512_roundscale_ps::<{ _MM_FROUND_TO_NEAREST_INT | _MM_FROUND_NO_EXC }>(y);
        // 2^n = reinterpret((n + 127) << 23)
        let n_i32 = _mm512_cvtps_epi32(n);
        let exp_bits = _mm512_slli_epi32::<23>(_mm512_add_epi32(n_i32, _mm512_set1_epi32(127)));
        (n, _mm512_castsi512_ps(exp_bits))
    }

    #[inline(always)]
    unsafe fn frexp(x: __m512) -> (__m512, __m512) {
        let bits = _mm512_castps_si512(x);
        let exp = _mm512_sub_epi32(_mm512_srli_epi32::<23>(bits), _mm512_set1_epi32(127));
        let m_bits = _mm512_or_si512(
            _mm512_and_si512(bits, _mm512_set1_epi32(0x007F_FFFF)),
            _mm512_set1_epi32(0x3F80_0000),
        );
        (_mm512_cvtepi32_ps(exp), _mm512_castsi512_ps(m_bits))
    }

    #[inline(always)]
    unsafe fn deinterleave(a: __m512, b: __m512) -> (__m512, __m512) {
        // Index bit 4 selects `b`
        let even = _mm512_setr_epi32(0, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30);
        let odd = _mm512_setr_epi32(1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31);
        (
            _mm512_permutex2var_ps(a, even, b),
            _mm512_permutex2var_ps(a, odd, b),
        )
    }

    #[inline(always)]
    unsafe fn interleave(first: __m512, second: __m512) -> (__m512, __m512) {
        let lo = _mm512_setr_epi32(0, 16, 1, 17, 2, 18, 3, 19, 4, 20, 5, 21, 6, 22, 7, 23);
        let hi = _mm512_setr_epi32(8, 24, 9, 25, 10, 26, 11, 27, 12, 28, 13, 29, 14, 30, 15, 31);
        (
            _mm512_permutex2var_ps(first, lo, second),
            _mm512_permutex2var_ps(first, hi, second),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_mask() {
        assert_eq!(lane_mask(0, 16), 0xFFFF);
        assert_eq!(lane_mask(2, 16), 0xFFFC);
        assert_eq!(lane_mask(1, 16), 0xFFFE);
        assert_eq!(lane_mask(0, 15), 0x7FFF);
        assert_eq!(lane_mask(0, 14), 0x3FFF);
        assert_eq!(lane_mask(0, 0), 0);
    }
}
