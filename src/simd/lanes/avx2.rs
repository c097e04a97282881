//! AVX2 + FMA lanes (W = 8)
//!
//! Masked access uses `vmaskmovps`, which suppresses faults on inactive
//! lanes.

use std::arch::x86_64::*;

use super::Lanes;
use crate::simd::SimdLevel;

const LANES: usize = 8;

/// 256-bit AVX2 register of eight f32 lanes
#[derive(Copy, Clone, Debug)]
pub struct Avx2;

/// Lane mask with lanes `[lo, hi)` set
#[inline(always)]
unsafe fn lane_mask(lo: usize, hi: usize) -> __m256i {
    let idx = _mm256_setr_epi32(0, 1, 2, 3, 4, 5, 6, 7);
    let above_lo = _mm256_cmpgt_epi32(idx, _mm256_set1_epi32(lo as i32 - 1));
    let below_hi = _mm256_cmpgt_epi32(_mm256_set1_epi32(hi as i32), idx);
    _mm256_and_si256(above_lo, below_hi)
}

unsafe impl Lanes for Avx2 {
    const WIDTH: usize = LANES;
    const LEVEL: SimdLevel = SimdLevel::Avx2Fma;
    type V = __m256;

    #[inline(always)]
    unsafe fn zero() -> __m256 {
        _mm256_setzero_ps()
    }

    #[inline(always)]
    unsafe fn splat(x: f32) -> __m256 {
        _mm256_set1_ps(x)
    }

    #[inline(always)]
    unsafe fn load(p: *const f32) -> __m256 {
        _mm256_loadu_ps(p)
    }

    #[inline(always)]
    unsafe fn load_aligned(p: *const f32) -> __m256 {
        _mm256_load_ps(p)
    }

    #[inline(always)]
    unsafe fn store(p: *mut f32, v: __m256) {
        _mm256_storeu_ps(p, v)
    }

    #[inline(always)]
    unsafe fn store_aligned(p: *mut f32, v: __m256) {
        _mm256_store_ps(p, v)
    }

    #[inline(always)]
    unsafe fn load_masked(p: *const f32, lo: usize, hi: usize) -> __m256 {
        _mm256_maskload_ps(p, lane_mask(lo, hi))
    }

    #[inline(always)]
    unsafe fn store_masked(p: *mut f32, v: __m256, n: usize) {
        _mm256_maskstore_ps(p, lane_mask(0, n), v)
    }

    #[inline(always)]
    unsafe fn add(a: __m256, b: __m256) -> __m256 {
        _mm256_add_ps(a, b)
    }

    #[inline(always)]
    unsafe fn sub(a: __m256, b: __m256) -> __m256 {
        _mm256_sub_ps(a, b)
    }

    #[inline(always)]
    unsafe fn mul(a: __m256, b: __m256) -> __m256 {
        _mm256_mul_ps(a, b)
    }

    #[inline(always)]
    unsafe fn div(a: __m256, b: __m256) -> __m256 {
        _mm256_div_ps(a, b)
    }

    #[inline(always)]
    unsafe fn fmadd(a: __m256, b: __m256, c: __m256) -> __m256 {
        _mm256_fmadd_ps(a, b, c)
    }

    #[inline(always)]
    unsafe fn max(a: __m256, b: __m256) -> __m256 {
        _mm256_max_ps(a, b)
    }

    #[inline(always)]
    unsafe fn min(a: __m256, b: __m256) -> __m256 {
        _mm256_min_ps(a, b)
    }

    #[inline(always)]
    unsafe fn abs(a: __m256) -> __m256 {
        _mm256_andnot_ps(_mm256_set1_ps(-0.0), a)
    }

    #[inline(always)]
    unsafe fn select_gt(a: __m256, b: __m256, t: __m256, f: __m256) -> __m256 {
        _mm256_blendv_ps(f, t, _mm256_cmp_ps::<_CMP_GT_OQ>(a, b))
    }

    #[inline(always)]
    unsafe fn reduce_sum(v: __m256) -> f32 {
        let lo = _mm256_castps256_ps128(v);
        let hi = _mm256_extractf128_ps::<1>(v);
        let v = _mm_add_ps(lo, hi);
        let hi = _mm_movehl_ps(v, v);
        let sums = _mm_add_ps(v, hi);
        let shuf = _mm_shuffle_ps::<0b01>(sums, sums);
        _mm_cvtss_f32(_mm_add_ss(sums, shuf))
    }

    #[inline(always)]
    unsafe fn round_exp2(y: __m256) -> (__m256, __m256) {
        let n = _mm256_round_ps::<{ _MM_FROUND_TO_NEAREST_INT | _MM_FROUND_NO_EXC }>(y);
        // 2^n = reinterpret((n + 127) << 23)
        let n_i32 = _mm256_cvtps_epi32(n);
        let exp_bits = _mm256_slli_epi32::<23>(_mm256_add_epi32(n_i32, _mm256_set1_epi32(127)));
        (n, _mm256_castsi256_ps(exp_bits))
    }

    #[inline(always)]
    unsafe fn frexp(x: __m256) -> (__m256, __m256) {
        let bits = _mm256_castps_si256(x);
        let exp = _mm256_sub_epi32(_mm256_srli_epi32::<23>(bits), _mm256_set1_epi32(127));
        let m_bits = _mm256_or_si256(
            _mm256_and_si256(bits, _mm256_set1_epi32(0x007F_FFFF)),
            _mm256_set1_epi32(0x3F80_0000),
        );
        (_mm256_cvtepi32_ps(exp), _mm256_castsi256_ps(m_bits))
    }

    #[inline(always)]
    unsafe fn deinterleave(a: __m256, b: __m256) -> (__m256, __m256) {
        // In-lane shuffles leave 64-bit groups ordered [a0 b0 a1 b1]; 0xD8
        // restores pair order.
        let first = _mm256_shuffle_ps::<0x88>(a, b);
        let second = _mm256_shuffle_ps::<0xDD>(a, b);
        (
            _mm256_castpd_ps(_mm256_permute4x64_pd::<0xD8>(_mm256_castps_pd(first))),
            _mm256_castpd_ps(_mm256_permute4x64_pd::<0xD8>(_mm256_castps_pd(second))),
        )
    }

    #[inline(always)]
    unsafe fn interleave(first: __m256, second: __m256) -> (__m256, __m256) {
        let lo = _mm256_unpacklo_ps(first, second);
        let hi = _mm256_unpackhi_ps(first, second);
        (
            _mm256_permute2f128_ps::<0x20>(lo, hi),
            _mm256_permute2f128_ps::<0x31>(lo, hi),
        )
    }
}
