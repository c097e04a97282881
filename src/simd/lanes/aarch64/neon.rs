//! NEON lanes (W = 4) for ARM64
//!
//! NEON has no masked load/store: masked access goes through a stack buffer.
//! Aligned and unaligned access compile to the same `ld1`/`st1`.

use std::arch::aarch64::*;

use crate::simd::SimdLevel;
use crate::simd::lanes::Lanes;

const LANES: usize = 4;

/// 128-bit NEON register of four f32 lanes
#[derive(Copy, Clone, Debug)]
pub struct Neon;

unsafe impl Lanes for Neon {
    const WIDTH: usize = LANES;
    const LEVEL: SimdLevel = SimdLevel::Neon;
    type V = float32x4_t;

    #[inline(always)]
    unsafe fn zero() -> float32x4_t {
        vdupq_n_f32(0.0)
    }

    #[inline(always)]
    unsafe fn splat(x: f32) -> float32x4_t {
        vdupq_n_f32(x)
    }

    #[inline(always)]
    unsafe fn load(p: *const f32) -> float32x4_t {
        vld1q_f32(p)
    }

    #[inline(always)]
    unsafe fn load_aligned(p: *const f32) -> float32x4_t {
        vld1q_f32(p)
    }

    #[inline(always)]
    unsafe fn store(p: *mut f32, v: float32x4_t) {
        vst1q_f32(p, v)
    }

    #[inline(always)]
    unsafe fn store_aligned(p: *mut f32, v: float32x4_t) {
        vst1q_f32(p, v)
    }

    #[inline(always)]
    unsafe fn load_masked(p: *const f32, lo: usize, hi: usize) -> float32x4_t {
        let mut buf = [0.0f32; LANES];
        for (i, slot) in buf.iter_mut().enumerate().take(hi.min(LANES)).skip(lo) {
            *slot = *p.wrapping_add(i);
        }
        vld1q_f32(buf.as_ptr())
    }

    #[inline(always)]
    unsafe fn store_masked(p: *mut f32, v: float32x4_t, n: usize) {
        let mut buf = [0.0f32; LANES];
        vst1q_f32(buf.as_mut_ptr(), v);
        for (i, &x) in buf.iter().enumerate().take(n.min(LANES)) {
            *p.add(i) = x;
        }
    }

    #[inline(always)]
    unsafe fn add(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        vaddq_f32(a, b)
    }

    #[inline(always)]
    unsafe fn sub(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        vsubq_f32(a, b)
    }

    #[inline(always)]
    unsafe fn mul(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        vmulq_f32(a, b)
    }

    #[inline(always)]
    unsafe fn div(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        vdivq_f32(a, b)
    }

    #[inline(always)]
    unsafe fn fmadd(a: float32x4_t, b: float32x4_t, c: float32x4_t) -> float32x4_t {
        vfmaq_f32(c, a, b)
    }

    #[inline(always)]
    unsafe fn max(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        vmaxq_f32(a, b)
    }

    #[inline(always)]
    unsafe fn min(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        vminq_f32(a, b)
    }

    #[inline(always)]
    unsafe fn abs(a: float32x4_t) -> float32x4_t {
        vabsq_f32(a)
    }

    #[inline(always)]
    unsafe fn select_gt(
        a: float32x4_t,
        b: float32x4_t,
        t: float32x4_t,
        f: float32x4_t,
    ) -> float32x4_t {
        vbslq_f32(vcgtq_f32(a, b), t, f)
    }

    #[inline(always)]
    unsafe fn reduce_sum(v: float32x4_t) -> f32 {
        vaddvq_f32(v)
    }

    #[inline(always)]
    unsafe fn round_exp2(y: float32x4_t) -> (float32x4_t, float32x4_t) {
        let n = vrndnq_f32(y);
        // 2^n = reinterpret((n + 127) << 23)
        let n_i32 = vcvtq_s32_f32(n);
        let exp_bits = vshlq_n_s32::<23>(vaddq_s32(n_i32, vdupq_n_s32(127)));
        (n, vreinterpretq_f32_s32(exp_bits))
    }

    #[inline(always)]
    unsafe fn frexp(x: float32x4_t) -> (float32x4_t, float32x4_t) {
        let bits = vreinterpretq_u32_f32(x);
        let exp = vsubq_s32(
            vreinterpretq_s32_u32(vshrq_n_u32::<23>(bits)),
            vdupq_n_s32(127),
        );
        let m_bits = vorrq_u32(
            vandq_u32(bits, vdupq_n_u32(0x007F_FFFF)),
            vdupq_n_u32(0x3F80_0000),
        );
        (vcvtq_f32_s32(exp), vreinterpretq_f32_u32(m_bits))
    }

    #[inline(always)]
    unsafe fn deinterleave(a: float32x4_t, b: float32x4_t) -> (float32x4_t, float32x4_t) {
        (vuzp1q_f32(a, b), vuzp2q_f32(a, b))
    }

    #[inline(always)]
    unsafe fn interleave(first: float32x4_t, second: float32x4_t) -> (float32x4_t, float32x4_t) {
        (vzip1q_f32(first, second), vzip2q_f32(first, second))
    }
}
