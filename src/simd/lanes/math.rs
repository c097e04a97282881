//! Vector exp / ln / pow written once against [`Lanes`]
//!
//! Accuracy contract: `exp` relative error below 1e-5 on `[-88, 88]`;
//! `ln` absolute error below 1e-6 for positive normal inputs; `pow(x, y)`
//! for `x > 0` inherits both, roughly `|y|` times the `ln` error.

use super::Lanes;

/// Taylor series coefficients for exp(r) where r is in [-ln(2)/2, ln(2)/2]
/// exp(r) ≈ 1 + r + r²/2! + r³/3! + r⁴/4! + r⁵/5! + r⁶/6!
pub mod exp_coefficients {
    /// r⁰ coefficient
    pub const C0: f32 = 1.0;
    /// r¹ coefficient
    pub const C1: f32 = 1.0;
    /// r² coefficient
    pub const C2: f32 = 0.5;
    /// r³ coefficient
    pub const C3: f32 = 1.0 / 6.0;
    /// r⁴ coefficient
    pub const C4: f32 = 1.0 / 24.0;
    /// r⁵ coefficient
    pub const C5: f32 = 1.0 / 120.0;
    /// r⁶ coefficient
    pub const C6: f32 = 1.0 / 720.0;

    /// Input clamp range to avoid overflow/underflow
    pub const MIN: f32 = -88.0;
    /// Upper end of the input clamp range
    pub const MAX: f32 = 88.0;
}

/// atanh series for ln(m) = 2·atanh(s), s = (m - 1) / (m + 1),
/// with m normalized to [sqrt(2)/2, sqrt(2)] so |s| <= 0.1716
pub mod ln_coefficients {
    /// s¹ coefficient
    pub const S1: f32 = 2.0;
    /// s³ coefficient
    pub const S3: f32 = 2.0 / 3.0;
    /// s⁵ coefficient
    pub const S5: f32 = 2.0 / 5.0;
    /// s⁷ coefficient
    pub const S7: f32 = 2.0 / 7.0;
    /// s⁹ coefficient
    pub const S9: f32 = 2.0 / 9.0;
}

/// Vector `e^x`
#[inline(always)]
pub unsafe fn exp<L: Lanes>(x: L::V) -> L::V {
    use exp_coefficients::*;

    // Clamp input to avoid overflow/underflow
    let x = L::min(L::max(x, L::splat(MIN)), L::splat(MAX));

    // x·log2(e) = n + f, f in [-0.5, 0.5]
    let y = L::mul(x, L::splat(std::f32::consts::LOG2_E));
    let (n, pow2n) = L::round_exp2(y);
    let r = L::mul(L::sub(y, n), L::splat(std::f32::consts::LN_2));

    // Horner's method
    let mut poly = L::splat(C6);
    poly = L::fmadd(poly, r, L::splat(C5));
    poly = L::fmadd(poly, r, L::splat(C4));
    poly = L::fmadd(poly, r, L::splat(C3));
    poly = L::fmadd(poly, r, L::splat(C2));
    poly = L::fmadd(poly, r, L::splat(C1));
    poly = L::fmadd(poly, r, L::splat(C0));

    L::mul(pow2n, poly)
}

/// Vector natural logarithm for positive normal inputs
#[inline(always)]
pub unsafe fn ln<L: Lanes>(x: L::V) -> L::V {
    use ln_coefficients::*;

    let one = L::splat(1.0);
    let (e, m) = L::frexp(x);

    // Normalize: if m > sqrt(2), halve it and bump the exponent
    let sqrt2 = L::splat(std::f32::consts::SQRT_2);
    let e = L::select_gt(m, sqrt2, L::add(e, one), e);
    let m = L::select_gt(m, sqrt2, L::mul(m, L::splat(0.5)), m);

    let s = L::div(L::sub(m, one), L::add(m, one));
    let s2 = L::mul(s, s);

    let mut poly = L::splat(S9);
    poly = L::fmadd(poly, s2, L::splat(S7));
    poly = L::fmadd(poly, s2, L::splat(S5));
    poly = L::fmadd(poly, s2, L::splat(S3));
    poly = L::fmadd(poly, s2, L::splat(S1));
    poly = L::mul(poly, s);

    L::fmadd(e, L::splat(std::f32::consts::LN_2), poly)
}

/// Vector `x^y` for `x > 0`
#[inline(always)]
pub unsafe fn pow<L: Lanes>(x: L::V, y: L::V) -> L::V {
    exp::<L>(L::mul(y, ln::<L>(x)))
}
