//! Checked slice API
//!
//! Safe wrappers over [`crate::raw`] that validate every buffer length
//! against the shape parameters before running the kernel on the global
//! strategy table. In-place variants are provided for the operations that
//! tolerate `dst` aliasing a source.

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::kernels::{self, EltwiseOp, PoolShape};
use crate::layout::TensorFormat;

/// Product of the shape dimensions, rejecting overflow
fn volume(arg: &'static str, dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| Error::invalid_argument(arg, format!("shape {dims:?} overflows usize")))
}

#[inline]
fn check_len(arg: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::shape_mismatch(arg, expected, got))
    }
}

fn check_format(format: TensorFormat, channels: usize) -> Result<()> {
    if format.holds(channels) {
        Ok(())
    } else {
        Err(Error::InvalidFormat { format, channels })
    }
}

fn opt_ptr(v: Option<&[f32]>) -> *const f32 {
    v.map_or(std::ptr::null(), <[f32]>::as_ptr)
}

// ============================================================================
// Bias, scale, PReLU, clamp
// ============================================================================

/// Add `bias[c]` to every element of channel `c` of `dst`
pub fn add_bias(
    bias: &[f32],
    channels: usize,
    spatial: usize,
    dst: &mut [f32],
    format: TensorFormat,
) -> Result<()> {
    check_format(format, channels)?;
    check_len("bias", channels, bias.len())?;
    check_len("dst", volume("dst", &[channels, spatial])?, dst.len())?;
    unsafe { kernels::add_bias(bias.as_ptr(), channels, spatial, dst.as_mut_ptr(), format) };
    Ok(())
}

/// `dst = src·scale[c] + bias[c]`, no shift when `bias` is `None`
pub fn scale(
    src: &[f32],
    scale: &[f32],
    bias: Option<&[f32]>,
    channels: usize,
    spatial: usize,
    dst: &mut [f32],
    format: TensorFormat,
) -> Result<()> {
    check_format(format, channels)?;
    let len = volume("src", &[channels, spatial])?;
    check_len("src", len, src.len())?;
    check_len("dst", len, dst.len())?;
    check_scale_params(scale, bias, channels)?;
    unsafe {
        kernels::scale(
            src.as_ptr(),
            scale.as_ptr(),
            opt_ptr(bias),
            channels,
            spatial,
            dst.as_mut_ptr(),
            format,
        )
    };
    Ok(())
}

/// [`scale`] applied to `data` in place
pub fn scale_inplace(
    data: &mut [f32],
    scale: &[f32],
    bias: Option<&[f32]>,
    channels: usize,
    spatial: usize,
    format: TensorFormat,
) -> Result<()> {
    check_format(format, channels)?;
    check_len("data", volume("data", &[channels, spatial])?, data.len())?;
    check_scale_params(scale, bias, channels)?;
    let p = data.as_mut_ptr();
    unsafe {
        kernels::scale(p.cast_const(), scale.as_ptr(), opt_ptr(bias), channels, spatial, p, format)
    };
    Ok(())
}

fn check_scale_params(scale: &[f32], bias: Option<&[f32]>, channels: usize) -> Result<()> {
    check_len("scale", channels, scale.len())?;
    if let Some(bias) = bias {
        check_len("bias", channels, bias.len())?;
    }
    Ok(())
}

/// `dst = max(0, src) + slope[c]·min(0, src)`
pub fn prelu(
    src: &[f32],
    slope: &[f32],
    count: usize,
    size: usize,
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    let len = volume("src", &[count, size])?;
    check_len("src", len, src.len())?;
    check_len("dst", len, dst.len())?;
    check_len("slope", count, slope.len())?;
    unsafe { kernels::prelu(src.as_ptr(), slope.as_ptr(), count, size, dst.as_mut_ptr(), trans) };
    Ok(())
}

/// [`prelu`] applied to `data` in place
pub fn prelu_inplace(
    data: &mut [f32],
    slope: &[f32],
    count: usize,
    size: usize,
    trans: bool,
) -> Result<()> {
    check_len("data", volume("data", &[count, size])?, data.len())?;
    check_len("slope", count, slope.len())?;
    let p = data.as_mut_ptr();
    unsafe { kernels::prelu(p.cast_const(), slope.as_ptr(), count, size, p, trans) };
    Ok(())
}

fn check_range(lower: f32, upper: f32) -> Result<()> {
    // also rejects NaN bounds
    if lower <= upper {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            "lower",
            format!("{lower} is not <= upper bound {upper}"),
        ))
    }
}

/// Clamp every element of `src` to `[lower, upper]`
pub fn restrict_range(src: &[f32], lower: f32, upper: f32, dst: &mut [f32]) -> Result<()> {
    check_range(lower, upper)?;
    check_len("dst", src.len(), dst.len())?;
    unsafe { kernels::restrict_range(src.as_ptr(), src.len(), lower, upper, dst.as_mut_ptr()) };
    Ok(())
}

/// [`restrict_range`] applied to `data` in place
pub fn restrict_range_inplace(data: &mut [f32], lower: f32, upper: f32) -> Result<()> {
    check_range(lower, upper)?;
    let p = data.as_mut_ptr();
    unsafe { kernels::restrict_range(p.cast_const(), data.len(), lower, upper, p) };
    Ok(())
}

// ============================================================================
// Eltwise
// ============================================================================

fn check_eltwise(count: usize, weight: Option<&[f32]>, op: EltwiseOp) -> Result<*const f32> {
    if count < 2 {
        return Err(Error::TooFewInputs {
            op: "eltwise",
            min: 2,
            got: count,
        });
    }
    match (op, weight) {
        (EltwiseOp::Sum, None) => Err(Error::invalid_argument(
            "weight",
            "a weighted sum needs one weight per input",
        )),
        (EltwiseOp::Sum, Some(w)) => {
            check_len("weight", count, w.len())?;
            Ok(w.as_ptr())
        }
        _ => Ok(std::ptr::null()),
    }
}

/// Combine `src.len() >= 2` equally sized inputs into `dst`.
///
/// `weight` is required for [`EltwiseOp::Sum`] and ignored otherwise.
pub fn eltwise(
    src: &[&[f32]],
    weight: Option<&[f32]>,
    op: EltwiseOp,
    dst: &mut [f32],
) -> Result<()> {
    let size = dst.len();
    let weight = check_eltwise(src.len(), weight, op)?;
    for s in src {
        check_len("src", size, s.len())?;
    }
    let ptrs: SmallVec<[*const f32; 8]> = src.iter().map(|s| s.as_ptr()).collect();
    unsafe { kernels::eltwise(&ptrs, weight, size, op, dst.as_mut_ptr()) };
    Ok(())
}

/// Combine `acc` with `others` in place; `acc` is the first input
pub fn eltwise_inplace(
    acc: &mut [f32],
    others: &[&[f32]],
    weight: Option<&[f32]>,
    op: EltwiseOp,
) -> Result<()> {
    let size = acc.len();
    let weight = check_eltwise(others.len() + 1, weight, op)?;
    for s in others {
        check_len("src", size, s.len())?;
    }
    let p = acc.as_mut_ptr();
    let mut ptrs: SmallVec<[*const f32; 8]> = SmallVec::with_capacity(others.len() + 1);
    ptrs.push(p.cast_const());
    ptrs.extend(others.iter().map(|s| s.as_ptr()));
    unsafe { kernels::eltwise(&ptrs, weight, size, op, p) };
    Ok(())
}

// ============================================================================
// Fused layer-forward
// ============================================================================

/// Shared checks for the single-source fused variants
fn check_fused(
    src: usize,
    dst: usize,
    dst_factor: usize,
    params: &[(&'static str, usize)],
    count: usize,
    size: usize,
) -> Result<()> {
    let len = volume("src", &[count, size])?;
    check_len("src", len, src)?;
    check_len("dst", volume("dst", &[dst_factor, len])?, dst)?;
    for &(arg, got) in params {
        check_len(arg, count, got)?;
    }
    Ok(())
}

/// Variant 0: `x = src + bias; dst = (x - |x|)·scale + max(0, x)`
pub fn fused_layer_forward0(
    src: &[f32],
    bias: &[f32],
    scale: &[f32],
    count: usize,
    size: usize,
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    check_fused(
        src.len(),
        dst.len(),
        1,
        &[("bias", bias.len()), ("scale", scale.len())],
        count,
        size,
    )?;
    unsafe {
        kernels::fused_layer_forward0(
            src.as_ptr(),
            bias.as_ptr(),
            scale.as_ptr(),
            count,
            size,
            dst.as_mut_ptr(),
            trans,
        )
    };
    Ok(())
}

/// Variant 1: `x = src + bias0; dst = max(0, -x)·scale1 + bias1 + max(0, x)`
#[allow(clippy::too_many_arguments)]
pub fn fused_layer_forward1(
    src: &[f32],
    bias0: &[f32],
    scale1: &[f32],
    bias1: &[f32],
    count: usize,
    size: usize,
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    check_fused(
        src.len(),
        dst.len(),
        1,
        &[
            ("bias0", bias0.len()),
            ("scale1", scale1.len()),
            ("bias1", bias1.len()),
        ],
        count,
        size,
    )?;
    unsafe {
        kernels::fused_layer_forward1(
            src.as_ptr(),
            bias0.as_ptr(),
            scale1.as_ptr(),
            bias1.as_ptr(),
            count,
            size,
            dst.as_mut_ptr(),
            trans,
        )
    };
    Ok(())
}

/// Variant 2: `x = src·scale + bias; dst = max(0, x) + slope·min(0, x)`
#[allow(clippy::too_many_arguments)]
pub fn fused_layer_forward2(
    src: &[f32],
    scale: &[f32],
    bias: &[f32],
    count: usize,
    size: usize,
    slope: f32,
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    check_fused(
        src.len(),
        dst.len(),
        1,
        &[("scale", scale.len()), ("bias", bias.len())],
        count,
        size,
    )?;
    unsafe {
        kernels::fused_layer_forward2(
            src.as_ptr(),
            scale.as_ptr(),
            bias.as_ptr(),
            count,
            size,
            &slope,
            dst.as_mut_ptr(),
            trans,
        )
    };
    Ok(())
}

/// Variant 3: `x = src + bias; dst = max(0, x) + scale·min(0, x)`
pub fn fused_layer_forward3(
    src: &[f32],
    bias: &[f32],
    scale: &[f32],
    count: usize,
    size: usize,
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    check_fused(
        src.len(),
        dst.len(),
        1,
        &[("bias", bias.len()), ("scale", scale.len())],
        count,
        size,
    )?;
    unsafe {
        kernels::fused_layer_forward3(
            src.as_ptr(),
            bias.as_ptr(),
            scale.as_ptr(),
            count,
            size,
            dst.as_mut_ptr(),
            trans,
        )
    };
    Ok(())
}

/// Variant 4: `x = src + bias0`; `dst` receives `max(0, x)` and
/// `max(0, x·scale1 + bias1)`, so it holds `2 * count * size` floats
#[allow(clippy::too_many_arguments)]
pub fn fused_layer_forward4(
    src: &[f32],
    bias0: &[f32],
    scale1: f32,
    bias1: f32,
    count: usize,
    size: usize,
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    check_fused(src.len(), dst.len(), 2, &[("bias0", bias0.len())], count, size)?;
    unsafe {
        kernels::fused_layer_forward4(
            src.as_ptr(),
            bias0.as_ptr(),
            &scale1,
            &bias1,
            count,
            size,
            dst.as_mut_ptr(),
            trans,
        )
    };
    Ok(())
}

/// Variant 8: `dst = src0 + src1·src2[c]`
pub fn fused_layer_forward8(
    src0: &[f32],
    src1: &[f32],
    src2: &[f32],
    count: usize,
    size: usize,
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    check_fused(src0.len(), dst.len(), 1, &[("src2", src2.len())], count, size)?;
    check_len("src1", src0.len(), src1.len())?;
    unsafe {
        kernels::fused_layer_forward8(
            src0.as_ptr(),
            src1.as_ptr(),
            src2.as_ptr(),
            count,
            size,
            dst.as_mut_ptr(),
            trans,
        )
    };
    Ok(())
}

/// Variant 9: `dst0 = max(0, src·scale + bias)` over the concatenation of
/// `src0` (`count0` channels) and `src1` (`count1` channels); `dst1`, when
/// given, receives a copy of the concatenated source
#[allow(clippy::too_many_arguments)]
pub fn fused_layer_forward9(
    src0: &[f32],
    src1: &[f32],
    scale: &[f32],
    bias: &[f32],
    count0: usize,
    count1: usize,
    size: usize,
    dst0: &mut [f32],
    dst1: Option<&mut [f32]>,
    trans: bool,
) -> Result<()> {
    let count = count0
        .checked_add(count1)
        .ok_or_else(|| Error::invalid_argument("count1", "channel count overflows usize"))?;
    check_len("src0", volume("src0", &[count0, size])?, src0.len())?;
    check_len("src1", volume("src1", &[count1, size])?, src1.len())?;
    check_len("scale", count, scale.len())?;
    check_len("bias", count, bias.len())?;
    let len = volume("dst0", &[count, size])?;
    check_len("dst0", len, dst0.len())?;
    let dst1 = match dst1 {
        Some(d) => {
            check_len("dst1", len, d.len())?;
            d.as_mut_ptr()
        }
        None => std::ptr::null_mut(),
    };
    unsafe {
        kernels::fused_layer_forward9(
            src0.as_ptr(),
            src1.as_ptr(),
            scale.as_ptr(),
            bias.as_ptr(),
            count0,
            count1,
            size,
            dst0.as_mut_ptr(),
            dst1,
            trans,
        )
    };
    Ok(())
}

// ============================================================================
// LRN, pooling, softmax, inner product
// ============================================================================

/// Cross-channel LRN with window `2·half + 1`:
/// `dst = src·(k[0] + k[1]·Σ src²)^k[2]`
pub fn lrn_cross_channels(
    src: &[f32],
    half: usize,
    count: usize,
    size: usize,
    k: [f32; 3],
    dst: &mut [f32],
    trans: bool,
) -> Result<()> {
    let len = volume("src", &[count, size])?;
    check_len("src", len, src.len())?;
    check_len("dst", len, dst.len())?;
    unsafe {
        kernels::lrn_cross_channels(src.as_ptr(), half, count, size, k, dst.as_mut_ptr(), trans)
    };
    Ok(())
}

/// Max pooling of `shape.channels` planes (`trans`: HWC storage)
pub fn max_pooling(src: &[f32], shape: PoolShape, dst: &mut [f32], trans: bool) -> Result<()> {
    if shape.kernel_y == 0 || shape.kernel_x == 0 {
        return Err(Error::invalid_argument("kernel", "window must not be empty"));
    }
    if shape.stride_y == 0 || shape.stride_x == 0 {
        return Err(Error::invalid_argument("stride", "must be positive"));
    }
    let s = &shape;
    check_len("src", volume("src", &[s.channels, s.src_h, s.src_w])?, src.len())?;
    check_len("dst", volume("dst", &[s.channels, s.dst_h, s.dst_w])?, dst.len())?;
    unsafe { kernels::max_pooling(src.as_ptr(), shape, dst.as_mut_ptr(), trans) };
    Ok(())
}

/// Softmax along `count` of an `[outer, count, inner]` tensor
pub fn softmax(
    src: &[f32],
    outer: usize,
    count: usize,
    inner: usize,
    dst: &mut [f32],
) -> Result<()> {
    let len = volume("src", &[outer, count, inner])?;
    check_len("src", len, src.len())?;
    check_len("dst", len, dst.len())?;
    unsafe { kernels::softmax(src.as_ptr(), outer, count, inner, dst.as_mut_ptr()) };
    Ok(())
}

/// [`softmax`] applied to `data` in place
pub fn softmax_inplace(data: &mut [f32], outer: usize, count: usize, inner: usize) -> Result<()> {
    check_len("data", volume("data", &[outer, count, inner])?, data.len())?;
    let p = data.as_mut_ptr();
    unsafe { kernels::softmax(p.cast_const(), outer, count, inner, p) };
    Ok(())
}

/// `dst[i] = src · weight[i·size..][..size] + bias[i]`, `size = src.len()`
pub fn inner_product(
    src: &[f32],
    weight: &[f32],
    bias: Option<&[f32]>,
    dst: &mut [f32],
) -> Result<()> {
    let (count, size) = (dst.len(), src.len());
    check_len("weight", volume("weight", &[count, size])?, weight.len())?;
    if let Some(bias) = bias {
        check_len("bias", count, bias.len())?;
    }
    unsafe {
        kernels::inner_product(
            src.as_ptr(),
            weight.as_ptr(),
            opt_ptr(bias),
            count,
            size,
            dst.as_mut_ptr(),
        )
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_empty_axis() {
        softmax(&[], 1, 0, 1 << 22, &mut []).unwrap();
        softmax_inplace(&mut [], 3, 0, 1 << 20).unwrap();
    }

    #[test]
    fn test_length_validation() {
        let mut dst = [0.0f32; 5];
        let err = add_bias(&[1.0, 2.0], 2, 3, &mut dst, TensorFormat::ChannelMajor).unwrap_err();
        assert_eq!(err, Error::shape_mismatch("dst", 6, 5));

        let err = prelu(&[0.0; 6], &[1.0], 2, 3, &mut [0.0; 6], false).unwrap_err();
        assert_eq!(err, Error::shape_mismatch("slope", 2, 1));

        let err = inner_product(&[1.0, 2.0], &[1.0; 5], None, &mut [0.0; 3]).unwrap_err();
        assert_eq!(err, Error::shape_mismatch("weight", 6, 5));
    }

    #[test]
    fn test_packed_format_rejects_partial_pack() {
        let mut dst = [0.0f32; 12];
        let err = add_bias(&[0.0; 6], 6, 2, &mut dst, TensorFormat::ChannelPacked4).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidFormat {
                format: TensorFormat::ChannelPacked4,
                channels: 6
            }
        );
    }

    #[test]
    fn test_restrict_range_rejects_inverted_bounds() {
        let mut dst = [0.0f32; 2];
        assert!(matches!(
            restrict_range(&[1.0, 2.0], 3.0, 1.0, &mut dst),
            Err(Error::InvalidArgument { arg: "lower", .. })
        ));
        assert!(restrict_range(&[1.0, 2.0], f32::NAN, 1.0, &mut dst).is_err());
    }

    #[test]
    fn test_eltwise_argument_checks() {
        let (a, b): (&[f32], &[f32]) = (&[1.0, 2.0], &[3.0, 4.0]);
        let mut dst = [0.0f32; 2];
        assert_eq!(
            eltwise(&[a], None, EltwiseOp::Max, &mut dst).unwrap_err(),
            Error::TooFewInputs {
                op: "eltwise",
                min: 2,
                got: 1
            }
        );
        assert!(matches!(
            eltwise(&[a, b], None, EltwiseOp::Sum, &mut dst),
            Err(Error::InvalidArgument { arg: "weight", .. })
        ));
        eltwise(&[a, b], Some(&[1.0, -1.0][..]), EltwiseOp::Sum, &mut dst).unwrap();
        assert_eq!(dst, [-2.0, -2.0]);
    }

    #[test]
    fn test_overflowing_shape() {
        let err = softmax(&[], usize::MAX, 2, 1, &mut []).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "src", .. }));
    }

    #[test]
    fn test_pooling_rejects_zero_stride() {
        let mut shape = PoolShape::square(1, 4, 4, 2, 2, 0);
        shape.stride_x = 0;
        let err = max_pooling(&[0.0; 16], shape, &mut [0.0; 4], false).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "stride", .. }));
    }
}
