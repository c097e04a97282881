//! Tail handling of the raw kernels on every strategy table
//!
//! Each output buffer is framed by canary values; a kernel that writes past
//! either end of its buffer fails the guard check. Sizes cover every
//! remainder of the widest vector.

mod common;

use common::{Guarded, assert_allclose_f32, random_vec, tables};
use nnkern::raw;
use nnkern::{Dispatch, EltwiseOp, PoolShape, TensorFormat};

fn sizes() -> impl Iterator<Item = usize> {
    (0..=35).chain([63, 64, 65, 127, 129])
}

#[test]
fn test_restrict_range_tails() {
    for size in sizes() {
        let src = random_vec(size, size as u64);
        let expected: Vec<f32> = src.iter().map(|x| x.clamp(-1.0, 1.0)).collect();
        for (name, table) in tables() {
            let mut dst = Guarded::zeros(size);
            unsafe {
                raw::restrict_range_with(&table, src.as_ptr(), size, -1.0, 1.0, dst.as_mut_ptr())
            };
            let msg = format!("{name} size={size}");
            dst.check_guards(&msg);
            assert_eq!(dst.as_slice(), expected, "{msg}");
        }
    }
}

#[test]
fn test_eltwise_tails() {
    for size in sizes() {
        let a = random_vec(size, 1);
        let b = random_vec(size, 2);
        let srcs = [a.as_ptr(), b.as_ptr()];
        for op in [EltwiseOp::Max, EltwiseOp::Min, EltwiseOp::Product] {
            for (name, table) in tables() {
                let mut dst = Guarded::zeros(size);
                unsafe {
                    raw::eltwise_with(&table, &srcs, std::ptr::null(), size, op, dst.as_mut_ptr())
                };
                dst.check_guards(&format!("{name} {op:?} size={size}"));
            }
        }
    }
}

#[test]
fn test_bias_and_scale_tails() {
    for format in [TensorFormat::ChannelMajor, TensorFormat::SpatialMajor] {
        for channels in [1usize, 3, 7, 17] {
            for spatial in [1usize, 5, 19] {
                let len = channels * spatial;
                let base = random_vec(len, 3);
                let params = random_vec(channels, 4);
                for (name, table) in tables() {
                    let msg = format!("{name} {format:?} c={channels} s={spatial}");

                    let mut dst = Guarded::new(&base);
                    unsafe {
                        raw::add_bias_with(
                            &table,
                            params.as_ptr(),
                            channels,
                            spatial,
                            dst.as_mut_ptr(),
                            format,
                        )
                    };
                    dst.check_guards(&msg);

                    let mut dst = Guarded::zeros(len);
                    unsafe {
                        raw::scale_with(
                            &table,
                            base.as_ptr(),
                            params.as_ptr(),
                            params.as_ptr(),
                            channels,
                            spatial,
                            dst.as_mut_ptr(),
                            format,
                        )
                    };
                    dst.check_guards(&msg);
                }
            }
        }
    }
}

#[test]
fn test_fused_tails() {
    for trans in [false, true] {
        for (count, size) in [(1usize, 1usize), (3, 5), (17, 3), (5, 33)] {
            let len = count * size;
            let src = random_vec(len, 5);
            let bias = random_vec(count, 6);
            let scale = random_vec(count, 7);
            let (scale1, bias1) = (0.5f32, -0.25f32);
            for (name, table) in tables() {
                let msg = format!("{name} trans={trans} count={count} size={size}");

                let mut dst = Guarded::zeros(len);
                unsafe {
                    raw::fused_layer_forward0_with(
                        &table,
                        src.as_ptr(),
                        bias.as_ptr(),
                        scale.as_ptr(),
                        count,
                        size,
                        dst.as_mut_ptr(),
                        trans,
                    )
                };
                dst.check_guards(&msg);

                let mut dst = Guarded::zeros(2 * len);
                unsafe {
                    raw::fused_layer_forward4_with(
                        &table,
                        src.as_ptr(),
                        bias.as_ptr(),
                        &scale1,
                        &bias1,
                        count,
                        size,
                        dst.as_mut_ptr(),
                        trans,
                    )
                };
                dst.check_guards(&msg);
            }
        }
    }
}

#[test]
fn test_softmax_and_inner_product_tails() {
    for size in [1usize, 2, 7, 16, 17, 33] {
        let src = random_vec(2 * size, 8);
        let weight = random_vec(5 * size, 9);
        for (name, table) in tables() {
            let msg = format!("{name} size={size}");

            let mut dst = Guarded::zeros(2 * size);
            unsafe { raw::softmax_with(&table, src.as_ptr(), size, 2, 1, dst.as_mut_ptr()) };
            dst.check_guards(&msg);

            let mut dst = Guarded::zeros(5);
            unsafe {
                raw::inner_product_with(
                    &table,
                    src.as_ptr(),
                    weight.as_ptr(),
                    std::ptr::null(),
                    5,
                    size,
                    dst.as_mut_ptr(),
                )
            };
            dst.check_guards(&msg);
        }
    }
}

#[test]
fn test_lrn_spatial_major_tails() {
    let k = [1.0f32, 0.1, -0.75];
    for count in [2usize, 5, 6, 7, 9, 10, 11, 17, 18, 19, 20, 33] {
        let size = 3;
        let src = Guarded::new(&random_vec(count * size, count as u64));
        let mut expected = vec![0.0f32; count * size];
        unsafe {
            raw::lrn_cross_channels_with(
                &Dispatch::scalar(),
                src.as_ptr(),
                2,
                count,
                size,
                k,
                expected.as_mut_ptr(),
                true,
            )
        };
        for (name, table) in tables() {
            let mut dst = Guarded::zeros(count * size);
            unsafe {
                raw::lrn_cross_channels_with(
                    &table,
                    src.as_ptr(),
                    2,
                    count,
                    size,
                    k,
                    dst.as_mut_ptr(),
                    true,
                )
            };
            let msg = format!("{name} count={count}");
            dst.check_guards(&msg);
            assert_allclose_f32(dst.as_slice(), &expected, 1e-4, 1e-5, &msg);
        }
    }
}

#[test]
fn test_pooling_tails() {
    for hw in [3usize, 8, 9, 17, 34] {
        for shape in [
            PoolShape::square(2, hw, hw, 3, 1, 1),
            PoolShape::square(2, hw, hw, 2, 2, 0),
            PoolShape::square(2, hw, hw, 3, 2, 0),
        ] {
            let src = random_vec(shape.src_len(), hw as u64);
            for trans in [false, true] {
                for (name, table) in tables() {
                    let mut dst = Guarded::zeros(shape.dst_len());
                    unsafe { raw::max_pooling_with(&table, src.as_ptr(), shape, dst.as_mut_ptr(), trans) };
                    dst.check_guards(&format!("{name} {shape:?} trans={trans}"));
                }
            }
        }
    }
}
