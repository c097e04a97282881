//! Raw forward kernels
//!
//! Every operation is an `unsafe` function over raw pointers that runs on the
//! process-wide strategy table, plus a `*_with` twin taking an explicit
//! [`Dispatch`](crate::simd::dispatch::Dispatch). The scalar reference of an
//! operation is reached with `*_with(&Dispatch::scalar(), ..)`.
//!
//! # Safety
//!
//! Callers guarantee that every pointer is valid for the element counts
//! implied by the shape arguments. Only the aliasing documented on each
//! function is allowed.

/// Generate a raw entry point on the global table and its `_with` twin
macro_rules! raw_entry {
    (
        $(#[$meta:meta])*
        pub unsafe fn $name:ident($($arg:ident: $ty:ty),* $(,)?) => $kernel:expr
    ) => {
        paste::paste! {
            $(#[$meta])*
            #[inline]
            pub unsafe fn $name($($arg: $ty),*) {
                [<$name _with>](crate::simd::dispatch::Dispatch::global(), $($arg),*)
            }

            #[doc = concat!("[`", stringify!($name), "`] on an explicit strategy table.")]
            ///
            /// # Safety
            #[doc = concat!("Same contract as [`", stringify!($name), "`].")]
            pub unsafe fn [<$name _with>](
                dispatch: &crate::simd::dispatch::Dispatch,
                $($arg: $ty),*
            ) {
                dispatch.run(&$kernel)
            }
        }
    };
}

mod channel_map;

pub mod bias;
pub mod eltwise;
pub mod fused;
pub mod inner_product;
pub mod lrn;
pub mod pooling;
pub mod prelu;
pub mod restrict_range;
pub mod scale;
pub mod softmax;

pub use bias::{add_bias, add_bias_with};
pub use eltwise::{EltwiseOp, eltwise, eltwise_with};
pub use fused::{
    fused_layer_forward0, fused_layer_forward0_with, fused_layer_forward1,
    fused_layer_forward1_with, fused_layer_forward2, fused_layer_forward2_with,
    fused_layer_forward3, fused_layer_forward3_with, fused_layer_forward4,
    fused_layer_forward4_with, fused_layer_forward8, fused_layer_forward8_with,
    fused_layer_forward9, fused_layer_forward9_with,
};
pub use inner_product::{inner_product, inner_product_with};
pub use lrn::{lrn_cross_channels, lrn_cross_channels_with};
pub use pooling::{PoolShape, max_pooling, max_pooling_with};
pub use prelu::{prelu, prelu_with};
pub use restrict_range::{restrict_range, restrict_range_with};
pub use scale::{scale, scale_with};
pub use softmax::{softmax, softmax_with};
