//! # nnkern
//!
//! **Layout-aware, width-adaptive forward kernels for neural-network inference.**
//!
//! nnkern computes the elementwise and reduction primitives of an inference
//! forward pass over dense `f32` buffers: bias add, eltwise combine, fused
//! activation blocks, cross-channel LRN, max pooling, PReLU, clamping,
//! channel scale, softmax and inner product.
//!
//! ## Why nnkern?
//!
//! - **One kernel, every width**: kernels are written once against the
//!   [`Lanes`](simd::lanes::Lanes) trait and instantiated for SSE2, AVX2+FMA,
//!   AVX-512F and NEON
//! - **Layout aware**: NCHW, NHWC and NCHWxc packed tensors, each traversed in
//!   the order with the longest contiguous rows
//! - **Safe tails**: lengths that are not a multiple of the vector width end
//!   in a masked chunk that never touches memory past the buffer
//! - **Scalar oracle**: every operation has a plain-loop reference selected
//!   with [`Dispatch::scalar`]
//!
//! ## Quick Start
//!
//! ```rust
//! use nnkern::prelude::*;
//!
//! let mut dst = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
//! ops::add_bias(&[10.0, 100.0], 2, 3, &mut dst, TensorFormat::ChannelMajor)?;
//! assert_eq!(dst, [11.0, 12.0, 13.0, 104.0, 105.0, 106.0]);
//! # Ok::<(), nnkern::Error>(())
//! ```
//!
//! ## API layers
//!
//! - [`ops`]: safe slice functions that validate lengths and return [`Result`]
//! - [`raw`]: `unsafe` pointer functions, each with a `*_with` twin taking an
//!   explicit [`Dispatch`]
//!
//! ## Feature Flags
//!
//! - `avx512` (default): AVX-512F kernels on x86-64
//!
//! ## Environment
//!
//! `NNKERN_SIMD` (`scalar`, `sse2`, `neon`, `avx2`, `avx512`) caps the widest
//! level used by the global strategy table.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod kernels;
pub mod layout;
pub mod ops;
pub mod simd;

#[cfg(test)]
mod test_util;

pub use config::{KernelConfig, SIMD_ENV};
pub use error::{Error, Result};
pub use kernels::{EltwiseOp, PoolShape};
pub use layout::{TensorFormat, Traversal};
pub use simd::dispatch::Dispatch;
pub use simd::{SimdLevel, available_levels, detect_simd};

/// Raw pointer kernels
///
/// See [`kernels`] for the shared safety contract.
pub mod raw {
    pub use crate::kernels::*;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::KernelConfig;
    pub use crate::error::{Error, Result};
    pub use crate::kernels::{EltwiseOp, PoolShape};
    pub use crate::layout::TensorFormat;
    pub use crate::ops;
    pub use crate::simd::SimdLevel;
    pub use crate::simd::dispatch::Dispatch;
}
