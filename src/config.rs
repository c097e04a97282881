//! Runtime configuration of the kernel strategy table

use crate::simd::SimdLevel;

/// Environment variable capping the widest SIMD level used by
/// [`Dispatch::global`](crate::simd::dispatch::Dispatch::global).
///
/// Accepted values: `scalar`, `sse2`, `neon`, `avx2`, `avx512`.
pub const SIMD_ENV: &str = "NNKERN_SIMD";

/// Configuration for building a strategy table
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct KernelConfig {
    /// Widest level allowed; `None` uses everything the CPU supports.
    ///
    /// The cap compares vector widths, so `Sse2` also caps NEON machines
    /// at four lanes.
    pub max_level: Option<SimdLevel>,
}

impl KernelConfig {
    /// Configuration using every detected level
    pub const fn new() -> Self {
        Self { max_level: None }
    }

    /// Cap the widest level used
    pub const fn with_max_level(mut self, level: SimdLevel) -> Self {
        self.max_level = Some(level);
        self
    }

    /// Read the configuration from [`SIMD_ENV`].
    ///
    /// Unknown values are logged and ignored.
    pub fn from_env() -> Self {
        match std::env::var(SIMD_ENV) {
            Ok(value) => Self::from_env_value(&value),
            Err(_) => Self::new(),
        }
    }

    fn from_env_value(value: &str) -> Self {
        match value.parse::<SimdLevel>() {
            Ok(level) => {
                log::debug!("{SIMD_ENV}={value}: capping kernels at {level}");
                Self::new().with_max_level(level)
            }
            Err(err) => {
                log::warn!("ignoring {SIMD_ENV}={value}: {err}");
                Self::new()
            }
        }
    }
}
