//! SIMD detection and the lane abstraction shared by every kernel
//!
//! # Module Structure
//!
//! ```text
//! simd/
//! ├── mod.rs              # This file: capability levels and detection
//! ├── dispatch.rs         # Strategy table and width walk-down
//! └── lanes/              # Width-generic vector register abstraction
//!     ├── mod.rs          # `Lanes` trait, tail planner, access mode
//!     ├── math.rs         # exp / ln / pow built on `Lanes`
//!     ├── sse.rs          # W = 4   (x86-64 baseline)
//!     ├── avx2.rs         # W = 8   (AVX2 + FMA)
//!     ├── avx512.rs       # W = 16  (AVX-512F)
//!     └── aarch64/        # W = 4   (NEON)
//! ```
//!
//! # Architecture Support
//!
//! | Architecture | Instruction Set | f32 lanes | Status    |
//! |--------------|-----------------|-----------|-----------|
//! | x86-64       | AVX-512F        | 16        | Supported (feature `avx512`) |
//! | x86-64       | AVX2 + FMA      | 8         | Supported |
//! | x86-64       | SSE2            | 4         | Supported |
//! | ARM64        | NEON            | 4         | Supported |
//! | Any          | Scalar          | 1         | Reference |

pub mod dispatch;
pub mod lanes;

use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::Error;

/// SIMD capability level detected at runtime
///
/// Levels are ordered by capability. Two levels of the same vector width on
/// different architectures (SSE2 and NEON) never coexist on one machine.
///
/// Note: All variants are defined on all platforms for API completeness,
/// but some are only constructed at runtime on their respective architectures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SimdLevel {
    // x86-64 variants (highest capability)
    /// AVX-512F (512-bit vectors, 16 f32s)
    Avx512 = 4,
    /// AVX2 with FMA support (256-bit vectors, 8 f32s)
    Avx2Fma = 3,
    /// SSE2 baseline for x86-64 (128-bit vectors, 4 f32s)
    Sse2 = 2,

    // ARM64 variants
    /// NEON baseline for AArch64 (128-bit vectors, 4 f32s)
    Neon = 1,

    // Universal fallback
    /// Scalar reference (no SIMD)
    Scalar = 0,
}

impl SimdLevel {
    /// Returns true if this is an x86-64 SIMD level
    #[inline]
    pub const fn is_x86(self) -> bool {
        matches!(self, Self::Avx512 | Self::Avx2Fma | Self::Sse2)
    }

    /// Returns true if this is an ARM64 SIMD level
    #[inline]
    pub const fn is_arm64(self) -> bool {
        matches!(self, Self::Neon)
    }

    /// Returns the number of f32 elements per vector register
    #[inline]
    pub const fn f32_lanes(self) -> usize {
        match self {
            Self::Avx512 => 16,
            Self::Avx2Fma => 8,
            Self::Sse2 | Self::Neon => 4,
            Self::Scalar => 1,
        }
    }

    /// Returns the name of this SIMD level as a string
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avx512 => "AVX-512",
            Self::Avx2Fma => "AVX2+FMA",
            Self::Sse2 => "SSE2",
            Self::Neon => "NEON",
            Self::Scalar => "Scalar",
        }
    }
}

impl std::fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimdLevel {
    type Err = Error;

    /// Parses the names accepted by the `NNKERN_SIMD` environment variable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avx512" | "avx-512" | "avx512f" => Ok(Self::Avx512),
            "avx2" | "avx2fma" | "avx2+fma" => Ok(Self::Avx2Fma),
            "sse2" | "sse" => Ok(Self::Sse2),
            "neon" => Ok(Self::Neon),
            "scalar" | "none" | "off" => Ok(Self::Scalar),
            other => Err(Error::InvalidArgument {
                arg: "simd_level",
                reason: format!(
                    "unknown SIMD level '{other}' (expected one of scalar, sse2, neon, avx2, avx512)"
                ),
            }),
        }
    }
}

/// Cached SIMD level detection
static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

/// Detect the best available SIMD level for the current CPU
///
/// This function is cached - the first call performs detection,
/// subsequent calls return the cached result.
#[inline]
pub fn detect_simd() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(detect_simd_uncached)
}

/// Perform actual CPU feature detection (called once)
#[cold]
fn detect_simd_uncached() -> SimdLevel {
    let level = detect_level();
    log::debug!("detected SIMD level: {level}");
    level
}

#[cfg(target_arch = "x86_64")]
fn detect_level() -> SimdLevel {
    #[cfg(feature = "avx512")]
    if is_x86_feature_detected!("avx512f") {
        return SimdLevel::Avx512;
    }

    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        return SimdLevel::Avx2Fma;
    }

    // SSE2 is part of the x86-64 baseline
    SimdLevel::Sse2
}

#[cfg(target_arch = "aarch64")]
fn detect_level() -> SimdLevel {
    // NEON is mandatory for AArch64 - always available
    SimdLevel::Neon
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_level() -> SimdLevel {
    SimdLevel::Scalar
}

/// Every vector level usable on this CPU, widest first
///
/// The scalar reference is implicit and never listed.
pub fn available_levels() -> Vec<SimdLevel> {
    let best = detect_simd();
    let mut levels = Vec::with_capacity(3);

    #[cfg(target_arch = "x86_64")]
    {
        if best >= SimdLevel::Avx512 {
            levels.push(SimdLevel::Avx512);
        }
        if best >= SimdLevel::Avx2Fma {
            // AVX-512F alone does not imply FMA; re-check before listing AVX2
            if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                levels.push(SimdLevel::Avx2Fma);
            }
        }
        if best >= SimdLevel::Sse2 {
            levels.push(SimdLevel::Sse2);
        }
    }

    #[cfg(target_arch = "aarch64")]
    if best == SimdLevel::Neon {
        levels.push(SimdLevel::Neon);
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    let _ = best;
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simd_detection_is_cached() {
        let level1 = detect_simd();
        let level2 = detect_simd();
        assert_eq!(level1, level2);
    }

    #[test]
    fn test_simd_level_ordering() {
        assert!(SimdLevel::Avx512 > SimdLevel::Avx2Fma);
        assert!(SimdLevel::Avx2Fma > SimdLevel::Sse2);
        assert!(SimdLevel::Neon > SimdLevel::Scalar);
    }

    #[test]
    fn test_lane_counts() {
        assert_eq!(SimdLevel::Avx512.f32_lanes(), 16);
        assert_eq!(SimdLevel::Avx2Fma.f32_lanes(), 8);
        assert_eq!(SimdLevel::Sse2.f32_lanes(), 4);
        assert_eq!(SimdLevel::Neon.f32_lanes(), 4);
        assert_eq!(SimdLevel::Scalar.f32_lanes(), 1);
    }

    #[test]
    fn test_architecture_detection() {
        assert!(SimdLevel::Avx512.is_x86());
        assert!(SimdLevel::Sse2.is_x86());
        assert!(!SimdLevel::Neon.is_x86());
        assert!(SimdLevel::Neon.is_arm64());
        assert!(!SimdLevel::Scalar.is_arm64());
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!("avx512".parse::<SimdLevel>().unwrap(), SimdLevel::Avx512);
        assert_eq!(" AVX2 ".parse::<SimdLevel>().unwrap(), SimdLevel::Avx2Fma);
        assert_eq!("sse2".parse::<SimdLevel>().unwrap(), SimdLevel::Sse2);
        assert_eq!("neon".parse::<SimdLevel>().unwrap(), SimdLevel::Neon);
        assert_eq!("scalar".parse::<SimdLevel>().unwrap(), SimdLevel::Scalar);
        assert!("avx1024".parse::<SimdLevel>().is_err());
    }

    #[test]
    fn test_available_levels_widest_first() {
        let levels = available_levels();
        assert!(!levels.contains(&SimdLevel::Scalar));
        for pair in levels.windows(2) {
            assert!(pair[0].f32_lanes() > pair[1].f32_lanes());
        }
        if let Some(first) = levels.first() {
            assert!(*first <= detect_simd());
        }
    }
}
