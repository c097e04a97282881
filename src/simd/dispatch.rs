//! Strategy table and width walk-down
//!
//! A [`Dispatch`] is an ordered list of vector levels, widest first. Each
//! kernel call walks the list and runs on the first width whose shape
//! predicate ([`LaneKernel::supports`]) accepts the call; if none does, the
//! kernel's scalar reference runs instead.
//!
//! Kernels are instantiated per width through `#[target_feature]`
//! trampolines, so the generic kernel body is compiled with the matching
//! instruction set enabled.

use std::fmt;
use std::sync::OnceLock;

use smallvec::SmallVec;

use super::lanes::Lanes;
use super::{SimdLevel, available_levels};
use crate::config::KernelConfig;

#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
use super::lanes::Avx512;
#[cfg(target_arch = "x86_64")]
use super::lanes::{Avx2, Sse};

#[cfg(target_arch = "aarch64")]
use super::lanes::Neon;

/// One kernel call, ready to run at any width
pub(crate) trait LaneKernel {
    /// Whether the vector kernel can serve this call at `width` lanes
    #[inline]
    fn supports(&self, _width: usize) -> bool {
        true
    }

    /// Width-generic vector kernel
    unsafe fn vector<L: Lanes>(&self);

    /// Scalar reference
    unsafe fn scalar(&self);
}

macro_rules! trampoline {
    ($name:ident, $lanes:ty, $($feature:literal),+) => {
        #[target_feature($(enable = $feature),+)]
        unsafe fn $name<K: LaneKernel>(kernel: &K) {
            kernel.vector::<$lanes>()
        }
    };
}

#[cfg(all(target_arch = "x86_64", feature = "avx512"))]
trampoline!(run_avx512, Avx512, "avx512f");
#[cfg(target_arch = "x86_64")]
trampoline!(run_avx2, Avx2, "avx2", "fma");
#[cfg(target_arch = "x86_64")]
trampoline!(run_sse2, Sse, "sse2");
#[cfg(target_arch = "aarch64")]
trampoline!(run_neon, Neon, "neon");

/// Immutable strategy table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
    levels: SmallVec<[SimdLevel; 4]>,
}

static GLOBAL: OnceLock<Dispatch> = OnceLock::new();

impl Dispatch {
    /// Process-wide table, built on first use from CPU detection and
    /// [`KernelConfig::from_env`].
    pub fn global() -> &'static Dispatch {
        GLOBAL.get_or_init(|| {
            let dispatch = Self::from_config(&KernelConfig::from_env());
            log::debug!("kernel strategies: {dispatch}");
            dispatch
        })
    }

    /// Table of every detected level allowed by `config`
    pub fn from_config(config: &KernelConfig) -> Self {
        let cap = config.max_level.map_or(usize::MAX, SimdLevel::f32_lanes);
        let levels = available_levels()
            .into_iter()
            .filter(|level| level.f32_lanes() <= cap)
            .collect();
        Self { levels }
    }

    /// Table of every detected level no wider than `level`
    pub fn with_max_level(level: SimdLevel) -> Self {
        Self::from_config(&KernelConfig::new().with_max_level(level))
    }

    /// Table that always runs the scalar reference
    pub fn scalar() -> Self {
        Self {
            levels: SmallVec::new(),
        }
    }

    /// Table holding only `level`, or `None` if this CPU lacks it.
    ///
    /// Calls the level cannot serve run the scalar reference.
    pub fn pinned(level: SimdLevel) -> Option<Self> {
        if level == SimdLevel::Scalar {
            return Some(Self::scalar());
        }
        available_levels().contains(&level).then(|| Self {
            levels: SmallVec::from_slice(&[level]),
        })
    }

    /// One pinned table per detected level, widest first, followed by the
    /// scalar table.
    pub fn each_level() -> Vec<Self> {
        available_levels()
            .into_iter()
            .map(|level| Self {
                levels: SmallVec::from_slice(&[level]),
            })
            .chain(std::iter::once(Self::scalar()))
            .collect()
    }

    /// Vector levels tried, widest first (the scalar reference is implicit)
    pub fn levels(&self) -> &[SimdLevel] {
        &self.levels
    }

    /// Widest level in the table
    pub fn widest(&self) -> SimdLevel {
        self.levels.first().copied().unwrap_or(SimdLevel::Scalar)
    }

    /// Run `kernel` on the widest level that supports it.
    ///
    /// # Safety
    /// The kernel's pointer preconditions must hold.
    pub(crate) unsafe fn run<K: LaneKernel>(&self, kernel: &K) {
        for &level in &self.levels {
            if !kernel.supports(level.f32_lanes()) {
                log::trace!("{level} cannot serve this shape, walking down");
                continue;
            }
            match level {
                #[cfg(all(target_arch = "x86_64", feature = "avx512"))]
                SimdLevel::Avx512 => return run_avx512(kernel),
                #[cfg(target_arch = "x86_64")]
                SimdLevel::Avx2Fma => return run_avx2(kernel),
                #[cfg(target_arch = "x86_64")]
                SimdLevel::Sse2 => return run_sse2(kernel),
                #[cfg(target_arch = "aarch64")]
                SimdLevel::Neon => return run_neon(kernel),
                _ => {}
            }
        }
        kernel.scalar()
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for level in &self.levels {
            write!(f, "{level} > ")?;
        }
        f.write_str(SimdLevel::Scalar.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Probe {
        max_width: usize,
        ran: Cell<usize>,
    }

    impl LaneKernel for Probe {
        fn supports(&self, width: usize) -> bool {
            width <= self.max_width
        }

        unsafe fn vector<L: Lanes>(&self) {
            self.ran.set(L::WIDTH);
        }

        unsafe fn scalar(&self) {
            self.ran.set(1);
        }
    }

    fn ran_width(dispatch: &Dispatch, max_width: usize) -> usize {
        let probe = Probe {
            max_width,
            ran: Cell::new(0),
        };
        unsafe { dispatch.run(&probe) };
        probe.ran.get()
    }

    #[test]
    fn test_scalar_table_runs_reference() {
        assert_eq!(ran_width(&Dispatch::scalar(), usize::MAX), 1);
        assert_eq!(Dispatch::scalar().widest(), SimdLevel::Scalar);
    }

    #[test]
    fn test_walks_down_to_supported_width() {
        let dispatch = Dispatch::from_config(&KernelConfig::new());
        let widest = dispatch.widest().f32_lanes();
        assert_eq!(ran_width(&dispatch, usize::MAX), widest);
        // A shape no vector width accepts falls through to scalar
        assert_eq!(ran_width(&dispatch, 2), 1);
        if dispatch.levels().len() > 1 {
            let narrower = dispatch.levels()[1].f32_lanes();
            assert_eq!(ran_width(&dispatch, widest - 1), narrower);
        }
    }

    #[test]
    fn test_cap_limits_width() {
        let capped = Dispatch::with_max_level(SimdLevel::Sse2);
        assert!(capped.levels().iter().all(|l| l.f32_lanes() <= 4));
        let none = Dispatch::with_max_level(SimdLevel::Scalar);
        assert!(none.levels().is_empty());
    }

    #[test]
    fn test_each_level_ends_with_scalar() {
        let tables = Dispatch::each_level();
        assert_eq!(tables.last(), Some(&Dispatch::scalar()));
        for table in &tables[..tables.len() - 1] {
            assert_eq!(table.levels().len(), 1);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Dispatch::scalar().to_string(), "Scalar");
    }
}
