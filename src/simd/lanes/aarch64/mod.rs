//! ARM64 lane implementations

mod neon;

pub use neon::Neon;
