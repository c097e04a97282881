//! Common test utilities
#![allow(dead_code)]

use nnkern::Dispatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Floats of guard space on each side of a [`Guarded`] buffer
pub const GUARD: usize = 32;

/// Value written to the guard space; kernels must leave it untouched
pub const CANARY: f32 = -12345.678;

/// Assert two f32 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Seeded uniform values in `[-2, 2)`
pub fn random_vec(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(-2.0f32..2.0)).collect()
}

/// Every single-level strategy table plus the scalar reference
pub fn tables() -> Vec<(String, Dispatch)> {
    Dispatch::each_level()
        .into_iter()
        .map(|d| (d.widest().to_string(), d))
        .collect()
}

/// An output buffer framed by canary values on both sides
pub struct Guarded {
    data: Vec<f32>,
    len: usize,
}

impl Guarded {
    pub fn new(values: &[f32]) -> Self {
        let mut data = vec![CANARY; values.len() + 2 * GUARD];
        data[GUARD..GUARD + values.len()].copy_from_slice(values);
        Self {
            data,
            len: values.len(),
        }
    }

    pub fn zeros(len: usize) -> Self {
        Self::new(&vec![0.0; len])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data[GUARD..GUARD + self.len]
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.as_slice().as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut f32 {
        self.data[GUARD..GUARD + self.len].as_mut_ptr()
    }

    /// Panic if anything outside the view was written
    pub fn check_guards(&self, msg: &str) {
        let (head, rest) = self.data.split_at(GUARD);
        let tail = &rest[self.len..];
        assert!(head.iter().all(|&x| x == CANARY), "{msg}: write before buffer");
        assert!(tail.iter().all(|&x| x == CANARY), "{msg}: write past buffer");
    }
}
