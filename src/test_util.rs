//! Helpers shared by the kernel unit tests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::simd::dispatch::Dispatch;

/// Sizes covering empty input, every remainder below 16 and a few
/// multiples of the widest vector plus remainders
pub fn boundary_sizes() -> Vec<usize> {
    let mut sizes: Vec<usize> = (0..=17).collect();
    sizes.extend([31, 32, 33, 47, 63, 64, 65, 79, 100]);
    sizes
}

pub fn random_vec(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(-2.0f32..2.0)).collect()
}

pub fn random_positive(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(0.1f32..2.0)).collect()
}

/// Element-wise `|a - b| <= atol + rtol * |b|`
pub fn assert_allclose(actual: &[f32], expected: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(actual.len(), expected.len(), "{msg}: length mismatch");
    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        let diff = (a - e).abs();
        let tol = atol + rtol * e.abs();
        assert!(
            diff <= tol,
            "{msg}: element {i} differs: {a} vs {e} (diff={diff}, tol={tol})"
        );
    }
}

/// Every single-level table followed by the scalar reference, paired with
/// a readable name
pub fn tables() -> Vec<(String, Dispatch)> {
    Dispatch::each_level()
        .into_iter()
        .map(|d| (d.widest().to_string(), d))
        .collect()
}

/// A float buffer whose view starts `shift` floats past a 64-byte boundary
pub struct Shifted {
    data: Vec<f32>,
    start: usize,
    len: usize,
}

impl Shifted {
    pub fn new(values: &[f32], shift: usize) -> Self {
        let mut data = vec![0.0f32; values.len() + 16 + shift];
        let misalign = (data.as_ptr() as usize % 64) / 4;
        let start = (16 - misalign) % 16 + shift;
        data[start..start + values.len()].copy_from_slice(values);
        Self {
            data,
            start,
            len: values.len(),
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data[self.start..self.start + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data[self.start..self.start + self.len]
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.as_slice().as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut f32 {
        self.as_mut_slice().as_mut_ptr()
    }
}
