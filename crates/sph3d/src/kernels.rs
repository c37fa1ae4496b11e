//! SPH smoothing kernel coefficients (Poly6, Spiky, Viscosity).

use std::f32::consts::PI;

/// Distance floor below which the pressure gradient direction is
/// undefined and the term is skipped.
pub const MIN_KERNEL_DISTANCE: f32 = 1e-5;

/// Kernel normalization coefficients for a given support radius `h`,
/// precomputed once so the per-tick passes stay free of `powi` calls.
#[derive(Clone, Copy, Debug)]
pub struct Kernels {
    /// Poly6 density kernel: 315 / (64 pi h^9)
    pub poly6: f32,
    /// Spiky pressure-gradient kernel: -45 / (pi h^6)
    pub spiky: f32,
    /// Viscosity Laplacian kernel: 45 / (pi h^6)
    pub viscosity: f32,
}

impl Kernels {
    pub fn new(h: f32) -> Self {
        Self {
            poly6: 315.0 / (64.0 * PI * h.powi(9)),
            spiky: -45.0 / (PI * h.powi(6)),
            viscosity: 45.0 / (PI * h.powi(6)),
        }
    }
}

/// Unnormalized Poly6 term `(h^2 - r^2)^3`, zero outside the support.
#[inline]
pub fn poly6_term(h2: f32, r2: f32) -> f32 {
    if r2 >= h2 {
        return 0.0;
    }
    let t = h2 - r2;
    t * t * t
}
