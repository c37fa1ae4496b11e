//! Force pass: pressure and viscosity accelerations.

use glam::Vec3;

use crate::kernels::{Kernels, MIN_KERNEL_DISTANCE};
use crate::neighbor::NeighborCache;
use crate::params::SphParams;
use crate::particle::ParticleBuffer;

/// Accumulate pressure (Spiky gradient) and viscosity (Viscosity
/// Laplacian) accelerations from the committed neighbor cache. No grid
/// access happens here; phase 2 already found every pair.
///
/// Gravity is deliberately absent; the integration pass adds it after
/// boundary handling.
pub fn compute_forces(
    particles: &mut ParticleBuffer,
    cache: &NeighborCache,
    params: &SphParams,
    kernels: &Kernels,
) {
    let h = params.smoothing_radius;

    for i in 0..particles.len() {
        let pi = *particles.get(i);
        let mut accel = Vec3::ZERO;

        for k in 0..cache.count(i) {
            let (j, r) = cache.get(i, k);
            let pj = *particles.get(j as usize);

            let d = (pi.position - pj.position) * params.unit_scale;
            let h_r = h - r;

            if r > MIN_KERNEL_DISTANCE {
                let pterm = -params.particle_mass * kernels.spiky * h_r * h_r
                    * (pi.pressure + pj.pressure)
                    / (2.0 * pi.density * pj.density);
                accel += d * (pterm / r);
            }

            let vterm = kernels.viscosity * params.viscosity * h_r * params.particle_mass
                / (pi.density * pj.density);
            accel += (pj.velocity_eval - pi.velocity_eval) * vterm;
        }

        particles.get_mut(i).acceleration = accel;
    }
}
