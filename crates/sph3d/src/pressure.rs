//! Density and pressure pass.

use crate::grid::SpatialGrid;
use crate::kernels::Kernels;
use crate::neighbor::NeighborCache;
use crate::params::SphParams;
use crate::particle::ParticleBuffer;

/// Estimate every particle's density with the Poly6 kernel and derive its
/// pressure from the ideal-gas equation of state, registering each
/// in-radius pair in the neighbor cache for the force pass.
///
/// The kernel sum is seeded with the self term `(h^2)^3`, so density has a
/// strictly positive floor even for a particle that drifted outside the
/// grid. Once a particle's neighbor list saturates, further neighbors are
/// dropped from the cache but still contribute to the density sum.
pub fn compute_density_pressure(
    particles: &mut ParticleBuffer,
    grid: &SpatialGrid,
    cache: &mut NeighborCache,
    params: &SphParams,
    kernels: &Kernels,
) {
    let h2 = params.h_squared();
    let search_radius = params.smoothing_radius / params.unit_scale;
    cache.reset(particles.len());

    for i in 0..particles.len() {
        let pos_i = particles.get(i).position;
        // Self term: contribution of the particle to its own density
        let mut sum = h2 * h2 * h2;

        cache.begin(i);
        let mut registering = true;
        for cell in grid.find_cells(pos_i, search_radius) {
            if cell < 0 {
                continue;
            }
            let mut j = grid.bucket_head(cell);
            while j >= 0 {
                let pj = particles.get(j as usize);
                let next = pj.next;
                if j as usize != i {
                    let d = (pos_i - pj.position) * params.unit_scale;
                    let r2 = d.length_squared();
                    if r2 < h2 {
                        let h2_r2 = h2 - r2;
                        sum += h2_r2 * h2_r2 * h2_r2;
                        if registering {
                            registering = cache.try_add(j as u16, r2.sqrt());
                        }
                    }
                }
                j = next;
            }
        }
        cache.commit();

        let p = particles.get_mut(i);
        p.density = kernels.poly6 * params.particle_mass * sum;
        p.pressure = (p.density - params.rest_density) * params.gas_constant;
    }
}
