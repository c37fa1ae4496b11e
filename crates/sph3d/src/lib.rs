//! 3D Smoothed Particle Hydrodynamics fluid simulation core.
//!
//! Particles carry position, velocity and derived density/pressure;
//! per-tick forces come from neighbors within a finite smoothing radius,
//! found through a uniform spatial grid and cached for the force pass.
//! Rendering, input and GPU transfer are external concerns: a consumer
//! calls [`SphSimulation3D::tick`] once per frame and reads positions
//! back through [`SphSimulation3D::positions`].
//!
//! # Example
//!
//! ```
//! use sph3d::SphSimulation3D;
//! use glam::Vec3;
//!
//! let mut sim = SphSimulation3D::new(
//!     1000,
//!     Vec3::ZERO,
//!     Vec3::splat(20.0),
//!     Vec3::new(5.0, 10.0, 5.0),
//!     Vec3::new(15.0, 18.0, 15.0),
//!     Vec3::new(0.0, -9.8, 0.0),
//! )
//! .unwrap();
//!
//! sim.tick();
//! assert!(sim.particle_count() > 0);
//! ```

pub mod advection;
pub mod forces;
pub mod grid;
pub mod kernels;
pub mod neighbor;
pub mod params;
pub mod particle;
pub mod pressure;

pub use glam::Vec3;
pub use grid::SpatialGrid;
pub use kernels::Kernels;
pub use neighbor::NeighborCache;
pub use params::SphParams;
pub use particle::{Particle, ParticleBuffer, MAX_PARTICLE_INDEX};

use thiserror::Error;

/// Construction-time validation errors. The tick itself is infallible:
/// runtime degradations (neighbor-cache saturation, bounded wall
/// penetration) are observable, not fatal.
#[derive(Debug, Error)]
pub enum SphError {
    #[error("max_particles {requested} exceeds the particle index limit {limit}")]
    TooManyParticles { requested: usize, limit: usize },
    #[error("fluid volume needs more particles than the index limit allows")]
    CapacityExhausted,
    #[error("invalid box: min {min:?} must be strictly below max {max:?} on every axis")]
    InvalidBounds { min: Vec3, max: Vec3 },
    #[error("grid cell size {cell_size} must be at least twice the smoothing radius {radius}")]
    CellSizeTooSmall { cell_size: f32, radius: f32 },
}

/// 3D SPH fluid simulation.
///
/// One [`tick`](Self::tick) runs four ordered phases, each completing
/// before the next starts: grid rebuild, density/pressure, forces,
/// integration with boundary response. Execution is single-threaded and
/// deterministic for a given initial state.
pub struct SphSimulation3D {
    params: SphParams,
    kernels: Kernels,
    particles: ParticleBuffer,
    grid: SpatialGrid,
    cache: NeighborCache,
    /// Flat xyz position mirror for the rendering collaborator
    positions: Vec<f32>,
    wall_min: Vec3,
    wall_max: Vec3,
    gravity: Vec3,
    /// Current simulation tick
    pub frame: u32,
}

impl SphSimulation3D {
    /// Create a simulation with default parameters: a wall box, an
    /// initial fluid-filled box and a gravity vector, all in world units.
    ///
    /// The fluid box is filled with a regular lattice at the rest spacing
    /// derived from particle mass and rest density. `max_particles` is
    /// the initial storage capacity; the store grows beyond it on demand,
    /// but never past [`MAX_PARTICLE_INDEX`].
    pub fn new(
        max_particles: usize,
        wall_min: Vec3,
        wall_max: Vec3,
        fluid_min: Vec3,
        fluid_max: Vec3,
        gravity: Vec3,
    ) -> Result<Self, SphError> {
        Self::with_params(
            SphParams::default(),
            max_particles,
            wall_min,
            wall_max,
            fluid_min,
            fluid_max,
            gravity,
        )
    }

    /// [`new`](Self::new) with explicit parameters.
    pub fn with_params(
        params: SphParams,
        max_particles: usize,
        wall_min: Vec3,
        wall_max: Vec3,
        fluid_min: Vec3,
        fluid_max: Vec3,
        gravity: Vec3,
    ) -> Result<Self, SphError> {
        assert!(params.dt > 0.0, "dt must be positive");
        assert!(params.unit_scale > 0.0, "unit_scale must be positive");
        assert!(params.smoothing_radius > 0.0, "smoothing_radius must be positive");
        assert!(params.particle_mass > 0.0 && params.rest_density > 0.0);

        if max_particles > MAX_PARTICLE_INDEX {
            return Err(SphError::TooManyParticles {
                requested: max_particles,
                limit: MAX_PARTICLE_INDEX,
            });
        }
        if wall_max.cmple(wall_min).any() {
            return Err(SphError::InvalidBounds {
                min: wall_min,
                max: wall_max,
            });
        }
        if fluid_max.cmplt(fluid_min).any() {
            return Err(SphError::InvalidBounds {
                min: fluid_min,
                max: fluid_max,
            });
        }
        // The 2x2x2 candidate-cell search is exhaustive only when one
        // cell spans the whole smoothing sphere
        if params.grid_cell_size < 2.0 * params.smoothing_radius {
            return Err(SphError::CellSizeTooSmall {
                cell_size: params.grid_cell_size,
                radius: params.smoothing_radius,
            });
        }

        let kernels = Kernels::new(params.smoothing_radius);
        let mut particles = ParticleBuffer::new();
        particles.reset(max_particles);

        // Regular lattice at the rest spacing, each axis from the max
        // corner down to the min corner
        let spacing = params.particle_spacing() / params.unit_scale;
        let mut z = fluid_max.z;
        while z >= fluid_min.z {
            let mut y = fluid_max.y;
            while y >= fluid_min.y {
                let mut x = fluid_max.x;
                while x >= fluid_min.x {
                    let p = particles.append().ok_or(SphError::CapacityExhausted)?;
                    p.position = Vec3::new(x, y, z);
                    x -= spacing;
                }
                y -= spacing;
            }
            z -= spacing;
        }

        let grid = SpatialGrid::new(
            wall_min,
            wall_max,
            params.unit_scale,
            params.grid_cell_size,
            1.0,
        )?;

        let positions = vec![0.0; particles.len() * 3];
        let res = grid.resolution();
        log::info!(
            "sph init: {} particles at spacing {:.3}, grid {}x{}x{} cells",
            particles.len(),
            spacing,
            res.x,
            res.y,
            res.z
        );

        Ok(Self {
            params,
            kernels,
            particles,
            grid,
            cache: NeighborCache::new(),
            positions,
            wall_min,
            wall_max,
            gravity,
            frame: 0,
        })
    }

    /// Advance the simulation by one fixed time step.
    pub fn tick(&mut self) {
        if self.particles.is_empty() {
            return;
        }

        // 1. Rebuild the spatial grid from current positions
        self.grid.insert_particles(&mut self.particles);

        // 2. Density and pressure from kernel-weighted neighbor sums
        pressure::compute_density_pressure(
            &mut self.particles,
            &self.grid,
            &mut self.cache,
            &self.params,
            &self.kernels,
        );
        let saturated = self.cache.saturated_particles();
        if saturated > 0 {
            log::debug!(
                "tick {}: neighbor cache saturated for {} particles",
                self.frame,
                saturated
            );
        }

        // 3. Pressure and viscosity forces from the cached neighbor lists
        forces::compute_forces(&mut self.particles, &self.cache, &self.params, &self.kernels);

        // 4. Integrate with boundary response, mirror positions out
        advection::advance(
            &mut self.particles,
            &mut self.positions,
            self.wall_min,
            self.wall_max,
            self.gravity,
            &self.params,
        );

        self.frame += 1;
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Byte size of one particle record in [`particles`](Self::particles).
    pub fn particle_stride(&self) -> usize {
        std::mem::size_of::<Particle>()
    }

    /// The dense particle array. Only valid until the next mutating call.
    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    /// Flat xyz positions updated at the end of every tick, for the
    /// rendering collaborator.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Simulation parameters.
    pub fn params(&self) -> &SphParams {
        &self.params
    }

    /// Wall box corners (world units).
    pub fn wall_bounds(&self) -> (Vec3, Vec3) {
        (self.wall_min, self.wall_max)
    }

    /// Particles whose neighbor list overflowed during the last tick.
    pub fn neighbor_saturation(&self) -> usize {
        self.cache.saturated_particles()
    }
}
