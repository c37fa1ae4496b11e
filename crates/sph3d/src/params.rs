//! Simulation parameters.
//!
//! All constants live in one immutable struct computed before the first
//! tick and passed by reference to each phase; nothing mutates them at
//! runtime.

use serde::{Deserialize, Serialize};

/// SPH simulation parameters.
///
/// Lengths below `unit_scale` are in physical units (meters); particle
/// positions are in world units, related by `physical = world * unit_scale`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SphParams {
    /// World-unit to physical-unit conversion factor
    pub unit_scale: f32,
    /// Dynamic viscosity coefficient
    pub viscosity: f32,
    /// Target fluid density (kg/m^3)
    pub rest_density: f32,
    /// Mass of one particle (kg)
    pub particle_mass: f32,
    /// Ideal-gas stiffness of the equation of state
    pub gas_constant: f32,
    /// Kernel support radius h (meters)
    pub smoothing_radius: f32,
    /// Neighbor-grid cell size (meters). Must be >= 2 * smoothing_radius
    /// for the single-cell-radius neighbor search to be exhaustive;
    /// validated at simulation construction.
    pub grid_cell_size: f32,
    /// Spring constant of the wall penalty force (also damps the
    /// velocity along the wall normal)
    pub boundary_stiffness: f32,
    /// Acceleration magnitude cap applied before integration
    pub speed_limit: f32,
    /// Fixed integration time step (seconds)
    pub dt: f32,
}

impl Default for SphParams {
    fn default() -> Self {
        Self {
            unit_scale: 0.004,
            viscosity: 1.0,
            rest_density: 1000.0,
            particle_mass: 0.0006,
            gas_constant: 1.0,
            smoothing_radius: 0.01,
            grid_cell_size: 0.02,
            boundary_stiffness: 50.0,
            speed_limit: 200.0,
            dt: 0.003,
        }
    }
}

impl SphParams {
    /// Squared smoothing radius.
    pub fn h_squared(&self) -> f32 {
        self.smoothing_radius * self.smoothing_radius
    }

    /// Rest spacing between particles (meters), from mass and rest density.
    pub fn particle_spacing(&self) -> f32 {
        (self.particle_mass / self.rest_density).powf(1.0 / 3.0)
    }
}
