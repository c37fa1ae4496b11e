//! Particle record and dense particle storage.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Highest particle slot index the neighbor cache's 16-bit record format
/// can address. The buffer never grows past this.
pub const MAX_PARTICLE_INDEX: usize = u16::MAX as usize;

/// Sentinel for "no particle" in a grid bucket chain.
pub const NO_PARTICLE: i32 = -1;

/// A single SPH fluid particle.
///
/// Positions are in world units (pre unit-scale division). `density`,
/// `pressure` and `acceleration` are recomputed from scratch every tick.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Particle {
    /// World position
    pub position: Vec3,
    /// Instantaneous velocity
    pub velocity: Vec3,
    /// Leap-frog averaged velocity, used by the viscosity force and
    /// boundary damping
    pub velocity_eval: Vec3,
    /// Force-derived acceleration accumulated this tick
    pub acceleration: Vec3,
    /// Kernel-estimated density (always >= the lone-particle floor)
    pub density: f32,
    /// Equation-of-state pressure; negative in under-dense regions
    pub pressure: f32,
    /// Index of the next particle in the same grid cell, or -1.
    /// Rebuilt by the grid every tick; meaningless between ticks.
    pub next: i32,
}

/// Dense growable particle store.
///
/// Slots are stable for the lifetime of a simulation: particles are only
/// appended, never removed. Capacity doubles on demand up to
/// [`MAX_PARTICLE_INDEX`], past which `append` refuses rather than
/// aliasing existing slots.
#[derive(Clone, Debug, Default)]
pub struct ParticleBuffer {
    particles: Vec<Particle>,
    capacity: usize,
}

impl ParticleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all particles and reallocate storage for `capacity` entries.
    pub fn reset(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.particles = Vec::with_capacity(self.capacity);
    }

    /// Append a zero-initialized particle and return a handle to it.
    ///
    /// Doubles capacity when full. Returns `None` once doubling would
    /// exceed the 16-bit index range, so a caller can surface a capacity
    /// error instead of silently corrupting state.
    pub fn append(&mut self) -> Option<&mut Particle> {
        if self.particles.len() == self.capacity {
            if self.capacity * 2 > MAX_PARTICLE_INDEX {
                return None;
            }
            self.capacity *= 2;
            self.particles.reserve(self.capacity - self.particles.len());
        }
        self.particles.push(Particle::default());
        self.particles.last_mut()
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Particle `i`. Panics if `i` is out of range.
    pub fn get(&self, i: usize) -> &Particle {
        &self.particles[i]
    }

    /// Mutable particle `i`. Panics if `i` is out of range.
    pub fn get_mut(&mut self, i: usize) -> &mut Particle {
        &mut self.particles[i]
    }

    /// The dense particle array, valid until the next mutating call.
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }
}
