//! Integration pass: speed limiting, wall response, gravity, leap-frog.

use glam::Vec3;

use crate::params::SphParams;
use crate::particle::ParticleBuffer;

/// Advance every particle by one fixed time step and mirror the updated
/// positions into the flat readback buffer (`[x0, y0, z0, x1, ...]`).
///
/// Wall handling engages within one world unit of each face: a spring
/// force proportional to penetration, damped along the wall normal, plus
/// a hard sign clamp on the velocity component so a particle can never
/// keep tunneling outward. The clamp trades a velocity discontinuity for
/// guaranteed re-entry.
pub fn advance(
    particles: &mut ParticleBuffer,
    positions: &mut [f32],
    wall_min: Vec3,
    wall_max: Vec3,
    gravity: Vec3,
    params: &SphParams,
) {
    debug_assert_eq!(positions.len(), particles.len() * 3);
    let dt = params.dt;
    let speed_limit_sq = params.speed_limit * params.speed_limit;
    let stiffness = params.boundary_stiffness;

    for i in 0..particles.len() {
        let p = particles.get_mut(i);
        let mut accel = p.acceleration;

        // Direction-preserving clamp of the force acceleration
        let accel_sq = accel.length_squared();
        if accel_sq > speed_limit_sq {
            accel *= params.speed_limit / accel_sq.sqrt();
        }

        for axis in 0..3 {
            // Wall at the minimum face: inward normal is +axis
            let diff = params.unit_scale - (p.position[axis] - wall_min[axis]) * params.unit_scale;
            if diff > 0.0 {
                let mut normal = Vec3::ZERO;
                normal[axis] = 1.0;
                let adj = stiffness * diff - stiffness * normal.dot(p.velocity_eval);
                accel += normal * adj;
                p.velocity[axis] = p.velocity[axis].abs();
                p.velocity_eval[axis] = p.velocity_eval[axis].abs();
            }

            // Wall at the maximum face: inward normal is -axis
            let diff = params.unit_scale - (wall_max[axis] - p.position[axis]) * params.unit_scale;
            if diff > 0.0 {
                let mut normal = Vec3::ZERO;
                normal[axis] = -1.0;
                let adj = stiffness * diff - stiffness * normal.dot(p.velocity_eval);
                accel += normal * adj;
                p.velocity[axis] = -p.velocity[axis].abs();
                p.velocity_eval[axis] = -p.velocity_eval[axis].abs();
            }
        }

        accel += gravity;

        // Leap-frog: velocity_eval is the time-centered average the next
        // tick's viscosity term reads
        let v_next = p.velocity + accel * dt;
        p.velocity_eval = (p.velocity + v_next) * 0.5;
        p.velocity = v_next;
        p.position += v_next * dt / params.unit_scale;

        positions[3 * i] = p.position.x;
        positions[3 * i + 1] = p.position.y;
        positions[3 * i + 2] = p.position.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_particle(position: Vec3) -> (ParticleBuffer, Vec<f32>) {
        let mut particles = ParticleBuffer::new();
        particles.reset(1);
        particles.append().unwrap().position = position;
        (particles, vec![0.0; 3])
    }

    #[test]
    fn test_free_fall_step() {
        let params = SphParams::default();
        let gravity = Vec3::new(0.0, -9.8, 0.0);
        let (mut particles, mut positions) = single_particle(Vec3::splat(25.0));

        advance(
            &mut particles,
            &mut positions,
            Vec3::ZERO,
            Vec3::splat(50.0),
            gravity,
            &params,
        );

        let p = particles.get(0);
        let v_expected = -9.8 * params.dt;
        assert!((p.velocity.y - v_expected).abs() < 1e-6);
        assert!((p.velocity_eval.y - v_expected * 0.5).abs() < 1e-6);
        let y_expected = 25.0 + v_expected * params.dt / params.unit_scale;
        assert!((p.position.y - y_expected).abs() < 1e-4);
        // Readback mirror
        assert_eq!(positions[1], p.position.y);
    }

    #[test]
    fn test_acceleration_clamp_preserves_direction() {
        let params = SphParams::default();
        let (mut particles, mut positions) = single_particle(Vec3::splat(25.0));
        particles.get_mut(0).acceleration = Vec3::new(1e6, 0.0, 0.0);

        advance(
            &mut particles,
            &mut positions,
            Vec3::ZERO,
            Vec3::splat(50.0),
            Vec3::ZERO,
            &params,
        );

        let v = particles.get(0).velocity;
        assert!((v.x - params.speed_limit * params.dt).abs() < 1e-3);
        assert_eq!(v.y, 0.0);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn test_floor_flips_velocity_inward() {
        let params = SphParams::default();
        // Within one world unit of the floor, moving down fast
        let (mut particles, mut positions) = single_particle(Vec3::new(25.0, 0.5, 25.0));
        particles.get_mut(0).velocity = Vec3::new(0.0, -2.0, 0.0);
        particles.get_mut(0).velocity_eval = Vec3::new(0.0, -2.0, 0.0);

        advance(
            &mut particles,
            &mut positions,
            Vec3::ZERO,
            Vec3::splat(50.0),
            Vec3::ZERO,
            &params,
        );

        // Sign clamp plus the spring make the next velocity point up
        assert!(particles.get(0).velocity.y > 0.0);
        assert!(particles.get(0).position.y > 0.5);
    }

    #[test]
    fn test_ceiling_flips_velocity_inward() {
        let params = SphParams::default();
        let (mut particles, mut positions) = single_particle(Vec3::new(25.0, 49.5, 25.0));
        particles.get_mut(0).velocity = Vec3::new(0.0, 2.0, 0.0);
        particles.get_mut(0).velocity_eval = Vec3::new(0.0, 2.0, 0.0);

        advance(
            &mut particles,
            &mut positions,
            Vec3::ZERO,
            Vec3::splat(50.0),
            Vec3::ZERO,
            &params,
        );

        assert!(particles.get(0).velocity.y < 0.0);
        assert!(particles.get(0).position.y < 49.5);
    }

    #[test]
    fn test_interior_particle_feels_no_wall() {
        let params = SphParams::default();
        let (mut particles, mut positions) = single_particle(Vec3::splat(25.0));
        particles.get_mut(0).velocity = Vec3::new(1.0, 0.0, 0.0);
        particles.get_mut(0).velocity_eval = Vec3::new(1.0, 0.0, 0.0);

        advance(
            &mut particles,
            &mut positions,
            Vec3::ZERO,
            Vec3::splat(50.0),
            Vec3::ZERO,
            &params,
        );

        // Pure drift, no wall force
        let p = particles.get(0);
        assert!((p.velocity.x - 1.0).abs() < 1e-6);
        assert!((p.position.x - (25.0 + 1.0 * params.dt / params.unit_scale)).abs() < 1e-4);
    }
}
