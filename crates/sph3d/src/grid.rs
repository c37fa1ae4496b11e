//! Uniform spatial grid with intrusive per-cell particle chains.
//!
//! Each cell holds the index of the first particle inside it; the rest of
//! the cell's particles are threaded through [`Particle::next`]. The whole
//! structure is rebuilt from scratch every tick by `insert_particles`.
//!
//! [`Particle::next`]: crate::particle::Particle

use glam::{IVec3, Vec3};

use crate::particle::{ParticleBuffer, NO_PARTICLE};
use crate::SphError;

/// Sentinel for "no such cell" in candidate-cell lookups.
pub const NO_CELL: i32 = -1;

/// Uniform grid over the simulation's wall box, expanded by a border
/// margin. Cell indices are row-major: `(z * res_y + y) * res_x + x`.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    /// Minimum corner of the expanded box (world units)
    min: Vec3,
    /// Grid extent, snapped to a whole number of cells (world units)
    size: Vec3,
    /// Cell count per axis
    resolution: IVec3,
    /// Cells per world unit, per axis
    delta: Vec3,
    /// World-space cell size
    cell_size: f32,
    /// Bucket heads, one per cell; NO_PARTICLE = empty
    buckets: Vec<i32>,
}

impl SpatialGrid {
    /// Build a grid covering `[box_min, box_max]` expanded by `border` on
    /// all sides. `cell_size` is in simulation (physical) units and is
    /// converted to world units through `sim_scale`.
    pub fn new(
        box_min: Vec3,
        box_max: Vec3,
        sim_scale: f32,
        cell_size: f32,
        border: f32,
    ) -> Result<Self, SphError> {
        assert!(cell_size > 0.0, "cell_size must be positive, got {}", cell_size);
        assert!(sim_scale > 0.0, "sim_scale must be positive, got {}", sim_scale);
        if box_max.cmple(box_min).any() {
            return Err(SphError::InvalidBounds {
                min: box_min,
                max: box_max,
            });
        }

        let world_cell_size = cell_size / sim_scale;
        let min = box_min - border;
        let max = box_max + border;
        let extent = max - min;

        let resolution = IVec3::new(
            (extent.x / world_cell_size).ceil() as i32,
            (extent.y / world_cell_size).ceil() as i32,
            (extent.z / world_cell_size).ceil() as i32,
        );
        // Snap the stored extent to a whole number of cells so cell
        // coordinates never round past the last row
        let size = resolution.as_vec3() * world_cell_size;
        let delta = resolution.as_vec3() / size;

        let cell_count = (resolution.x * resolution.y * resolution.z) as usize;

        Ok(Self {
            min,
            size,
            resolution,
            delta,
            cell_size: world_cell_size,
            buckets: vec![NO_PARTICLE; cell_count],
        })
    }

    /// Minimum corner of the grid (world units).
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner of the grid (world units).
    pub fn max(&self) -> Vec3 {
        self.min + self.size
    }

    /// Cell count per axis.
    pub fn resolution(&self) -> IVec3 {
        self.resolution
    }

    /// World-space size of one cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.buckets.len()
    }

    /// Rebuild every bucket from the current particle positions.
    ///
    /// Particles outside the grid get `next = -1` and appear in no bucket;
    /// they rejoin the grid as soon as their position maps back inside.
    pub fn insert_particles(&mut self, particles: &mut ParticleBuffer) {
        self.buckets.fill(NO_PARTICLE);
        for n in 0..particles.len() {
            let cell = self.find_cell(particles.get(n).position);
            let p = particles.get_mut(n);
            if cell >= 0 {
                p.next = self.buckets[cell as usize];
                self.buckets[cell as usize] = n as i32;
            } else {
                p.next = NO_PARTICLE;
            }
        }
    }

    /// Cell index containing `pos`, or -1 if outside the grid.
    pub fn find_cell(&self, pos: Vec3) -> i32 {
        let c = ((pos - self.min) * self.delta).floor();
        let (x, y, z) = (c.x as i32, c.y as i32, c.z as i32);
        if x < 0
            || y < 0
            || z < 0
            || x >= self.resolution.x
            || y >= self.resolution.y
            || z >= self.resolution.z
        {
            return NO_CELL;
        }
        (z * self.resolution.y + y) * self.resolution.x + x
    }

    /// The 2x2x2 block of cells that can contain anything within `radius`
    /// of `pos` (world units), chosen from the minimum corner
    /// `pos - radius`. Out-of-range entries are -1.
    ///
    /// Exhaustive only when the cell size is at least twice the search
    /// radius; the simulation guarantees that coupling at construction.
    pub fn find_cells(&self, pos: Vec3, radius: f32) -> [i32; 8] {
        let mut cells = [NO_CELL; 8];
        let (bx, by, bz) = self.base_cell(pos, radius);

        cells[0] = (bz * self.resolution.y + by) * self.resolution.x + bx;
        cells[1] = cells[0] + 1;
        cells[2] = cells[0] + self.resolution.x;
        cells[3] = cells[2] + 1;

        if bz + 1 < self.resolution.z {
            cells[4] = cells[0] + self.resolution.y * self.resolution.x;
            cells[5] = cells[4] + 1;
            cells[6] = cells[4] + self.resolution.x;
            cells[7] = cells[6] + 1;
        }
        if bx + 1 >= self.resolution.x {
            for k in [1, 3, 5, 7] {
                cells[k] = NO_CELL;
            }
        }
        if by + 1 >= self.resolution.y {
            for k in [2, 3, 6, 7] {
                cells[k] = NO_CELL;
            }
        }
        cells
    }

    /// The 4x4x4 block variant of [`find_cells`](Self::find_cells), for a
    /// search radius spanning up to two cells per direction.
    pub fn find_two_cells(&self, pos: Vec3, radius: f32) -> [i32; 64] {
        let mut cells = [NO_CELL; 64];
        let (bx, by, bz) = self.base_cell(pos, radius);

        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    if bx + x >= self.resolution.x
                        || by + y >= self.resolution.y
                        || bz + z >= self.resolution.z
                    {
                        continue;
                    }
                    cells[(16 * z + 4 * y + x) as usize] =
                        ((bz + z) * self.resolution.y + by + y) * self.resolution.x + bx + x;
                }
            }
        }
        cells
    }

    /// Head of the bucket chain for `cell`, or -1 for an empty bucket or
    /// an out-of-range index.
    pub fn bucket_head(&self, cell: i32) -> i32 {
        if cell < 0 || cell as usize >= self.buckets.len() {
            return NO_PARTICLE;
        }
        self.buckets[cell as usize]
    }

    /// Clamped cell coordinates of the minimum corner `pos - radius`.
    fn base_cell(&self, pos: Vec3, radius: f32) -> (i32, i32, i32) {
        let c = ((pos - radius - self.min) * self.delta).floor();
        (
            (c.x as i32).clamp(0, self.resolution.x - 1),
            (c.y as i32).clamp(0, self.resolution.y - 1),
            (c.z as i32).clamp(0, self.resolution.z - 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_grid() -> SpatialGrid {
        // 0.02 sim units / 0.004 scale = 5 world units per cell;
        // [0,50] + border 1 => 52 units => 11 cells per axis
        SpatialGrid::new(Vec3::ZERO, Vec3::splat(50.0), 0.004, 0.02, 1.0).unwrap()
    }

    #[test]
    fn test_resolution_snaps_to_cell_multiple() {
        let grid = test_grid();
        assert_eq!(grid.resolution(), IVec3::splat(11));
        assert_eq!(grid.cell_count(), 11 * 11 * 11);
        assert!((grid.cell_size() - 5.0).abs() < 1e-4);
        // Stored extent is resolution * cell_size, not the raw box extent
        let extent = grid.max() - grid.min();
        assert!((extent.x - 55.0).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_inverted_box() {
        let r = SpatialGrid::new(Vec3::splat(10.0), Vec3::splat(5.0), 0.004, 0.02, 1.0);
        assert!(r.is_err());
    }

    #[test]
    fn test_find_cell_mapping() {
        let grid = test_grid();
        // Grid min is (-1,-1,-1); first cell covers [-1, 4)
        assert_eq!(grid.find_cell(Vec3::ZERO), 0);
        assert_eq!(grid.find_cell(Vec3::new(4.5, 0.0, 0.0)), 1);
        assert_eq!(grid.find_cell(Vec3::new(0.0, 4.5, 0.0)), 11);
        assert_eq!(grid.find_cell(Vec3::new(0.0, 0.0, 4.5)), 11 * 11);
        // Outside on any axis
        assert_eq!(grid.find_cell(Vec3::new(-2.0, 0.0, 0.0)), NO_CELL);
        assert_eq!(grid.find_cell(Vec3::new(0.0, 60.0, 0.0)), NO_CELL);
    }

    #[test]
    fn test_insert_excludes_out_of_range() {
        let mut grid = test_grid();
        let cell_count = grid.cell_count();
        let mut particles = ParticleBuffer::new();
        particles.reset(4);
        particles.append().unwrap().position = Vec3::splat(10.0);
        particles.append().unwrap().position = Vec3::splat(-100.0);
        grid.insert_particles(&mut particles);

        assert_eq!(particles.get(1).next, NO_PARTICLE);
        let mut found = 0;
        for cell in 0..cell_count as i32 {
            let mut j = grid.bucket_head(cell);
            while j >= 0 {
                found += 1;
                j = particles.get(j as usize).next;
            }
        }
        assert_eq!(found, 1, "only the in-range particle may be bucketed");
    }

    #[test]
    fn test_insert_chains_same_cell() {
        let mut grid = test_grid();
        let mut particles = ParticleBuffer::new();
        particles.reset(4);
        for _ in 0..3 {
            particles.append().unwrap().position = Vec3::splat(10.0);
        }
        grid.insert_particles(&mut particles);

        let cell = grid.find_cell(Vec3::splat(10.0));
        let mut chain = Vec::new();
        let mut j = grid.bucket_head(cell);
        while j >= 0 {
            chain.push(j);
            j = particles.get(j as usize).next;
        }
        // Prepended in insertion order
        assert_eq!(chain, vec![2, 1, 0]);
    }

    #[test]
    fn test_find_cells_covers_radius() {
        let grid = test_grid();
        let pos = Vec3::new(10.0, 10.0, 10.0);
        let radius = 2.5; // == cell_size / 2, the guaranteed coupling
        let cells = grid.find_cells(pos, radius);

        // Every cell containing a point within `radius` of `pos` must be
        // among the candidates
        for dz in [-1.0f32, 1.0] {
            for dy in [-1.0f32, 1.0] {
                for dx in [-1.0f32, 1.0] {
                    let probe = pos + Vec3::new(dx, dy, dz) * (radius * 0.99);
                    let cell = grid.find_cell(probe);
                    assert!(
                        cells.contains(&cell),
                        "cell {} for offset ({},{},{}) not in candidates {:?}",
                        cell,
                        dx,
                        dy,
                        dz,
                        cells
                    );
                }
            }
        }
    }

    #[test]
    fn test_find_cells_masks_edges() {
        let grid = test_grid();
        // Minimum corner of the grid: only the base cell block survives
        let cells = grid.find_cells(grid.min() + 0.1, 2.5);
        assert_eq!(cells[0], 0);
        assert!(cells.iter().all(|&c| c == NO_CELL || c >= 0));
        // Maximum corner: the +1 offsets in x and y must be masked
        let cells = grid.find_cells(grid.max() - 0.1, 2.5);
        assert_eq!(cells[1], NO_CELL);
        assert_eq!(cells[2], NO_CELL);
        assert_eq!(cells[3], NO_CELL);
        assert!(cells[0] >= 0);
    }

    #[test]
    fn test_find_two_cells_interior_full_block() {
        let grid = test_grid();
        let cells = grid.find_two_cells(Vec3::splat(25.0), 7.5);
        assert!(cells.iter().all(|&c| c >= 0), "interior 4x4x4 block must be fully valid");
        let mut sorted: Vec<i32> = cells.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 64, "candidate cells must be distinct");
    }

    #[test]
    fn test_find_two_cells_masks_boundary() {
        let grid = test_grid();
        let cells = grid.find_two_cells(grid.max() - 0.1, 7.5);
        assert!(cells.contains(&NO_CELL));
        assert!(cells.iter().any(|&c| c >= 0));
    }
}
