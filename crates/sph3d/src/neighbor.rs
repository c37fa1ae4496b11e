//! Per-tick packed neighbor cache.
//!
//! The density pass registers every (neighbor, distance) pair it finds so
//! the force pass can reuse them without re-walking the grid. Records for
//! one particle are staged in a fixed-size scratch block and copied into
//! a single packed buffer on commit, so unrelated particles' records
//! never interleave and no per-particle allocation happens in the hot
//! loop.

/// Per-particle neighbor cap; additional neighbors are dropped and
/// counted in [`NeighborCache::saturated_particles`].
pub const MAX_NEIGHBORS: usize = 100;

/// Packed buffer floor, in records.
const MIN_RECORDS: usize = 1024;

/// One neighbor of one particle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct NeighborRecord {
    index: u16,
    distance: f32,
}

/// Where a particle's records live in the packed buffer.
#[derive(Clone, Copy, Debug, Default)]
struct Entry {
    offset: u32,
    count: u16,
}

/// Neighbor lists for all particles, rebuilt every tick.
#[derive(Clone, Debug)]
pub struct NeighborCache {
    entries: Vec<Entry>,
    records: Vec<NeighborRecord>,
    /// Packed-buffer write cursor, in records
    cursor: usize,
    /// Particle whose scratch block is open
    current: usize,
    scratch: [NeighborRecord; MAX_NEIGHBORS],
    scratch_len: usize,
    scratch_full: bool,
    saturated: usize,
}

impl Default for NeighborCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NeighborCache {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            records: Vec::new(),
            cursor: 0,
            current: 0,
            scratch: [NeighborRecord::default(); MAX_NEIGHBORS],
            scratch_len: 0,
            scratch_full: false,
            saturated: 0,
        }
    }

    /// Invalidate all lists and make room for `particle_count` entries.
    /// The packed buffer is retained and overwritten in place.
    pub fn reset(&mut self, particle_count: usize) {
        self.entries.clear();
        self.entries.resize(particle_count, Entry::default());
        self.cursor = 0;
        self.saturated = 0;
    }

    /// Open a scratch block for particle `i`.
    pub fn begin(&mut self, i: usize) {
        debug_assert!(i < self.entries.len());
        self.current = i;
        self.scratch_len = 0;
        self.scratch_full = false;
    }

    /// Stage neighbor `j` at `distance`. Returns `false` without mutating
    /// the cache once the per-particle cap is reached; the caller should
    /// stop registering (but may keep scanning for other purposes).
    pub fn try_add(&mut self, j: u16, distance: f32) -> bool {
        if self.scratch_len >= MAX_NEIGHBORS {
            if !self.scratch_full {
                self.scratch_full = true;
                self.saturated += 1;
            }
            return false;
        }
        self.scratch[self.scratch_len] = NeighborRecord { index: j, distance };
        self.scratch_len += 1;
        true
    }

    /// Copy the scratch block into the packed buffer and record the
    /// particle's (offset, count).
    pub fn commit(&mut self) {
        let n = self.scratch_len;
        self.entries[self.current] = Entry {
            offset: self.cursor as u32,
            count: n as u16,
        };
        if n == 0 {
            return;
        }
        self.ensure_capacity(self.cursor + n);
        self.records[self.cursor..self.cursor + n].copy_from_slice(&self.scratch[..n]);
        self.cursor += n;
    }

    /// Number of committed neighbors of particle `i`.
    pub fn count(&self, i: usize) -> usize {
        self.entries[i].count as usize
    }

    /// The `k`-th committed neighbor of particle `i` as
    /// `(neighbor index, distance)`. Panics on an out-of-range `k`.
    pub fn get(&self, i: usize, k: usize) -> (u16, f32) {
        let entry = self.entries[i];
        assert!(k < entry.count as usize, "neighbor {} of {} out of range", k, i);
        let record = self.records[entry.offset as usize + k];
        (record.index, record.distance)
    }

    /// Particles whose neighbor list overflowed the cap this tick.
    pub fn saturated_particles(&self) -> usize {
        self.saturated
    }

    fn ensure_capacity(&mut self, need: usize) {
        if need <= self.records.len() {
            return;
        }
        let mut len = self.records.len().max(1);
        while len < need {
            len *= 2;
        }
        self.records.resize(len.max(MIN_RECORDS), NeighborRecord::default());
    }
}
