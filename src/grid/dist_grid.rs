//! Block-distributed dense 3D array with a one-cell halo shell, the stand-in
//! for `dash::NArray<double, 3>` over a `BLOCKED` distribution pattern.

use crate::team::Team;

/// Splits a global extent of `global` cells across `nunits` units along one
/// axis, giving the remainder to the lowest-ranked units first — the same
/// rule `dash`'s `BLOCKED` pattern uses.
pub fn partition_1d(global: usize, nunits: usize, coord: usize) -> (usize, usize) {
    let base = global / nunits;
    let rem = global % nunits;
    let local_len = base + if coord < rem { 1 } else { 0 };
    let offset = coord * base + coord.min(rem);
    (offset, local_len)
}

/// One unit's block of a block-distributed 3D array, padded with a
/// one-cell halo shell on every face (so edges and corners of the shell are
/// filled too, covering all 26 neighbor directions at once).
#[derive(Clone)]
pub struct DistGrid3D {
    pub global: [usize; 3],
    pub local: [usize; 3],
    pub offset: [usize; 3],
    data: Vec<f64>,
}

impl DistGrid3D {
    pub fn zeros(team: &Team, global: [usize; 3]) -> Self {
        let spec = team.spec();
        let coords = team.coords();
        let mut local = [0usize; 3];
        let mut offset = [0usize; 3];
        for d in 0..3 {
            let (off, len) = partition_1d(global[d], spec.dims[d], coords[d]);
            local[d] = len;
            offset[d] = off;
        }
        let padded = (local[0] + 2) * (local[1] + 2) * (local[2] + 2);
        Self {
            global,
            local,
            offset,
            data: vec![0.0; padded],
        }
    }

    /// Local storage index for local coordinates `(z, y, x)` where `-1`
    /// and `local[d]` address the halo shell on either side of axis `d`.
    #[inline]
    fn idx(&self, z: i64, y: i64, x: i64) -> usize {
        let lz = (z + 1) as usize;
        let ly = (y + 1) as usize;
        let lx = (x + 1) as usize;
        debug_assert!(lz <= self.local[0] + 1 && ly <= self.local[1] + 1 && lx <= self.local[2] + 1);
        (lz * (self.local[1] + 2) + ly) * (self.local[2] + 2) + lx
    }

    #[inline]
    pub fn get(&self, z: i64, y: i64, x: i64) -> f64 {
        self.data[self.idx(z, y, x)]
    }

    #[inline]
    pub fn set(&mut self, z: i64, y: i64, x: i64, v: f64) {
        let i = self.idx(z, y, x);
        self.data[i] = v;
    }

    /// Global coordinate of local interior coordinate `(z, y, x)`, `z`/`y`/`x`
    /// in `0..local[d]`.
    pub fn global_coord(&self, z: usize, y: usize, x: usize) -> [usize; 3] {
        [self.offset[0] + z, self.offset[1] + y, self.offset[2] + x]
    }

    /// Fills the strictly-local interior (no halo) from a function of
    /// global coordinates.
    pub fn fill_interior(&mut self, f: impl Fn([usize; 3]) -> f64) {
        for z in 0..self.local[0] {
            for y in 0..self.local[1] {
                for x in 0..self.local[2] {
                    let g = self.global_coord(z, y, x);
                    self.set(z as i64, y as i64, x as i64, f(g));
                }
            }
        }
    }

    pub fn is_interior(&self, z: i64, y: i64, x: i64) -> bool {
        z >= 1
            && y >= 1
            && x >= 1
            && (z as usize) <= self.local[0].saturating_sub(2)
            && (y as usize) <= self.local[1].saturating_sub(2)
            && (x as usize) <= self.local[2].saturating_sub(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;
    use proptest::prelude::*;

    #[test]
    fn partition_covers_extent_exactly() {
        for nunits in [1usize, 2, 3, 5] {
            let global = 17;
            let mut covered = 0;
            for coord in 0..nunits {
                let (off, len) = partition_1d(global, nunits, coord);
                assert_eq!(off, covered);
                covered += len;
            }
            assert_eq!(covered, global);
        }
    }

    #[tokio::test]
    async fn fill_interior_matches_global_coords() {
        let teams = Team::all(1);
        let grid = {
            let mut g = DistGrid3D::zeros(&teams[0], [4, 4, 4]);
            g.fill_interior(|[z, y, x]| (z + y + x) as f64);
            g
        };
        assert_eq!(grid.get(2, 1, 0), 3.0);
    }

    proptest! {
        #[test]
        fn partition_covers_any_extent_exactly_once(global in 1usize..500, nunits in 1usize..64) {
            let mut covered = 0;
            for coord in 0..nunits {
                let (off, len) = partition_1d(global, nunits, coord);
                prop_assert_eq!(off, covered);
                covered += len;
            }
            prop_assert_eq!(covered, global);
        }
    }
}
