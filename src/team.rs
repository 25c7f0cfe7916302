//! Team substrate: stands in for a process group and its collective
//! topology. Every unit of a run is a tokio task inside this one process;
//! `Team` is the logical handle each task holds to its group membership.

use std::sync::Arc;

use crate::error::GridMgError;

/// Shape of a team across the three grid axes, z (slowest) to x (fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamSpec {
    pub dims: [usize; 3],
}

impl TeamSpec {
    /// Mirrors `dash::TeamSpec<3>(size, 1, 1)`: start degenerate, all units
    /// along the z axis.
    pub fn new(size: usize) -> Self {
        Self { dims: [size, 1, 1] }
    }

    pub fn size(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Redistributes `size` across the three axes so the team shape is as
    /// close to cubic as an exact-divisor search finds, starting from the
    /// largest axis. Ties favor the earlier axis, matching the scan order
    /// a capability-negotiation pass would use over a sorted candidate list.
    pub fn balance_extents(&mut self) {
        let size = self.size();
        if size <= 1 {
            self.dims = [size.max(1), 1, 1];
            return;
        }
        let target = (size as f64).cbrt();
        let mut best = [size, 1, 1];
        let mut best_score = f64::MAX;
        for z in divisors(size) {
            let rest = size / z;
            for y in divisors(rest) {
                let x = rest / y;
                let score = (z as f64 - target).powi(2)
                    + (y as f64 - target).powi(2)
                    + (x as f64 - target).powi(2);
                if score < best_score {
                    best_score = score;
                    best = [z, y, x];
                }
            }
        }
        self.dims = best;
    }

    /// Converts a linear rank into (z, y, x) team coordinates.
    pub fn coords_of(&self, rank: usize) -> [usize; 3] {
        let z = rank / (self.dims[1] * self.dims[2]);
        let rem = rank % (self.dims[1] * self.dims[2]);
        let y = rem / self.dims[2];
        let x = rem % self.dims[2];
        [z, y, x]
    }

    /// Inverse of [`coords_of`]; returns `None` if any coordinate is
    /// out of range.
    pub fn rank_of(&self, coords: [i64; 3]) -> Option<usize> {
        for (c, d) in coords.iter().zip(self.dims.iter()) {
            if *c < 0 || *c as usize >= *d {
                return None;
            }
        }
        let [z, y, x] = [coords[0] as usize, coords[1] as usize, coords[2] as usize];
        Some((z * self.dims[1] + y) * self.dims[2] + x)
    }
}

fn divisors(n: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            out.push(d);
            if d != n / d {
                out.push(n / d);
            }
        }
        d += 1;
    }
    out.sort_unstable();
    out
}

/// A unit's handle to its team. Cheap to clone; the barrier is shared.
#[derive(Clone)]
pub struct Team {
    rank: usize,
    spec: TeamSpec,
    barrier: Arc<tokio::sync::Barrier>,
}

impl Team {
    pub fn new(rank: usize, spec: TeamSpec) -> Self {
        let barrier = Arc::new(tokio::sync::Barrier::new(spec.size()));
        Self { rank, spec, barrier }
    }

    /// Builds a full team of `size` units, one `Team` handle per rank,
    /// all sharing one barrier — the in-process analogue of `dash::Team::All()`.
    pub fn all(size: usize) -> Vec<Team> {
        let spec = TeamSpec::new(size);
        let barrier = Arc::new(tokio::sync::Barrier::new(size));
        (0..size)
            .map(|rank| Team {
                rank,
                spec,
                barrier: barrier.clone(),
            })
            .collect()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.spec.size()
    }

    pub fn spec(&self) -> TeamSpec {
        self.spec
    }

    pub fn coords(&self) -> [usize; 3] {
        self.spec.coords_of(self.rank)
    }

    pub async fn barrier(&self) {
        self.barrier.wait().await;
    }

    /// Splits this team into `factor` equally-sized groups and returns the
    /// subteam (size `self.size() / factor`) that this unit belongs to if
    /// it falls in group 0 (the "kept" group after an elastic shrink),
    /// or `None` if it is now passive.
    ///
    /// Every member of the parent team must call `split` with the same
    /// `factor`, in lockstep, so the returned barriers line up 1:1 across
    /// units that stay active — this mirrors `dash::Team::split`.
    pub fn split(&self, factor: usize, new_barrier: Arc<tokio::sync::Barrier>) -> Option<Team> {
        let new_size = self.spec.size() / factor;
        if new_size == 0 || self.rank >= new_size {
            return None;
        }
        let mut spec = TeamSpec::new(new_size);
        spec.balance_extents();
        Some(Team {
            rank: self.rank,
            spec,
            barrier: new_barrier,
        })
    }

    pub fn validate_rank(&self) -> Result<(), GridMgError> {
        if self.rank >= self.spec.size() {
            return Err(GridMgError::TeamShapeMismatch(self.spec.dims, self.rank));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn balance_extents_multiplies_back_to_size() {
        for size in [1usize, 2, 3, 7, 8, 12, 16, 27, 64, 100] {
            let mut spec = TeamSpec::new(size);
            spec.balance_extents();
            assert_eq!(spec.size(), size);
            assert!(spec.dims.iter().all(|&d| d > 0));
        }
    }

    #[test]
    fn coords_roundtrip() {
        let mut spec = TeamSpec::new(24);
        spec.balance_extents();
        for rank in 0..24 {
            let coords = spec.coords_of(rank);
            let coords_i = [coords[0] as i64, coords[1] as i64, coords[2] as i64];
            assert_eq!(spec.rank_of(coords_i), Some(rank));
        }
    }

    proptest! {
        #[test]
        fn balance_extents_never_zero_and_always_reconstructs_size(size in 1usize..2000) {
            let mut spec = TeamSpec::new(size);
            spec.balance_extents();
            prop_assert_eq!(spec.size(), size);
            prop_assert!(spec.dims.iter().all(|&d| d > 0));
        }

        #[test]
        fn coords_of_and_rank_of_roundtrip_for_any_balanced_size(size in 1usize..500) {
            let mut spec = TeamSpec::new(size);
            spec.balance_extents();
            for rank in 0..size {
                let coords = spec.coords_of(rank);
                let coords_i = [coords[0] as i64, coords[1] as i64, coords[2] as i64];
                prop_assert_eq!(spec.rank_of(coords_i), Some(rank));
            }
        }
    }
}
