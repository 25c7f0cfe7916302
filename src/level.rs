//! One grid level of the multigrid hierarchy: the finite-difference
//! coefficients, the two rotating solution buffers, and the right-hand
//! side.

use crate::grid::{BoundaryFn, DistGrid3D, HaloExchange, OffDiag};
use crate::team::Team;

/// Coefficients of the discretized heat/Poisson operator at one level.
#[derive(Debug, Clone, Copy)]
pub struct Coeffs {
    pub offdiag: OffDiag,
    /// Center coefficient of `A`.
    pub ac: f64,
    /// Jacobi damping weight applied to the residual correction.
    pub m: f64,
    /// Forcing scale applied to the right-hand side.
    pub ff: f64,
    pub dt: f64,
}

pub struct Level {
    pub team: Team,
    buf: [DistGrid3D; 2],
    cur: usize,
    pub halo: HaloExchange,
    pub rhs: DistGrid3D,
    pub coeffs: Coeffs,
    pub global: [usize; 3],
    pub extents: [f64; 3],
}

impl Level {
    /// Spacing along each axis given the physical box size and point count.
    fn spacing(extents: [f64; 3], global: [usize; 3]) -> [f64; 3] {
        [
            extents[0] / (global[0] as f64 + 1.0),
            extents[1] / (global[1] as f64 + 1.0),
            extents[2] / (global[2] as f64 + 1.0),
        ]
    }

    /// `dt = 0.5 * hmin^2`, the largest stable explicit time step for this
    /// level's mesh spacing.
    pub fn max_dt(extents: [f64; 3], global: [usize; 3]) -> f64 {
        let h = Self::spacing(extents, global);
        0.5 * h.iter().cloned().fold(f64::MAX, f64::min).powi(2)
    }

    /// Static (steady-state) operator coefficients: `A` is the negative
    /// discrete Laplacian (`ac = -2*(ax+ay+az)` positive, `ax/ay/az`
    /// negative), `m = 1/ac` is the Jacobi-optimal damping for that
    /// diagonal, and `ff = 1.0` leaves the right-hand side unscaled. `dt`
    /// is carried along only as the mesh's stability limit for callers that
    /// later switch this level to time-stepping via `set_dt`.
    fn static_coeffs_for(extents: [f64; 3], global: [usize; 3]) -> Coeffs {
        let h = Self::spacing(extents, global);
        let az = -1.0 / (h[0] * h[0]);
        let ay = -1.0 / (h[1] * h[1]);
        let ax = -1.0 / (h[2] * h[2]);
        let ac = -2.0 * (az + ay + ax);
        Coeffs {
            offdiag: OffDiag { az, ay, ax },
            ac,
            m: 1.0 / ac,
            ff: 1.0,
            dt: Self::max_dt(extents, global),
        }
    }

    /// Explicit time-stepping coefficients for the heat equation: one
    /// forward-Euler step of size `dt` folded directly into `A` and `ff`.
    fn time_step_coeffs_for(extents: [f64; 3], global: [usize; 3], dt: f64) -> Coeffs {
        let h = Self::spacing(extents, global);
        let az = dt / (h[0] * h[0]);
        let ay = dt / (h[1] * h[1]);
        let ax = dt / (h[2] * h[2]);
        let ac = 1.0 - 2.0 * (az + ay + ax);
        Coeffs {
            offdiag: OffDiag { az, ay, ax },
            ac,
            m: 1.0,
            ff: dt,
            dt,
        }
    }

    /// Builds the finest level: `global[d] = 2^levels - 1` points on every
    /// axis, hot-disk boundary on the solution grid, static (steady-state)
    /// coefficients.
    pub fn finest(team: Team, levels: u32, extents: [f64; 3]) -> Self {
        let n = (1usize << levels) - 1;
        let global = [n, n, n];
        let coeffs = Self::static_coeffs_for(extents, global);
        Self::new(team, global, extents, coeffs, crate::problem::hot_disk_boundary(global))
    }

    /// Builds the level directly coarser than `parent`: half the points on
    /// every axis (rounded down, matching `(n-1)/2` for odd `n`), same
    /// physical extents, zero boundary. Coefficients are inherited verbatim
    /// from `parent` rather than recomputed from the coarser spacing.
    pub fn coarser_than(parent: &Level, team: Team) -> Self {
        let global = [
            (parent.global[0] - 1) / 2,
            (parent.global[1] - 1) / 2,
            (parent.global[2] - 1) / 2,
        ];
        let extents = parent.extents;
        let coeffs = parent.coeffs;
        Self::new(team, global, extents, coeffs, crate::problem::zero_boundary())
    }

    fn new(
        team: Team,
        global: [usize; 3],
        extents: [f64; 3],
        coeffs: Coeffs,
        boundary: BoundaryFn,
    ) -> Self {
        let halo = HaloExchange::new(team.clone(), boundary);
        let mut src = DistGrid3D::zeros(&team, global);
        let dst = DistGrid3D::zeros(&team, global);
        let rhs = DistGrid3D::zeros(&team, global);
        src.fill_interior(|_| 0.0);
        Self {
            team,
            buf: [src, dst],
            cur: 0,
            halo,
            rhs,
            coeffs,
            global,
            extents,
        }
    }

    pub fn src(&self) -> &DistGrid3D {
        &self.buf[self.cur]
    }

    pub fn src_mut(&mut self) -> &mut DistGrid3D {
        &mut self.buf[self.cur]
    }

    pub fn dst(&self) -> &DistGrid3D {
        &self.buf[1 - self.cur]
    }

    pub fn dst_mut(&mut self) -> &mut DistGrid3D {
        &mut self.buf[1 - self.cur]
    }

    /// Rotates `dst` into `src` for the next sweep. An involution: calling
    /// it twice returns the buffer roles to their original state.
    pub fn swap(&mut self) {
        self.cur = 1 - self.cur;
    }

    pub fn local(&self) -> [usize; 3] {
        self.src().local
    }

    /// Switches this level onto explicit time-stepping coefficients for
    /// step size `dt`, replacing whatever static or time-step coefficients
    /// it held before. Used by the time-stepping driver both to enter
    /// time-stepping mode and to shorten the last step of an output
    /// interval instead of overshooting it.
    pub fn set_dt(&mut self, dt: f64) {
        self.coeffs = Self::time_step_coeffs_for(self.extents, self.global, dt);
    }

    /// Full operator `A * u` at owned local coordinate `(z, y, x)` of `src`.
    pub fn apply_a(&self, z: i64, y: i64, x: i64) -> f64 {
        let grid = self.src();
        self.coeffs.ac * grid.get(z, y, x) + self.coeffs.offdiag.apply(grid, z, y, x)
    }

    /// Weighted-Jacobi update `u + m * (ff * rhs - A * u)` at owned local
    /// coordinate `(z, y, x)` of `src`, read-only.
    pub fn point_update(&self, z: i64, y: i64, x: i64) -> f64 {
        let u = self.src().get(z, y, x);
        let rhs = self.rhs.get(z, y, x);
        let residual = self.coeffs.ff * rhs - self.apply_a(z, y, x);
        u + self.coeffs.m * residual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_is_an_involution() {
        let teams = Team::all(1);
        let mut level = Level::finest(teams[0].clone(), 3, [1.0, 1.0, 1.0]);
        level.src_mut().set(0, 0, 0, 42.0);
        level.dst_mut().set(0, 0, 0, 7.0);
        level.swap();
        level.swap();
        assert_eq!(level.src().get(0, 0, 0), 42.0);
        assert_eq!(level.dst().get(0, 0, 0), 7.0);
    }

    #[test]
    fn coarser_level_has_roughly_half_the_points() {
        let teams = Team::all(1);
        let fine = Level::finest(teams[0].clone(), 4, [1.0, 1.0, 1.0]);
        let coarse = Level::coarser_than(&fine, teams[0].clone());
        assert_eq!(coarse.global[0], (fine.global[0] - 1) / 2);
    }
}
