//! Inner/boundary iteration split and the 6-point off-diagonal stencil
//! shared by the smoother and restriction, standing in for
//! `dash::halo::StencilOperator`'s `inner()`/`boundary()` iterators.

use super::dist_grid::DistGrid3D;

/// Off-diagonal coefficients of the 6-point stencil (`A`), one weight per
/// axis (applied symmetrically to both neighbors on that axis).
#[derive(Debug, Clone, Copy)]
pub struct OffDiag {
    pub az: f64,
    pub ay: f64,
    pub ax: f64,
}

impl OffDiag {
    /// `A_offdiag * u` at owned local coordinate `(z, y, x)`.
    pub fn apply(&self, grid: &DistGrid3D, z: i64, y: i64, x: i64) -> f64 {
        self.az * (grid.get(z - 1, y, x) + grid.get(z + 1, y, x))
            + self.ay * (grid.get(z, y - 1, x) + grid.get(z, y + 1, x))
            + self.ax * (grid.get(z, y, x - 1) + grid.get(z, y, x + 1))
    }
}

pub struct StencilOperator;

impl StencilOperator {
    /// True if the 6-point footprint of owned coordinate `(z, y, x)` reaches
    /// into the halo shell of a grid shaped `local`.
    pub fn touches_halo(local: [usize; 3], z: usize, y: usize, x: usize) -> bool {
        z == 0
            || y == 0
            || x == 0
            || z + 1 == local[0]
            || y + 1 == local[1]
            || x + 1 == local[2]
    }

    pub fn for_each_inner(local: [usize; 3], mut f: impl FnMut(i64, i64, i64)) {
        for z in 0..local[0] {
            for y in 0..local[1] {
                for x in 0..local[2] {
                    if !Self::touches_halo(local, z, y, x) {
                        f(z as i64, y as i64, x as i64);
                    }
                }
            }
        }
    }

    pub fn for_each_boundary(local: [usize; 3], mut f: impl FnMut(i64, i64, i64)) {
        for z in 0..local[0] {
            for y in 0..local[1] {
                for x in 0..local[2] {
                    if Self::touches_halo(local, z, y, x) {
                        f(z as i64, y as i64, x as i64);
                    }
                }
            }
        }
    }
}
