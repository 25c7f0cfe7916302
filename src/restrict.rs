//! Restriction (fine → coarse): straight-injects the fine residual at even
//! fine coordinates into the coarse right-hand side.
//!
//! `coarse.rhs[i,j,k] = K * (ff * rhs_fine[2i,2j,2k] - A * u_fine[2i,2j,2k])`,
//! with `A * u = A_offdiag * u + ac * u` the full 7-point operator including
//! the diagonal term.
//!
//! `K = 4.0` is an empirical constant, not the textbook `1/8`: the `1/8`
//! factor for this discretization fails to converge, so it is left as-is
//! rather than "corrected" into a non-converging solver.

use crate::grid::StencilOperator;
use crate::level::Level;

const EXTRA_FACTOR: f64 = 4.0;

fn injected_value(fine: &Level, fz: i64, fy: i64, fx: i64) -> f64 {
    let a_u = fine.coeffs.offdiag.apply(fine.src(), fz, fy, fx)
        + fine.coeffs.ac * fine.src().get(fz, fy, fx);
    EXTRA_FACTOR * (fine.coeffs.ff * fine.rhs.get(fz, fy, fx) - a_u)
}

/// Begins an async halo update of `fine`'s solution grid, computes the
/// interior of `coarse.rhs` while it is in flight, then waits and finishes
/// the coarse points adjacent to the fine halo.
pub async fn scaledown(fine: &mut Level, coarse: &mut Level) -> anyhow::Result<()> {
    let coarse_local = coarse.local();
    let snapshot = fine.src().clone();
    let ticket = fine.halo.update_async(&snapshot);

    StencilOperator::for_each_inner(coarse_local, |i, j, k| {
        let v = injected_value(fine, 2 * i, 2 * j, 2 * k);
        coarse.rhs.set(i, j, k, v);
    });

    {
        let halo = fine.halo.clone();
        let src = fine.src_mut();
        halo.wait(ticket, src).await?;
    }

    StencilOperator::for_each_boundary(coarse_local, |i, j, k| {
        let v = injected_value(fine, 2 * i, 2 * j, 2 * k);
        coarse.rhs.set(i, j, k, v);
    });

    Ok(())
}

/// Coarse-boundary counterpart of [`scaledown`] is intentionally not wired
/// up: every level but the finest uses a zero boundary (see
/// `problem::zero_boundary`) instead, so no call site needs this.
#[allow(dead_code)]
pub fn scaledownboundary(_fine: &Level, _coarse: &mut Level) {
    unreachable!("scaledownboundary is unreachable on the default multigrid path")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;

    #[tokio::test]
    async fn restriction_preserves_zero_field() {
        let teams = Team::all(1);
        let mut fine = Level::finest(teams[0].clone(), 4, [1.0, 1.0, 1.0]);
        let mut coarse = Level::coarser_than(&fine, teams[0].clone());
        scaledown(&mut fine, &mut coarse).await.unwrap();
        let c = coarse.global[0] as i64 / 2;
        assert_eq!(coarse.rhs.get(c, c, c), 0.0);
    }
}
