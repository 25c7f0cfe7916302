//! Prolongation (coarse → fine): tri-linear interpolation of the coarse
//! correction onto the fine grid, added into `fine.dst()`.
//!
//! Each fine axis coordinate is either exactly aligned with a coarse index
//! (even) or straddles two coarse indices (odd); averaging over every
//! combination of aligned/straddled axes gives the tri-linear stencil
//! without enumerating face/edge/corner cases separately: one straddled
//! axis averages 2 neighbors (a face), two average 4 (an edge), three
//! average 8 (a corner), zero is a direct copy (the center).

use crate::grid::StencilOperator;
use crate::level::Level;

fn axis_neighbors(v: i64) -> [i64; 2] {
    if v % 2 == 0 {
        [v / 2, v / 2]
    } else {
        [v / 2, v / 2 + 1]
    }
}

fn interpolate(coarse: &Level, z: i64, y: i64, x: i64) -> f64 {
    let zs = axis_neighbors(z);
    let ys = axis_neighbors(y);
    let xs = axis_neighbors(x);
    let mut sum = 0.0;
    let mut seen = std::collections::HashSet::new();
    for &cz in &zs {
        for &cy in &ys {
            for &cx in &xs {
                if seen.insert((cz, cy, cx)) {
                    sum += coarse.src().get(cz, cy, cx);
                }
            }
        }
    }
    sum / seen.len() as f64
}

/// Begins an async halo update of `coarse`'s solution grid, interpolates
/// the fine interior while it is in flight, then waits and finishes the
/// fine points adjacent to the fine block's own boundary (which may need
/// coarse halo data).
pub async fn scaleup(coarse: &mut Level, fine: &mut Level) -> anyhow::Result<()> {
    let fine_local = fine.local();
    let snapshot = coarse.src().clone();
    let ticket = coarse.halo.update_async(&snapshot);

    StencilOperator::for_each_inner(fine_local, |z, y, x| {
        let v = interpolate(coarse, z, y, x);
        let old = fine.dst().get(z, y, x);
        fine.dst_mut().set(z, y, x, old + v);
    });

    {
        let halo = coarse.halo.clone();
        let src = coarse.src_mut();
        halo.wait(ticket, src).await?;
    }

    StencilOperator::for_each_boundary(fine_local, |z, y, x| {
        let v = interpolate(coarse, z, y, x);
        let old = fine.dst().get(z, y, x);
        fine.dst_mut().set(z, y, x, old + v);
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;

    #[tokio::test]
    async fn prolongation_of_constant_field_is_constant() {
        let teams = Team::all(1);
        let mut fine = Level::finest(teams[0].clone(), 4, [1.0, 1.0, 1.0]);
        let mut coarse = Level::coarser_than(&fine, teams[0].clone());
        coarse.src_mut().fill_interior(|_| 5.0);
        scaleup(&mut coarse, &mut fine).await.unwrap();
        let c = fine.global[0] as i64 / 2;
        assert_eq!(fine.dst().get(c, c, c), 5.0);
    }
}
