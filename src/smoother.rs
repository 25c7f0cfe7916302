//! Weighted-Jacobi smoother: one sweep computes
//! `u_new = u + m * (ff * rhs - A * u)`, overlapping the halo exchange
//! needed for boundary-adjacent points with the interior update.

use tracing::debug;

use crate::allreduce::AsyncAllreduce;
use crate::grid::StencilOperator;
use crate::level::Level;

/// Runs one smoothing sweep. Returns the global max residual *from the
/// previous sweep's reduction* — `AsyncAllreduce` is pipelined by one
/// sweep: the reduction launched by this call is only observed on the
/// following call.
pub async fn smoothen(level: &mut Level, allreduce: &AsyncAllreduce) -> anyhow::Result<f64> {
    let prior_residual = allreduce.get();
    allreduce.reset().await?;

    let local = level.local();
    let snapshot = level.src().clone();
    let ticket = level.halo.update_async(&snapshot);

    let mut local_max: f64 = 0.0;
    StencilOperator::for_each_inner(local, |z, y, x| {
        let old = level.src().get(z, y, x);
        let v = level.point_update(z, y, x);
        level.dst_mut().set(z, y, x, v);
        local_max = local_max.max((v - old).abs());
    });

    {
        let halo = level.halo.clone();
        let src = level.src_mut();
        halo.wait(ticket, src).await?;
    }

    StencilOperator::for_each_boundary(local, |z, y, x| {
        let old = level.src().get(z, y, x);
        let v = level.point_update(z, y, x);
        level.dst_mut().set(z, y, x, v);
        local_max = local_max.max((v - old).abs());
    });

    allreduce.set(local_max);
    allreduce.collect_and_spread_pipelined();

    level.swap();
    debug!(rank = level.team.rank(), prior_residual, "smoothing sweep");
    Ok(prior_residual)
}

/// Runs sweeps until the (pipelined) residual drops below `eps`, capped at
/// `max_sweeps`. Returns the number of sweeps actually run and the last
/// observed residual.
pub async fn smoothen_final(
    level: &mut Level,
    allreduce: &AsyncAllreduce,
    eps: f64,
    max_sweeps: u32,
) -> anyhow::Result<(u32, f64)> {
    let mut last = f64::MAX;
    for sweep in 0..max_sweeps {
        last = smoothen(level, allreduce).await?;
        if sweep > 0 && last < eps {
            return Ok((sweep, last));
        }
    }
    Ok((max_sweeps, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;

    #[tokio::test]
    async fn single_sweep_preserves_zero_interior_with_zero_rhs() {
        let teams = Team::all(1);
        let mut level = Level::finest(teams[0].clone(), 3, [1.0, 1.0, 1.0]);
        let allreduce = AsyncAllreduce::new(teams[0].clone());
        allreduce.reset().await.unwrap();
        let _ = smoothen(&mut level, &allreduce).await.unwrap();
        // With u=0 and rhs=0 everywhere in the interior, the only nonzero
        // contribution comes from the boundary-adjacent points reading the
        // hot-disk halo, so the grid center should remain exactly zero
        // after a single sweep.
        let c = level.global[0] as i64 / 2;
        assert_eq!(level.src().get(c, c, c), 0.0);
    }
}
