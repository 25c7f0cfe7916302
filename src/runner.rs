//! Top-level drivers, one per CLI mode. Each spawns one tokio task per
//! simulated unit and joins them, since every unit runs the same
//! collective code path in lockstep.

use tracing::info;

use crate::allreduce::AsyncAllreduce;
use crate::config::RunConfig;
use crate::cycle::{build_forest, recursive_cycle, CycleParams, LevelNode};
use crate::diagnostics::check_symmetry;
use crate::level::Level;
use crate::smoother::smoothen_final;
use crate::team::Team;
use crate::telemetry::Telemetry;

/// Sweeps per level on the way down/up a cycle.
const BETA: u32 = 20;
/// Gamma=2 selects a W-cycle.
const GAMMA_W_CYCLE: u32 = 2;
const FLAT_MAX_SWEEPS: u32 = 100_000;
/// `check_symmetry`'s tolerance in flat mode, fixed independently of
/// `--eps`.
const FLAT_SYMMETRY_EPS: f64 = 0.01;

async fn unit_multigrid(
    mut node: LevelNode,
    rank: usize,
    params: CycleParams,
    eps: f64,
) -> anyhow::Result<f64> {
    let mut telemetry = Telemetry::new();
    telemetry.start("algorithm");
    let residual = recursive_cycle(&mut node, &params).await?;

    let finest = match &mut node {
        LevelNode::Normal { level, allreduce, .. } => {
            info!(rank, eps, "final smoothing");
            let (sweeps, last) = smoothen_final(level, allreduce, eps, FLAT_MAX_SWEEPS).await?;
            info!(rank, sweeps, residual = last, "final smoothing converged");
            Some(level)
        }
        LevelNode::Leaf { level, .. } => Some(level),
        LevelNode::Shrink { level, .. } => Some(level),
        LevelNode::Passive => None,
    };
    telemetry.stop("algorithm", 1, 0);
    telemetry.print(rank, &["algorithm"]);

    if let Some(level) = finest {
        if !check_symmetry(level, eps).await {
            tracing::warn!(rank, "test for asymmetry of solution failed");
        }
    }
    Ok(residual)
}

/// Runs the default (non-elastic) multigrid W-cycle solver.
pub async fn run_multigrid(config: &RunConfig) -> anyhow::Result<f64> {
    info!(units = config.units, levels = config.levels, "run multigrid iteration");
    let forest = build_forest(config.units, config.levels, config.dim, None);
    let params = CycleParams {
        beta: BETA,
        gamma: GAMMA_W_CYCLE,
        eps: config.eps,
    };

    let mut handles = Vec::with_capacity(forest.len());
    for (rank, node) in forest.into_iter().enumerate() {
        let params = CycleParams {
            beta: params.beta,
            gamma: params.gamma,
            eps: params.eps,
        };
        let eps = config.eps;
        handles.push(tokio::spawn(
            async move { unit_multigrid(node, rank, params, eps).await },
        ));
    }

    let mut last = 0.0;
    for h in handles {
        last = h.await??;
    }
    Ok(last)
}

/// Runs the elastic multigrid solver: the team shrinks by a factor of 8
/// every `shrink_every` levels.
pub async fn run_multigrid_elastic(config: &RunConfig, shrink_every: u32) -> anyhow::Result<f64> {
    info!(
        units = config.units,
        levels = config.levels,
        shrink_every,
        "run elastic multigrid iteration"
    );
    let forest = build_forest(config.units, config.levels, config.dim, Some(shrink_every));
    let params = CycleParams {
        beta: BETA,
        gamma: GAMMA_W_CYCLE,
        eps: config.eps,
    };

    let mut handles = Vec::with_capacity(forest.len());
    for (rank, node) in forest.into_iter().enumerate() {
        let params = CycleParams {
            beta: params.beta,
            gamma: params.gamma,
            eps: params.eps,
        };
        let eps = config.eps;
        handles.push(tokio::spawn(
            async move { unit_multigrid(node, rank, params, eps).await },
        ));
    }

    let mut last = 0.0;
    for h in handles {
        last = h.await??;
    }
    Ok(last)
}

/// Runs plain weighted-Jacobi on the finest grid with no multigrid
/// acceleration, for comparison against the cycle-based solvers.
pub async fn run_flat(config: &RunConfig) -> anyhow::Result<f64> {
    info!(units = config.units, levels = config.levels, "run flat iteration");
    let teams = Team::all(config.units);
    let mut handles = Vec::with_capacity(teams.len());
    for team in teams {
        let extents = config.dim;
        let levels = config.levels;
        let eps = config.eps;
        handles.push(tokio::spawn(async move {
            let rank = team.rank();
            let mut level = Level::finest(team.clone(), levels, extents);
            let allreduce = AsyncAllreduce::new(team);
            allreduce.reset().await?;
            let (sweeps, residual) =
                smoothen_final(&mut level, &allreduce, eps, FLAT_MAX_SWEEPS).await?;
            info!(rank, sweeps, residual, "smoothing: flat iteration finished");
            if !check_symmetry(&level, FLAT_SYMMETRY_EPS).await {
                tracing::warn!(rank, "test for asymmetry of solution failed");
            }
            anyhow::Ok(residual)
        }));
    }
    let mut last = 0.0;
    for h in handles {
        last = h.await??;
    }
    Ok(last)
}

/// Runs a fixed-size time-stepping simulation for `timerange` seconds,
/// logging progress every `dt_out` seconds, on a single (non-multigrid)
/// finest grid.
pub async fn run_simulation(config: &RunConfig, timerange: f64, dt_out: f64) -> anyhow::Result<f64> {
    info!(
        units = config.units,
        levels = config.levels,
        timerange,
        dt_out,
        "run simulation"
    );
    let teams = Team::all(config.units);
    let mut handles = Vec::with_capacity(teams.len());
    for team in teams {
        let extents = config.dim;
        let levels = config.levels;
        handles.push(tokio::spawn(async move {
            let rank = team.rank();
            let mut level = Level::finest(team.clone(), levels, extents);
            let dt = Level::max_dt(extents, level.global);
            level.set_dt(dt);
            let allreduce = AsyncAllreduce::new(team);
            allreduce.reset().await?;

            let mut time = 0.0;
            let mut time_next = dt_out;
            let mut steps = 0u64;
            info!(rank, time, steps, "simulation tick");

            while time < timerange {
                while time + dt < time_next {
                    crate::smoother::smoothen(&mut level, &allreduce).await?;
                    steps += 1;
                    time += dt;
                }
                let shorten = (time_next - time) / dt;
                level.set_dt(dt * shorten);
                crate::smoother::smoothen(&mut level, &allreduce).await?;
                level.set_dt(dt);
                steps += 1;
                time += time_next - time;
                time_next += dt_out;
                info!(rank, time, steps, "simulation tick");
            }
            anyhow::Ok(allreduce.get())
        }));
    }
    let mut last = 0.0;
    for h in handles {
        last = h.await??;
    }
    Ok(last)
}
