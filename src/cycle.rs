//! CycleDriver: the recursive V/W-cycle over the level hierarchy.
//!
//! `LevelNode::Passive` represents a unit that has dropped out of an
//! elastic team shrink. A unit only ever becomes `Passive` as the child of a
//! `Shrink` node, and the two barriers that node's `TeamTransfer` performs
//! (scatter-then-barrier, barrier-then-gather) are exactly the collective
//! operations a dropped unit still owes its surviving siblings — nothing
//! deeper needs its participation, so `Passive` carries no further state.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::allreduce::AsyncAllreduce;
use crate::level::Level;
use crate::prolong::scaleup;
use crate::restrict::scaledown;
use crate::smoother::{smoothen, smoothen_final};
use crate::team::Team;
use crate::transfer::TeamTransfer;

/// Each elastic shrink divides the active unit count by this factor.
const SHRINK_FACTOR: usize = 8;

/// Cap on coarsest-level Jacobi sweeps, matching the flat-mode cap used
/// when no multigrid acceleration is in play.
const MAX_COARSE_SWEEPS: u32 = 100_000;

pub enum LevelNode {
    /// Coarsest level: smoothed to convergence instead of recursing.
    Leaf {
        level: Level,
        allreduce: AsyncAllreduce,
    },
    /// An ordinary level: presmooth, restrict, recurse `gamma` times,
    /// prolong, postsmooth.
    Normal {
        level: Level,
        allreduce: AsyncAllreduce,
        child: Box<LevelNode>,
    },
    /// A team-shrink boundary: no smoothing here, just transfer the grid
    /// down to the (smaller) child team and back, with `gamma = 1`
    /// regardless of the driver's configured `gamma`.
    Shrink {
        level: Level,
        transfer: TeamTransfer,
        child: Box<LevelNode>,
    },
    /// This unit was shed at the enclosing `Shrink` node; it has no work
    /// at this depth or below.
    Passive,
}

impl LevelNode {
    pub fn level_mut(&mut self) -> Option<&mut Level> {
        match self {
            LevelNode::Leaf { level, .. }
            | LevelNode::Normal { level, .. }
            | LevelNode::Shrink { level, .. } => Some(level),
            LevelNode::Passive => None,
        }
    }

    pub fn level(&self) -> Option<&Level> {
        match self {
            LevelNode::Leaf { level, .. }
            | LevelNode::Normal { level, .. }
            | LevelNode::Shrink { level, .. } => Some(level),
            LevelNode::Passive => None,
        }
    }
}

pub struct CycleParams {
    pub beta: u32,
    pub gamma: u32,
    pub eps: f64,
}

/// Runs one recursive cycle starting at `node`, returning the global
/// residual observed at this node's own level (the prior-sweep pipelined
/// value from the last smoothing call made here).
pub fn recursive_cycle<'a>(
    node: &'a mut LevelNode,
    params: &'a CycleParams,
) -> BoxFuture<'a, anyhow::Result<f64>> {
    Box::pin(async move {
        match node {
            LevelNode::Leaf { level, allreduce } => {
                let (sweeps, residual) =
                    smoothen_final(level, allreduce, params.eps, MAX_COARSE_SWEEPS).await?;
                debug!(rank = level.team.rank(), sweeps, residual, "coarsest level converged");
                Ok(residual)
            }

            LevelNode::Passive => Ok(0.0),

            LevelNode::Shrink {
                level,
                transfer,
                child,
            } => {
                transfer.transfer_to_fewer(level, child.level_mut()).await;
                let residual = recursive_cycle(
                    child,
                    &CycleParams {
                        beta: params.beta,
                        gamma: 1,
                        eps: params.eps,
                    },
                )
                .await?;
                transfer.transfer_to_more(child.level(), level).await;
                Ok(residual)
            }

            LevelNode::Normal {
                level,
                allreduce,
                child,
            } => {
                let mut residual = 0.0;
                for _ in 0..params.beta {
                    residual = smoothen(level, allreduce).await?;
                }

                {
                    let child_level = child
                        .level_mut()
                        .expect("Normal node's child must own a Level");
                    scaledown(level, child_level).await?;
                }

                for _ in 0..params.gamma {
                    residual = recursive_cycle(child, params).await?;
                }

                {
                    // `scaleup` takes the coarse level `&mut` for its own
                    // halo exchange of the (read-only) correction.
                    let child_level = child
                        .level_mut()
                        .expect("Normal node's child must own a Level");
                    scaleup(child_level, level).await?;
                }
                level.swap();

                for _ in 0..params.beta {
                    residual = smoothen(level, allreduce).await?;
                }
                Ok(residual)
            }
        }
    })
}

/// Builds one `LevelNode` tree per original unit (`n_units` of them), from
/// the finest level down to the coarsest. `shrink_every` is `Some(s)` in
/// elastic mode (shrink every `s` levels by `SHRINK_FACTOR`) or `None` for
/// plain multigrid (team never shrinks). Purely synchronous: construction
/// needs no collective communication beyond what `Team::all`/`split` and
/// `TeamTransfer::for_team` already do in-process.
pub fn build_forest(
    n_units: usize,
    levels: u32,
    extents: [f64; 3],
    shrink_every: Option<u32>,
) -> Vec<LevelNode> {
    let teams = Team::all(n_units);
    build_rec(teams, levels, extents, shrink_every, 0, &[], n_units)
}

fn build_rec(
    teams: Vec<Team>,
    remaining: u32,
    extents: [f64; 3],
    shrink_every: Option<u32>,
    depth: u32,
    parents: &[Level],
    n_units_total: usize,
) -> Vec<LevelNode> {
    let active_count = teams.len();
    let finest_levels = remaining_to_total_levels(remaining, depth);

    let levels: Vec<Level> = (0..active_count)
        .map(|i| {
            if depth == 0 {
                Level::finest(teams[i].clone(), finest_levels, extents)
            } else {
                Level::coarser_than(&parents[i], teams[i].clone())
            }
        })
        .collect();

    if remaining == 1 {
        let mut out: Vec<LevelNode> = levels
            .into_iter()
            .zip(teams.iter())
            .map(|(level, team)| LevelNode::Leaf {
                allreduce: AsyncAllreduce::new(team.clone()),
                level,
            })
            .collect();
        out.extend((active_count..n_units_total).map(|_| LevelNode::Passive));
        return out;
    }

    let should_shrink = shrink_every.map_or(false, |s| s > 0 && depth > 0 && depth % s == 0)
        && active_count > 1;

    if should_shrink {
        let new_size = (active_count / SHRINK_FACTOR).max(1);
        let new_barrier = Arc::new(tokio::sync::Barrier::new(new_size));
        let new_teams: Vec<Team> = (0..new_size)
            .map(|i| {
                teams[i]
                    .split(active_count / new_size, new_barrier.clone())
                    .expect("rank < new_size must stay active")
            })
            .collect();
        let transfers = TeamTransfer::for_team(&teams, levels[0].global);

        let child_nodes = build_rec(
            new_teams,
            remaining - 1,
            extents,
            shrink_every,
            depth + 1,
            &levels[..new_size],
            active_count,
        );

        let mut out = Vec::with_capacity(n_units_total);
        for ((level, transfer), child) in levels
            .into_iter()
            .zip(transfers.into_iter())
            .zip(child_nodes.into_iter())
        {
            out.push(LevelNode::Shrink {
                level,
                transfer,
                child: Box::new(child),
            });
        }
        out.extend((active_count..n_units_total).map(|_| LevelNode::Passive));
        return out;
    }

    let allreduces: Vec<AsyncAllreduce> = teams.iter().cloned().map(AsyncAllreduce::new).collect();
    let child_nodes = build_rec(
        teams,
        remaining - 1,
        extents,
        shrink_every,
        depth + 1,
        &levels,
        active_count,
    );

    let mut out = Vec::with_capacity(n_units_total);
    for ((level, allreduce), child) in levels
        .into_iter()
        .zip(allreduces.into_iter())
        .zip(child_nodes.into_iter())
    {
        out.push(LevelNode::Normal {
            level,
            allreduce,
            child: Box::new(child),
        });
    }
    out.extend((active_count..n_units_total).map(|_| LevelNode::Passive));
    out
}

/// `levels` as originally given to `build_forest` (the finest level's
/// exponent), recovered from `remaining`/`depth` since only depth 0 needs
/// it (every deeper level is built from its parent's extents directly).
fn remaining_to_total_levels(remaining: u32, depth: u32) -> u32 {
    remaining + depth
}
