//! Async halo exchange: stages each unit's boundary slabs into a shared
//! mailbox and lets the caller's interior computation run concurrently with
//! the exchange, joining only when the halo is actually read — the
//! in-process analogue of `dash::halo::HaloMatrixWrapper::updateHalosAsync`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;

use super::dist_grid::DistGrid3D;
use crate::team::Team;

/// Supplies ghost-cell values for faces that have no neighbor (the global
/// domain boundary). Takes the *global* coordinate of the ghost cell,
/// which may lie one cell outside `[0, global)` on the relevant axis.
pub type BoundaryFn = Arc<dyn Fn([i64; 3]) -> f64 + Send + Sync>;

/// All 26 non-zero offsets in `{-1,0,1}^3`.
fn neighbor_offsets() -> &'static [[i32; 3]] {
    static OFFSETS: once_cell::sync::Lazy<Vec<[i32; 3]>> = once_cell::sync::Lazy::new(|| {
        let mut v = Vec::with_capacity(26);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dz, dy, dx) != (0, 0, 0) {
                        v.push([dz, dy, dx]);
                    }
                }
            }
        }
        v
    });
    &OFFSETS
}

type Mailbox = Arc<DashMap<(usize, [i32; 3]), Vec<f64>>>;

/// Owns the shared staging table for one grid's halo exchange across a
/// team. Cheap to clone; every unit holding a clone shares the same
/// mailbox and boundary function.
#[derive(Clone)]
pub struct HaloExchange {
    team: Team,
    mailbox: Mailbox,
    boundary: BoundaryFn,
}

pub struct HaloTicket {
    join: JoinHandle<()>,
}

impl HaloExchange {
    pub fn new(team: Team, boundary: BoundaryFn) -> Self {
        Self {
            team,
            mailbox: Arc::new(DashMap::new()),
            boundary,
        }
    }

    fn neighbor_rank(&self, offset: [i32; 3]) -> Option<usize> {
        let coords = self.team.coords();
        let target = [
            coords[0] as i64 + offset[0] as i64,
            coords[1] as i64 + offset[1] as i64,
            coords[2] as i64 + offset[2] as i64,
        ];
        self.team.spec().rank_of(target)
    }

    /// Extracts the single-layer slab of `grid`'s interior facing
    /// `offset` (e.g. offset `[1,0,0]` is the z = local[0]-1 plane).
    fn outgoing_slab(grid: &DistGrid3D, offset: [i32; 3]) -> Vec<f64> {
        let pick = |len: usize, o: i32| -> Vec<i64> {
            match o {
                -1 => vec![0],
                1 => vec![len as i64 - 1],
                _ => (0..len as i64).collect(),
            }
        };
        let zs = pick(grid.local[0], offset[0]);
        let ys = pick(grid.local[1], offset[1]);
        let xs = pick(grid.local[2], offset[2]);
        let mut out = Vec::with_capacity(zs.len() * ys.len() * xs.len());
        for &z in &zs {
            for &y in &ys {
                for &x in &xs {
                    out.push(grid.get(z, y, x));
                }
            }
        }
        out
    }

    /// Writes a received (or boundary-synthesized) slab into the halo shell
    /// facing `offset`.
    fn write_halo(grid: &mut DistGrid3D, offset: [i32; 3], values: &[f64]) {
        let pick = |len: usize, o: i32| -> Vec<i64> {
            match o {
                -1 => vec![-1],
                1 => vec![len as i64],
                _ => (0..len as i64).collect(),
            }
        };
        let zs = pick(grid.local[0], offset[0]);
        let ys = pick(grid.local[1], offset[1]);
        let xs = pick(grid.local[2], offset[2]);
        let mut i = 0;
        for &z in &zs {
            for &y in &ys {
                for &x in &xs {
                    grid.set(z, y, x, values[i]);
                    i += 1;
                }
            }
        }
    }

    fn boundary_values(&self, grid: &DistGrid3D, offset: [i32; 3]) -> Vec<f64> {
        let pick = |len: usize, off: usize, o: i32| -> Vec<i64> {
            match o {
                -1 => vec![-1 + off as i64],
                1 => vec![len as i64 + off as i64],
                _ => (0..len as i64).map(|v| v + off as i64).collect(),
            }
        };
        let zs = pick(grid.local[0], grid.offset[0], offset[0]);
        let ys = pick(grid.local[1], grid.offset[1], offset[1]);
        let xs = pick(grid.local[2], grid.offset[2], offset[2]);
        let mut out = Vec::with_capacity(zs.len() * ys.len() * xs.len());
        for &z in &zs {
            for &y in &ys {
                for &x in &xs {
                    out.push((self.boundary)([z, y, x]));
                }
            }
        }
        out
    }

    /// Stages this unit's outgoing slabs and spawns the background task
    /// that will wait for every unit to finish staging. Returns
    /// immediately so the caller can run interior work concurrently.
    pub fn update_async(&self, grid: &DistGrid3D) -> HaloTicket {
        let my_rank = self.team.rank();
        for &offset in neighbor_offsets() {
            if let Some(dest) = self.neighbor_rank(offset) {
                // The neighbor in direction `offset` will look this slab up
                // keyed by (dest, -offset) from its own perspective.
                let inverse = [-offset[0], -offset[1], -offset[2]];
                let slab = Self::outgoing_slab(grid, offset);
                self.mailbox.insert((dest, inverse), slab);
            }
        }
        let team = self.team.clone();
        let join = tokio::spawn(async move {
            team.barrier().await;
        });
        let _ = my_rank;
        HaloTicket { join }
    }

    /// Joins the background barrier task (guaranteeing every unit has
    /// staged its outgoing slabs), then drains this unit's halo shell.
    pub async fn wait(&self, ticket: HaloTicket, grid: &mut DistGrid3D) -> anyhow::Result<()> {
        ticket.join.await?;
        let my_rank = self.team.rank();
        for &offset in neighbor_offsets() {
            if self.neighbor_rank(offset).is_some() {
                let key = (my_rank, offset);
                let values = self
                    .mailbox
                    .remove(&key)
                    .map(|(_, v)| v)
                    .unwrap_or_default();
                if !values.is_empty() {
                    Self::write_halo(grid, offset, &values);
                }
            } else {
                let values = self.boundary_values(grid, offset);
                Self::write_halo(grid, offset, &values);
            }
        }
        Ok(())
    }

    /// Synchronous convenience used by tests and single-unit runs: stage,
    /// wait, and drain in one call.
    pub async fn update_sync(&self, grid: &mut DistGrid3D) -> anyhow::Result<()> {
        let snapshot = grid.clone();
        let ticket = self.update_async(&snapshot);
        self.wait(ticket, grid).await
    }
}
