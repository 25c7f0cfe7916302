//! TeamTransfer: copies an entire level's grids between a larger team and
//! the subteam left after an elastic shrink, barrier-synchronized on the
//! larger team. Every unit scatters its local block into a team-shared
//! global mirror behind one barrier, and the receiving side gathers its
//! new block back out — equivalent to a row-wise copy between the two
//! teams' distributed arrays, since both ends of the transfer live in the
//! same process here.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::grid::DistGrid3D;
use crate::level::Level;
use crate::team::Team;

#[derive(Clone)]
pub struct TeamTransfer {
    big_team: Team,
    global: [usize; 3],
    src_mirror: Arc<RwLock<Vec<f64>>>,
    rhs_mirror: Arc<RwLock<Vec<f64>>>,
}

impl TeamTransfer {
    /// Builds one `TeamTransfer` handle per member of `big_teams`, all
    /// sharing the same mirrors — the collective-construction analogue of
    /// `Team::all`. Every unit of the larger team must receive one of
    /// these (even the ones that will be passive in the subteam) before
    /// any of them calls `transfer_to_fewer`/`transfer_to_more`.
    pub fn for_team(big_teams: &[Team], global: [usize; 3]) -> Vec<TeamTransfer> {
        let n = global[0] * global[1] * global[2];
        let src_mirror = Arc::new(RwLock::new(vec![0.0; n]));
        let rhs_mirror = Arc::new(RwLock::new(vec![0.0; n]));
        big_teams
            .iter()
            .cloned()
            .map(|big_team| TeamTransfer {
                big_team,
                global,
                src_mirror: src_mirror.clone(),
                rhs_mirror: rhs_mirror.clone(),
            })
            .collect()
    }

    fn idx(&self, g: [usize; 3]) -> usize {
        (g[0] * self.global[1] + g[1]) * self.global[2] + g[2]
    }

    fn scatter(&self, mirror: &mut [f64], grid: &DistGrid3D) {
        for z in 0..grid.local[0] {
            for y in 0..grid.local[1] {
                for x in 0..grid.local[2] {
                    let g = grid.global_coord(z, y, x);
                    mirror[self.idx(g)] = grid.get(z as i64, y as i64, x as i64);
                }
            }
        }
    }

    fn gather(&self, mirror: &[f64], grid: &mut DistGrid3D) {
        for z in 0..grid.local[0] {
            for y in 0..grid.local[1] {
                for x in 0..grid.local[2] {
                    let g = grid.global_coord(z, y, x);
                    grid.set(z as i64, y as i64, x as i64, mirror[self.idx(g)]);
                }
            }
        }
    }

    /// Called at a team-shrink boundary on the way down the V/W-cycle:
    /// every big-team unit scatters its block, then (after the barrier)
    /// whichever units are still active in `small` gather their new block.
    pub async fn transfer_to_fewer(&self, big: &Level, small: Option<&mut Level>) {
        self.scatter(&mut self.src_mirror.write(), big.src());
        self.scatter(&mut self.rhs_mirror.write(), &big.rhs);
        self.big_team.barrier().await;
        if let Some(level) = small {
            self.gather(&self.src_mirror.read(), level.src_mut());
            self.gather(&self.rhs_mirror.read(), &mut level.rhs);
        }
    }

    /// Called on the way back up: active units scatter their (now
    /// corrected) `small` block, then every big-team unit gathers it back
    /// into `big`.
    pub async fn transfer_to_more(&self, small: Option<&Level>, big: &mut Level) {
        if let Some(level) = small {
            self.scatter(&mut self.src_mirror.write(), level.src());
            self.scatter(&mut self.rhs_mirror.write(), &level.rhs);
        }
        self.big_team.barrier().await;
        self.gather(&self.src_mirror.read(), big.src_mut());
        self.gather(&self.rhs_mirror.read(), &mut big.rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transfer_round_trip_preserves_values() {
        let teams = Team::all(2);
        let mut big0 = Level::finest(teams[0].clone(), 3, [1.0, 1.0, 1.0]);
        let mut big1 = Level::finest(teams[1].clone(), 3, [1.0, 1.0, 1.0]);
        big0.src_mut().fill_interior(|_| 9.0);
        big1.src_mut().fill_interior(|_| 9.0);

        let xfers = TeamTransfer::for_team(&teams, big0.global);

        let small_teams = Team::all(1);
        let mut small0 = Level::finest(small_teams[0].clone(), 3, [1.0, 1.0, 1.0]);

        tokio::join!(
            xfers[0].transfer_to_fewer(&big0, Some(&mut small0)),
            xfers[1].transfer_to_fewer(&big1, None),
        );

        let c = small0.global[0] as i64 / 2;
        assert_eq!(small0.src().get(c, c, c), 9.0);
    }
}
