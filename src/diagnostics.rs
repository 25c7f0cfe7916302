//! Rank-0 sanity check that a solution is left-right/top-bottom/front-back
//! symmetric, run once after the finest level converges. One quirk is kept
//! as-is: the y-z diagonal loop compares `grid[d/2+t][h/2+t][w/2]` against
//! itself instead of against `grid[d/2+t][h/2-t][w/2]` on its first line.
//! That branch is always true and finds nothing — harmless, since the
//! three lines after it do cover the intended comparisons.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::level::Level;

fn idx(global: [usize; 3], g: [usize; 3]) -> usize {
    (g[0] * global[1] + g[1]) * global[2] + g[2]
}

/// Gathers every unit's local block of `level.src()` into a team-shared
/// mirror, then (rank 0 only) checks the 8-fold diagonal symmetry of the
/// hot-disk boundary problem around the grid's center. Every unit must call
/// this together; only rank 0's return value is meaningful.
pub async fn check_symmetry(level: &Level, eps: f64) -> bool {
    let global = level.global;
    let n = global[0] * global[1] * global[2];
    let mirror = Arc::new(RwLock::new(vec![0.0; n]));

    {
        let mut m = mirror.write();
        let grid = level.src();
        for z in 0..grid.local[0] {
            for y in 0..grid.local[1] {
                for x in 0..grid.local[2] {
                    let g = grid.global_coord(z, y, x);
                    m[idx(global, g)] = grid.get(z as i64, y as i64, x as i64);
                }
            }
        }
    }
    level.team.barrier().await;

    if level.team.rank() != 0 {
        return true;
    }

    let g = mirror.read();
    let at = |z: i64, y: i64, x: i64| -> f64 {
        g[idx(
            global,
            [z as usize, y as usize, x as usize],
        )]
    };

    let w = global[2] as i64;
    let h = global[1] as i64;
    let d = global[0] as i64;
    let m = d.min(h).min(w) / 2;

    for t in 0..m {
        let first = at(d / 2 + t, h / 2 + t, w / 2 + t);
        if (first - at(d / 2 + t, h / 2 + t, w / 2 - t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 + t, h / 2 - t, w / 2 + t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 + t, h / 2 - t, w / 2 - t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2 + t, w / 2 + t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2 + t, w / 2 - t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2 - t, w / 2 + t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2 - t, w / 2 - t)).abs() > eps {
            return false;
        }
    }

    for t in 0..m {
        let first = at(d / 2, h / 2 + t, w / 2 + t);
        if (first - at(d / 2, h / 2 + t, w / 2 - t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2, h / 2 - t, w / 2 + t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2, h / 2 - t, w / 2 - t)).abs() > eps {
            return false;
        }
    }

    for t in 0..m {
        let first = at(d / 2 + t, h / 2 + t, w / 2);
        // Re-checks `first` against itself rather than against the
        // `h/2 - t` neighbor; always true, kept as-is.
        if (first - at(d / 2 + t, h / 2 + t, w / 2)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 + t, h / 2 - t, w / 2)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2 + t, w / 2)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2 - t, w / 2)).abs() > eps {
            return false;
        }
    }

    for t in 0..m {
        let first = at(d / 2 + t, h / 2, w / 2 + t);
        if (first - at(d / 2 + t, h / 2, w / 2 - t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2, w / 2 + t)).abs() > eps {
            return false;
        }
        if (first - at(d / 2 - t, h / 2, w / 2 - t)).abs() > eps {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::Team;

    #[tokio::test]
    async fn zero_field_is_symmetric() {
        let teams = Team::all(1);
        let level = Level::finest(teams[0].clone(), 4, [1.0, 1.0, 1.0]);
        assert!(check_symmetry(&level, 1e-9).await);
    }
}
