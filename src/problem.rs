//! Boundary-value functions. Kept free of grid/team types: each is a pure
//! function of a global ghost coordinate.

use crate::grid::BoundaryFn;
use std::sync::Arc;

const RADIUS: f64 = 0.4;
const HIGH_VALUE: f64 = 9.0;
const LOW_VALUE: f64 = 2.0;
const SUBSAMPLES: i64 = 3;

/// Anti-aliased hot disk painted on the top (`z == -1`) and bottom
/// (`z == global[0]`) planes, zero elsewhere. Each boundary cell is
/// `SUBSAMPLES x SUBSAMPLES` supersampled against the unit disk centered on
/// the plane before being averaged into `HIGH_VALUE`/`LOW_VALUE`.
pub fn hot_disk_boundary(global: [usize; 3]) -> BoundaryFn {
    let gy = global[1] as f64;
    let gx = global[2] as f64;
    Arc::new(move |[z, y, x]| {
        if z != -1 && z != global[0] as i64 {
            return 0.0;
        }
        let cy = gy / 2.0;
        let cx = gx / 2.0;
        let mut hits = 0;
        for sy in 0..SUBSAMPLES {
            for sx in 0..SUBSAMPLES {
                let py = y as f64 + (sy as f64 + 0.5) / SUBSAMPLES as f64 - 0.5;
                let px = x as f64 + (sx as f64 + 0.5) / SUBSAMPLES as f64 - 0.5;
                let ny = (py - cy) / gy;
                let nx = (px - cx) / gx;
                if (ny * ny + nx * nx).sqrt() <= RADIUS {
                    hits += 1;
                }
            }
        }
        let frac = hits as f64 / (SUBSAMPLES * SUBSAMPLES) as f64;
        LOW_VALUE + frac * (HIGH_VALUE - LOW_VALUE)
    })
}

/// Constant-zero boundary, used on every level but the finest.
pub fn zero_boundary() -> BoundaryFn {
    Arc::new(|_| 0.0)
}
