//! Distributed geometric multigrid solver for the 3D Poisson/heat equation,
//! simulated as a bulk-synchronous group of tokio tasks rather than
//! `mpirun`-launched processes — there is no DASH/MPI runtime available
//! here, so `team`/`grid`/`allreduce`/`transfer` stand in for the parts of
//! a real distributed run that would otherwise cross process boundaries.

pub mod allreduce;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod level;
pub mod problem;
pub mod prolong;
pub mod restrict;
pub mod runner;
pub mod smoother;
pub mod team;
pub mod telemetry;
pub mod transfer;
