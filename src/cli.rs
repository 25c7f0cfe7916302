//! Command-line surface, grounded on `daa-cli/src/main.rs`'s `clap::Parser`
//! usage (global flags, `-v` raising the log level) adapted to this
//! solver's flat argument list rather than a subcommand tree.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gridmg")]
#[command(about = "Distributed geometric multigrid solver for the 3D Poisson/heat equation")]
#[command(version)]
pub struct Cli {
    /// Number of grid levels; the finest grid has 2^levels - 1 points per axis.
    #[arg(default_value_t = 5)]
    pub levels: u32,

    /// Run flat (non-multigrid) Jacobi iteration instead of a V-cycle.
    #[arg(short, long)]
    pub flat: bool,

    /// Run a time-dependent simulation for T seconds, writing output every
    /// DT_OUT seconds, instead of a single steady-state solve.
    #[arg(long, num_args = 2, value_names = ["T", "DT_OUT"])]
    pub sim: Option<Vec<f64>>,

    /// Shrink the team by a factor of 8 every S levels (default 3 when the
    /// flag is given without a value).
    #[arg(short = 'e', long, num_args = 0..=1, default_missing_value = "3")]
    pub elastic: Option<u32>,

    /// Convergence threshold on the global max residual.
    #[arg(long, default_value_t = 1e-3)]
    pub eps: f64,

    /// Physical box extents (lz, ly, lx).
    #[arg(short = 'd', num_args = 3, default_values_t = [10.0, 10.0, 10.0], value_names = ["LZ", "LY", "LX"])]
    pub dim: Vec<f64>,

    /// Number of units to simulate, in place of the `mpirun -n` rank count
    /// a real DASH/MPI launch would provide.
    #[arg(long, default_value_t = 8)]
    pub units: usize,

    /// Optional config file overriding the built-in defaults before CLI
    /// flags are applied on top.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Raise the tracing verbosity; repeat for more (-vv, -vvv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the resolved configuration as JSON and exit, without running
    /// the solver.
    #[arg(long)]
    pub print_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn defaults_parse() {
        let cli = Cli::try_parse_from(["gridmg"]).unwrap();
        assert_eq!(cli.levels, 5);
        assert_eq!(cli.units, 8);
        assert_eq!(cli.dim, vec![10.0, 10.0, 10.0]);
        assert!(cli.elastic.is_none());
        assert!(!cli.print_config);
    }

    #[test]
    fn elastic_without_value_defaults_to_three() {
        let cli = Cli::try_parse_from(["gridmg", "-e"]).unwrap();
        assert_eq!(cli.elastic, Some(3));
    }

    #[test]
    fn elastic_with_value_overrides_default() {
        let cli = Cli::try_parse_from(["gridmg", "--elastic=4"]).unwrap();
        assert_eq!(cli.elastic, Some(4));
    }

    #[test]
    fn sim_takes_two_values() {
        let cli = Cli::try_parse_from(["gridmg", "--sim", "2.0", "0.5"]).unwrap();
        assert_eq!(cli.sim, Some(vec![2.0, 0.5]));
    }
}
