use thiserror::Error;

/// Recoverable errors surfaced to the CLI layer.
///
/// Invariant violations inside the solver's hot path (mismatched team
/// shapes between levels, non-even coarse extents, halo contracts called
/// out of order) are programmer-contract violations, not recoverable
/// conditions, and remain `assert!`/`debug_assert!` aborts rather than
/// variants here.
#[derive(Debug, Error)]
pub enum GridMgError {
    #[error("grid shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: [usize; 3], got: [usize; 3] },

    #[error("team shape {0:?} does not multiply to the requested unit count {1}")]
    TeamShapeMismatch([usize; 3], usize),

    #[error("need at least {needed} units for {levels} levels of elastic shrinking, have {have}")]
    InsufficientUnits {
        needed: usize,
        have: usize,
        levels: u32,
    },

    #[error("invalid argument: {0}")]
    InvalidCliArgument(String),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
