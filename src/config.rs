//! The validated, resolved configuration the solver actually runs with.
//! Loadable from a `gridmg.toml` file and then overridden by CLI flags —
//! the same "file defaults, flags override" layering as
//! `daa-cli::config::CliConfig`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::GridMgError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub levels: u32,
    pub flat: bool,
    pub sim: Option<(f64, f64)>,
    pub elastic: Option<u32>,
    pub eps: f64,
    pub dim: [f64; 3],
    pub units: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            levels: 5,
            flat: false,
            sim: None,
            elastic: None,
            eps: 1e-3,
            dim: [10.0, 10.0, 10.0],
            units: 8,
        }
    }
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GridMgError> {
        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merges `cli` on top of `self` (typically loaded from file, or the
    /// default if no file was given): any flag the user actually passed on
    /// the command line wins.
    pub fn merge_cli(mut self, cli: &Cli) -> Self {
        self.levels = cli.levels;
        self.flat = cli.flat || self.flat;
        if let Some(ref s) = cli.sim {
            self.sim = Some((s[0], s[1]));
        }
        if cli.elastic.is_some() {
            self.elastic = cli.elastic;
        }
        self.eps = cli.eps;
        if !cli.dim.is_empty() {
            self.dim = [cli.dim[0], cli.dim[1], cli.dim[2]];
        }
        self.units = cli.units;
        self
    }

    /// Validates the resolved configuration, matching the range clap's
    /// own parsing can't express declaratively.
    pub fn validate(&self) -> Result<(), GridMgError> {
        if !(2 < self.levels && self.levels <= 16) {
            return Err(GridMgError::InvalidCliArgument(format!(
                "levels must be in 3..=16, got {}",
                self.levels
            )));
        }
        if let Some(s) = self.elastic {
            if s == 0 {
                return Err(GridMgError::InvalidCliArgument(
                    "elastic shrink period must be at least 1".to_string(),
                ));
            }
            let shrinks = (self.levels.saturating_sub(1)) / s;
            let needed = 8usize.pow(shrinks);
            if self.units < needed {
                return Err(GridMgError::InsufficientUnits {
                    needed,
                    have: self.units,
                    levels: self.levels,
                });
            }
        }
        Ok(())
    }
}

/// Loads `gridmg.toml` from `path` if given (else from the CLI's `--config`,
/// else skipped entirely), then merges and validates `cli` on top.
pub fn resolve(cli: &Cli) -> anyhow::Result<RunConfig> {
    use anyhow::Context;

    let base = match &cli.config {
        Some(path) if path.exists() => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        _ => RunConfig::default(),
    };
    let resolved = base.merge_cli(cli);
    resolved.validate().context("invalid configuration")?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_levels() {
        let mut c = RunConfig::default();
        c.levels = 1;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_too_few_units_for_elastic_depth() {
        let mut c = RunConfig::default();
        c.levels = 10;
        c.elastic = Some(1);
        c.units = 8;
        assert!(c.validate().is_err());
    }
}
