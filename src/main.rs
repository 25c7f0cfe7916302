use anyhow::Result;
use clap::Parser;

use gridmg::cli::Cli;
use gridmg::config;
use gridmg::runner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = config::resolve(&cli)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let residual = if let Some(sim) = &config.sim {
        runner::run_simulation(&config, sim.0, sim.1).await?
    } else if config.flat {
        runner::run_flat(&config).await?
    } else if let Some(shrink_every) = config.elastic {
        runner::run_multigrid_elastic(&config, shrink_every).await?
    } else {
        runner::run_multigrid(&config).await?
    };

    tracing::info!(residual, "run finished");
    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("gridmg={level}"))),
        )
        .with_target(false)
        .init();
}
