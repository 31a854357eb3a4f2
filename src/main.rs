mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use c_docgen::config::Config;

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "c_docgen=trace"
    } else {
        "c_docgen=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { file, output, args } => {
            cli::parse(&file, output.as_deref(), &args, &config)?;
        }
        Commands::Html {
            input_dir,
            output_dir,
            project_name,
        } => {
            cli::html(&input_dir, &output_dir, project_name.as_deref(), &config)?;
        }
        Commands::Doc {
            file,
            output_dir,
            project_name,
            args,
        } => {
            cli::doc(&file, &output_dir, project_name.as_deref(), &args, &config)?;
        }
    }

    Ok(())
}
