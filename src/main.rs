use clap::Parser;
use form_detection::cli::commands::{cmd_chunk, cmd_extract, cmd_fill};
use form_detection::cli::config::{Cli, Commands, load_config, resolve_backend};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info,form_detection=info",
        2 => "info,form_detection=debug",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match &cli.command {
        Commands::Extract {
            html,
            scope,
            visible_only,
            output,
        } => {
            cmd_extract(html, scope.as_deref(), *visible_only, output.as_deref(), &config)?;
        }
        Commands::Chunk {
            html,
            scope,
            chunk_size,
        } => {
            cmd_chunk(html, scope.as_deref(), *chunk_size, &config)?;
        }
        Commands::Fill {
            html,
            resume,
            scope,
            backend,
            chunk_size,
            date,
            usage_log,
            output,
        } => {
            let settings = resolve_backend(&cli, &config, backend.as_deref());
            cmd_fill(
                html,
                resume,
                scope.as_deref(),
                *chunk_size,
                *date,
                usage_log.as_deref(),
                output.as_deref(),
                &settings,
                &config,
            )?;
        }
    }

    Ok(())
}
