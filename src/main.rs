use anyhow::Result;
use clap::Parser;

use migration_gate::cli::{Cli, Commands};
use migration_gate::commands::{rules, validate};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Validate {
            path,
            id,
            config,
            database_url,
            engine_version,
            pool_utilization,
            max_risk,
            format,
            output,
            emit_events,
        } => {
            validate::execute(validate::ValidateArgs {
                path,
                id,
                config,
                database_url,
                engine_version,
                pool_utilization,
                max_risk,
                format,
                output,
                emit_events,
            })
            .await?;
        }
        Commands::Rules { category } => {
            rules::execute(category)?;
        }
    }

    Ok(())
}
