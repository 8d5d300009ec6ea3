use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ppfin::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display accounts, positions and net worth
    Summary,
    /// Verify that every configured symbol can be quoted
    Check,
    /// Convert an amount between currencies at the current rate
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let command = match cli.command {
        Some(Commands::Setup) => return ppfin::cli::setup::setup(),
        Some(Commands::Summary) => ppfin::AppCommand::Summary,
        Some(Commands::Check) => ppfin::AppCommand::Check,
        Some(Commands::Convert { amount, from, to }) => {
            ppfin::AppCommand::Convert { amount, from, to }
        }
        None => {
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    let result = ppfin::run_command(command, cli.config_path.as_deref()).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
