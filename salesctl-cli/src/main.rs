//! salesctl CLI - paginated sales reports over a data warehouse
//!
//! - `serve`: run the HTTP report API
//! - `report`: run one report with a JSON body and print the response
//! - `reports`: list report names

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "salesctl",
    author,
    version,
    about = "Paginated sales reports over a data warehouse",
    long_about = "Serve product sales reports over HTTP, or run one from the command line. \
                  Every report is a single warehouse round trip returning a page of rows \
                  plus the size of the whole filtered set."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP report API
    Serve(commands::serve::ServeArgs),
    /// Run one report and print its JSON response
    Report(commands::report::ReportArgs),
    /// List available reports
    Reports,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Report(args) => commands::run_report(args).await?,
        Commands::Reports => commands::run_list()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn debug_flag_is_global() {
        let cli = Cli::parse_from(["salesctl", "reports", "--debug"]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Reports));
    }
}
