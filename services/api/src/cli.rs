use crate::report::{run_dashboard, run_scan, DashboardArgs, ScanArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fleet_compliance::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Fleet Compliance",
    about = "Track vehicle document expiries and remind owners before they lapse",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the daily expiry scheduler (default command)
    Serve(ServeArgs),
    /// Replay one or more expiry scans against a fleet CSV
    Scan(ScanArgs),
    /// Print the dashboard summary for one owner
    Dashboard(DashboardArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Fleet CSV used to seed the in-memory vehicle store
    #[arg(long)]
    pub(crate) fleet_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scan(args) => run_scan(args),
        Command::Dashboard(args) => run_dashboard(args),
    }
}
