use crate::export::{run_report, run_summary, ReportArgs, SummaryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use placement_tracker::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Placement Tracker",
    about = "Serve placement records over HTTP or build placement reports from CSV exports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Render an Excel or PDF placement report from CSV exports
    Report(ReportArgs),
    /// Print placement totals and per-company rankings from CSV exports
    Summary(SummaryArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Companies CSV used to seed the in-memory store
    #[arg(long, requires = "students")]
    pub(crate) companies: Option<PathBuf>,
    /// Students CSV used to seed the in-memory store
    #[arg(long, requires = "companies")]
    pub(crate) students: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Report(args) => run_report(args),
        Command::Summary(args) => run_summary(args),
    }
}
