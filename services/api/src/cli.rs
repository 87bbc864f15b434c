use crate::demo::{run_demo, run_stats, DemoArgs, StatsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use insertion_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Insertion Tracker",
    about = "Track applicant engagement, dispatch notifications, and report outcome statistics",
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
    /// Compute seen-rate statistics from an engagement CSV export
    Stats(StatsArgs),
    /// Walk through status derivation, dispatch, and statistics on sample data
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory store with the demo applicants
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Stats(args) => run_stats(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accepts_repeated_windows() {
        let cli = Cli::try_parse_from([
            "insertion-tracker-api",
            "stats",
            "--contexts",
            "export.csv",
            "--days",
            "30",
            "--days",
            "15",
            "--today",
            "2022-04-25",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Stats(args)) => {
                assert_eq!(args.days, vec![30, 15]);
                assert!(args.today.is_some());
            }
            other => panic!("expected stats command, got {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["insertion-tracker-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
