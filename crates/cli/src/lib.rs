pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "folio",
    about = "Folio operator CLI",
    long_about = "Operate Folio data readiness, config inspection, and static asset syncing.",
    after_help = "Examples:\n  folio doctor --json\n  folio config\n  folio sync-assets --dry-run"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config, data files, and provider key readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source precedence and redaction"
    )]
    Config,
    #[command(about = "Discover static project assets and merge them into the project data")]
    SyncAssets {
        #[arg(long, help = "Report what would change without writing anything")]
        dry_run: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::SyncAssets { dry_run } => commands::sync_assets::run(dry_run),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
