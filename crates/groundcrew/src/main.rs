mod commands;
mod context;

use clap::{Parser, Subcommand};
use context::{RetryArgs, StackArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crew")]
#[command(version)]
#[command(about = "Provision the loan-agent demo stack, idempotently", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the full stack (probe before create, safe to re-run)
    Deploy {
        #[command(flatten)]
        stack: StackArgs,
        #[command(flatten)]
        retry: RetryArgs,
        /// Where to write the settings document
        #[arg(long, default_value = "loan-agent.settings.json")]
        settings_out: PathBuf,
        /// Allow a timestamp-suffixed name once deterministic candidates
        /// are exhausted (sacrifices idempotent naming)
        #[arg(long)]
        timestamp_fallback: bool,
        /// Run without the confirmation preview
        #[arg(short, long)]
        yes: bool,
    },
    /// Show what a deploy would create or reuse, without changing anything
    Plan {
        #[command(flatten)]
        stack: StackArgs,
    },
    /// Re-run the access binder (RBAC grants) on a provisioned stack
    Bind {
        #[command(flatten)]
        stack: StackArgs,
        #[command(flatten)]
        retry: RetryArgs,
    },
    /// Re-materialize the settings document from the current stack
    Settings {
        #[command(flatten)]
        stack: StackArgs,
        /// Where to write the settings document
        #[arg(long, default_value = "loan-agent.settings.json")]
        settings_out: PathBuf,
    },
    /// Show which stack resources exist and which consents are pending
    Status {
        #[command(flatten)]
        stack: StackArgs,
    },
    /// Delete stack resources in reverse dependency order
    Destroy {
        #[command(flatten)]
        stack: StackArgs,
        /// Also delete the resource group itself
        #[arg(long)]
        delete_group: bool,
        /// Run without the confirmation preview
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy { stack, retry, settings_out, timestamp_fallback, yes } => {
            commands::deploy::handle(stack, retry, settings_out, timestamp_fallback, yes).await?;
        }
        Commands::Plan { stack } => {
            commands::plan::handle(stack).await?;
        }
        Commands::Bind { stack, retry } => {
            commands::bind::handle(stack, retry).await?;
        }
        Commands::Settings { stack, settings_out } => {
            commands::settings::handle(stack, settings_out).await?;
        }
        Commands::Status { stack } => {
            commands::status::handle(stack).await?;
        }
        Commands::Destroy { stack, delete_group, yes } => {
            commands::destroy::handle(stack, delete_group, yes).await?;
        }
    }

    Ok(())
}
