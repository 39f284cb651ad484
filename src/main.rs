use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "component")]
#[command(about = "Install components and their dependencies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install packages and their dependencies
    Install {
        /// Packages to install, as owner/repo[@range]
        #[arg(required = true)]
        packages: Vec<String>,
        /// Destination directory (default: components)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Files transferred at once per package (default: 6)
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// GitHub access token (overrides GITHUB_TOKEN)
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Install {
            packages,
            dir,
            concurrency,
            token,
        } => {
            cli::install::run(cli::install::InstallOptions {
                packages,
                dir,
                concurrency,
                token,
            })
            .await
        }
    };

    match result {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(summary) => {
            eprintln!(
                "\n{} package(s) installed, {} failed",
                summary.installed, summary.failed
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("\nError: {}", e);
            ExitCode::FAILURE
        }
    }
}
