//! Relmap CLI entry point

use clap::{Parser, Subcommand};
use relmap_core::Tier;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "relmap")]
#[command(about = "Import dependency and call graph analysis for Python projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Capability tier: community, pro or enterprise
    #[arg(long, default_value = "community", global = true)]
    tier: Tier,

    /// Architecture rules file (TOML or YAML)
    #[arg(long, global = true)]
    architecture: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve what a file (or one of its symbols) depends on
    Deps {
        /// Target file, relative to the root or absolute
        file: PathBuf,

        /// Narrow the target imports to those this symbol uses
        #[arg(short, long)]
        symbol: Option<String>,

        /// Include the target source
        #[arg(long)]
        code: bool,

        /// Include a Mermaid diagram
        #[arg(long)]
        diagram: bool,

        /// Depth override, capped by the tier
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Build the call graph, optionally from one entry point
    Calls {
        /// `path:Qualified.name` or a bare function name
        #[arg(short, long)]
        entry: Option<String>,

        /// Reachability depth from the entry point, capped by the tier
        #[arg(short, long)]
        depth: Option<usize>,

        /// Also report circular imports
        #[arg(long)]
        check_imports: bool,

        /// Include a Mermaid diagram
        #[arg(long)]
        diagram: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays JSON
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("relmap={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Relmap v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Project root: {}", cli.root.display());

    let options = commands::GlobalOptions {
        root: cli.root,
        tier: cli.tier,
        architecture: cli.architecture,
    };

    match cli.command {
        Commands::Deps {
            file,
            symbol,
            code,
            diagram,
            max_depth,
        } => commands::deps(options, file, symbol, code, diagram, max_depth).await,
        Commands::Calls {
            entry,
            depth,
            check_imports,
            diagram,
        } => commands::calls(options, entry, depth, check_imports, diagram).await,
        Commands::Version => {
            println!("Relmap v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
