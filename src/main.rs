use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::process;

use sizegate::cmd::{self, CliOverrides};
use sizegate::context::RunContext;

/// Build-output size tracking and budget gating for CI
///
/// sizegate measures a build's compiled assets, compares them against the
/// most recently published baseline, and gates merges on configured size
/// budgets and per-file thresholds.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Disable emoji output (useful for CI/CD or accessibility)
    #[arg(long, global = true)]
    no_emoji: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags shared by the measuring commands
#[derive(Args, Clone, Default)]
struct GateArgs {
    /// Build output directory (auto-detected when omitted)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum allowed aggregate increase in the comparison metric (KB)
    #[arg(long)]
    budget_max_increase_kb: Option<f64>,

    /// Warn when the largest per-file delta exceeds this (KB)
    #[arg(long)]
    warn_above_kb: Option<f64>,

    /// Fail when the largest per-file delta exceeds this (KB)
    #[arg(long)]
    fail_above_kb: Option<f64>,

    /// Page budget for the repository-wide artifact scan
    #[arg(long)]
    max_artifact_pages: Option<u32>,

    /// Candidate baseline branches, highest priority first
    #[arg(long, value_delimiter = ',')]
    branches: Option<Vec<String>>,

    /// Skip gzip measurement and comparison
    #[arg(long)]
    no_gzip: bool,

    /// Skip brotli measurement and comparison
    #[arg(long)]
    no_brotli: bool,

    /// Measure the existing output without running the build command
    #[arg(long)]
    skip_build: bool,
}

impl From<&GateArgs> for CliOverrides {
    fn from(args: &GateArgs) -> Self {
        Self {
            output_dir: args.output_dir.clone(),
            budget_max_increase_kb: args.budget_max_increase_kb,
            warn_above_kb: args.warn_above_kb,
            fail_above_kb: args.fail_above_kb,
            max_artifact_pages: args.max_artifact_pages,
            branches: args.branches.clone(),
            no_gzip: args.no_gzip,
            no_brotli: args.no_brotli,
            skip_build: args.skip_build,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the appropriate pipeline for the triggering event
    ///
    /// Push events publish a new baseline; pull request events compare
    /// against the existing one.
    Ci {
        #[command(flatten)]
        args: GateArgs,
    },

    /// Measure the build and compare it against the stored baseline
    Check {
        #[command(flatten)]
        args: GateArgs,
    },

    /// Measure the build and publish it as the new baseline
    Publish {
        #[command(flatten)]
        args: GateArgs,
    },

    /// Measure the build output locally, without any remote calls
    Measure {
        #[command(flatten)]
        args: GateArgs,

        /// Print the raw measurement record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    // Initialize logger (use RUST_LOG env var to control verbosity)
    env_logger::init();

    let cli = Cli::parse();

    // Set console emoji mode based on CLI flag
    if cli.no_emoji {
        std::env::set_var("NO_EMOJI", "1");
    }

    // The only place the CI environment is read; everything downstream
    // receives this context by parameter.
    let ctx = RunContext::from_env();

    let result = match &cli.command {
        Some(Commands::Ci { args }) => {
            let overrides = CliOverrides::from(args);
            with_root(|root| {
                if ctx.is_trunk_build() {
                    cmd::cmd_publish(&root, &ctx, &overrides)
                } else {
                    cmd::cmd_check(&root, &ctx, &overrides)
                }
            })
        }
        Some(Commands::Check { args }) => {
            let overrides = CliOverrides::from(args);
            with_root(|root| cmd::cmd_check(&root, &ctx, &overrides))
        }
        Some(Commands::Publish { args }) => {
            let overrides = CliOverrides::from(args);
            with_root(|root| cmd::cmd_publish(&root, &ctx, &overrides))
        }
        Some(Commands::Measure { args, json }) => {
            let overrides = CliOverrides::from(args);
            with_root(|root| cmd::cmd_measure(&root, &ctx, &overrides, *json))
        }
        Some(Commands::Completions { shell }) => {
            cmd::cmd_completions::<Cli>(*shell);
            Ok(())
        }
        None => {
            // No subcommand provided, show help
            println!("sizegate v{}", env!("CARGO_PKG_VERSION"));
            println!("Build-output size tracking and budget gating for CI\n");
            println!("Usage: sizegate <COMMAND>\n");
            println!("Commands:");
            println!("  ci       Run the pipeline for the triggering CI event");
            println!("  check    Compare the current build against the baseline");
            println!("  publish  Publish the current build as the new baseline");
            println!("  measure  Measure the build output locally");
            println!("\nRun 'sizegate <COMMAND> --help' for more information on a command.");
            Ok(())
        }
    };

    if let Err(e) = result {
        use sizegate::error::ErrorFormatter;
        eprintln!("{}", ErrorFormatter::format(&e));
        let exit_code = ErrorFormatter::exit_code(&e);
        process::exit(exit_code);
    }
}

fn with_root(
    f: impl FnOnce(PathBuf) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let root = std::env::current_dir()?;
    f(root)
}
