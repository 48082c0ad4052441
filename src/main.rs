use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "tdforge")]
#[command(about = "Generate tests for a feature request, then implement the feature against them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable verbose debug output")]
    verbose: bool,

    #[arg(long, global = true, help = "Write prompts to disk instead of calling the model")]
    dry_run: bool,

    #[arg(long, global = true, help = "Settings file (default: ./tdforge.yml if present)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "API key (default: $TOGETHER_API_KEY)")]
    api_key: Option<String>,

    #[arg(long, global = true, help = "Model used for the final completion")]
    model: Option<String>,
}

#[derive(Args)]
struct FeatureArgs {
    #[arg(help = "Repository URL; its last path segment names the working directory")]
    repo: String,

    #[arg(long, help = "Feature description, or @FILE to read it from a file")]
    feature: String,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Clone the repository and generate tests for the feature")]
    Tests(FeatureArgs),

    #[command(about = "Implement the feature against previously generated tests")]
    Implement(FeatureArgs),

    #[command(about = "Generate tests, then implement the feature")]
    Run(FeatureArgs),
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = cli::Config {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        settings_path: cli.config,
        api_key: cli.api_key,
        model: cli.model,
    };

    match cli.command {
        Commands::Tests(args) => cli::generate_tests(&args.repo, &args.feature, &config)?,
        Commands::Implement(args) => cli::implement_feature(&args.repo, &args.feature, &config)?,
        Commands::Run(args) => cli::run_all(&args.repo, &args.feature, &config)?,
    }

    Ok(())
}
