mod format_file;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use crate::format_file::{DEFAULT_FORMAT_NAME, load_format, write_sample_format};

#[derive(Parser)]
#[command(name = "cliopts")]
#[command(version, about = "Parse argument vectors against a JSON option format", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample option format file
    Init(InitArgs),

    /// Parse the arguments given after `--` and print the result as JSON
    Parse(ParseArgs),

    /// Print the option listing of a format file
    Usage(UsageArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Directory to write cliopts.json into (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Replace an existing cliopts.json
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct ParseArgs {
    /// Option format file (JSON). Without it every option is accepted as-is
    #[arg(short, long, value_name = "FILE")]
    format: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,

    /// Arguments to parse
    #[arg(last = true, value_name = "ARGS")]
    argv: Vec<String>,
}

#[derive(Parser)]
struct UsageArgs {
    /// Option format file (JSON)
    #[arg(short, long, default_value = DEFAULT_FORMAT_NAME, value_name = "FILE")]
    format: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Parse(args) => parse(args),
        Commands::Usage(args) => usage(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }

    let existed = dir.join(DEFAULT_FORMAT_NAME).exists();
    if existed && !args.force {
        bail!(
            "{DEFAULT_FORMAT_NAME} already exists in {} (use --force to replace it)",
            dir.display()
        );
    }

    let dest = write_sample_format(&dir, args.force)?;
    eprintln!("Created: {}", dest.display());
    eprintln!("\nTry:");
    eprintln!("  cliopts usage -f {}", dest.display());
    eprintln!("  cliopts parse -f {} -- -v -j4 -Isrc input.txt", dest.display());

    Ok(())
}

fn parse(args: ParseArgs) -> Result<()> {
    tracing::debug!("executing parse command");

    let format = args.format.as_deref().map(load_format).transpose()?;
    let parsed = cliopts::parse(&args.argv, format.as_ref()).context("invalid arguments")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&parsed)
    } else {
        serde_json::to_string(&parsed)
    }
    .context("failed to serialize result")?;
    println!("{json}");

    Ok(())
}

fn usage(args: UsageArgs) -> Result<()> {
    tracing::debug!("executing usage command");

    let format = load_format(&args.format)?;
    let text = format.help();
    if !text.is_empty() {
        println!("{text}");
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
