use anyhow::{Context as AnyhowContext, Result};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use quarry_config::{resolve_output_dir, Config};
use quarry_indexer::{build_index, verify_index};
use quarry_search::QueryEngine;
use std::path::PathBuf;

mod report;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Local repository indexing and ranked retrieval", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or incrementally refresh) the index for the current repo
    Build(BuildArgs),

    /// Run a ranked query against the persisted index
    Query(QueryArgs),

    /// Check index integrity and drift against the live source tree
    Verify(VerifyArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Path to the JSON config file
    #[arg(long, default_value = "quarry.json")]
    config: PathBuf,

    /// Output directory override (disables branch/worktree isolation)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct BuildArgs {
    /// Force a full rebuild (ignore the incremental cache)
    #[arg(long)]
    full: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct QueryArgs {
    /// Free-text query
    text: String,

    /// Maximum number of results (invalid values fall back to the configured default)
    #[arg(long)]
    top: Option<String>,

    /// Output JSON format
    #[arg(long)]
    json: bool,

    /// Refuse to answer when the indexed git state no longer matches the live one
    #[arg(long)]
    strict_fresh: bool,

    /// Run structural verification first and refuse to answer on any error
    #[arg(long)]
    verify: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct VerifyArgs {
    /// Promote drift warnings (changed/deleted sources, git state) to errors
    #[arg(long)]
    strict: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = err.print();
                std::process::exit(0);
            }
            ErrorKind::InvalidSubcommand | ErrorKind::MissingSubcommand => {
                let _ = Cli::command().print_help();
                std::process::exit(0);
            }
            _ => {
                let _ = err.print();
                std::process::exit(1);
            }
        },
    };

    // --json reserves stdout for the payload; keep logs quiet and on stderr.
    let json_output = match &cli.command {
        Commands::Build(args) => args.json,
        Commands::Query(args) => args.json,
        Commands::Verify(args) => args.json,
    };
    init_logging(cli.verbose, cli.quiet || json_output);

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Build(args) => run_build(args),
        Commands::Query(args) => run_query(args),
        Commands::Verify(args) => run_verify(args),
    }
}

/// Load config and resolve where the index lives for this invocation.
fn resolve(common: &CommonArgs) -> Result<(PathBuf, Config, PathBuf)> {
    let repo_root = std::env::current_dir().context("cannot resolve working directory")?;
    let config = Config::load(&common.config)
        .with_context(|| format!("loading config {}", common.config.display()))?;
    let output_dir = resolve_output_dir(&repo_root, &config, common.output.as_deref())
        .context("resolving output directory")?;
    Ok((repo_root, config, output_dir))
}

fn run_build(args: BuildArgs) -> Result<i32> {
    let (repo_root, config, output_dir) = resolve(&args.common)?;
    let outcome = build_index(&repo_root, &config, &output_dir, args.full)?;

    if args.json {
        let payload = report::BuildPayload {
            manifest: &outcome.manifest,
            warnings: &outcome.warnings,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", report::render_build(&outcome));
    }
    Ok(0)
}

fn run_query(args: QueryArgs) -> Result<i32> {
    let (repo_root, config, output_dir) = resolve(&args.common)?;
    let top_k = parse_top(args.top.as_deref(), config.query.default_top_k);

    let engine = QueryEngine::load(&config, &output_dir)?;
    if args.strict_fresh {
        engine.ensure_fresh(&repo_root)?;
    }
    if args.verify {
        engine.ensure_verified(&repo_root, &output_dir)?;
    }

    let hits = engine.search(&args.text, top_k);
    if args.json {
        let payload = report::QueryPayload {
            query: &args.text,
            top_k,
            hits: &hits,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print!("{}", report::render_query(&args.text, &hits));
    }
    Ok(0)
}

fn run_verify(args: VerifyArgs) -> Result<i32> {
    let (repo_root, _config, output_dir) = resolve(&args.common)?;
    let report = verify_index(&repo_root, &output_dir, args.strict);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::render_verify(&report));
    }
    Ok(if report.is_ok() { 0 } else { 1 })
}

/// Permissive `--top` parsing: anything non-numeric or non-positive falls
/// back to the configured default rather than aborting the query.
fn parse_top(raw: Option<&str>, default: usize) -> usize {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => n as usize,
        _ => {
            log::warn!("ignoring invalid --top value {raw:?}, using default {default}");
            default
        }
    }
}
