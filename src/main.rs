//! Command-line driver: prove a file of target statements in a model
//! context with an iterative deepening search.
#![forbid(unsafe_code)]
use eqprover::{
    parse_statements, ContextError, KnowledgeKernel, ModelContext, ParseError,
    ProofCompletionState, SearchSettings, SettingsError,
};
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const EXIT_UNPROVEN: i32 = 3;
const EXIT_BAD_INPUT: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("{path}: {source}")]
    Targets { path: String, source: ParseError },
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: io::Error },
}

#[derive(Debug)]
struct Options {
    context: PathBuf,
    targets: PathBuf,
    settings: Option<PathBuf>,
    seed: Option<u64>,
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <context.json> <targets.txt> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --settings <file>  Search settings (JSON)");
    eprintln!("  --seed <n>         Override the random seed");
    eprintln!("  -h, --help         Show this help message");
    eprintln!("  -v, --version      Show version information");
    eprintln!();
    eprintln!("Set RUST_LOG to control log output (default: info).");
}

fn parse_args(args: &[String]) -> Result<Options, CliError> {
    let mut positional = Vec::new();
    let mut settings = None;
    let mut seed = None;
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--settings" => {
                let path = iter
                    .next()
                    .ok_or_else(|| CliError::Usage("--settings needs a file".into()))?;
                settings = Some(PathBuf::from(path));
            }
            "--seed" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError::Usage("--seed needs a value".into()))?;
                let parsed = value
                    .parse()
                    .map_err(|_| CliError::Usage(format!("bad seed `{}`", value)))?;
                seed = Some(parsed);
            }
            flag if flag.starts_with('-') => {
                return Err(CliError::Usage(format!("unknown option `{}`", flag)));
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let [context, targets]: [PathBuf; 2] = positional
        .try_into()
        .map_err(|_| CliError::Usage("expected a context file and a targets file".into()))?;
    Ok(Options {
        context,
        targets,
        settings,
        seed,
    })
}

/// Runs the search; `Ok(true)` when every target was proven.
fn run(opts: &Options) -> Result<bool, CliError> {
    let ctx = Rc::new(ModelContext::load(&opts.context)?);
    let settings = match &opts.settings {
        Some(path) => SearchSettings::load(path)?,
        None => SearchSettings::default(),
    };
    let mut kernel_settings = settings.kernel_settings();
    if let Some(seed) = opts.seed {
        kernel_settings.seed = seed;
    }
    let kernel = KnowledgeKernel::new(ctx.clone(), kernel_settings).map_err(|source| {
        CliError::Targets {
            path: opts.context.display().to_string(),
            source,
        }
    })?;
    let kernel = Rc::new(kernel);

    let targets_path = opts.targets.display().to_string();
    let text = fs::read_to_string(&opts.targets).map_err(|source| CliError::Io {
        path: targets_path.clone(),
        source,
    })?;
    let targets = parse_statements(&ctx, &text).map_err(|source| CliError::Targets {
        path: targets_path.clone(),
        source,
    })?;
    if targets.is_empty() {
        return Err(CliError::Usage(format!("{} contains no statements", targets_path)));
    }

    println!("Search settings: {} ({})", settings.name, settings.desc);
    println!("Seed: {}", kernel_settings.seed);
    println!("Targets: {}", targets.len());
    println!();

    let mut solver = settings.create_solver(kernel);
    solver.set_targets(&targets);
    for _ in 0..settings.max_steps {
        if !solver.any_proof_not_done() {
            break;
        }
        solver.step(settings.step_size);
    }

    let states = solver.states();
    let proofs = solver.proofs();
    let times = solver.agg_time();
    let expansions = solver.num_expansions();
    for (idx, target) in targets.iter().enumerate() {
        println!("{}: {}", target, states[idx]);
        println!("  Expansions: {}", expansions[idx]);
        println!("  Time: {:.3}s", times[idx]);
        if let Some(proof) = &proofs[idx] {
            println!("  Proof:");
            for line in proof.to_str().lines() {
                println!("    {}", line);
            }
        }
    }
    println!();
    println!("{}", solver.stats().report());

    Ok(states.iter().all(|s| *s == ProofCompletionState::Proven))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("eqprover", String::as_str);
    if let Some(first) = args.get(1) {
        match first.as_str() {
            "-h" | "--help" => {
                print_usage(program);
                return;
            }
            "-v" | "--version" => {
                println!("eqprover {}", VERSION);
                return;
            }
            _ => {}
        }
    }

    let opts = match parse_args(&args) {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("Error: {}", err);
            print_usage(program);
            process::exit(EXIT_BAD_INPUT);
        }
    };
    match run(&opts) {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_UNPROVEN),
        Err(err) => {
            tracing::error!(%err, "aborting");
            eprintln!("Error: {}", err);
            process::exit(EXIT_BAD_INPUT);
        }
    }
}
