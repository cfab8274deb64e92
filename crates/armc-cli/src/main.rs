//! Command-line interface for the armc model checker.

use armc_abstraction::{Abstraction, FiniteLengthAbstraction, PredicateAbstraction};
use armc_algebra::AlgebraRegistry;
use armc_io::{
    parse_path, AbstractionChoice, ArmcConfig, BoundIncrementKind, ConfigError, InitialBound,
    InitialPredicate, OutputWriter, ParseError,
};
use armc_verify::{VerifyError, VerifyOutcome, VerifySession, VerifySettings};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("cannot write '{path}': {message}")]
    Write { path: String, message: String },
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "armc", version)]
#[command(about = "Abstract regular model checking over symbolic word automata", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, value_name = "PATH", default_value = "armc.properties")]
    config: PathBuf,

    /// Override the initial-automaton path from the configuration
    #[arg(short, long, value_name = "PATH")]
    init: Option<PathBuf>,

    /// Override the bad-automaton path from the configuration
    #[arg(short, long, value_name = "PATH")]
    bad: Option<PathBuf>,

    /// Override the transducer paths with a single path
    #[arg(short, long, value_name = "PATH")]
    tau: Option<PathBuf>,

    /// Write a default configuration file and exit
    #[arg(short, long)]
    generate_config: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error - {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if cli.generate_config {
        let path = cli.config;
        fs::write(&path, ArmcConfig::default_template()).map_err(|e| CliError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = ArmcConfig::load(&cli.config)?;
    if let Some(init) = cli.init {
        config.init_file_path = init;
    }
    if let Some(bad) = cli.bad {
        config.bad_file_path = bad;
    }
    if let Some(tau) = cli.tau {
        config.tau_file_paths = vec![tau];
    }

    init_logging(config.verbose);
    verify(&config)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn verify(config: &ArmcConfig) -> CliResult<()> {
    let mut registry = AlgebraRegistry::new();
    let init = parse_path(&config.init_file_path, &mut registry)?.into_automaton()?;
    let bad = parse_path(&config.bad_file_path, &mut registry)?.into_automaton()?;
    let mut taus = Vec::new();
    for path in &config.tau_file_paths {
        taus.push(parse_path(path, &mut registry)?.into_transducer()?);
    }
    info!(
        init = %config.init_file_path.display(),
        bad = %config.bad_file_path.display(),
        transducers = taus.len(),
        "inputs loaded"
    );

    let settings = VerifySettings {
        direction: config.computation_direction,
        timeout: config.timeout,
    };
    let session = VerifySession::new(&mut registry, init, bad, taus, settings)?;
    let mut abstraction = build_abstraction(config, &session)?;
    let mut writer = OutputWriter::new(config).map_err(VerifyError::Sink)?;

    match session.run(abstraction.as_mut(), &mut writer)? {
        VerifyOutcome::Holds { loops, iterations } => {
            println!("Property HOLDS ({loops} refinements, {iterations} iterations).");
        }
        VerifyOutcome::Violated {
            counterexample, ..
        } => {
            println!(
                "Property VIOLATED; counterexample of length {} written to {}.",
                counterexample.len(),
                writer.counterexample_dir().display()
            );
        }
    }
    Ok(())
}

/// Build the configured abstraction from the session's rebound inputs.
fn build_abstraction(
    config: &ArmcConfig,
    session: &VerifySession,
) -> CliResult<Box<dyn Abstraction>> {
    match &config.abstraction {
        AbstractionChoice::PredicateLanguages {
            initial_predicate,
            include_guard,
            include_action,
            heuristic,
        } => {
            let mut seeds = Vec::new();
            match initial_predicate {
                InitialPredicate::Init => seeds.push(session.init().clone()),
                InitialPredicate::Bad => seeds.push(session.bad().clone()),
                InitialPredicate::Both => {
                    seeds.push(session.init().clone());
                    seeds.push(session.bad().clone());
                }
            }
            for tau in session.transducers() {
                if *include_guard {
                    seeds.push(tau.domain().map_err(VerifyError::from)?);
                }
                if *include_action {
                    seeds.push(tau.range().map_err(VerifyError::from)?);
                }
            }
            Ok(Box::new(PredicateAbstraction::new(
                config.language_direction,
                *heuristic,
                seeds,
            )))
        }
        AbstractionChoice::FiniteLengthLanguages {
            trace_languages,
            initial_bound,
            halve_initial_bound,
            bound_increment,
            halve_bound_increment,
        } => {
            let mut bound = match initial_bound {
                InitialBound::One => 1,
                InitialBound::Init => session.init().state_count(),
                InitialBound::Bad => session.bad().state_count(),
            };
            if *halve_initial_bound {
                bound = bound.div_ceil(2);
            }
            let increment = match bound_increment {
                BoundIncrementKind::One => armc_abstraction::BoundIncrement::One,
                BoundIncrementKind::X => armc_abstraction::BoundIncrement::WitnessSize,
                BoundIncrementKind::M => armc_abstraction::BoundIncrement::MachineSize,
            };
            Ok(Box::new(FiniteLengthAbstraction::new(
                config.language_direction,
                *trace_languages,
                bound,
                increment,
                *halve_bound_increment,
            )))
        }
    }
}
