//! The on-disk layout produced by a verification run.

use armc_abstraction::{Direction, PredicateAbstraction};
use armc_algebra::{AlgebraRegistry, Label, Predicate, Symbol};
use armc_automata::{Guard, Machine, Move, Sfa, Sft};
use armc_io::{AbstractionChoice, ArmcConfig, AutomataFormat, InitialPredicate, OutputWriter};
use armc_verify::{VerifyOutcome, VerifySession, VerifySettings};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn sfa_word(reg: &mut AlgebraRegistry, letters: &str) -> Sfa {
    let algebra = reg.algebra(["a", "b"].map(Symbol::new));
    let moves: Vec<Move<Guard>> = letters
        .chars()
        .enumerate()
        .map(|(i, c)| {
            Move::new(
                i,
                Guard::Pred(Predicate::of([c.to_string().as_str()])),
                i + 1,
            )
        })
        .collect();
    Machine::new(algebra, 0, [letters.len()], moves, None, BTreeMap::new()).unwrap()
}

fn tau_a_to_b(reg: &mut AlgebraRegistry) -> Sft {
    let algebra = reg.algebra(["a", "b"].map(Symbol::new));
    Machine::new(
        algebra,
        0,
        [1],
        [Move::new(
            0,
            Label::pair(Some(Predicate::of(["a"])), Some(Predicate::of(["b"]))),
            1,
        )],
        None,
        BTreeMap::new(),
    )
    .unwrap()
}

fn config_for(dir: PathBuf) -> ArmcConfig {
    ArmcConfig {
        init_file_path: PathBuf::from("init.tmb"),
        bad_file_path: PathBuf::from("bad.tmb"),
        tau_file_paths: vec![PathBuf::from("tau.tmb")],
        computation_direction: Direction::Forward,
        language_direction: Direction::Forward,
        timeout: None,
        verbose: false,
        print_automata: true,
        automata_format: AutomataFormat::Timbuk,
        output_directory: dir,
        image_format: None,
        abstraction: AbstractionChoice::PredicateLanguages {
            initial_predicate: InitialPredicate::Bad,
            include_guard: false,
            include_action: false,
            heuristic: None,
        },
    }
}

#[test]
fn violated_run_writes_input_loop_and_counterexample_dirs() {
    let temp = tempfile::tempdir().unwrap();
    let out = temp.path().join("armc-output");
    let config = config_for(out.clone());

    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "b");
    let tau = tau_a_to_b(&mut reg);
    let session =
        VerifySession::new(&mut reg, init, bad, vec![tau], VerifySettings::default()).unwrap();
    let mut abstraction =
        PredicateAbstraction::new(Direction::Forward, None, vec![session.bad().clone()]);
    let mut writer = OutputWriter::new(&config).unwrap();

    let outcome = session.run(&mut abstraction, &mut writer).unwrap();
    assert!(matches!(outcome, VerifyOutcome::Violated { .. }));

    assert!(out.join("armc-input/config.properties").is_file());
    assert!(out.join("armc-input/init.tmb").is_file());
    assert!(out.join("armc-input/bad.tmb").is_file());
    assert!(out.join("armc-input/tau.tmb").is_file());
    assert!(out.join("armc-loop-0/m-0.tmb").is_file());
    assert!(out.join("armc-loop-0/m-0+.tmb").is_file());
    assert!(out.join("armc-loop-0/x-0.tmb").is_file());
    assert!(out.join("armc-counterexample/m-0.tmb").is_file());
    assert!(out.join("armc-counterexample/m-1.tmb").is_file());
    assert!(out.join("armc-counterexample/x-1.tmb").is_file());
    // the final step broke out before collapsing, so it has no abstraction
    assert!(!out.join("armc-counterexample/m-1+.tmb").exists());
}

#[test]
fn output_directory_is_cleared_on_start() {
    let temp = tempfile::tempdir().unwrap();
    let out = temp.path().join("armc-output");
    std::fs::create_dir_all(out.join("stale")).unwrap();
    let config = config_for(out.clone());
    let _writer = OutputWriter::new(&config).unwrap();
    assert!(out.is_dir());
    assert!(!out.join("stale").exists());
}

#[test]
fn print_automata_no_still_writes_config() {
    let temp = tempfile::tempdir().unwrap();
    let out = temp.path().join("armc-output");
    let mut config = config_for(out.clone());
    config.print_automata = false;

    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "b");
    let tau = tau_a_to_b(&mut reg);
    let session =
        VerifySession::new(&mut reg, init, bad, vec![tau], VerifySettings::default()).unwrap();
    let mut abstraction =
        PredicateAbstraction::new(Direction::Forward, None, vec![session.bad().clone()]);
    let mut writer = OutputWriter::new(&config).unwrap();
    session.run(&mut abstraction, &mut writer).unwrap();

    assert!(out.join("armc-input/config.properties").is_file());
    assert!(!out.join("armc-input/init.tmb").exists());
}
