//! End-to-end tests of the armc binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn armc(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_armc"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("binary runs")
}

const INIT_A: &str = "\
Ops start:0 a:1 b:1
Automaton init
States q0 q1
Final States q1
Transitions
start -> q0
a(q0) -> q1
";

const BAD_B: &str = "\
Ops start:0 a:1 b:1
Automaton bad
States q0 q1
Final States q1
Transitions
start -> q0
b(q0) -> q1
";

const TAU_IDENTITY: &str = "\
Ops start:0 @not_in{}/@not_in{}:1 a:1 b:1
Automaton tau
States p0
Final States p0
Transitions
start -> p0
@not_in{}/@not_in{}(p0) -> p0
";

const TAU_A_TO_B: &str = "\
Ops start:0 a/b:1
Automaton tau
States p0 p1
Final States p1
Transitions
start -> p0
a/b(p0) -> p1
";

fn write_inputs(dir: &Path, tau: &str) {
    fs::write(dir.join("init.tmb"), INIT_A).unwrap();
    fs::write(dir.join("bad.tmb"), BAD_B).unwrap();
    fs::write(dir.join("tau.tmb"), tau).unwrap();
    fs::write(
        dir.join("armc.properties"),
        armc_io::ArmcConfig::default_template(),
    )
    .unwrap();
}

#[test]
fn generate_config_writes_file_and_exits_zero() {
    let temp = tempfile::tempdir().unwrap();
    let out = armc(temp.path(), &["--generate-config"]);
    assert!(out.status.success());
    let written = fs::read_to_string(temp.path().join("armc.properties")).unwrap();
    assert!(written.contains("PREDICATE_LANGUAGES = YES"));
}

#[test]
fn holds_run_exits_zero_and_reports_on_stdout() {
    let temp = tempfile::tempdir().unwrap();
    write_inputs(temp.path(), TAU_IDENTITY);
    let out = armc(temp.path(), &[]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("HOLDS"), "stdout: {stdout}");
    assert!(temp.path().join("armc-output/armc-input/init.tmb").is_file());
    assert!(temp.path().join("armc-output/armc-loop-0/m-0.tmb").is_file());
}

#[test]
fn violated_run_exits_zero_and_writes_counterexample() {
    let temp = tempfile::tempdir().unwrap();
    write_inputs(temp.path(), TAU_A_TO_B);
    let out = armc(temp.path(), &[]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout.contains("VIOLATED"), "stdout: {stdout}");
    assert!(temp
        .path()
        .join("armc-output/armc-counterexample/x-0.tmb")
        .is_file());
}

#[test]
fn initial_violation_exits_one_with_error_prefix() {
    let temp = tempfile::tempdir().unwrap();
    write_inputs(temp.path(), TAU_IDENTITY);
    // bad = init: the intersection is non-empty before any step
    fs::write(temp.path().join("bad.tmb"), INIT_A).unwrap();
    let out = armc(temp.path(), &[]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Error - initial property violation"), "stderr: {stderr}");
}

#[test]
fn missing_input_file_exits_one() {
    let temp = tempfile::tempdir().unwrap();
    write_inputs(temp.path(), TAU_IDENTITY);
    fs::remove_file(temp.path().join("init.tmb")).unwrap();
    let out = armc(temp.path(), &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("Error - "));
}

#[test]
fn path_overrides_take_effect() {
    let temp = tempfile::tempdir().unwrap();
    write_inputs(temp.path(), TAU_IDENTITY);
    fs::write(temp.path().join("other-init.tmb"), INIT_A).unwrap();
    fs::remove_file(temp.path().join("init.tmb")).unwrap();
    let out = armc(temp.path(), &["--init", "other-init.tmb"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
}
