//! The FSM format: numeric columns with optional symbol files.
//!
//! Arc lines are `src dst isym` (automata) or `src dst isym osym`
//! (transducers); a line with a single column marks a final state. Symbol
//! number 0 is ε. Symbol files map names to numbers, one `name number` pair
//! per line; without them the numbers name themselves. The initial state is
//! the source of the first arc.
//!
//! Predicates are expanded to one arc per symbol on printing, so a round
//! trip preserves the language but not the predicate structure.

use crate::error::{ParseError, ParseResult};
use crate::format::{MachineRef, ParsedMachine, RawLabel, RawParts};
use armc_algebra::{Algebra, AlgebraRegistry, Label, Predicate, Symbol};
use armc_automata::{Guard, Sfa, Sft, StateId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

const FORMAT: &str = "fsm";

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        format: FORMAT,
        line,
        message: message.into(),
    }
}

/// Parse a `name number` symbol file into number→symbol.
fn parse_symbols(text: &str) -> ParseResult<BTreeMap<usize, Symbol>> {
    let mut table = BTreeMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(number), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(syntax(index + 1, "expected 'name number'"));
        };
        let number: usize = number
            .parse()
            .map_err(|_| syntax(index + 1, format!("bad symbol number '{number}'")))?;
        if number == 0 {
            // 0 is reserved for ε
            continue;
        }
        if table.insert(number, Symbol::new(name)).is_some() {
            return Err(ParseError::DuplicateDeclaration(number.to_string()));
        }
    }
    Ok(table)
}

fn lookup(
    table: &BTreeMap<usize, Symbol>,
    number: usize,
) -> Option<Predicate> {
    if number == 0 {
        return None;
    }
    let symbol = table
        .get(&number)
        .cloned()
        .unwrap_or_else(|| Symbol::new(number.to_string()));
    Some(Predicate::In([symbol].into()))
}

pub fn parse(
    text: &str,
    input_symbols: Option<&str>,
    output_symbols: Option<&str>,
    registry: &mut AlgebraRegistry,
) -> ParseResult<ParsedMachine> {
    let isyms = input_symbols.map(parse_symbols).transpose()?.unwrap_or_default();
    let osyms = output_symbols
        .map(parse_symbols)
        .transpose()?
        .unwrap_or_else(|| isyms.clone());

    let mut alphabet: BTreeSet<Symbol> = isyms.values().cloned().collect();
    alphabet.extend(osyms.values().cloned());

    let mut moves: Vec<(StateId, RawLabel, StateId)> = Vec::new();
    let mut finals: BTreeSet<StateId> = BTreeSet::new();
    let mut initial: Option<StateId> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let number = |field: &str| -> ParseResult<usize> {
            field
                .parse()
                .map_err(|_| syntax(line_no, format!("bad number '{field}'")))
        };
        match fields.as_slice() {
            &[state] => {
                finals.insert(number(state)?);
            }
            &[src, dst, isym] => {
                let source = number(src)?;
                initial.get_or_insert(source);
                let guard = match lookup(&isyms, number(isym)?) {
                    Some(p) => Guard::Pred(p),
                    None => Guard::Epsilon,
                };
                moves.push((source, RawLabel::Guard(guard), number(dst)?));
            }
            &[src, dst, isym, osym] => {
                let source = number(src)?;
                initial.get_or_insert(source);
                let input = lookup(&isyms, number(isym)?);
                let output = lookup(&osyms, number(osym)?);
                moves.push((source, RawLabel::Trans(Label::pair(input, output)), number(dst)?));
            }
            _ => return Err(syntax(line_no, "expected 1, 3 or 4 columns")),
        }
    }

    let Some(initial) = initial else {
        return Err(syntax(1, "no transitions"));
    };
    let alphabet = (!alphabet.is_empty()).then_some(alphabet);
    let parts = RawParts {
        name: None,
        initial,
        finals,
        moves,
        alphabet,
        state_names: BTreeMap::new(),
    };
    parts.assemble(registry)
}

// === printing ===

/// Symbol numbering shared by the arcs and the companion symbol file.
fn numbering(algebra: &Algebra) -> BTreeMap<Symbol, usize> {
    algebra
        .symbols()
        .iter()
        .enumerate()
        .map(|(i, s)| (s.clone(), i + 1))
        .collect()
}

/// The companion symbol file, with ε as number 0.
pub fn render_symbols(algebra: &Algebra) -> String {
    let mut out = String::new();
    writeln!(out, "<eps> 0").ok();
    for (symbol, number) in numbering(algebra) {
        writeln!(out, "{symbol} {number}").ok();
    }
    out
}

pub fn render(machine: MachineRef<'_>) -> String {
    match machine {
        MachineRef::Automaton(m) => render_sfa(m),
        MachineRef::Transducer(t) => render_sft(t),
    }
}

fn render_sfa(m: &Sfa) -> String {
    let m = m.normalize(0);
    let numbers = numbering(m.algebra());
    let mut out = String::new();
    for mv in m.moves() {
        match &mv.label {
            Guard::Epsilon => {
                writeln!(out, "{} {} 0", mv.source, mv.target).ok();
            }
            Guard::Pred(p) => {
                for symbol in m.algebra().inclusive_set(p) {
                    writeln!(out, "{} {} {}", mv.source, mv.target, numbers[&symbol]).ok();
                }
            }
        }
    }
    for state in m.finals() {
        writeln!(out, "{state}").ok();
    }
    out
}

fn render_sft(t: &Sft) -> String {
    let t = t.normalize(0);
    let numbers = numbering(t.algebra());
    let mut out = String::new();
    for mv in t.moves() {
        match &mv.label {
            Label::Identity(p) => {
                for symbol in t.algebra().inclusive_set(p) {
                    let n = numbers[&symbol];
                    writeln!(out, "{} {} {n} {n}", mv.source, mv.target).ok();
                }
            }
            Label::Pair { input, output } => {
                let inputs: Vec<usize> = match input {
                    Some(p) => t
                        .algebra()
                        .inclusive_set(p)
                        .iter()
                        .map(|s| numbers[s])
                        .collect(),
                    None => vec![0],
                };
                let outputs: Vec<usize> = match output {
                    Some(p) => t
                        .algebra()
                        .inclusive_set(p)
                        .iter()
                        .map(|s| numbers[s])
                        .collect(),
                    None => vec![0],
                };
                for &i in &inputs {
                    for &o in &outputs {
                        writeln!(out, "{} {} {i} {o}", mv.source, mv.target).ok();
                    }
                }
            }
        }
    }
    for state in t.finals() {
        writeln!(out, "{state}").ok();
    }
    out
}
