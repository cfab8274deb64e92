//! The Timbuk-style textual format.
//!
//! Word automata are written as tree automata over unary symbols plus one
//! nullary start symbol:
//!
//! ```text
//! Ops start:0 a:1 b:1 in{a,b}:1
//! Automaton A
//! States q0 q1
//! Final States q1
//! Transitions
//! start -> q0
//! in{a,b}(q0) -> q1
//! ```
//!
//! Predicates are `in{…}`, `not_in{…}` or a bare symbol; `eps` marks an
//! ε-move. Transducer labels are `X/Y` with `eps` for an empty side, or
//! `@P/@P` for identity.

use crate::error::{ParseError, ParseResult};
use crate::format::{MachineRef, ParsedMachine, RawLabel, RawParts};
use armc_algebra::{AlgebraRegistry, Label, Predicate, Symbol};
use armc_automata::{Guard, StateId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

const FORMAT: &str = "timbuk";

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        format: FORMAT,
        line,
        message: message.into(),
    }
}

pub fn parse(text: &str, registry: &mut AlgebraRegistry) -> ParseResult<ParsedMachine> {
    let mut declared: BTreeSet<String> = BTreeSet::new();
    let mut start_symbols: BTreeSet<String> = BTreeSet::new();
    let mut alphabet: BTreeSet<Symbol> = BTreeSet::new();
    let mut name: Option<String> = None;
    let mut state_ids: BTreeMap<String, StateId> = BTreeMap::new();
    let mut state_names: BTreeMap<StateId, String> = BTreeMap::new();
    let mut finals: BTreeSet<StateId> = BTreeSet::new();
    let mut moves: Vec<(StateId, RawLabel, StateId)> = Vec::new();
    let mut initial: Option<StateId> = None;
    let mut in_transitions = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Ops ") {
            for item in rest.split_whitespace() {
                let Some((symbol, arity)) = item.rsplit_once(':') else {
                    return Err(syntax(line_no, format!("expected name:arity, found '{item}'")));
                };
                let arity: usize = arity
                    .parse()
                    .map_err(|_| syntax(line_no, format!("bad arity in '{item}'")))?;
                if !declared.insert(symbol.to_string()) {
                    return Err(ParseError::DuplicateDeclaration(symbol.to_string()));
                }
                match arity {
                    0 => {
                        start_symbols.insert(symbol.to_string());
                    }
                    1 => collect_alphabet(symbol, &mut alphabet),
                    _ => {
                        return Err(ParseError::UnsupportedArity {
                            symbol: symbol.to_string(),
                            arity,
                        })
                    }
                }
            }
        } else if let Some(rest) = line.strip_prefix("Automaton") {
            let rest = rest.trim();
            if !rest.is_empty() {
                name = Some(rest.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("Final States") {
            for token in rest.split_whitespace() {
                let Some(&id) = state_ids.get(token) else {
                    return Err(ParseError::UnknownFinalState(token.to_string()));
                };
                finals.insert(id);
            }
        } else if let Some(rest) = line.strip_prefix("States") {
            for token in rest.split_whitespace() {
                if state_ids.contains_key(token) {
                    return Err(ParseError::DuplicateState(token.to_string()));
                }
                let id = state_ids.len();
                state_ids.insert(token.to_string(), id);
                state_names.insert(id, token.to_string());
            }
        } else if line == "Transitions" {
            in_transitions = true;
        } else if in_transitions {
            let Some((left, right)) = line.split_once("->") else {
                return Err(syntax(line_no, "expected 'label(state) -> state'"));
            };
            let left = left.trim();
            let right = right.trim();
            let Some(&target) = state_ids.get(right) else {
                return Err(syntax(line_no, format!("unknown state '{right}'")));
            };
            if let Some((label_text, source_name)) = split_application(left) {
                let Some(&source) = state_ids.get(source_name) else {
                    return Err(syntax(line_no, format!("unknown state '{source_name}'")));
                };
                if !label_text.contains('/')
                    && label_text != "eps"
                    && !declared.is_empty()
                    && !declared.contains(label_text)
                {
                    return Err(syntax(line_no, format!("undeclared symbol '{label_text}'")));
                }
                let label = parse_label(label_text, line_no)?;
                moves.push((source, label, target));
            } else {
                // nullary start transition
                if !start_symbols.contains(left) {
                    return Err(syntax(line_no, format!("'{left}' is not a start symbol")));
                }
                if initial.replace(target).is_some() {
                    return Err(syntax(line_no, "more than one start transition"));
                }
            }
        } else {
            return Err(syntax(line_no, format!("unexpected line '{line}'")));
        }
    }

    let Some(initial) = initial else {
        return Err(ParseError::MissingStartSymbol);
    };
    let parts = RawParts {
        name,
        initial,
        finals,
        moves,
        alphabet: Some(alphabet),
        state_names,
    };
    parts.assemble(registry)
}

/// Split `label(state)` into its two parts.
fn split_application(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    if close != text.len() - 1 || close <= open {
        return None;
    }
    Some((&text[..open], text[open + 1..close].trim()))
}

/// Add the symbols a declared unary name speaks about to the alphabet.
fn collect_alphabet(symbol: &str, alphabet: &mut BTreeSet<Symbol>) {
    for side in symbol.split('/') {
        let side = side.trim_start_matches('@');
        if side == "eps" {
            continue;
        }
        if let Some(set) = brace_set(side) {
            alphabet.extend(set);
        } else {
            alphabet.insert(Symbol::new(side));
        }
    }
}

/// The member symbols of an `in{…}`/`not_in{…}` form, if it is one.
fn brace_set(text: &str) -> Option<BTreeSet<Symbol>> {
    let inner = text
        .strip_prefix("in{")
        .or_else(|| text.strip_prefix("not_in{"))?
        .strip_suffix('}')?;
    Some(
        inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Symbol::new)
            .collect(),
    )
}

fn parse_predicate(text: &str, line: usize) -> ParseResult<Predicate> {
    if let Some(set) = brace_set(text) {
        if text.starts_with("not_in{") {
            Ok(Predicate::NotIn(set))
        } else {
            Ok(Predicate::In(set))
        }
    } else if text.is_empty() || text.contains(['{', '}', '(', ')']) {
        Err(syntax(line, format!("bad predicate '{text}'")))
    } else {
        Ok(Predicate::symbol(text))
    }
}

fn parse_label(text: &str, line: usize) -> ParseResult<RawLabel> {
    if text == "eps" {
        return Ok(RawLabel::Guard(Guard::Epsilon));
    }
    let Some((left, right)) = text.split_once('/') else {
        return Ok(RawLabel::Guard(Guard::Pred(parse_predicate(text, line)?)));
    };
    if left.starts_with('@') || right.starts_with('@') {
        let (Some(l), Some(r)) = (left.strip_prefix('@'), right.strip_prefix('@')) else {
            return Err(ParseError::InvalidIdentityLabel(text.to_string()));
        };
        if l != r {
            return Err(ParseError::InvalidIdentityLabel(text.to_string()));
        }
        return Ok(RawLabel::Trans(Label::identity(parse_predicate(l, line)?)));
    }
    let side = |s: &str| -> ParseResult<Option<Predicate>> {
        if s == "eps" {
            Ok(None)
        } else {
            parse_predicate(s, line).map(Some)
        }
    };
    Ok(RawLabel::Trans(Label::pair(side(left)?, side(right)?)))
}

// === printing ===

fn render_predicate(p: &Predicate) -> String {
    match p {
        // single-symbol abbreviation
        Predicate::In(set) if set.len() == 1 => {
            set.iter().next().map(|s| s.to_string()).unwrap_or_default()
        }
        _ => p.to_string(),
    }
}

fn render_guard(g: &Guard) -> String {
    match g {
        Guard::Epsilon => "eps".to_string(),
        Guard::Pred(p) => render_predicate(p),
    }
}

fn render_trans_label(label: &Label) -> String {
    match label {
        Label::Identity(p) => {
            let p = render_predicate(p);
            format!("@{p}/@{p}")
        }
        Label::Pair { input, output } => {
            let side = |s: &Option<Predicate>| match s {
                Some(p) => render_predicate(p),
                None => "eps".to_string(),
            };
            format!("{}/{}", side(input), side(output))
        }
    }
}

pub fn render(machine: MachineRef<'_>) -> String {
    let (name, initial, states, finals, labels, edges): (
        _,
        _,
        Vec<StateId>,
        Vec<StateId>,
        Vec<String>,
        Vec<(StateId, String, StateId)>,
    ) = match machine {
        MachineRef::Automaton(m) => (
            m.name().unwrap_or("A").to_string(),
            m.initial(),
            m.states().iter().copied().collect(),
            m.finals().iter().copied().collect(),
            m.moves().map(|mv| render_guard(&mv.label)).collect(),
            m.moves()
                .map(|mv| (mv.source, render_guard(&mv.label), mv.target))
                .collect(),
        ),
        MachineRef::Transducer(t) => (
            t.name().unwrap_or("T").to_string(),
            t.initial(),
            t.states().iter().copied().collect(),
            t.finals().iter().copied().collect(),
            t.moves().map(|mv| render_trans_label(&mv.label)).collect(),
            t.moves()
                .map(|mv| (mv.source, render_trans_label(&mv.label), mv.target))
                .collect(),
        ),
    };
    let alphabet: &BTreeSet<Symbol> = match machine {
        MachineRef::Automaton(m) => m.algebra().symbols(),
        MachineRef::Transducer(t) => t.algebra().symbols(),
    };

    let mut declarations: BTreeSet<String> = alphabet.iter().map(|s| s.to_string()).collect();
    declarations.extend(labels.into_iter().filter(|l| l != "eps"));

    let mut out = String::new();
    write!(out, "Ops start:0").ok();
    for declaration in &declarations {
        write!(out, " {declaration}:1").ok();
    }
    writeln!(out).ok();
    writeln!(out, "Automaton {name}").ok();
    write!(out, "States").ok();
    for s in &states {
        write!(out, " q{s}").ok();
    }
    writeln!(out).ok();
    write!(out, "Final States").ok();
    for s in &finals {
        write!(out, " q{s}").ok();
    }
    writeln!(out).ok();
    writeln!(out, "Transitions").ok();
    writeln!(out, "start -> q{initial}").ok();
    for (source, label, target) in &edges {
        writeln!(out, "{label}(q{source}) -> q{target}").ok();
    }
    out
}
