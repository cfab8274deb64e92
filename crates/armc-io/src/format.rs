//! Format dispatch and machine assembly.

use crate::config::AutomataFormat;
use crate::error::{ParseError, ParseResult};
use crate::{dot, fsa, fsm, timbuk};
use armc_algebra::{AlgebraRegistry, Label, Symbol};
use armc_automata::{Guard, Machine, Move, Sfa, Sft, StateId};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A parsed machine: the file decides whether it is an automaton or a
/// transducer by the labels it uses.
#[derive(Debug)]
pub enum ParsedMachine {
    Automaton(Sfa),
    Transducer(Sft),
}

impl ParsedMachine {
    pub fn into_automaton(self) -> ParseResult<Sfa> {
        match self {
            ParsedMachine::Automaton(m) => Ok(m),
            ParsedMachine::Transducer(_) => Err(ParseError::WrongKind {
                expected: "an automaton, found a transducer",
            }),
        }
    }

    pub fn into_transducer(self) -> ParseResult<Sft> {
        match self {
            ParsedMachine::Transducer(t) => Ok(t),
            ParsedMachine::Automaton(_) => Err(ParseError::WrongKind {
                expected: "a transducer, found an automaton",
            }),
        }
    }
}

/// An edge label before the file's kind is known.
#[derive(Debug, Clone)]
pub(crate) enum RawLabel {
    Guard(Guard),
    Trans(Label),
}

/// What every parser returns: initial state, final states, moves, optional
/// alphabet, optional name, optional state-name map.
#[derive(Debug)]
pub(crate) struct RawParts {
    pub name: Option<String>,
    pub initial: StateId,
    pub finals: BTreeSet<StateId>,
    pub moves: Vec<(StateId, RawLabel, StateId)>,
    pub alphabet: Option<BTreeSet<Symbol>>,
    pub state_names: BTreeMap<StateId, String>,
}

impl RawParts {
    /// Build the machine through the shared registry; structural validation
    /// and trimming happen in the machine constructor.
    pub fn assemble(self, registry: &mut AlgebraRegistry) -> ParseResult<ParsedMachine> {
        let is_transducer = self
            .moves
            .iter()
            .any(|(_, label, _)| matches!(label, RawLabel::Trans(_)));

        let mut symbols = self.alphabet.unwrap_or_default();
        for (_, label, _) in &self.moves {
            match label {
                RawLabel::Guard(Guard::Pred(p)) => symbols.extend(p.set().iter().cloned()),
                RawLabel::Guard(Guard::Epsilon) => {}
                RawLabel::Trans(label) => {
                    for side in [label.input(), label.output()].into_iter().flatten() {
                        symbols.extend(side.set().iter().cloned());
                    }
                }
            }
        }
        let algebra = registry.algebra(symbols);

        if is_transducer {
            let moves: Vec<Move<Label>> = self
                .moves
                .into_iter()
                .map(|(source, label, target)| match label {
                    RawLabel::Trans(label) => Ok(Move::new(source, label, target)),
                    RawLabel::Guard(Guard::Epsilon) => {
                        Ok(Move::new(source, Label::epsilon(), target))
                    }
                    RawLabel::Guard(Guard::Pred(_)) => Err(ParseError::MixedLabels),
                })
                .collect::<ParseResult<_>>()?;
            let machine = Machine::new(
                algebra,
                self.initial,
                self.finals,
                moves,
                self.name,
                self.state_names,
            )?;
            Ok(ParsedMachine::Transducer(machine))
        } else {
            let moves: Vec<Move<Guard>> = self
                .moves
                .into_iter()
                .map(|(source, label, target)| match label {
                    RawLabel::Guard(g) => Move::new(source, g, target),
                    RawLabel::Trans(_) => unreachable!("kind decided above"),
                })
                .collect();
            let machine = Machine::new(
                algebra,
                self.initial,
                self.finals,
                moves,
                self.name,
                self.state_names,
            )?;
            Ok(ParsedMachine::Automaton(machine))
        }
    }
}

/// Input format detection by file extension.
pub fn format_for_path(path: &Path) -> ParseResult<AutomataFormat> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match extension {
        "tmb" | "timbuk" => Ok(AutomataFormat::Timbuk),
        "fsa" | "pl" => Ok(AutomataFormat::Fsa),
        "fsm" => Ok(AutomataFormat::Fsm),
        _ => Err(ParseError::UnknownFormat(path.display().to_string())),
    }
}

/// Parse a machine file, detecting the format from the extension. FSM input
/// picks up the optional `.isym`/`.osym` companions next to the file.
pub fn parse_path(path: &Path, registry: &mut AlgebraRegistry) -> ParseResult<ParsedMachine> {
    let format = format_for_path(path)?;
    let text = read(path)?;
    match format {
        AutomataFormat::Timbuk => timbuk::parse(&text, registry),
        AutomataFormat::Fsa => fsa::parse(&text, registry),
        AutomataFormat::Fsm => {
            let isyms = read_optional(&path.with_extension("isym"))?;
            let osyms = read_optional(&path.with_extension("osym"))?;
            fsm::parse(&text, isyms.as_deref(), osyms.as_deref(), registry)
        }
        AutomataFormat::Dot => Err(ParseError::UnknownFormat(path.display().to_string())),
    }
}

/// A machine to print.
#[derive(Debug, Clone, Copy)]
pub enum MachineRef<'a> {
    Automaton(&'a Sfa),
    Transducer(&'a Sft),
}

/// Render a machine in the given output format.
pub fn render(machine: MachineRef<'_>, format: AutomataFormat) -> String {
    match format {
        AutomataFormat::Dot => dot::render(machine),
        AutomataFormat::Timbuk => timbuk::render(machine),
        AutomataFormat::Fsa => fsa::render(machine),
        AutomataFormat::Fsm => fsm::render(machine),
    }
}

fn read(path: &Path) -> ParseResult<String> {
    std::fs::read_to_string(path).map_err(|e| ParseError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_optional(path: &Path) -> ParseResult<Option<String>> {
    if path.exists() {
        read(path).map(Some)
    } else {
        Ok(None)
    }
}
