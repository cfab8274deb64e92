//! DOT output, for visualisation only.

use crate::format::MachineRef;
use armc_automata::StateId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

struct Graph {
    name: String,
    initial: StateId,
    states: Vec<StateId>,
    finals: BTreeSet<StateId>,
    names: BTreeMap<StateId, String>,
    edges: Vec<(StateId, String, StateId)>,
}

pub fn render(machine: MachineRef<'_>) -> String {
    let graph = match machine {
        MachineRef::Automaton(m) => Graph {
            name: m.name().unwrap_or("sfa").to_string(),
            initial: m.initial(),
            states: m.states().iter().copied().collect(),
            finals: m.finals().clone(),
            names: m.state_names().clone(),
            edges: m
                .moves()
                .map(|mv| (mv.source, mv.label.to_string(), mv.target))
                .collect(),
        },
        MachineRef::Transducer(t) => Graph {
            name: t.name().unwrap_or("sft").to_string(),
            initial: t.initial(),
            states: t.states().iter().copied().collect(),
            finals: t.finals().clone(),
            names: t.state_names().clone(),
            edges: t
                .moves()
                .map(|mv| (mv.source, mv.label.to_string(), mv.target))
                .collect(),
        },
    };

    let label = |s: StateId| {
        graph
            .names
            .get(&s)
            .cloned()
            .unwrap_or_else(|| format!("q{s}"))
    };

    let mut out = String::new();
    writeln!(out, "digraph \"{}\" {{", escape(&graph.name)).ok();
    writeln!(out, "  rankdir = LR;").ok();
    writeln!(out, "  node [shape = circle];").ok();
    writeln!(out, "  init [shape = point];").ok();
    for &s in &graph.states {
        let shape = if graph.finals.contains(&s) {
            "doublecircle"
        } else {
            "circle"
        };
        writeln!(out, "  s{s} [shape = {shape}, label = \"{}\"];", escape(&label(s))).ok();
    }
    writeln!(out, "  init -> s{};", graph.initial).ok();
    for (source, text, target) in &graph.edges {
        writeln!(out, "  s{source} -> s{target} [label = \"{}\"];", escape(text)).ok();
    }
    writeln!(out, "}}").ok();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use armc_algebra::{AlgebraRegistry, Predicate, Symbol};
    use armc_automata::{Guard, Machine, Move};
    use std::collections::BTreeMap;

    #[test]
    fn test_render_contains_graph_elements() {
        let algebra = AlgebraRegistry::new().algebra(["a", "b"].map(Symbol::new));
        let m = Machine::new(
            algebra,
            0,
            [1],
            [Move::new(0, Guard::Pred(Predicate::of(["a"])), 1)],
            Some("tiny".into()),
            BTreeMap::new(),
        )
        .unwrap();
        let dot = render(MachineRef::Automaton(&m));
        assert!(dot.starts_with("digraph \"tiny\""));
        assert!(dot.contains("init -> s0;"));
        assert!(dot.contains("s1 [shape = doublecircle"));
        assert!(dot.contains("s0 -> s1 [label = \"in{a}\"]"));
    }
}
