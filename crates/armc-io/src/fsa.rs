//! The Prolog-style FSA format.
//!
//! ```text
//! fa(
//! fsa_preds,
//! 3,
//! [0],
//! [2],
//! [
//! trans(0, in([a,b]), 1),
//! trans(1, a/b, 2),
//! trans(1, id(a), 1)
//! ],
//! [
//! jump(0, 2)
//! ]).
//! ```
//!
//! The predicate module is `fsa_preds` or `fsa_frozen`; `jump` terms are
//! ε-moves and `[]` is an ε side in a transducer label.

use crate::error::{ParseError, ParseResult};
use crate::format::{MachineRef, ParsedMachine, RawLabel, RawParts};
use armc_algebra::{AlgebraRegistry, Label, Predicate, Symbol};
use armc_automata::{Guard, Sfa, Sft, StateId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

const FORMAT: &str = "fsa";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Number(usize),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Slash,
    Dot,
}

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        format: FORMAT,
        line,
        message: message.into(),
    }
}

fn tokenize(text: &str) -> ParseResult<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '%' => {
                // comment to end of line
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' => {
                tokens.push((Token::LParen, line));
                chars.next();
            }
            ')' => {
                tokens.push((Token::RParen, line));
                chars.next();
            }
            '[' => {
                tokens.push((Token::LBracket, line));
                chars.next();
            }
            ']' => {
                tokens.push((Token::RBracket, line));
                chars.next();
            }
            ',' => {
                tokens.push((Token::Comma, line));
                chars.next();
            }
            '/' => {
                tokens.push((Token::Slash, line));
                chars.next();
            }
            '.' => {
                tokens.push((Token::Dot, line));
                chars.next();
            }
            c if c.is_ascii_digit() => {
                let mut value = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        value.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = value
                    .parse()
                    .map_err(|_| syntax(line, format!("bad number '{value}'")))?;
                tokens.push((Token::Number(number), line));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Ident(ident), line));
            }
            other => return Err(syntax(line, format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl Parser {
    fn line(&self) -> usize {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|(_, l)| *l)
            .unwrap_or(1)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn next(&mut self) -> ParseResult<Token> {
        let token = self
            .tokens
            .get(self.position)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| syntax(self.line(), "unexpected end of input"))?;
        self.position += 1;
        Ok(token)
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        let line = self.line();
        let found = self.next()?;
        if found == token {
            Ok(())
        } else {
            Err(syntax(line, format!("expected {token:?}, found {found:?}")))
        }
    }

    fn ident(&mut self) -> ParseResult<String> {
        let line = self.line();
        match self.next()? {
            Token::Ident(name) => Ok(name),
            other => Err(syntax(line, format!("expected a name, found {other:?}"))),
        }
    }

    fn number(&mut self) -> ParseResult<usize> {
        let line = self.line();
        match self.next()? {
            Token::Number(n) => Ok(n),
            other => Err(syntax(line, format!("expected a number, found {other:?}"))),
        }
    }

    fn number_list(&mut self) -> ParseResult<Vec<usize>> {
        self.expect(Token::LBracket)?;
        let mut numbers = Vec::new();
        if self.peek() == Some(&Token::RBracket) {
            self.next()?;
            return Ok(numbers);
        }
        loop {
            numbers.push(self.number()?);
            match self.next()? {
                Token::Comma => continue,
                Token::RBracket => break,
                other => {
                    return Err(syntax(self.line(), format!("expected , or ], found {other:?}")))
                }
            }
        }
        Ok(numbers)
    }

    /// `a`, `in([a,b])`, `not_in([a])`, or `[]` for ε.
    fn predicate_side(&mut self) -> ParseResult<Option<Predicate>> {
        let line = self.line();
        match self.next()? {
            Token::LBracket => {
                self.expect(Token::RBracket)?;
                Ok(None)
            }
            Token::Ident(name) if name == "in" || name == "not_in" => {
                self.expect(Token::LParen)?;
                self.expect(Token::LBracket)?;
                let mut set: BTreeSet<Symbol> = BTreeSet::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.next()?;
                } else {
                    loop {
                        set.insert(Symbol::new(self.ident()?));
                        match self.next()? {
                            Token::Comma => continue,
                            Token::RBracket => break,
                            other => {
                                return Err(syntax(
                                    self.line(),
                                    format!("expected , or ], found {other:?}"),
                                ))
                            }
                        }
                    }
                }
                self.expect(Token::RParen)?;
                if name == "in" {
                    Ok(Some(Predicate::In(set)))
                } else {
                    Ok(Some(Predicate::NotIn(set)))
                }
            }
            Token::Ident(name) => Ok(Some(Predicate::symbol(name))),
            other => Err(syntax(line, format!("expected a predicate, found {other:?}"))),
        }
    }

    /// The label term of a `trans`: predicate, pair, or identity.
    fn label(&mut self) -> ParseResult<RawLabel> {
        if let Some(Token::Ident(name)) = self.peek() {
            if name == "id" {
                self.next()?;
                self.expect(Token::LParen)?;
                let inner = self.predicate_side()?;
                // a slash inside id(...) is not a predicate
                if self.peek() == Some(&Token::Slash) {
                    return Err(ParseError::InvalidIdentityLabel("id(../..)".to_string()));
                }
                self.expect(Token::RParen)?;
                let Some(p) = inner else {
                    return Err(ParseError::InvalidIdentityLabel("id([])".to_string()));
                };
                return Ok(RawLabel::Trans(Label::identity(p)));
            }
        }
        let left = self.predicate_side()?;
        if self.peek() == Some(&Token::Slash) {
            self.next()?;
            let right = self.predicate_side()?;
            Ok(RawLabel::Trans(Label::pair(left, right)))
        } else {
            match left {
                Some(p) => Ok(RawLabel::Guard(Guard::Pred(p))),
                None => Ok(RawLabel::Guard(Guard::Epsilon)),
            }
        }
    }
}

pub fn parse(text: &str, registry: &mut AlgebraRegistry) -> ParseResult<ParsedMachine> {
    let mut p = Parser {
        tokens: tokenize(text)?,
        position: 0,
    };

    let line = p.line();
    let head = p.ident()?;
    if head != "fa" {
        return Err(syntax(line, format!("expected fa(...), found '{head}'")));
    }
    p.expect(Token::LParen)?;
    let line = p.line();
    let module = p.ident()?;
    if module != "fsa_preds" && module != "fsa_frozen" {
        return Err(syntax(line, format!("unknown predicate module '{module}'")));
    }
    p.expect(Token::Comma)?;
    let state_count = p.number()?;
    p.expect(Token::Comma)?;

    let line = p.line();
    let initials = p.number_list()?;
    let [initial] = initials.as_slice() else {
        return Err(syntax(line, "expected exactly one initial state"));
    };
    let initial = *initial;
    p.expect(Token::Comma)?;
    let finals: BTreeSet<StateId> = p.number_list()?.into_iter().collect();
    p.expect(Token::Comma)?;

    // transitions
    let mut moves: Vec<(StateId, RawLabel, StateId)> = Vec::new();
    p.expect(Token::LBracket)?;
    if p.peek() == Some(&Token::RBracket) {
        p.next()?;
    } else {
        loop {
            let line = p.line();
            let term = p.ident()?;
            if term != "trans" {
                return Err(syntax(line, format!("expected trans(...), found '{term}'")));
            }
            p.expect(Token::LParen)?;
            let source = p.number()?;
            p.expect(Token::Comma)?;
            let label = p.label()?;
            p.expect(Token::Comma)?;
            let target = p.number()?;
            p.expect(Token::RParen)?;
            moves.push((source, label, target));
            match p.next()? {
                Token::Comma => continue,
                Token::RBracket => break,
                other => {
                    return Err(syntax(p.line(), format!("expected , or ], found {other:?}")))
                }
            }
        }
    }
    p.expect(Token::Comma)?;

    // jumps (ε-moves)
    p.expect(Token::LBracket)?;
    if p.peek() == Some(&Token::RBracket) {
        p.next()?;
    } else {
        loop {
            let line = p.line();
            let term = p.ident()?;
            if term != "jump" {
                return Err(syntax(line, format!("expected jump(...), found '{term}'")));
            }
            p.expect(Token::LParen)?;
            let source = p.number()?;
            p.expect(Token::Comma)?;
            let target = p.number()?;
            p.expect(Token::RParen)?;
            moves.push((source, RawLabel::Guard(Guard::Epsilon), target));
            match p.next()? {
                Token::Comma => continue,
                Token::RBracket => break,
                other => {
                    return Err(syntax(p.line(), format!("expected , or ], found {other:?}")))
                }
            }
        }
    }
    p.expect(Token::RParen)?;
    p.expect(Token::Dot)?;

    for &(source, _, target) in &moves {
        if source >= state_count || target >= state_count {
            return Err(syntax(1, format!("state beyond declared count {state_count}")));
        }
    }

    let parts = RawParts {
        name: None,
        initial,
        finals,
        moves,
        alphabet: None,
        state_names: BTreeMap::new(),
    };
    parts.assemble(registry)
}

// === printing ===

fn render_predicate(p: &Predicate) -> String {
    let list = |set: &BTreeSet<Symbol>| {
        set.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",")
    };
    match p {
        Predicate::In(set) if set.len() == 1 => list(set),
        Predicate::In(set) => format!("in([{}])", list(set)),
        Predicate::NotIn(set) => format!("not_in([{}])", list(set)),
    }
}

fn render_side(p: &Option<Predicate>) -> String {
    match p {
        Some(p) => render_predicate(p),
        None => "[]".to_string(),
    }
}

pub fn render(machine: MachineRef<'_>) -> String {
    match machine {
        MachineRef::Automaton(m) => render_sfa(m),
        MachineRef::Transducer(t) => render_sft(t),
    }
}

fn render_header(out: &mut String, state_count: usize, initial: StateId, finals: &[StateId]) {
    writeln!(out, "fa(").ok();
    writeln!(out, "fsa_preds,").ok();
    writeln!(out, "{state_count},").ok();
    writeln!(out, "[{initial}],").ok();
    let finals = finals
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "[{finals}],").ok();
}

fn render_lists(out: &mut String, trans: Vec<String>, jumps: Vec<String>) {
    writeln!(out, "[").ok();
    writeln!(out, "{}", trans.join(",\n")).ok();
    writeln!(out, "],").ok();
    writeln!(out, "[").ok();
    writeln!(out, "{}", jumps.join(",\n")).ok();
    writeln!(out, "]).").ok();
}

fn render_sfa(m: &Sfa) -> String {
    let m = m.normalize(0);
    let mut trans = Vec::new();
    let mut jumps = Vec::new();
    for mv in m.moves() {
        match &mv.label {
            Guard::Epsilon => jumps.push(format!("jump({}, {})", mv.source, mv.target)),
            Guard::Pred(p) => trans.push(format!(
                "trans({}, {}, {})",
                mv.source,
                render_predicate(p),
                mv.target
            )),
        }
    }
    let mut out = String::new();
    let finals: Vec<StateId> = m.finals().iter().copied().collect();
    render_header(&mut out, m.state_count(), m.initial(), &finals);
    render_lists(&mut out, trans, jumps);
    out
}

fn render_sft(t: &Sft) -> String {
    let t = t.normalize(0);
    let mut trans = Vec::new();
    let mut jumps = Vec::new();
    for mv in t.moves() {
        match &mv.label {
            Label::Pair {
                input: None,
                output: None,
            } => jumps.push(format!("jump({}, {})", mv.source, mv.target)),
            Label::Identity(p) => trans.push(format!(
                "trans({}, id({}), {})",
                mv.source,
                render_predicate(p),
                mv.target
            )),
            Label::Pair { input, output } => trans.push(format!(
                "trans({}, {}/{}, {})",
                mv.source,
                render_side(input),
                render_side(output),
                mv.target
            )),
        }
    }
    let mut out = String::new();
    let finals: Vec<StateId> = t.finals().iter().copied().collect();
    render_header(&mut out, t.state_count(), t.initial(), &finals);
    render_lists(&mut out, trans, jumps);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
fa(
fsa_preds,
3,
[0],
[2],
[
trans(0, in([a,b]), 1),
trans(1, b, 2)
],
[
jump(0, 2)
]).
";

    #[test]
    fn test_parse_automaton() {
        let m = parse(SAMPLE, &mut AlgebraRegistry::new())
            .unwrap()
            .into_automaton()
            .unwrap();
        assert_eq!(m.state_count(), 3);
        assert!(m.has_epsilon_moves());
        let ab: Vec<Symbol> = ["a", "b"].map(Symbol::new).into();
        assert!(m.accepts(&ab));
        assert!(m.accepts(&[]));
    }

    #[test]
    fn test_parse_transducer_with_identity() {
        let text = "\
fa(
fsa_frozen,
2,
[0],
[1],
[
trans(0, id(not_in([])), 0),
trans(0, a/b, 1),
trans(1, a/[], 1)
],
[
]).
";
        let t = parse(text, &mut AlgebraRegistry::new())
            .unwrap()
            .into_transducer()
            .unwrap();
        assert_eq!(t.move_count(), 3);
    }

    #[test]
    fn test_invalid_identity() {
        let text = "\
fa(
fsa_preds,
2,
[0],
[1],
[
trans(0, id([]), 1)
],
[
]).
";
        let err = parse(text, &mut AlgebraRegistry::new()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidIdentityLabel(_)));
    }

    #[test]
    fn test_unknown_module() {
        let text = SAMPLE.replace("fsa_preds", "fsa_magic");
        let err = parse(&text, &mut AlgebraRegistry::new()).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_roundtrip_preserves_language() {
        let m = parse(SAMPLE, &mut AlgebraRegistry::new())
            .unwrap()
            .into_automaton()
            .unwrap();
        let printed = render(MachineRef::Automaton(&m));
        let again = parse(&printed, &mut AlgebraRegistry::new())
            .unwrap()
            .into_automaton()
            .unwrap();
        assert!(m.equivalent(&again).unwrap());
    }
}
