//! Predicates over a finite alphabet.

use crate::symbol::Symbol;
use std::collections::BTreeSet;
use std::fmt;

/// A finite representation of a subset of an alphabet.
///
/// `In(s)` denotes exactly the symbols in `s`; `NotIn(s)` denotes the rest of
/// the alphabet. Keeping the complemented form first-class keeps predicates
/// compact when the alphabet is large. Predicates are immutable values.
///
/// The algebra is non-extensional: structurally distinct predicates may
/// denote the same set, so semantic comparisons go through
/// [`Algebra::equivalent`](crate::Algebra::equivalent).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    In(BTreeSet<Symbol>),
    NotIn(BTreeSet<Symbol>),
}

impl Predicate {
    /// The predicate denoting no symbol (`in{}`).
    pub fn none() -> Self {
        Predicate::In(BTreeSet::new())
    }

    /// The predicate denoting every symbol (`not_in{}`).
    pub fn any() -> Self {
        Predicate::NotIn(BTreeSet::new())
    }

    /// Predicate denoting exactly the given symbols.
    pub fn of<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Predicate::In(symbols.into_iter().map(Into::into).collect())
    }

    /// Predicate denoting a single symbol.
    pub fn symbol(s: impl Into<Symbol>) -> Self {
        Predicate::In([s.into()].into())
    }

    /// The listed symbol set, regardless of polarity.
    pub fn set(&self) -> &BTreeSet<Symbol> {
        match self {
            Predicate::In(s) | Predicate::NotIn(s) => s,
        }
    }

    /// Whether this is the inclusive (`in{…}`) form.
    pub fn is_inclusive(&self) -> bool {
        matches!(self, Predicate::In(_))
    }

    /// Negation: the polarity flips, the set is unchanged.
    pub fn not(&self) -> Predicate {
        match self {
            Predicate::In(s) => Predicate::NotIn(s.clone()),
            Predicate::NotIn(s) => Predicate::In(s.clone()),
        }
    }

    /// Conjunction.
    pub fn and(&self, other: &Predicate) -> Predicate {
        match (self, other) {
            (Predicate::In(a), Predicate::In(b)) => {
                Predicate::In(a.intersection(b).cloned().collect())
            }
            (Predicate::In(a), Predicate::NotIn(b)) | (Predicate::NotIn(b), Predicate::In(a)) => {
                Predicate::In(a.difference(b).cloned().collect())
            }
            (Predicate::NotIn(a), Predicate::NotIn(b)) => {
                Predicate::NotIn(a.union(b).cloned().collect())
            }
        }
    }

    /// Disjunction.
    pub fn or(&self, other: &Predicate) -> Predicate {
        match (self, other) {
            (Predicate::In(a), Predicate::In(b)) => Predicate::In(a.union(b).cloned().collect()),
            (Predicate::In(a), Predicate::NotIn(b)) | (Predicate::NotIn(b), Predicate::In(a)) => {
                Predicate::NotIn(b.difference(a).cloned().collect())
            }
            (Predicate::NotIn(a), Predicate::NotIn(b)) => {
                Predicate::NotIn(a.intersection(b).cloned().collect())
            }
        }
    }

    /// Set difference, derived from `and` and `not`.
    pub fn minus(&self, other: &Predicate) -> Predicate {
        self.and(&other.not())
    }

    /// Symmetric difference.
    pub fn xor(&self, other: &Predicate) -> Predicate {
        self.minus(other).or(&other.minus(self))
    }

    /// Whether the denotation contains `symbol`.
    ///
    /// Only meaningful for symbols of the enclosing alphabet; a `NotIn`
    /// predicate accepts any symbol outside its set.
    pub fn accepts_symbol(&self, symbol: &Symbol) -> bool {
        match self {
            Predicate::In(s) => s.contains(symbol),
            Predicate::NotIn(s) => !s.contains(symbol),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, set) = match self {
            Predicate::In(s) => ("in", s),
            Predicate::NotIn(s) => ("not_in", s),
        };
        write!(f, "{prefix}{{")?;
        for (i, sym) in set.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{sym}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(s: &str) -> Predicate {
        Predicate::of(s.split(',').filter(|p| !p.is_empty()))
    }

    #[test]
    fn test_and_mixed_polarity() {
        let p = syms("a,b").and(&Predicate::NotIn([Symbol::new("b")].into()));
        assert_eq!(p, Predicate::of(["a"]));
    }

    #[test]
    fn test_or_mixed_polarity() {
        // in{a} or not_in{a,b} denotes everything but b
        let p = syms("a").or(&Predicate::NotIn(
            [Symbol::new("a"), Symbol::new("b")].into(),
        ));
        assert_eq!(p, Predicate::NotIn([Symbol::new("b")].into()));
    }

    #[test]
    fn test_not_keeps_set() {
        let p = syms("a,b");
        assert_eq!(p.not().set(), p.set());
        assert_eq!(p.not().not(), p);
    }

    #[test]
    fn test_display() {
        assert_eq!(syms("b,a").to_string(), "in{a,b}");
        assert_eq!(Predicate::any().to_string(), "not_in{}");
    }
}
