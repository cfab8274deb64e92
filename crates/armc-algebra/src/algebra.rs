//! The predicate boolean algebra for one alphabet.

use crate::predicate::Predicate;
use crate::symbol::Symbol;
use std::collections::BTreeSet;
use std::fmt;

/// The boolean algebra of predicates over one finite alphabet.
///
/// Boolean connectives live on [`Predicate`] (they never consult the
/// alphabet); everything that depends on the alphabet (satisfiability,
/// semantic comparison, materialisation, minterms) lives here. Instances are
/// shared per alphabet through [`AlgebraRegistry`](crate::AlgebraRegistry).
#[derive(Debug, PartialEq, Eq)]
pub struct Algebra {
    symbols: BTreeSet<Symbol>,
}

impl Algebra {
    pub(crate) fn new(symbols: BTreeSet<Symbol>) -> Self {
        Algebra { symbols }
    }

    pub fn symbols(&self) -> &BTreeSet<Symbol> {
        &self.symbols
    }

    pub fn size(&self) -> usize {
        self.symbols.len()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Whether the denotation of `p` intersects the alphabet.
    pub fn satisfiable(&self, p: &Predicate) -> bool {
        match p {
            Predicate::In(s) => s.iter().any(|sym| self.symbols.contains(sym)),
            Predicate::NotIn(s) => self.symbols.iter().any(|sym| !s.contains(sym)),
        }
    }

    /// Materialise the denotation of `p` restricted to the alphabet.
    pub fn inclusive_set(&self, p: &Predicate) -> BTreeSet<Symbol> {
        self.symbols
            .iter()
            .filter(|sym| p.accepts_symbol(sym))
            .cloned()
            .collect()
    }

    /// Whether `p` and `q` denote the same subset of the alphabet.
    pub fn equivalent(&self, p: &Predicate, q: &Predicate) -> bool {
        self.symbols
            .iter()
            .all(|sym| p.accepts_symbol(sym) == q.accepts_symbol(sym))
    }

    /// Whether the denotation of `p` is contained in the denotation of `q`.
    pub fn implies(&self, p: &Predicate, q: &Predicate) -> bool {
        self.symbols
            .iter()
            .all(|sym| !p.accepts_symbol(sym) || q.accepts_symbol(sym))
    }

    /// Pick the representation of `p` with the smaller listed set.
    pub fn simplify(&self, p: &Predicate) -> Predicate {
        let inside = self.inclusive_set(p);
        let outside: BTreeSet<Symbol> = self
            .symbols
            .iter()
            .filter(|sym| !inside.contains(*sym))
            .cloned()
            .collect();
        if inside.len() <= outside.len() {
            Predicate::In(inside)
        } else {
            Predicate::NotIn(outside)
        }
    }

    /// Enumerate the minterms of a list of predicates.
    ///
    /// A minterm is a satisfiable intersection of each predicate or its
    /// complement; together the minterms partition the alphabet. The
    /// enumeration order is deterministic: positive branches before negated
    /// ones, in input order.
    pub fn minterms(&self, predicates: &[Predicate]) -> Vec<Predicate> {
        let mut terms = vec![Predicate::any()];
        for p in predicates {
            let mut split = Vec::with_capacity(terms.len() * 2);
            for t in &terms {
                let pos = t.and(p);
                if self.satisfiable(&pos) {
                    split.push(pos);
                }
                let neg = t.and(&p.not());
                if self.satisfiable(&neg) {
                    split.push(neg);
                }
            }
            terms = split;
        }
        terms
    }
}

impl fmt::Display for Algebra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, sym) in self.symbols.iter().enumerate() {
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
    use crate::registry::AlgebraRegistry;
    use std::sync::Arc;

    fn abc() -> Arc<Algebra> {
        AlgebraRegistry::new().algebra(["a", "b", "c"].map(Symbol::new))
    }

    #[test]
    fn test_satisfiable() {
        let alg = abc();
        assert!(!alg.satisfiable(&Predicate::none()));
        assert!(alg.satisfiable(&Predicate::any()));
        assert!(alg.satisfiable(&Predicate::of(["a"])));
        // a set covering the whole alphabet makes not_in unsatisfiable
        assert!(!alg.satisfiable(&Predicate::of(["a", "b", "c"]).not()));
        // symbols outside the alphabet do not make a predicate satisfiable
        assert!(!alg.satisfiable(&Predicate::of(["z"])));
    }

    #[test]
    fn test_equivalent_across_polarity() {
        let alg = abc();
        let p = Predicate::of(["a"]);
        let q = Predicate::NotIn([Symbol::new("b"), Symbol::new("c")].into());
        assert!(alg.equivalent(&p, &q));
        assert!(!alg.equivalent(&p, &Predicate::of(["b"])));
    }

    #[test]
    fn test_implies() {
        let alg = abc();
        assert!(alg.implies(&Predicate::of(["a"]), &Predicate::of(["a", "b"])));
        assert!(!alg.implies(&Predicate::of(["a", "c"]), &Predicate::of(["a", "b"])));
        assert!(alg.implies(&Predicate::none(), &Predicate::of(["a"])));
    }

    #[test]
    fn test_simplify_prefers_smaller_set() {
        let alg = abc();
        let bulky = Predicate::of(["a", "b"]);
        assert_eq!(alg.simplify(&bulky), Predicate::NotIn([Symbol::new("c")].into()));
        assert_eq!(alg.simplify(&Predicate::of(["a"])), Predicate::of(["a"]));
    }

    #[test]
    fn test_minterms_partition() {
        let alg = abc();
        let preds = [Predicate::of(["a", "b"]), Predicate::of(["b", "c"])];
        let terms = alg.minterms(&preds);
        // every symbol falls into exactly one minterm
        for sym in alg.symbols() {
            let hits = terms.iter().filter(|t| t.accepts_symbol(sym)).count();
            assert_eq!(hits, 1, "symbol {sym} in {hits} minterms");
        }
        // and every minterm is satisfiable
        for t in &terms {
            assert!(alg.satisfiable(t));
        }
    }

    #[test]
    fn test_minterms_of_nothing_is_true() {
        let alg = abc();
        assert_eq!(alg.minterms(&[]), vec![Predicate::any()]);
    }
}
