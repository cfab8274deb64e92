//! Transducer edge labels.

use crate::algebra::Algebra;
use crate::predicate::Predicate;
use std::fmt;

/// The label of a transducer edge.
///
/// `Identity(p)` denotes the diagonal `{(a, a) : a ∈ ⟦p⟧}`; `Pair` denotes
/// the rectangle `⟦input⟧ × ⟦output⟧`, where `None` on either side marks the
/// empty word (an ε side is not the same thing as an unsatisfiable
/// predicate). Labels are immutable values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Identity(Predicate),
    Pair {
        input: Option<Predicate>,
        output: Option<Predicate>,
    },
}

impl Label {
    pub fn identity(p: Predicate) -> Self {
        Label::Identity(p)
    }

    pub fn pair(input: Option<Predicate>, output: Option<Predicate>) -> Self {
        Label::Pair { input, output }
    }

    /// A label reading and writing nothing.
    pub fn epsilon() -> Self {
        Label::Pair {
            input: None,
            output: None,
        }
    }

    /// The input predicate; `None` on an ε input.
    pub fn input(&self) -> Option<&Predicate> {
        match self {
            Label::Identity(p) => Some(p),
            Label::Pair { input, .. } => input.as_ref(),
        }
    }

    /// The output predicate; `None` on an ε output.
    pub fn output(&self) -> Option<&Predicate> {
        match self {
            Label::Identity(p) => Some(p),
            Label::Pair { output, .. } => output.as_ref(),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Label::Identity(_))
    }

    /// Whether both sides are ε.
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Label::Pair {
                input: None,
                output: None
            }
        )
    }

    /// A label is satisfiable when each non-ε side is.
    pub fn satisfiable(&self, algebra: &Algebra) -> bool {
        match self {
            Label::Identity(p) => algebra.satisfiable(p),
            Label::Pair { input, output } => {
                input.as_ref().map_or(true, |p| algebra.satisfiable(p))
                    && output.as_ref().map_or(true, |p| algebra.satisfiable(p))
            }
        }
    }

    /// Serial composition: this label feeding `other`.
    ///
    /// The output of `self` must meet the input of `other`; when it cannot,
    /// the composite is unsatisfiable and `None` is returned. Labels with a
    /// mismatched ε side cannot be combined in lockstep either; the
    /// transducer composition advances one operand alone for those moves.
    pub fn combine(&self, other: &Label, algebra: &Algebra) -> Option<Label> {
        match (self.output(), other.input()) {
            (Some(mid_out), Some(mid_in)) => {
                if !algebra.satisfiable(&mid_out.and(mid_in)) {
                    return None;
                }
                if self.is_identity() || other.is_identity() {
                    let glued = self.input()?.and(other.output()?);
                    if !algebra.satisfiable(&glued) {
                        return None;
                    }
                    Some(Label::Identity(glued))
                } else {
                    Some(Label::Pair {
                        input: self.input().cloned(),
                        output: other.output().cloned(),
                    })
                }
            }
            (None, None) => Some(Label::Pair {
                input: self.input().cloned(),
                output: other.output().cloned(),
            }),
            _ => None,
        }
    }

    /// Component-wise conjunction.
    ///
    /// Sides must agree on ε; an identity operand constrains both sides of
    /// the other. Returns `None` when the conjunction is unsatisfiable or
    /// the shapes do not line up.
    pub fn conjoin(&self, other: &Label, algebra: &Algebra) -> Option<Label> {
        match (self, other) {
            (Label::Identity(p), Label::Identity(q)) => {
                let r = p.and(q);
                algebra.satisfiable(&r).then(|| Label::Identity(r))
            }
            (Label::Identity(p), Label::Pair { input, output })
            | (Label::Pair { input, output }, Label::Identity(p)) => {
                let r = p.and(input.as_ref()?).and(output.as_ref()?);
                algebra.satisfiable(&r).then(|| Label::Identity(r))
            }
            (
                Label::Pair { input, output },
                Label::Pair {
                    input: input2,
                    output: output2,
                },
            ) => {
                let input = conjoin_side(input, input2, algebra)?;
                let output = conjoin_side(output, output2, algebra)?;
                Some(Label::Pair { input, output })
            }
        }
    }

    /// Component-wise disjunction; defined for same-shape operands only.
    pub fn disjoin(&self, other: &Label) -> Option<Label> {
        match (self, other) {
            (Label::Identity(p), Label::Identity(q)) => Some(Label::Identity(p.or(q))),
            (
                Label::Pair { input, output },
                Label::Pair {
                    input: input2,
                    output: output2,
                },
            ) => {
                let input = match (input, input2) {
                    (None, None) => None,
                    (Some(p), Some(q)) => Some(p.or(q)),
                    _ => return None,
                };
                let output = match (output, output2) {
                    (None, None) => None,
                    (Some(p), Some(q)) => Some(p.or(q)),
                    _ => return None,
                };
                Some(Label::Pair { input, output })
            }
            _ => None,
        }
    }
}

/// Conjoin one side of two pair labels; `None` sides must match.
fn conjoin_side(
    a: &Option<Predicate>,
    b: &Option<Predicate>,
    algebra: &Algebra,
) -> Option<Option<Predicate>> {
    match (a, b) {
        (None, None) => Some(None),
        (Some(p), Some(q)) => {
            let r = p.and(q);
            algebra.satisfiable(&r).then_some(Some(r))
        }
        _ => None,
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(p: &Option<Predicate>) -> String {
            match p {
                Some(p) => p.to_string(),
                None => "eps".to_string(),
            }
        }
        match self {
            Label::Identity(p) => write!(f, "@{p}/@{p}"),
            Label::Pair { input, output } => write!(f, "{}/{}", side(input), side(output)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AlgebraRegistry;
    use crate::symbol::Symbol;
    use std::sync::Arc;

    fn ab() -> Arc<Algebra> {
        AlgebraRegistry::new().algebra(["a", "b"].map(Symbol::new))
    }

    fn p(s: &str) -> Predicate {
        Predicate::of([s])
    }

    #[test]
    fn test_combine_identities() {
        let alg = ab();
        let l = Label::identity(Predicate::of(["a", "b"]));
        let r = Label::identity(p("a"));
        assert_eq!(l.combine(&r, &alg), Some(Label::identity(p("a"))));
    }

    #[test]
    fn test_combine_pairs_keeps_outer_sides() {
        let alg = ab();
        let l = Label::pair(Some(p("a")), Some(p("b")));
        let r = Label::pair(Some(p("b")), Some(p("a")));
        assert_eq!(
            l.combine(&r, &alg),
            Some(Label::pair(Some(p("a")), Some(p("a"))))
        );
    }

    #[test]
    fn test_combine_unsatisfiable_middle() {
        let alg = ab();
        let l = Label::pair(Some(p("a")), Some(p("b")));
        let r = Label::pair(Some(p("a")), Some(p("a")));
        assert_eq!(l.combine(&r, &alg), None);
    }

    #[test]
    fn test_combine_mismatched_epsilon_sides() {
        let alg = ab();
        let l = Label::pair(Some(p("a")), None);
        let r = Label::pair(Some(p("a")), Some(p("b")));
        assert_eq!(l.combine(&r, &alg), None);
        // two ε-middles glue directly
        let r2 = Label::pair(None, Some(p("b")));
        assert_eq!(
            l.combine(&r2, &alg),
            Some(Label::pair(Some(p("a")), Some(p("b"))))
        );
    }

    #[test]
    fn test_conjoin_identity_with_pair() {
        let alg = ab();
        let id = Label::identity(Predicate::of(["a", "b"]));
        let pr = Label::pair(Some(p("a")), Some(Predicate::of(["a", "b"])));
        assert_eq!(id.conjoin(&pr, &alg), Some(Label::identity(p("a"))));
    }

    #[test]
    fn test_epsilon_label_is_satisfiable() {
        let alg = ab();
        assert!(Label::epsilon().satisfiable(&alg));
        assert!(!Label::identity(Predicate::none()).satisfiable(&alg));
    }
}
