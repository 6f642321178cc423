//! Applying rewrite rules to sub-expressions.
//!
//! A rule `l = r` can be used in both directions.  Matching one side against
//! a sub-expression binds the free variables of that side; the other side is
//! then instantiated with those bindings.  Variables that occur only on the
//! other side stay unbound and are later assigned one of the candidates
//! produced by [`assignment_candidates`].

use crate::data::{Expression, FreeVarMap, Statement, SymbolId};

/// One way of rewriting a sub-expression with a rule.
#[derive(Clone, Debug)]
pub struct MatchResult {
    /// The instantiated other side of the rule.
    pub replacement: Expression,
    /// Free variable ids of the rule that the match did not bind, ascending.
    pub unbound: Vec<usize>,
}

/// Value a still-unbound rule variable may take.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Candidate {
    Free(usize),
    Const(SymbolId),
}

impl Candidate {
    /// Substitute `id` by this candidate everywhere in `stmt`.
    pub fn assign(&self, stmt: &Statement, id: usize) -> Statement {
        match *self {
            Candidate::Free(to) => stmt.replace_free_with_free(id, to),
            Candidate::Const(constant) => stmt.replace_free_with_const(id, constant),
        }
    }
}

/// Every distinct rewrite of `subexpr` by `rule`; left-to-right matches come
/// before right-to-left ones.
pub fn match_rule(rule: &Statement, subexpr: &Expression) -> Vec<MatchResult> {
    let mut results: Vec<MatchResult> = Vec::with_capacity(2);
    let mut subs = FreeVarMap::new();
    for (pattern, other) in [(rule.lhs(), rule.rhs()), (rule.rhs(), rule.lhs())] {
        if !pattern.try_match(subexpr, &mut subs) {
            continue;
        }
        let replacement = other.map_free_vars(&subs);
        if results.iter().any(|r| r.replacement.identical(&replacement)) {
            continue;
        }
        let unbound = other
            .free_var_ids()
            .iter()
            .filter(|id| !subs.contains(*id))
            .collect();
        results.push(MatchResult { replacement, unbound });
    }
    results
}

/// Assignment candidates for rewriting `target`: its free variable ids in
/// ascending order, then `constants` in the order given.
pub fn assignment_candidates(target: &Statement, constants: &[SymbolId]) -> Vec<Candidate> {
    target
        .free_var_ids()
        .iter()
        .map(Candidate::Free)
        .chain(constants.iter().copied().map(Candidate::Const))
        .collect()
}

/// Whether `pattern` matches at least one sub-expression of `stmt`.
pub fn matches_somewhere(pattern: &Expression, stmt: &Statement) -> bool {
    let mut subs = FreeVarMap::new();
    stmt.iter().any(|pos| pattern.try_match(&stmt.at(&pos), &mut subs))
}

/// Soft test for whether `theorem` was used to step from `premise` to
/// `conclusion`: one of its sides occurs in the premise and the other in
/// the conclusion.
pub fn theorem_used(theorem: &Statement, premise: &Statement, conclusion: &Statement) -> bool {
    let (lhs, rhs) = (theorem.lhs(), theorem.rhs());
    (matches_somewhere(lhs, premise) && matches_somewhere(rhs, conclusion))
        || (matches_somewhere(rhs, premise) && matches_somewhere(lhs, conclusion))
}
