//! Benefit estimates for proof states.

use crate::data::{ExprTreeFlyweight, Expression, NodeType, Statement, SymbolId};
use crate::inference::ProofState;
use std::collections::HashMap;

/// A node of a flyweight tree: record index or leaf id, and its type.
type Node = (usize, NodeType);

/// Predicts how promising a proof state is.  Larger is better.
pub trait Heuristic {
    fn predict(&self, state: &ProofState) -> f32;
}

/// Scores a forefront by how close it is to the active rules.
///
/// The distance to each rule is a tree edit distance in which a free
/// variable costs nothing against another free variable and 1 against
/// anything else, differing symbols cost `symbol_mismatch_cost`, and the
/// children of two functions are paired up by a minimum cost assignment.
/// Each rule at distance `d` contributes `1 / (d^p + 1)`, or 1 when `d`
/// is zero.
#[derive(Clone, Debug)]
pub struct EditDistanceHeuristic {
    symbol_mismatch_cost: f32,
    p: f32,
}

impl EditDistanceHeuristic {
    pub fn new(symbol_mismatch_cost: f32, p: f32) -> Self {
        assert!(symbol_mismatch_cost > 0.0, "symbol mismatch cost must be positive");
        assert!(p > 0.0, "edit distance exponent must be positive");
        Self {
            symbol_mismatch_cost,
            p,
        }
    }

    pub fn symbol_mismatch_cost(&self) -> f32 {
        self.symbol_mismatch_cost
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    /// Distance between two statements, taking the better of the two
    /// orientations of `b`.
    pub fn statement_distance(&self, a: &Statement, b: &Statement) -> f32 {
        let straight = self.expr_distance(a.lhs(), b.lhs()) + self.expr_distance(a.rhs(), b.rhs());
        let crossed = self.expr_distance(a.lhs(), b.rhs()) + self.expr_distance(a.rhs(), b.lhs());
        straight.min(crossed)
    }

    /// Edit distance between two expressions.  Node pairs are scored
    /// bottom-up from an explicit stack, each pair once.
    pub fn expr_distance(&self, a: &Expression, b: &Expression) -> f32 {
        enum Visit {
            Enter(Node, Node),
            Combine(Node, Node),
        }

        let (lt, rt) = (a.tree(), b.tree());
        let root = ((lt.root_id(), lt.root_type()), (rt.root_id(), rt.root_type()));
        let mut scores: HashMap<(Node, Node), f32> = HashMap::new();
        let mut stack = vec![Visit::Enter(root.0, root.1)];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(x, y) if scores.contains_key(&(x, y)) => {}
                Visit::Enter(x, y) => match (x.1, y.1) {
                    (NodeType::Free, NodeType::Free) => {
                        scores.insert((x, y), 0.0);
                    }
                    (NodeType::Free, _) | (_, NodeType::Free) => {
                        scores.insert((x, y), 1.0);
                    }
                    (NodeType::Func, NodeType::Func) => {
                        stack.push(Visit::Combine(x, y));
                        for cx in children(lt, x.0) {
                            for cy in children(rt, y.0) {
                                stack.push(Visit::Enter(cx, cy));
                            }
                        }
                    }
                    _ => {
                        scores.insert((x, y), self.symbol_cost(lt, x, rt, y));
                    }
                },
                Visit::Combine(x, y) => {
                    let left = children(lt, x.0);
                    let right = children(rt, y.0);
                    // The larger child list is the one assigned from.
                    let dists: Vec<Vec<f32>> = if left.len() >= right.len() {
                        left.iter()
                            .map(|&cx| right.iter().map(|&cy| scores[&(cx, cy)]).collect())
                            .collect()
                    } else {
                        right
                            .iter()
                            .map(|&cy| left.iter().map(|&cx| scores[&(cx, cy)]).collect())
                            .collect()
                    };
                    let value = self.symbol_cost(lt, x, rt, y)
                        + minimum_assignment(&dists, left.len().min(right.len()));
                    scores.insert((x, y), value);
                }
            }
        }

        scores[&root]
    }

    fn symbol_cost(&self, lt: &ExprTreeFlyweight, x: Node, rt: &ExprTreeFlyweight, y: Node) -> f32 {
        if x.1 == y.1 && node_symbol(lt, x) == node_symbol(rt, y) {
            0.0
        } else {
            self.symbol_mismatch_cost
        }
    }

    pub fn utility(&self, distances: impl IntoIterator<Item = f32>) -> f32 {
        distances
            .into_iter()
            .map(|d| {
                if d == 0.0 {
                    1.0
                } else {
                    1.0 / (d.powf(self.p) + 1.0)
                }
            })
            .sum()
    }
}

impl Heuristic for EditDistanceHeuristic {
    fn predict(&self, state: &ProofState) -> f32 {
        let rules = state.kernel().active_rules();
        let forefront = state.forefront();
        self.utility(rules.iter().map(|rule| self.statement_distance(forefront, rule)))
    }
}

fn children(tree: &ExprTreeFlyweight, func_idx: usize) -> Vec<Node> {
    tree.func_children(func_idx)
        .iter()
        .copied()
        .zip(tree.func_child_types(func_idx).iter().copied())
        .collect()
}

fn node_symbol(tree: &ExprTreeFlyweight, node: Node) -> Option<SymbolId> {
    match node.1 {
        NodeType::Free => None,
        NodeType::Const => Some(SymbolId::from_raw(node.0)),
        NodeType::Func => Some(tree.func_symb_id(node.0)),
    }
}

/// Cheapest way of giving every column its own row.  `dists` is indexed
/// `[row][col]` with at least as many rows as columns.
fn minimum_assignment(dists: &[Vec<f32>], num_cols: usize) -> f32 {
    if num_cols == 0 {
        return 0.0;
    }
    let mut in_use = vec![false; dists.len()];
    let mut best = f32::INFINITY;
    assign_column(dists, num_cols, 0, 0.0, &mut in_use, &mut best);
    best
}

fn assign_column(
    dists: &[Vec<f32>],
    num_cols: usize,
    col: usize,
    cost: f32,
    in_use: &mut [bool],
    best: &mut f32,
) {
    if col == num_cols {
        *best = best.min(cost);
        return;
    }
    if cost >= *best {
        return;
    }
    for row in 0..dists.len() {
        if !in_use[row] {
            in_use[row] = true;
            assign_column(dists, num_cols, col + 1, cost + dists[row][col], in_use, best);
            in_use[row] = false;
        }
    }
}
