//! Equational statements `lhs = rhs`.

use super::context::ModelContext;
use super::expression::{ExprPosition, Expression, SubExprIter};
use super::flyweight::{ArchiveError, ExprTreeFlyweight, NodeType};
use super::free_vars::{FreeVarIdSet, FreeVarMap};
use super::node::SyntaxNode;
use super::symbol::SymbolId;
use std::cell::OnceCell;
use std::fmt;
use std::io::{Read, Write};
use std::rc::Rc;

/// Which side of an equality a position lies on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Lhs,
    Rhs,
}

/// A sub-expression position inside a statement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StmtPosition {
    pub side: Side,
    pub pos: ExprPosition,
}

/// An equality between two expressions of the same context.
#[derive(Clone)]
pub struct Statement {
    lhs: Expression,
    rhs: Expression,
    free_ids: OnceCell<FreeVarIdSet>,
}

impl Statement {
    pub fn new(lhs: Expression, rhs: Expression) -> Self {
        assert!(
            Rc::ptr_eq(lhs.context(), rhs.context()),
            "both sides of a statement must share one model context"
        );
        Self {
            lhs,
            rhs,
            free_ids: OnceCell::new(),
        }
    }

    /// Build from an `Equality` syntax tree.
    pub fn from_syntax(ctx: Rc<ModelContext>, node: &SyntaxNode) -> Self {
        match node {
            SyntaxNode::Equality(lhs, rhs) => Self::new(
                Expression::from_syntax(ctx.clone(), lhs),
                Expression::from_syntax(ctx, rhs),
            ),
            _ => panic!("a statement must be rooted at an equality"),
        }
    }

    pub fn lhs(&self) -> &Expression {
        &self.lhs
    }

    pub fn rhs(&self) -> &Expression {
        &self.rhs
    }

    pub fn side(&self, side: Side) -> &Expression {
        match side {
            Side::Lhs => &self.lhs,
            Side::Rhs => &self.rhs,
        }
    }

    pub fn context(&self) -> &Rc<ModelContext> {
        self.lhs.context()
    }

    pub fn with_context(&self, ctx: &Rc<ModelContext>) -> Statement {
        Statement::new(self.lhs.with_context(ctx.clone()), self.rhs.with_context(ctx.clone()))
    }

    pub fn to_str(&self) -> String {
        format!("{} = {}", self.lhs.to_str(), self.rhs.to_str())
    }

    pub fn transpose(&self) -> Statement {
        Statement::new(self.rhs.clone(), self.lhs.clone())
    }

    /// Fold both sides with the expression handlers, then combine the two
    /// results with `eq_f`.
    pub fn fold<T, EqF, FreeF, ConstF, FuncF>(
        &self,
        eq_f: EqF,
        mut free_f: FreeF,
        mut const_f: ConstF,
        mut func_f: FuncF,
    ) -> T
    where
        T: Clone,
        EqF: FnOnce(T, T) -> T,
        FreeF: FnMut(usize) -> T,
        ConstF: FnMut(SymbolId) -> T,
        FuncF: FnMut(SymbolId, &[T]) -> T,
    {
        let lhs = self.lhs.fold(&mut free_f, &mut const_f, &mut func_f);
        let rhs = self.rhs.fold(&mut free_f, &mut const_f, &mut func_f);
        eq_f(lhs, rhs)
    }

    pub fn free_var_ids(&self) -> &FreeVarIdSet {
        self.free_ids.get_or_init(|| {
            let mut ids = self.lhs.free_var_ids().clone();
            ids.union_with(self.rhs.free_var_ids());
            ids
        })
    }

    pub fn height(&self) -> usize {
        self.lhs.height().max(self.rhs.height())
    }

    pub fn true_by_reflexivity(&self) -> bool {
        self.lhs.identical(&self.rhs)
    }

    pub fn identical(&self, other: &Statement) -> bool {
        self.lhs.identical(&other.lhs) && self.rhs.identical(&other.rhs)
    }

    /// Equality up to renaming free variables, in either orientation.  One
    /// renaming must work for both sides at once.
    pub fn equivalent(&self, other: &Statement) -> bool {
        self.equivalent_oriented(&other.lhs, &other.rhs)
            || self.equivalent_oriented(&other.rhs, &other.lhs)
    }

    fn equivalent_oriented(&self, lhs: &Expression, rhs: &Expression) -> bool {
        let mut forward = FreeVarMap::new();
        let mut backward = FreeVarMap::new();
        self.lhs.equivalent_under(lhs, &mut forward, &mut backward)
            && self.rhs.equivalent_under(rhs, &mut forward, &mut backward)
    }

    /// Whether `other` is an instance of this statement: some substitution
    /// of this statement's free variables turns it into `other`, in either
    /// orientation.
    pub fn implies(&self, other: &Statement) -> bool {
        let mut subs = FreeVarMap::new();
        let forward = self.lhs.try_match_into(&other.lhs, &mut subs)
            && self.rhs.try_match_into(&other.rhs, &mut subs);
        if forward {
            return true;
        }
        subs.clear();
        self.lhs.try_match_into(&other.rhs, &mut subs)
            && self.rhs.try_match_into(&other.lhs, &mut subs)
    }

    /// Pre-order positions of the left side followed by the right side.
    pub fn iter(&self) -> StmtIter {
        StmtIter {
            lhs: self.lhs.iter(),
            rhs: self.rhs.iter(),
        }
    }

    pub fn at(&self, pos: &StmtPosition) -> Expression {
        self.side(pos.side).at(&pos.pos)
    }

    pub fn replace(&self, pos: &StmtPosition, new_expr: &Expression) -> Statement {
        match pos.side {
            Side::Lhs => Statement::new(self.lhs.replace(&pos.pos, new_expr), self.rhs.clone()),
            Side::Rhs => Statement::new(self.lhs.clone(), self.rhs.replace(&pos.pos, new_expr)),
        }
    }

    pub fn map_free_vars(&self, subs: &FreeVarMap<Expression>) -> Statement {
        Statement::new(self.lhs.map_free_vars(subs), self.rhs.map_free_vars(subs))
    }

    pub fn replace_free_with_free(&self, from: usize, to: usize) -> Statement {
        Statement::new(
            self.lhs.replace_free_with_free(from, to),
            self.rhs.replace_free_with_free(from, to),
        )
    }

    pub fn replace_free_with_const(&self, from: usize, constant: SymbolId) -> Statement {
        Statement::new(
            self.lhs.replace_free_with_const(from, constant),
            self.rhs.replace_free_with_const(from, constant),
        )
    }

    pub fn increment_free_var_ids(&self, inc: usize) -> Statement {
        Statement::new(
            self.lhs.increment_free_var_ids(inc),
            self.rhs.increment_free_var_ids(inc),
        )
    }

    /// Copy without unreachable function records.
    pub fn compact(&self) -> Statement {
        Statement::new(self.lhs.compact(), self.rhs.compact())
    }

    /// Write both side trees, left first.
    pub fn save<W: Write>(&self, mut out: W) -> Result<(), ArchiveError> {
        self.lhs.tree().save(&mut out)?;
        self.rhs.tree().save(&mut out)
    }

    /// Read a statement written by [`Statement::save`].  Every symbol the
    /// archive mentions must exist in `ctx` with the recorded arity.
    pub fn load_from_bin<R: Read>(ctx: Rc<ModelContext>, mut input: R) -> Result<Self, ArchiveError> {
        let lhs = ExprTreeFlyweight::load_from_bin(&mut input)?;
        let rhs = ExprTreeFlyweight::load_from_bin(&mut input)?;
        check_symbols(&ctx, &lhs)?;
        check_symbols(&ctx, &rhs)?;
        Ok(Statement::new(
            Expression::from_tree(ctx.clone(), lhs),
            Expression::from_tree(ctx, rhs),
        ))
    }
}

fn check_symbols(ctx: &ModelContext, tree: &ExprTreeFlyweight) -> Result<(), ArchiveError> {
    let known = |raw: usize, arity: usize| {
        let id = SymbolId::from_raw(raw);
        ctx.symbols().contains_id(id) && ctx.symbol_arity(id) == arity
    };
    if tree.root_type() == NodeType::Const && !known(tree.root_id(), 0) {
        return Err(ArchiveError::UnknownSymbol(tree.root_id()));
    }
    for idx in 0..tree.size() {
        if tree.func_arity(idx) > ctx.max_arity() {
            return Err(ArchiveError::Malformed(format!(
                "record {} has arity {}, above the limit of {}",
                idx,
                tree.func_arity(idx),
                ctx.max_arity()
            )));
        }
        let symb = tree.func_symb_id(idx).as_raw();
        if !known(symb, tree.func_arity(idx)) {
            return Err(ArchiveError::UnknownSymbol(symb));
        }
        let slots = tree.func_children(idx).iter().zip(tree.func_child_types(idx));
        for (&child, &ty) in slots {
            if ty == NodeType::Const && !known(child, 0) {
                return Err(ArchiveError::UnknownSymbol(child));
            }
        }
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Statement({})", self)
    }
}

/// Positions of a statement: the whole left side tree, then the right.
#[derive(Clone, Debug)]
pub struct StmtIter {
    lhs: SubExprIter,
    rhs: SubExprIter,
}

impl Iterator for StmtIter {
    type Item = StmtPosition;

    fn next(&mut self) -> Option<StmtPosition> {
        if let Some(pos) = self.lhs.next() {
            return Some(StmtPosition { side: Side::Lhs, pos });
        }
        self.rhs.next().map(|pos| StmtPosition { side: Side::Rhs, pos })
    }
}
