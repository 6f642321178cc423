//! Expressions: flyweight trees bound to a model context.
//!
//! Every traversal goes through [`Expression::fold`] or
//! [`Expression::fold_pair`], both of which run on an explicit stack so deep
//! derivations cannot overflow the call stack.  Transformations never mutate
//! in place; they return new expressions that share unaffected storage.

use super::context::ModelContext;
use super::flyweight::{ChildIds, ChildTypes, ExprTreeFlyweight, NodeType};
use super::free_vars::{FreeVarIdSet, FreeVarMap};
use super::node::SyntaxNode;
use super::symbol::SymbolId;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Location of a sub-expression inside an expression tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExprPosition {
    pub node_id: usize,
    pub node_type: NodeType,
    /// Function record and argument slot holding this node, `None` at the root.
    pub parent: Option<(usize, usize)>,
}

impl ExprPosition {
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Which argument slot of its parent this node came from.
    pub fn arg_index(&self) -> Option<usize> {
        self.parent.map(|(_, arg)| arg)
    }
}

/// A non-equality expression over a [`ModelContext`].
#[derive(Clone)]
pub struct Expression {
    ctx: Rc<ModelContext>,
    tree: ExprTreeFlyweight,
    height: OnceCell<usize>,
    free_ids: OnceCell<FreeVarIdSet>,
}

impl Expression {
    pub fn from_tree(ctx: Rc<ModelContext>, tree: ExprTreeFlyweight) -> Self {
        Self {
            ctx,
            tree,
            height: OnceCell::new(),
            free_ids: OnceCell::new(),
        }
    }

    pub fn free(ctx: Rc<ModelContext>, id: usize) -> Self {
        Self::from_tree(ctx, ExprTreeFlyweight::leaf(id, NodeType::Free))
    }

    pub fn constant(ctx: Rc<ModelContext>, id: SymbolId) -> Self {
        assert_eq!(ctx.symbol_arity(id), 0, "`{}` is not a constant", ctx.symbol_name(id));
        Self::from_tree(ctx, ExprTreeFlyweight::leaf(id.as_raw(), NodeType::Const))
    }

    /// Apply function symbol `id` to `children`, merging their storage.
    pub fn func(ctx: Rc<ModelContext>, id: SymbolId, children: &[Expression]) -> Self {
        assert_eq!(
            ctx.symbol_arity(id),
            children.len(),
            "wrong number of arguments for `{}`",
            ctx.symbol_name(id)
        );
        let mut tree = ExprTreeFlyweight::new();
        let mut ids = ChildIds::new();
        let mut types = ChildTypes::new();
        for child in children {
            let (child_id, child_type) = tree.merge_from(&child.tree);
            ids.push(child_id);
            types.push(child_type);
        }
        let root = tree.add_func(id, &ids, &types);
        tree.set_root(root, NodeType::Func);
        Self::from_tree(ctx, tree)
    }

    /// Encode a syntax tree.  Equalities are not expressions and must not
    /// occur anywhere in `node`.
    pub fn from_syntax(ctx: Rc<ModelContext>, node: &SyntaxNode) -> Self {
        let mut tree = ExprTreeFlyweight::new();
        let (root_id, root_type) = node.fold(
            |_, _| panic!("equality nodes only appear at the top of a statement"),
            |id| (id, NodeType::Free),
            |id| (id.as_raw(), NodeType::Const),
            |id, args: Vec<(usize, NodeType)>| {
                let ids: ChildIds = args.iter().map(|(child, _)| *child).collect();
                let types: ChildTypes = args.iter().map(|(_, ty)| *ty).collect();
                (tree.add_func(id, &ids, &types), NodeType::Func)
            },
        );
        tree.set_root(root_id, root_type);
        Self::from_tree(ctx, tree)
    }

    pub fn context(&self) -> &Rc<ModelContext> {
        &self.ctx
    }

    /// The same tree read through `ctx`, which must extend this
    /// expression's context.
    pub fn with_context(&self, ctx: Rc<ModelContext>) -> Expression {
        assert!(ctx.extends(&self.ctx), "{} does not extend {}", ctx.name(), self.ctx.name());
        Expression::from_tree(ctx, self.tree.clone())
    }

    pub fn tree(&self) -> &ExprTreeFlyweight {
        &self.tree
    }

    pub fn root_id(&self) -> usize {
        self.tree.root_id()
    }

    pub fn root_type(&self) -> NodeType {
        self.tree.root_type()
    }

    /// Symbol at the root, for constants and functions.
    pub fn root_symbol(&self) -> Option<SymbolId> {
        match self.root_type() {
            NodeType::Free => None,
            NodeType::Const => Some(SymbolId::from_raw(self.root_id())),
            NodeType::Func => Some(self.tree.func_symb_id(self.root_id())),
        }
    }

    /// Direct children of a function root, in argument order.
    pub fn root_children(&self) -> Vec<Expression> {
        if self.root_type() != NodeType::Func {
            return Vec::new();
        }
        let root = self.root_id();
        self.tree
            .func_children(root)
            .iter()
            .zip(self.tree.func_child_types(root))
            .map(|(&id, &ty)| self.sub_expression(id, ty))
            .collect()
    }

    /// Bottom-up reduction of the tree.
    ///
    /// Function nodes are visited twice: once to schedule their children and
    /// once to combine the top `arity` results.  Leaf results are cached for
    /// the duration of the fold.
    pub fn fold<T, FreeF, ConstF, FuncF>(
        &self,
        mut free_f: FreeF,
        mut const_f: ConstF,
        mut func_f: FuncF,
    ) -> T
    where
        T: Clone,
        FreeF: FnMut(usize) -> T,
        ConstF: FnMut(SymbolId) -> T,
        FuncF: FnMut(SymbolId, &[T]) -> T,
    {
        match self.root_type() {
            NodeType::Free => return free_f(self.root_id()),
            NodeType::Const => return const_f(SymbolId::from_raw(self.root_id())),
            NodeType::Func => {}
        }

        let tree = &self.tree;
        let mut free_cache: FreeVarMap<T> = FreeVarMap::new();
        let mut const_cache: HashMap<usize, T> = HashMap::new();
        let mut stack = vec![(self.root_id(), NodeType::Func, false)];
        let mut results: Vec<T> = Vec::new();

        while let Some((id, node_type, seen)) = stack.pop() {
            match node_type {
                NodeType::Free => {
                    let value = match free_cache.get(id) {
                        Some(cached) => cached.clone(),
                        None => {
                            let value = free_f(id);
                            free_cache.insert(id, value.clone());
                            value
                        }
                    };
                    results.push(value);
                }
                NodeType::Const => {
                    let value = const_cache
                        .entry(id)
                        .or_insert_with(|| const_f(SymbolId::from_raw(id)))
                        .clone();
                    results.push(value);
                }
                NodeType::Func if !seen => {
                    stack.push((id, NodeType::Func, true));
                    let children = tree.func_children(id).iter();
                    let types = tree.func_child_types(id).iter();
                    for (&child, &ty) in children.zip(types).rev() {
                        stack.push((child, ty, false));
                    }
                }
                NodeType::Func => {
                    let start = results.len() - tree.func_arity(id);
                    let value = func_f(tree.func_symb_id(id), &results[start..]);
                    results.truncate(start);
                    results.push(value);
                }
            }
        }

        results.pop().expect("fold produces one result")
    }

    /// Simultaneous reduction over `self` and `other`.
    ///
    /// Where the node types differ, or two function nodes differ in arity,
    /// `default_f(self_id, self_type, other_id, other_type)` supplies the
    /// result and the subtrees are not descended into.
    pub fn fold_pair<T, FreeF, ConstF, FuncF, DefaultF>(
        &self,
        other: &Expression,
        mut free_f: FreeF,
        mut const_f: ConstF,
        mut func_f: FuncF,
        mut default_f: DefaultF,
    ) -> T
    where
        FreeF: FnMut(usize, usize) -> T,
        ConstF: FnMut(SymbolId, SymbolId) -> T,
        FuncF: FnMut(SymbolId, SymbolId, &[T]) -> T,
        DefaultF: FnMut(usize, NodeType, usize, NodeType) -> T,
    {
        enum Frame {
            Pair(usize, NodeType, usize, NodeType),
            Combine(usize, usize),
        }

        let (lt, rt) = (&self.tree, &other.tree);
        let mut stack = vec![Frame::Pair(
            lt.root_id(),
            lt.root_type(),
            rt.root_id(),
            rt.root_type(),
        )];
        let mut results: Vec<T> = Vec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Pair(a, NodeType::Free, b, NodeType::Free) => {
                    results.push(free_f(a, b));
                }
                Frame::Pair(a, NodeType::Const, b, NodeType::Const) => {
                    results.push(const_f(SymbolId::from_raw(a), SymbolId::from_raw(b)));
                }
                Frame::Pair(a, NodeType::Func, b, NodeType::Func)
                    if lt.func_arity(a) == rt.func_arity(b) =>
                {
                    stack.push(Frame::Combine(a, b));
                    for arg in (0..lt.func_arity(a)).rev() {
                        stack.push(Frame::Pair(
                            lt.func_children(a)[arg],
                            lt.func_child_types(a)[arg],
                            rt.func_children(b)[arg],
                            rt.func_child_types(b)[arg],
                        ));
                    }
                }
                Frame::Pair(a, a_type, b, b_type) => {
                    results.push(default_f(a, a_type, b, b_type));
                }
                Frame::Combine(a, b) => {
                    let start = results.len() - lt.func_arity(a);
                    let value = func_f(lt.func_symb_id(a), rt.func_symb_id(b), &results[start..]);
                    results.truncate(start);
                    results.push(value);
                }
            }
        }

        results.pop().expect("fold_pair produces one result")
    }

    /// [`Expression::fold_pair`] with a constant fallback for mismatches.
    pub fn fold_pair_or<T, FreeF, ConstF, FuncF>(
        &self,
        other: &Expression,
        free_f: FreeF,
        const_f: ConstF,
        func_f: FuncF,
        default: T,
    ) -> T
    where
        T: Clone,
        FreeF: FnMut(usize, usize) -> T,
        ConstF: FnMut(SymbolId, SymbolId) -> T,
        FuncF: FnMut(SymbolId, SymbolId, &[T]) -> T,
    {
        self.fold_pair(other, free_f, const_f, func_f, |_, _, _, _| default.clone())
    }

    pub fn to_str(&self) -> String {
        let ctx = &self.ctx;
        self.fold(
            |id| format!("x{}", id),
            |id| ctx.symbol_name(id).to_string(),
            |id, args: &[String]| format!("{}({})", ctx.symbol_name(id), args.join(", ")),
        )
    }

    pub fn height(&self) -> usize {
        *self.height.get_or_init(|| {
            self.fold(
                |_| 1,
                |_| 1,
                |_, args: &[usize]| 1 + args.iter().copied().max().unwrap_or(0),
            )
        })
    }

    /// Ids of the free variables reachable from the root.
    pub fn free_var_ids(&self) -> &FreeVarIdSet {
        self.free_ids.get_or_init(|| {
            let mut ids = FreeVarIdSet::new();
            self.fold(|id| { ids.insert(id); }, |_| (), |_, _: &[()]| ());
            ids
        })
    }

    /// Syntactic equality, free variable ids included.
    pub fn identical(&self, other: &Expression) -> bool {
        self.fold_pair_or(
            other,
            |a, b| a == b,
            |a, b| a == b,
            |a, b, args: &[bool]| a == b && args.iter().all(|ok| *ok),
            false,
        )
    }

    /// Equality up to a bijective renaming of free variables.
    pub fn equivalent(&self, other: &Expression) -> bool {
        let mut forward = FreeVarMap::new();
        let mut backward = FreeVarMap::new();
        self.equivalent_under(other, &mut forward, &mut backward)
    }

    /// Equivalence check that extends an existing partial renaming.  Both
    /// maps are left in an unspecified state when the check fails.
    pub fn equivalent_under(
        &self,
        other: &Expression,
        forward: &mut FreeVarMap<usize>,
        backward: &mut FreeVarMap<usize>,
    ) -> bool {
        self.fold_pair_or(
            other,
            |a, b| match (forward.get(a).copied(), backward.get(b).copied()) {
                (None, None) => {
                    forward.insert(a, b);
                    backward.insert(b, a);
                    true
                }
                (Some(fa), Some(ba)) => fa == b && ba == a,
                _ => false,
            },
            |a, b| a == b,
            |a, b, args: &[bool]| a == b && args.iter().all(|ok| *ok),
            false,
        )
    }

    /// One-way match of `self` as a pattern against `target`.
    ///
    /// On success `subs` maps every free variable of `self` to the part of
    /// `target` it stands for; on failure `subs` is left empty.
    pub fn try_match(&self, target: &Expression, subs: &mut FreeVarMap<Expression>) -> bool {
        subs.clear();
        let matched = self.try_match_into(target, subs);
        if !matched {
            subs.clear();
        }
        matched
    }

    /// Like [`Expression::try_match`] but keeps the bindings already in
    /// `subs`, so several patterns can be matched under one substitution.
    /// The map is unspecified after a failed match.
    pub fn try_match_into(&self, target: &Expression, subs: &mut FreeVarMap<Expression>) -> bool {
        let subs = RefCell::new(subs);
        self.fold_pair(
            target,
            |pattern_id, target_id| {
                let mut subs = subs.borrow_mut();
                match subs.get(pattern_id) {
                    Some(bound) => {
                        bound.root_type() == NodeType::Free && bound.root_id() == target_id
                    }
                    None => {
                        subs.insert(pattern_id, Expression::free(target.ctx.clone(), target_id));
                        true
                    }
                }
            },
            |a, b| a == b,
            |a, b, args: &[bool]| a == b && args.iter().all(|ok| *ok),
            |pattern_id, pattern_type, target_id, target_type| {
                if pattern_type != NodeType::Free {
                    return false;
                }
                let part = target.sub_expression(target_id, target_type);
                let mut subs = subs.borrow_mut();
                match subs.get(pattern_id) {
                    Some(bound) => bound.identical(&part),
                    None => {
                        subs.insert(pattern_id, part);
                        true
                    }
                }
            },
        )
    }

    /// View of the subtree rooted at `(id, node_type)`; function subtrees
    /// share this expression's storage.
    pub fn sub_expression(&self, id: usize, node_type: NodeType) -> Expression {
        let tree = match node_type {
            NodeType::Func => {
                let mut tree = self.tree.clone();
                tree.set_root(id, NodeType::Func);
                tree
            }
            _ => ExprTreeFlyweight::leaf(id, node_type),
        };
        Expression::from_tree(self.ctx.clone(), tree)
    }

    pub fn at(&self, pos: &ExprPosition) -> Expression {
        self.sub_expression(pos.node_id, pos.node_type)
    }

    /// Pre-order positions of every sub-expression, root first.
    pub fn iter(&self) -> SubExprIter {
        SubExprIter::new(self.tree.clone())
    }

    /// Substitute free variables.  Ids missing from `subs` are left alone.
    ///
    /// Every occurrence gets its own copy of the replacement records, so
    /// the result is still a tree and [`Expression::replace`] touches one
    /// position only.
    pub fn map_free_vars(&self, subs: &FreeVarMap<Expression>) -> Expression {
        match self.root_type() {
            NodeType::Free => return subs.get(self.root_id()).cloned().unwrap_or_else(|| self.clone()),
            NodeType::Const => return self.clone(),
            NodeType::Func => {}
        }
        if !self.free_var_ids().iter().any(|id| subs.contains(id)) {
            return self.clone();
        }

        let mut tree = self.compact().tree;
        for func_idx in 0..tree.size() {
            for arg in 0..tree.func_arity(func_idx) {
                if tree.func_child_types(func_idx)[arg] != NodeType::Free {
                    continue;
                }
                let child = tree.func_children(func_idx)[arg];
                if let Some(replacement) = subs.get(child) {
                    let (new_id, new_type) = tree.merge_from(&replacement.tree);
                    tree.update_func_child(func_idx, arg, new_id, new_type);
                }
            }
        }
        Expression::from_tree(self.ctx.clone(), tree)
    }

    /// Replace the sub-expression at `pos` by `new_expr`.
    pub fn replace(&self, pos: &ExprPosition, new_expr: &Expression) -> Expression {
        let Some((func_idx, arg_idx)) = pos.parent else {
            return new_expr.clone();
        };
        let mut tree = self.tree.clone();
        let (new_id, new_type) = tree.merge_from(&new_expr.tree);
        tree.update_func_child(func_idx, arg_idx, new_id, new_type);
        Expression::from_tree(self.ctx.clone(), tree)
    }

    pub fn replace_free_with_free(&self, from: usize, to: usize) -> Expression {
        if !self.free_var_ids().contains(from) {
            return self.clone();
        }
        self.relabel_free(|id| (id == from).then_some((to, NodeType::Free)))
    }

    pub fn replace_free_with_const(&self, from: usize, constant: SymbolId) -> Expression {
        assert_eq!(self.ctx.symbol_arity(constant), 0, "replacement must be a constant");
        if !self.free_var_ids().contains(from) {
            return self.clone();
        }
        self.relabel_free(|id| (id == from).then_some((constant.as_raw(), NodeType::Const)))
    }

    pub fn increment_free_var_ids(&self, inc: usize) -> Expression {
        if inc == 0 || self.free_var_ids().is_empty() {
            return self.clone();
        }
        self.relabel_free(|id| Some((id + inc, NodeType::Free)))
    }

    /// Copy holding only the records reachable from the root.
    pub fn compact(&self) -> Expression {
        if self.root_type() != NodeType::Func {
            return self.clone();
        }
        let mut tree = ExprTreeFlyweight::new();
        let (root_id, root_type) = self.fold(
            |id| (id, NodeType::Free),
            |id| (id.as_raw(), NodeType::Const),
            |id, args: &[(usize, NodeType)]| {
                let ids: ChildIds = args.iter().map(|(child, _)| *child).collect();
                let types: ChildTypes = args.iter().map(|(_, ty)| *ty).collect();
                (tree.add_func(id, &ids, &types), NodeType::Func)
            },
        );
        tree.set_root(root_id, root_type);
        Expression::from_tree(self.ctx.clone(), tree)
    }

    fn relabel_free<F>(&self, relabel: F) -> Expression
    where
        F: Fn(usize) -> Option<(usize, NodeType)>,
    {
        if self.root_type() == NodeType::Free {
            return match relabel(self.root_id()) {
                Some((id, ty)) => {
                    Expression::from_tree(self.ctx.clone(), ExprTreeFlyweight::leaf(id, ty))
                }
                None => self.clone(),
            };
        }

        let mut tree = self.tree.clone();
        for func_idx in 0..tree.size() {
            for arg in 0..tree.func_arity(func_idx) {
                if tree.func_child_types(func_idx)[arg] != NodeType::Free {
                    continue;
                }
                let child = tree.func_children(func_idx)[arg];
                if let Some((id, ty)) = relabel(child) {
                    tree.update_func_child(func_idx, arg, id, ty);
                }
            }
        }
        Expression::from_tree(self.ctx.clone(), tree)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self.to_str())
    }
}

/// Pre-order walk over the positions of an expression tree.
#[derive(Clone, Debug)]
pub struct SubExprIter {
    tree: ExprTreeFlyweight,
    stack: Vec<ExprPosition>,
}

impl SubExprIter {
    fn new(tree: ExprTreeFlyweight) -> Self {
        let root = ExprPosition {
            node_id: tree.root_id(),
            node_type: tree.root_type(),
            parent: None,
        };
        Self { tree, stack: vec![root] }
    }
}

impl Iterator for SubExprIter {
    type Item = ExprPosition;

    fn next(&mut self) -> Option<ExprPosition> {
        let pos = self.stack.pop()?;
        if pos.node_type == NodeType::Func {
            let children = self.tree.func_children(pos.node_id);
            let types = self.tree.func_child_types(pos.node_id);
            for arg in (0..children.len()).rev() {
                self.stack.push(ExprPosition {
                    node_id: children[arg],
                    node_type: types[arg],
                    parent: Some((pos.node_id, arg)),
                });
            }
        }
        Some(pos)
    }
}
