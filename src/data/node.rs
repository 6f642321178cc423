use super::context::ModelContext;
use super::flyweight::DEFAULT_MAX_ARITY;
use super::symbol::SymbolId;
use smallvec::SmallVec;
use std::rc::Rc;

pub type SyntaxNodePtr = Rc<SyntaxNode>;
pub type SyntaxChildren = SmallVec<[SyntaxNodePtr; DEFAULT_MAX_ARITY]>;

/// Tagged syntax tree as produced by the front-end.
///
/// Subtrees are shared through `Rc`; an equality only ever appears at the
/// top of a statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyntaxNode {
    Equality(SyntaxNodePtr, SyntaxNodePtr),
    Free(usize),
    Constant(SymbolId),
    Function(SymbolId, SyntaxChildren),
}

impl SyntaxNode {
    pub fn equality(lhs: SyntaxNodePtr, rhs: SyntaxNodePtr) -> SyntaxNodePtr {
        Rc::new(SyntaxNode::Equality(lhs, rhs))
    }

    pub fn free(id: usize) -> SyntaxNodePtr {
        Rc::new(SyntaxNode::Free(id))
    }

    pub fn constant(id: SymbolId) -> SyntaxNodePtr {
        Rc::new(SyntaxNode::Constant(id))
    }

    pub fn function(id: SymbolId, children: impl IntoIterator<Item = SyntaxNodePtr>) -> SyntaxNodePtr {
        Rc::new(SyntaxNode::Function(id, children.into_iter().collect()))
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, SyntaxNode::Equality(..))
    }

    /// Bottom-up reduction with an explicit stack.
    ///
    /// The function handler receives the folded results of the children in
    /// argument order.
    pub fn fold<T, EqF, FreeF, ConstF, FuncF>(
        &self,
        mut eq_f: EqF,
        mut free_f: FreeF,
        mut const_f: ConstF,
        mut func_f: FuncF,
    ) -> T
    where
        EqF: FnMut(T, T) -> T,
        FreeF: FnMut(usize) -> T,
        ConstF: FnMut(SymbolId) -> T,
        FuncF: FnMut(SymbolId, Vec<T>) -> T,
    {
        enum Visit<'a> {
            Enter(&'a SyntaxNode),
            Exit(&'a SyntaxNode),
        }

        let mut stack = vec![Visit::Enter(self)];
        let mut results: Vec<T> = Vec::new();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node) => match node {
                    SyntaxNode::Free(id) => results.push(free_f(*id)),
                    SyntaxNode::Constant(id) => results.push(const_f(*id)),
                    SyntaxNode::Equality(lhs, rhs) => {
                        stack.push(Visit::Exit(node));
                        stack.push(Visit::Enter(rhs));
                        stack.push(Visit::Enter(lhs));
                    }
                    SyntaxNode::Function(_, children) => {
                        stack.push(Visit::Exit(node));
                        for child in children.iter().rev() {
                            stack.push(Visit::Enter(child));
                        }
                    }
                },
                Visit::Exit(node) => match node {
                    SyntaxNode::Equality(..) => {
                        let rhs = results.pop().expect("equality missing rhs result");
                        let lhs = results.pop().expect("equality missing lhs result");
                        results.push(eq_f(lhs, rhs));
                    }
                    SyntaxNode::Function(id, children) => {
                        let args = results.split_off(results.len() - children.len());
                        results.push(func_f(*id, args));
                    }
                    SyntaxNode::Free(_) | SyntaxNode::Constant(_) => {
                        unreachable!("leaves are never revisited")
                    }
                },
            }
        }

        results.pop().expect("fold produces one result")
    }

    /// Check symbol definitions and arities against `ctx`.  An equality is
    /// only accepted at the root.
    pub fn type_check(&self, ctx: &ModelContext) -> bool {
        match self {
            SyntaxNode::Equality(lhs, rhs) => {
                check_expression(lhs, ctx) && check_expression(rhs, ctx)
            }
            _ => check_expression(self, ctx),
        }
    }

    pub fn to_str(&self, ctx: &ModelContext) -> String {
        self.fold(
            |lhs: String, rhs: String| format!("{} = {}", lhs, rhs),
            |id| format!("x{}", id),
            |id| ctx.symbol_name(id).to_string(),
            |id, args| format!("{}({})", ctx.symbol_name(id), args.join(", ")),
        )
    }
}

// Uniquely owned children are unlinked onto a work list so dropping a deep
// tree does not recurse.
impl Drop for SyntaxNode {
    fn drop(&mut self) {
        let SyntaxNode::Function(_, children) = self else {
            return;
        };
        let mut pending: Vec<SyntaxNodePtr> = children.drain(..).collect();
        while let Some(child) = pending.pop() {
            if let Ok(mut node) = Rc::try_unwrap(child) {
                if let SyntaxNode::Function(_, children) = &mut node {
                    pending.extend(children.drain(..));
                }
            }
        }
    }
}

fn check_expression(node: &SyntaxNode, ctx: &ModelContext) -> bool {
    node.fold(
        |_, _| false,
        |_| true,
        |id| ctx.symbols().contains_id(id) && ctx.symbol_arity(id) == 0,
        |id, args| {
            ctx.symbols().contains_id(id)
                && ctx.symbol_arity(id) == args.len()
                && args.iter().all(|ok| *ok)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::SyntaxNode;
    use crate::data::context::ModelContext;

    fn ctx() -> ModelContext {
        ModelContext::builder("t")
            .define("e", 0)
            .and_then(|b| b.define("i", 1))
            .and_then(|b| b.define("*", 2))
            .and_then(|b| b.build())
            .expect("context")
    }

    #[test]
    fn fold_visits_children_in_order() {
        let ctx = ctx();
        let mul = ctx.symbol_id("*").expect("defined");
        let e = ctx.symbol_id("e").expect("defined");
        let tree = SyntaxNode::equality(
            SyntaxNode::function(mul, [SyntaxNode::free(0), SyntaxNode::constant(e)]),
            SyntaxNode::free(0),
        );
        assert_eq!(tree.to_str(&ctx), "*(x0, e) = x0");
    }

    #[test]
    fn type_check_rejects_bad_arity_and_nesting() {
        let ctx = ctx();
        let i = ctx.symbol_id("i").expect("defined");
        let good = SyntaxNode::function(i, [SyntaxNode::free(0)]);
        assert!(good.type_check(&ctx));
        let bad = SyntaxNode::function(i, [SyntaxNode::free(0), SyntaxNode::free(1)]);
        assert!(!bad.type_check(&ctx));
        let nested = SyntaxNode::function(
            i,
            [SyntaxNode::equality(SyntaxNode::free(0), SyntaxNode::free(1))],
        );
        assert!(!nested.type_check(&ctx));
    }
}
