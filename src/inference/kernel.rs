//! The knowledge kernel: active rewrite rules and the triviality oracle.
//!
//! A kernel owns the axioms of its model context plus any number of theorem
//! batches added and removed at run time.  Every query goes through the
//! *active rule set*, the concatenation of the axioms and the live batches in
//! the order they were added, which is rebuilt after every change.
//!
//! Symbols defined on a kernel extend its own copy of the model context;
//! the rules and every proof started afterwards read through that copy.
//!
//! Iterators created by [`KnowledgeKernel::begin_proof_of`] hold a reference
//! to the kernel and read the active rule set as they advance.  Adding or
//! removing theorems while such iterators are alive changes what they see
//! part way through; which successors they then produce is unspecified.

use super::matching::{match_rule, MatchResult};
use super::proof_state::ProofState;
use super::random::{shuffle, Lcg};
use crate::data::{Expression, ModelContext, Statement, StatementArray, SymbolId};
use crate::parser::{parse_statements, ParseError};
use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Options threaded through every successor iterator built by a kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KernelSettings {
    /// Draw rules and assignment candidates in pseudo-random order.
    pub randomised: bool,
    /// Skip successors equivalent to a statement already on the proof path.
    pub no_repeats: bool,
    /// Seed of the kernel's random source.
    pub seed: u64,
}

pub struct KnowledgeKernel {
    ctx: RefCell<Rc<ModelContext>>,
    settings: KernelSettings,
    axioms: RefCell<StatementArray>,
    theorems: RefCell<BTreeMap<usize, StatementArray>>,
    next_ref: Cell<usize>,
    active_rules: RefCell<StatementArray>,
    rule_free_id_bound: Cell<usize>,
    rng: RefCell<Lcg>,
}

impl KnowledgeKernel {
    /// Build a kernel whose axioms are the context's axiom strings.
    pub fn new(ctx: Rc<ModelContext>, settings: KernelSettings) -> Result<Self, ParseError> {
        let axioms = parse_statements(&ctx, &ctx.axioms().join("\n"))?;
        Ok(Self::with_axioms(ctx, axioms, settings))
    }

    /// Build a kernel with explicitly given axioms.
    pub fn with_axioms(ctx: Rc<ModelContext>, axioms: StatementArray, settings: KernelSettings) -> Self {
        let kernel = Self {
            ctx: RefCell::new(ctx),
            settings,
            axioms: RefCell::new(axioms),
            theorems: RefCell::new(BTreeMap::new()),
            next_ref: Cell::new(0),
            active_rules: RefCell::new(StatementArray::new()),
            rule_free_id_bound: Cell::new(0),
            rng: RefCell::new(Lcg::new(settings.seed)),
        };
        assert!(kernel.valid(&kernel.axioms()), "axioms must type check against the context");
        kernel.rebuild_active_rules();
        kernel
    }

    /// The model context, including symbols defined on this kernel.
    pub fn context(&self) -> Rc<ModelContext> {
        self.ctx.borrow().clone()
    }

    pub const fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    pub fn randomised(&self) -> bool {
        self.settings.randomised
    }

    pub fn no_repeats(&self) -> bool {
        self.settings.no_repeats
    }

    pub fn axioms(&self) -> StatementArray {
        self.axioms.borrow().clone()
    }

    /// Register an extra symbol with this kernel.  The name must not be
    /// defined yet, either in the context or in the kernel.
    ///
    /// Statements parsed against [`KnowledgeKernel::context`] afterwards
    /// may use the new symbol.
    pub fn define_symbol(&self, name: &str, arity: usize) -> SymbolId {
        assert!(!self.is_defined(name), "symbol `{}` is already defined", name);
        let extended = match self.context().with_symbol(name, arity) {
            Ok(ctx) => Rc::new(ctx),
            Err(err) => panic!("symbol `{}` could not be registered: {}", name, err),
        };
        let id = extended
            .symbol_id(name)
            .unwrap_or_else(|| panic!("symbol `{}` missing after registration", name));

        let rehome = |stmts: &StatementArray| -> StatementArray {
            stmts.iter().map(|stmt| stmt.with_context(&extended)).collect()
        };
        let axioms = rehome(&self.axioms.borrow());
        *self.axioms.borrow_mut() = axioms;
        for batch in self.theorems.borrow_mut().values_mut() {
            *batch = rehome(batch);
        }
        *self.ctx.borrow_mut() = extended;
        self.rebuild_active_rules();
        tracing::debug!(symbol = name, arity, id = id.as_raw(), "kernel symbol defined");
        id
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.ctx.borrow().is_defined(name)
    }

    pub fn symbol_arity(&self, name: &str) -> Option<usize> {
        let ctx = self.ctx.borrow();
        ctx.symbol_id(name).map(|id| ctx.symbol_arity(id))
    }

    /// Constant ids known to the kernel, in definition order.
    pub fn constant_ids(&self) -> Vec<SymbolId> {
        self.ctx.borrow().constant_ids().to_vec()
    }

    /// Whether every symbol in `stmts` is defined with the arity it is used at.
    pub fn valid(&self, stmts: &StatementArray) -> bool {
        let ctx = self.context();
        let known = |id: SymbolId, arity: usize| ctx.symbols().contains_id(id) && ctx.symbol_arity(id) == arity;
        stmts.iter().all(|stmt| {
            stmt.fold(
                |lhs, rhs| lhs && rhs,
                |_| true,
                |id| known(id, 0),
                |id, args: &[bool]| known(id, args.len()) && args.iter().all(|ok| *ok),
            )
        })
    }

    /// Add a non-empty batch of theorems as extra rules.  Returns the handle
    /// to pass to [`KnowledgeKernel::remove_theorems`].
    pub fn add_theorems(&self, stmts: &StatementArray) -> usize {
        assert!(!stmts.is_empty(), "cannot add an empty theorem batch");
        debug_assert!(self.valid(stmts), "theorems must type check against the kernel");
        let ctx = self.context();
        let batch = if stmts.iter().all(|stmt| Rc::ptr_eq(stmt.context(), &ctx)) {
            stmts.clone()
        } else {
            stmts.iter().map(|stmt| stmt.with_context(&ctx)).collect()
        };
        let ref_id = self.next_ref.get();
        self.next_ref.set(ref_id + 1);
        self.theorems.borrow_mut().insert(ref_id, batch);
        self.rebuild_active_rules();
        tracing::debug!(ref_id, count = stmts.len(), rules = self.num_active_rules(), "theorems added");
        ref_id
    }

    /// Drop a batch previously returned by [`KnowledgeKernel::add_theorems`].
    pub fn remove_theorems(&self, ref_id: usize) {
        let removed = self.theorems.borrow_mut().remove(&ref_id);
        assert!(removed.is_some(), "theorem batch {} is not live", ref_id);
        self.rebuild_active_rules();
        tracing::debug!(ref_id, rules = self.num_active_rules(), "theorems removed");
    }

    fn rebuild_active_rules(&self) {
        let mut active = self.axioms();
        for batch in self.theorems.borrow().values() {
            active = active.concat(batch);
        }
        let bound = active
            .iter()
            .filter_map(|rule| rule.free_var_ids().max())
            .max()
            .map_or(0, |max| max + 1);
        self.rule_free_id_bound.set(bound);
        *self.active_rules.borrow_mut() = active;
    }

    /// Snapshot of the active rule set.
    pub fn active_rules(&self) -> StatementArray {
        self.active_rules.borrow().clone()
    }

    pub fn num_active_rules(&self) -> usize {
        self.active_rules.borrow().len()
    }

    /// Exclusive upper bound of the free variable ids used by active rules.
    pub fn rule_free_id_bound(&self) -> usize {
        self.rule_free_id_bound.get()
    }

    /// True by reflexivity, or an instance of some active rule.
    pub fn is_trivial(&self, stmt: &Statement) -> bool {
        stmt.true_by_reflexivity() || self.active_rules.borrow().iter().any(|rule| rule.implies(stmt))
    }

    /// Rewrites of `subexpr` by active rule `rule_idx`, left-to-right
    /// matches first.  Out of range indices give no results.
    pub fn match_results(&self, subexpr: &Expression, rule_idx: usize) -> Vec<MatchResult> {
        match self.active_rules.borrow().get(rule_idx) {
            Some(rule) => match_rule(rule, subexpr),
            None => Vec::new(),
        }
    }

    /// Start a proof of `target` in this kernel.  Targets parsed before a
    /// [`KnowledgeKernel::define_symbol`] call are read through the
    /// extended context.
    pub fn begin_proof_of(self: &Rc<Self>, target: &Statement) -> Rc<ProofState> {
        let ctx = self.context();
        let target = if Rc::ptr_eq(target.context(), &ctx) {
            target.clone()
        } else {
            assert!(
                ctx.extends(target.context()),
                "target statement belongs to another model context"
            );
            target.with_context(&ctx)
        };
        ProofState::begin(self.clone(), target)
    }

    /// Hash of the symbol table and the active rules.  Kernels with equal
    /// codes answer every query the same way.
    pub fn get_integrity_code(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for symbol in self.ctx.borrow().symbols().iter() {
            symbol.name.hash(&mut hasher);
            symbol.arity.hash(&mut hasher);
        }
        for rule in self.active_rules.borrow().iter() {
            rule.to_str().hash(&mut hasher);
        }
        hasher.finish()
    }

    pub fn set_seed(&self, seed: u64) {
        self.rng.borrow_mut().set_seed(seed);
    }

    pub fn generate_rand(&self) -> u64 {
        self.rng.borrow_mut().next_u64()
    }

    /// Uniform draw from `0..bound`.
    pub fn random_below(&self, bound: usize) -> usize {
        self.rng.borrow_mut().below(bound)
    }

    /// Fisher-Yates shuffle using the kernel's random source.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        let mut rng = self.rng.borrow_mut();
        shuffle(items, |bound| rng.below(bound));
    }
}

impl std::fmt::Debug for KnowledgeKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeKernel")
            .field("context", &self.ctx.borrow().name())
            .field("settings", &self.settings)
            .field("active_rules", &self.num_active_rules())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{KernelSettings, KnowledgeKernel};
    use crate::data::ModelContext;
    use crate::inference::ProofCompletionState;
    use crate::parser::{parse_statement, parse_statements};
    use std::rc::Rc;

    fn kernel() -> KnowledgeKernel {
        let ctx = ModelContext::builder("group")
            .define("e", 0)
            .and_then(|b| b.define("i", 1))
            .and_then(|b| b.define("*", 2))
            .map(|b| {
                b.axiom("*(*(x, y), z) = *(x, *(y, z))")
                    .axiom("*(x, e) = x")
                    .axiom("*(e, x) = x")
                    .axiom("*(x, i(x)) = e")
                    .axiom("*(i(x), x) = e")
            })
            .and_then(|b| b.build())
            .expect("context");
        KnowledgeKernel::new(Rc::new(ctx), KernelSettings::default()).expect("kernel")
    }

    #[test]
    fn axioms_become_active_rules() {
        let ker = kernel();
        assert_eq!(ker.num_active_rules(), 5);
        assert_eq!(ker.rule_free_id_bound(), 3);
    }

    #[test]
    fn trivial_statements() {
        let ker = kernel();
        let ctx = ker.context();
        for text in ["e = e", "*(e, y) = y", "y = *(y, e)", "*(i(x), i(i(x))) = e"] {
            let stmt = parse_statement(&ctx, text).expect("statement");
            assert!(ker.is_trivial(&stmt), "`{}` should be trivial", text);
        }
        let stmt = parse_statement(&ctx, "i(e) = e").expect("statement");
        assert!(!ker.is_trivial(&stmt));
    }

    #[test]
    fn theorem_batches_come_and_go() {
        let ker = kernel();
        let ctx = ker.context();
        let target = parse_statement(&ctx, "e = i(e)").expect("statement");
        let before = ker.get_integrity_code();
        let batch = parse_statements(&ctx, "i(e) = e").expect("theorems");
        let handle = ker.add_theorems(&batch);
        assert!(ker.is_trivial(&target));
        assert_ne!(ker.get_integrity_code(), before);
        ker.remove_theorems(handle);
        assert!(!ker.is_trivial(&target));
        assert_eq!(ker.get_integrity_code(), before);
    }

    #[test]
    #[should_panic]
    fn removing_a_dead_batch_panics() {
        let ker = kernel();
        ker.remove_theorems(3);
    }

    #[test]
    fn kernel_symbols_extend_the_context() {
        let ker = kernel();
        assert!(ker.is_defined("*"));
        assert!(!ker.is_defined("g"));
        ker.define_symbol("g", 2);
        assert_eq!(ker.symbol_arity("g"), Some(2));
        let ctx = ker.context();
        let stmts = parse_statements(&ctx, "*(x, y) = e").expect("statements");
        assert!(ker.valid(&stmts));
    }

    #[test]
    fn kernel_constants_take_part_in_search() {
        let ker = Rc::new(kernel());
        let early = parse_statement(&ker.context(), "e = i(e)").expect("target");
        let c = ker.define_symbol("c", 0);
        let ctx = ker.context();
        assert_eq!(ctx.symbol_id("c"), Some(c));
        assert_eq!(ker.constant_ids().len(), 2);
        assert_eq!(ker.axioms().at(0).context().symbol_id("c"), Some(c));

        let wanted = parse_statement(&ctx, "e = i(*(c, i(c)))").expect("names the new constant");
        let found = ker
            .begin_proof_of(&early)
            .successors()
            .any(|succ| succ.forefront().identical(&wanted));
        assert!(found, "the new constant is an assignment candidate");

        let target = parse_statement(&ctx, "c = *(c, e)").expect("target");
        assert_eq!(ker.begin_proof_of(&target).completion_state(), ProofCompletionState::Proven);
    }

    #[test]
    #[should_panic]
    fn redefining_a_context_symbol_panics() {
        kernel().define_symbol("e", 0);
    }

    #[test]
    fn seeded_draws_repeat() {
        let ker = kernel();
        ker.set_seed(11);
        let first: Vec<_> = (0..5).map(|_| ker.generate_rand()).collect();
        ker.set_seed(11);
        let second: Vec<_> = (0..5).map(|_| ker.generate_rand()).collect();
        assert_eq!(first, second);
    }
}
