//! Proof states: persistent chains of statements from a target to the
//! statement currently being rewritten.

use super::kernel::KnowledgeKernel;
use super::matching::{assignment_candidates, theorem_used};
use super::no_repeat_iter::NoRepeatIter;
use super::sub_expr_iter::SubExprMatchingIter;
use super::succ_iter::{StepContext, SuccIterPtr, SuccessorIter, Successors};
use crate::data::{Statement, StatementArray};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// How far a proof state is from being a finished proof.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProofCompletionState {
    /// The forefront is trivially true.
    Proven,
    /// Not proven and no successors exist.
    NoProof,
    /// Not proven but at least one successor exists.
    Unfinished,
}

impl fmt::Display for ProofCompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProofCompletionState::Proven => "PROVEN",
            ProofCompletionState::NoProof => "NO_PROOF",
            ProofCompletionState::Unfinished => "UNFINISHED",
        };
        f.write_str(name)
    }
}

/// One node of a proof attempt.
///
/// The root holds the target statement; every other node holds the
/// statement derived from its parent's forefront by a single rewrite.
pub struct ProofState {
    kernel: Rc<KnowledgeKernel>,
    parent: Option<Rc<ProofState>>,
    forefront: Statement,
    depth: usize,
    this: Weak<ProofState>,
    completion: Cell<Option<ProofCompletionState>>,
    cached_iter: RefCell<Option<SuccIterPtr>>,
}

impl ProofState {
    pub(crate) fn begin(kernel: Rc<KnowledgeKernel>, target: Statement) -> Rc<Self> {
        Self::create(kernel, None, target.compact())
    }

    pub(crate) fn child(parent: &Rc<ProofState>, forefront: Statement) -> Rc<Self> {
        Self::create(parent.kernel.clone(), Some(parent.clone()), forefront.compact())
    }

    fn create(kernel: Rc<KnowledgeKernel>, parent: Option<Rc<ProofState>>, forefront: Statement) -> Rc<Self> {
        let depth = parent.as_ref().map_or(0, |p| p.depth + 1);
        Rc::new_cyclic(|this| ProofState {
            kernel,
            parent,
            forefront,
            depth,
            this: this.clone(),
            completion: Cell::new(None),
            cached_iter: RefCell::new(None),
        })
    }

    pub fn kernel(&self) -> &Rc<KnowledgeKernel> {
        &self.kernel
    }

    /// The statement currently being rewritten.
    pub fn forefront(&self) -> &Statement {
        &self.forefront
    }

    /// The statement the proof started from.
    pub fn target(&self) -> &Statement {
        let mut state = self;
        while let Some(parent) = &state.parent {
            state = parent;
        }
        &state.forefront
    }

    /// Number of rewrites between the target and the forefront.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<&Rc<ProofState>> {
        self.parent.as_ref()
    }

    /// Statements from the target down to the forefront.
    pub fn path(&self) -> Vec<Statement> {
        let mut path = Vec::with_capacity(self.depth + 1);
        let mut state = Some(self);
        while let Some(current) = state {
            path.push(current.forefront.clone());
            state = current.parent.as_deref();
        }
        path.reverse();
        path
    }

    /// Proven if the forefront is trivial; otherwise builds the successor
    /// iterator (kept for the next [`ProofState::succ_begin`]) to tell
    /// unfinished states from dead ends.
    pub fn completion_state(&self) -> ProofCompletionState {
        if let Some(state) = self.completion.get() {
            return state;
        }
        let state = if self.kernel.is_trivial(&self.forefront) {
            ProofCompletionState::Proven
        } else {
            let mut cached = self.cached_iter.borrow_mut();
            let iter = cached.get_or_insert_with(|| self.compute_begin());
            if iter.valid() {
                ProofCompletionState::Unfinished
            } else {
                ProofCompletionState::NoProof
            }
        };
        self.completion.set(Some(state));
        state
    }

    /// Cursor over the successors of this state.  The first call hands out
    /// the iterator cached by [`ProofState::completion_state`], if any.
    pub fn succ_begin(&self) -> SuccIterPtr {
        let inner = self
            .cached_iter
            .borrow_mut()
            .take()
            .unwrap_or_else(|| self.compute_begin());
        Box::new(AnchoredSuccIter {
            _owner: self.self_rc(),
            inner,
        })
    }

    /// [`ProofState::succ_begin`] as a standard iterator.
    pub fn successors(&self) -> Successors {
        Successors::new(self.succ_begin())
    }

    fn self_rc(&self) -> Rc<ProofState> {
        self.this
            .upgrade()
            .expect("proof states only exist behind an Rc")
    }

    fn compute_begin(&self) -> SuccIterPtr {
        // Rule variables keep ids below the bound, so the working copy of
        // the forefront is moved above it.
        let bound = self.kernel.rule_free_id_bound();
        let working = match self.forefront.free_var_ids().min() {
            Some(min) if min < bound => self.forefront.increment_free_var_ids(bound - min),
            _ => self.forefront.clone(),
        };
        let candidates = assignment_candidates(&working, working.context().constant_ids());
        let step = Rc::new(StepContext {
            parent: self.this.clone(),
            kernel: self.kernel.clone(),
            forefront: working,
            candidates,
        });
        let iter: SuccIterPtr = Box::new(SubExprMatchingIter::new(step));
        if self.kernel.no_repeats() {
            Box::new(NoRepeatIter::new(self.path(), iter))
        } else {
            iter
        }
    }

    /// For each theorem, the number of steps of this proof that look like
    /// they used it.
    pub fn get_usage(&self, theorems: &StatementArray) -> Vec<usize> {
        let path = self.path();
        theorems
            .iter()
            .map(|theorem| {
                path.windows(2)
                    .filter(|step| theorem_used(theorem, &step[0], &step[1]))
                    .count()
            })
            .collect()
    }

    /// Newline separated statements, target first.
    pub fn to_str(&self) -> String {
        self.path()
            .iter()
            .map(Statement::to_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Debug for ProofState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofState")
            .field("depth", &self.depth)
            .field("forefront", &self.forefront)
            .finish()
    }
}

/// Keeps the originating proof state alive for as long as its successor
/// cursor is in use; the inner layers only hold weak references to it.
struct AnchoredSuccIter {
    _owner: Rc<ProofState>,
    inner: SuccIterPtr,
}

impl SuccessorIter for AnchoredSuccIter {
    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn get(&self) -> Rc<ProofState> {
        self.inner.get()
    }

    fn get_forefront(&self) -> Statement {
        self.inner.get_forefront()
    }

    fn advance(&mut self) {
        self.inner.advance()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}
