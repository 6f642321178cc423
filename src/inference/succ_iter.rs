//! Cursor interface shared by every successor iterator.
//!
//! Successor iterators are nested, lazy state machines.  A cursor is either
//! positioned on a successor (`valid()`) or exhausted for good; none of them
//! can be rewound.

use super::kernel::KnowledgeKernel;
use super::matching::Candidate;
use super::proof_state::ProofState;
use crate::data::Statement;
use std::rc::{Rc, Weak};

pub trait SuccessorIter {
    /// Whether the cursor is positioned on a successor.
    fn valid(&self) -> bool;

    /// The current successor.  Must only be called while `valid()`.
    fn get(&self) -> Rc<ProofState>;

    /// Forefront of the current successor.  Layers that can answer without
    /// building the proof state override this.
    fn get_forefront(&self) -> Statement {
        self.get().forefront().clone()
    }

    /// Move to the next successor.  Must only be called while `valid()`.
    fn advance(&mut self);

    /// Rough measure of the work still held by the cursor, used for memory
    /// accounting by the search layer.
    fn size(&self) -> usize;
}

pub type SuccIterPtr = Box<dyn SuccessorIter>;

/// Everything the layers of one expansion share.
pub(crate) struct StepContext {
    pub parent: Weak<ProofState>,
    pub kernel: Rc<KnowledgeKernel>,
    /// Parent forefront with its free ids moved above the rule ids.
    pub forefront: Statement,
    /// Values for unbound rule variables, in enumeration order.
    pub candidates: Vec<Candidate>,
}

impl StepContext {
    pub fn parent(&self) -> Rc<ProofState> {
        self.parent
            .upgrade()
            .expect("successor iterators must not outlive their proof state")
    }
}

/// Adapts a cursor to a standard [`Iterator`].
pub struct Successors {
    inner: SuccIterPtr,
}

impl Successors {
    pub fn new(inner: SuccIterPtr) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> SuccIterPtr {
        self.inner
    }
}

impl Iterator for Successors {
    type Item = Rc<ProofState>;

    fn next(&mut self) -> Option<Rc<ProofState>> {
        if !self.inner.valid() {
            return None;
        }
        let current = self.inner.get();
        self.inner.advance();
        Some(current)
    }
}

/// Cursor with no successors.
#[derive(Debug, Default)]
pub struct EmptySuccIter;

impl SuccessorIter for EmptySuccIter {
    fn valid(&self) -> bool {
        false
    }

    fn get(&self) -> Rc<ProofState> {
        panic!("get() on an exhausted successor iterator")
    }

    fn advance(&mut self) {
        panic!("advance() on an exhausted successor iterator")
    }

    fn size(&self) -> usize {
        0
    }
}
