//! Compact copy-on-write storage for expression trees.
//!
//! A tree is a flat list of function records plus a distinguished root.
//! Free variables and constants never get records of their own: they only
//! appear as typed child slots (or as the root).  Record arrays are shared
//! between clones and copied only when a shared clone is mutated.

use super::symbol::SymbolId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::io::{Read, Write};
use std::rc::Rc;
use thiserror::Error;

/// Default bound on function arity; a model context may lower or raise it.
pub const DEFAULT_MAX_ARITY: usize = 5;

/// Type tag of a node inside a flyweight tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Free,
    Const,
    Func,
}

pub type ChildIds = SmallVec<[usize; DEFAULT_MAX_ARITY]>;
pub type ChildTypes = SmallVec<[NodeType; DEFAULT_MAX_ARITY]>;

/// Errors raised while reading or writing binary tree archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("malformed archive: {0}")]
    Malformed(String),
    #[error("archive refers to symbol id {0}, which the model context does not define")]
    UnknownSymbol(usize),
}

/// Flat, reference counted encoding of a non-equality expression.
///
/// Invariant: when the root type is [`NodeType::Func`] the root id indexes
/// the record arrays; otherwise the root id is a free variable id or a raw
/// constant symbol id and the arrays are empty.
#[derive(Clone, Debug)]
pub struct ExprTreeFlyweight {
    root_id: usize,
    root_type: NodeType,
    func_symb_ids: Rc<Vec<SymbolId>>,
    func_arities: Rc<Vec<usize>>,
    func_children: Rc<Vec<ChildIds>>,
    func_child_types: Rc<Vec<ChildTypes>>,
}

impl Default for ExprTreeFlyweight {
    fn default() -> Self {
        Self {
            root_id: 0,
            root_type: NodeType::Free,
            func_symb_ids: Rc::default(),
            func_arities: Rc::default(),
            func_children: Rc::default(),
            func_child_types: Rc::default(),
        }
    }
}

impl ExprTreeFlyweight {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree consisting of a single free variable or constant.
    pub fn leaf(id: usize, node_type: NodeType) -> Self {
        assert!(node_type != NodeType::Func, "a leaf cannot be a function node");
        let mut tree = Self::new();
        tree.set_root(id, node_type);
        tree
    }

    pub const fn root_id(&self) -> usize {
        self.root_id
    }

    pub const fn root_type(&self) -> NodeType {
        self.root_type
    }

    /// Number of function records (reachable or not).
    pub fn size(&self) -> usize {
        self.func_symb_ids.len()
    }

    pub fn func_symb_id(&self, idx: usize) -> SymbolId {
        self.func_symb_ids[idx]
    }

    pub fn func_arity(&self, idx: usize) -> usize {
        self.func_arities[idx]
    }

    pub fn func_children(&self, idx: usize) -> &[usize] {
        &self.func_children[idx]
    }

    pub fn func_child_types(&self, idx: usize) -> &[NodeType] {
        &self.func_child_types[idx]
    }

    /// Whether both trees currently share their record storage.
    pub fn shares_storage_with(&self, other: &ExprTreeFlyweight) -> bool {
        Rc::ptr_eq(&self.func_children, &other.func_children)
    }

    /// Set the apex of the tree.  Non-function roots drop the record arrays.
    pub fn set_root(&mut self, id: usize, node_type: NodeType) {
        if node_type == NodeType::Func {
            assert!(id < self.size(), "function root {} out of range", id);
        } else if self.size() > 0 {
            self.func_symb_ids = Rc::default();
            self.func_arities = Rc::default();
            self.func_children = Rc::default();
            self.func_child_types = Rc::default();
        }
        self.root_id = id;
        self.root_type = node_type;
    }

    /// Append a function record and return its index.
    ///
    /// Function children must already be records of this tree.
    pub fn add_func(
        &mut self,
        symb_id: SymbolId,
        children: &[usize],
        child_types: &[NodeType],
    ) -> usize {
        let arity = children.len();
        assert!(arity > 0, "function records need at least one child");
        assert_eq!(arity, child_types.len(), "child id/type arrays differ in length");
        for (&child, &ty) in children.iter().zip(child_types) {
            if ty == NodeType::Func {
                assert!(child < self.size(), "function child {} not merged", child);
            }
        }

        let idx = self.size();
        Rc::make_mut(&mut self.func_symb_ids).push(symb_id);
        Rc::make_mut(&mut self.func_arities).push(arity);
        Rc::make_mut(&mut self.func_children).push(children.iter().copied().collect());
        Rc::make_mut(&mut self.func_child_types).push(child_types.iter().copied().collect());
        idx
    }

    /// Overwrite one child slot of an existing record.
    pub fn update_func_child(
        &mut self,
        func_idx: usize,
        arg_idx: usize,
        new_id: usize,
        new_type: NodeType,
    ) {
        assert!(func_idx < self.size(), "function index {} out of range", func_idx);
        assert!(
            arg_idx < self.func_arities[func_idx],
            "argument {} out of range for arity {}",
            arg_idx,
            self.func_arities[func_idx]
        );
        if new_type == NodeType::Func {
            assert!(new_id < self.size(), "function child {} not merged", new_id);
        }

        Rc::make_mut(&mut self.func_children)[func_idx][arg_idx] = new_id;
        Rc::make_mut(&mut self.func_child_types)[func_idx][arg_idx] = new_type;
    }

    /// Append every record of `other` to this tree and return where
    /// `other`'s root now lives.  Leaf roots are returned unchanged.
    pub fn merge_from(&mut self, other: &ExprTreeFlyweight) -> (usize, NodeType) {
        if other.root_type != NodeType::Func {
            return (other.root_id, other.root_type);
        }

        let offset = self.size();
        Rc::make_mut(&mut self.func_symb_ids).extend_from_slice(&other.func_symb_ids);
        Rc::make_mut(&mut self.func_arities).extend_from_slice(&other.func_arities);

        let children = Rc::make_mut(&mut self.func_children);
        children.reserve(other.size());
        for (ids, types) in other.func_children.iter().zip(other.func_child_types.iter()) {
            children.push(
                ids.iter()
                    .zip(types)
                    .map(|(&id, &ty)| if ty == NodeType::Func { id + offset } else { id })
                    .collect(),
            );
        }
        Rc::make_mut(&mut self.func_child_types).extend(other.func_child_types.iter().cloned());

        (other.root_id + offset, NodeType::Func)
    }

    /// Write the tree as a sequential archive.
    ///
    /// Field order is root id, root type, symbol ids, arities, children,
    /// child types; [`ExprTreeFlyweight::load_from_bin`] reads the same order.
    pub fn save<W: Write>(&self, out: W) -> Result<(), ArchiveError> {
        let archive = ArchiveRef {
            root_id: self.root_id,
            root_type: self.root_type,
            func_symb_ids: &self.func_symb_ids,
            func_arities: &self.func_arities,
            func_children: &self.func_children,
            func_child_types: &self.func_child_types,
        };
        bincode::serialize_into(out, &archive)?;
        Ok(())
    }

    /// Read a tree written by [`ExprTreeFlyweight::save`], checking that the
    /// records describe a well formed tree.
    pub fn load_from_bin<R: Read>(input: R) -> Result<Self, ArchiveError> {
        let archive: ArchiveOwned = bincode::deserialize_from(input)?;
        archive.validate()?;

        let mut tree = ExprTreeFlyweight {
            root_id: archive.root_id,
            root_type: archive.root_type,
            func_symb_ids: Rc::new(archive.func_symb_ids),
            func_arities: Rc::new(archive.func_arities),
            func_children: Rc::new(archive.func_children),
            func_child_types: Rc::new(archive.func_child_types),
        };
        tree.set_root(archive.root_id, archive.root_type);
        Ok(tree)
    }
}

#[derive(Serialize)]
struct ArchiveRef<'a> {
    root_id: usize,
    root_type: NodeType,
    func_symb_ids: &'a [SymbolId],
    func_arities: &'a [usize],
    func_children: &'a [ChildIds],
    func_child_types: &'a [ChildTypes],
}

#[derive(Deserialize)]
struct ArchiveOwned {
    root_id: usize,
    root_type: NodeType,
    func_symb_ids: Vec<SymbolId>,
    func_arities: Vec<usize>,
    func_children: Vec<ChildIds>,
    func_child_types: Vec<ChildTypes>,
}

impl ArchiveOwned {
    fn validate(&self) -> Result<(), ArchiveError> {
        let size = self.func_symb_ids.len();
        if self.func_arities.len() != size
            || self.func_children.len() != size
            || self.func_child_types.len() != size
        {
            return Err(ArchiveError::Malformed("record arrays differ in length".into()));
        }
        if self.root_type == NodeType::Func && self.root_id >= size {
            return Err(ArchiveError::Malformed(format!(
                "root {} outside {} records",
                self.root_id, size
            )));
        }

        let records = self
            .func_arities
            .iter()
            .zip(&self.func_children)
            .zip(&self.func_child_types);
        for (idx, ((&arity, ids), types)) in records.enumerate() {
            if arity == 0 || ids.len() != arity || types.len() != arity {
                return Err(ArchiveError::Malformed(format!(
                    "record {} has inconsistent arity",
                    idx
                )));
            }
            // Children precede their parents, which also rules out cycles.
            let forward = ids
                .iter()
                .zip(types)
                .any(|(&id, &ty)| ty == NodeType::Func && id >= idx);
            if forward {
                return Err(ArchiveError::Malformed(format!(
                    "record {} refers to a record that does not precede it",
                    idx
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveError, ExprTreeFlyweight, NodeType};
    use crate::data::symbol::SymbolId;

    fn f() -> SymbolId {
        SymbolId::from_raw(1)
    }

    // f(x0, f(x1, c)) with c the raw constant id 0
    fn sample() -> ExprTreeFlyweight {
        let mut tree = ExprTreeFlyweight::new();
        let inner = tree.add_func(f(), &[1, 0], &[NodeType::Free, NodeType::Const]);
        let outer = tree.add_func(f(), &[0, inner], &[NodeType::Free, NodeType::Func]);
        tree.set_root(outer, NodeType::Func);
        tree
    }

    #[test]
    fn set_root_to_leaf_clears_records() {
        let mut tree = sample();
        assert_eq!(tree.size(), 2);
        tree.set_root(3, NodeType::Free);
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.root_id(), 3);
    }

    #[test]
    fn merge_offsets_function_children() {
        let mut base = sample();
        let other = sample();
        let (idx, ty) = base.merge_from(&other);
        assert_eq!(ty, NodeType::Func);
        assert_eq!(idx, other.root_id() + 2);
        assert_eq!(base.func_children(idx), &[0, 2]);
        assert_eq!(base.func_child_types(idx), &[NodeType::Free, NodeType::Func]);
        assert_eq!(base.func_children(2), &[1, 0]);
    }

    #[test]
    fn merge_of_leaf_is_a_no_op() {
        let mut base = sample();
        let leaf = ExprTreeFlyweight::leaf(7, NodeType::Free);
        assert_eq!(base.merge_from(&leaf), (7, NodeType::Free));
        assert_eq!(base.size(), 2);
    }

    #[test]
    fn mutation_copies_shared_storage() {
        let original = sample();
        let mut copy = original.clone();
        assert!(copy.shares_storage_with(&original));
        copy.update_func_child(0, 0, 9, NodeType::Free);
        assert!(!copy.shares_storage_with(&original));
        assert_eq!(original.func_children(0), &[1, 0]);
        assert_eq!(copy.func_children(0), &[9, 0]);
    }

    #[test]
    #[should_panic]
    fn update_with_unmerged_function_child_panics() {
        let mut tree = sample();
        tree.update_func_child(1, 0, 5, NodeType::Func);
    }

    #[test]
    fn archive_round_trip_keeps_records() {
        let tree = sample();
        let mut buf = Vec::new();
        tree.save(&mut buf).expect("save");
        let loaded = ExprTreeFlyweight::load_from_bin(buf.as_slice()).expect("load");
        assert_eq!(loaded.root_id(), tree.root_id());
        assert_eq!(loaded.root_type(), NodeType::Func);
        assert_eq!(loaded.func_children(1), tree.func_children(1));
    }

    #[test]
    fn self_referencing_record_is_rejected() {
        let mut tree = ExprTreeFlyweight::new();
        tree.add_func(f(), &[0], &[NodeType::Free]);
        tree.set_root(0, NodeType::Func);
        tree.update_func_child(0, 0, 0, NodeType::Func);
        let mut buf = Vec::new();
        tree.save(&mut buf).expect("save");
        assert!(matches!(
            ExprTreeFlyweight::load_from_bin(buf.as_slice()),
            Err(ArchiveError::Malformed(_))
        ));
    }

    #[test]
    fn forward_child_reference_is_rejected() {
        let mut tree = sample();
        // The inner record now points at the outer one, closing a cycle.
        tree.update_func_child(0, 0, 1, NodeType::Func);
        let mut buf = Vec::new();
        tree.save(&mut buf).expect("save");
        assert!(ExprTreeFlyweight::load_from_bin(buf.as_slice()).is_err());
    }

    #[test]
    fn truncated_archive_is_rejected() {
        let mut buf = Vec::new();
        sample().save(&mut buf).expect("save");
        buf.truncate(buf.len() / 2);
        assert!(ExprTreeFlyweight::load_from_bin(buf.as_slice()).is_err());
    }
}
