//! Mutation records and the per-observer queues they are delivered to.

use std::collections::VecDeque;

use slotmap::new_key_type;

use super::node::NodeId;

new_key_type! {
    pub struct ObserverId;
}

/// Which changes an observer wants delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    /// Also report changes below the observed node, not just on it.
    pub subtree: bool,
}

impl ObserveOptions {
    pub fn structure() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        name: String,
    },
    CharacterData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// Node whose children, attributes or text changed.
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn added(&self) -> &[NodeId] {
        match &self.kind {
            MutationKind::ChildList { added, .. } => added,
            _ => &[],
        }
    }

    pub fn removed(&self) -> &[NodeId] {
        match &self.kind {
            MutationKind::ChildList { removed, .. } => removed,
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub(crate) struct Observer {
    pub(crate) target: NodeId,
    pub(crate) options: ObserveOptions,
    pub(crate) pending: VecDeque<MutationRecord>,
}

impl Observer {
    pub(crate) fn new(target: NodeId, options: ObserveOptions) -> Self {
        Self {
            target,
            options,
            pending: VecDeque::new(),
        }
    }

    pub(crate) fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList { .. } => self.options.child_list,
            MutationKind::Attributes { .. } => self.options.attributes,
            MutationKind::CharacterData => self.options.character_data,
        }
    }
}
