use crate::value::IdentityKey;
use std::{
    any::{Any, TypeId},
    collections::{HashMap, HashSet},
    fmt,
};

///
/// NodeId
/// Index of one materialized entity in the scan arena.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// Node
///
/// One entity instance with its column fields populated. Relationship
/// fields stay at their default here; they are attached at assembly from
/// `links`, one ordered child list per relation binding.
///

pub(crate) struct Node {
    pub(crate) key: IdentityKey,
    pub(crate) instance: Box<dyn Any>,
    links: Vec<Vec<NodeId>>,
}

///
/// IdentityMap
///
/// Scan-scoped arena keyed by `(type, primary key)`. Lives for exactly one
/// orchestrator call.
///

#[derive(Default)]
pub(crate) struct IdentityMap {
    nodes: Vec<Node>,
    index: HashMap<(TypeId, IdentityKey), NodeId>,
    edges: HashSet<(NodeId, usize, NodeId)>,
}

impl IdentityMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn find(&self, type_id: TypeId, key: &IdentityKey) -> Option<NodeId> {
        // the index is keyed by owned pairs; lookups are one clone per row
        self.index.get(&(type_id, key.clone())).copied()
    }

    /// Store a freshly populated instance with room for `relations` child lists.
    pub(crate) fn insert(
        &mut self,
        type_id: TypeId,
        key: IdentityKey,
        instance: Box<dyn Any>,
        relations: usize,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert((type_id, key.clone()), id);
        self.nodes.push(Node {
            key,
            instance,
            links: vec![Vec::new(); relations],
        });

        id
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Children linked under `parent` for one relation, in first-seen order.
    pub(crate) fn links(&self, parent: NodeId, relation: usize) -> &[NodeId] {
        self.nodes
            .get(parent.0)
            .and_then(|node| node.links.get(relation))
            .map_or(&[], Vec::as_slice)
    }

    /// Link `child` under `parent`. Returns `false` if the link already existed.
    pub(crate) fn link(&mut self, parent: NodeId, relation: usize, child: NodeId) -> bool {
        let Some(links) = self
            .nodes
            .get_mut(parent.0)
            .and_then(|node| node.links.get_mut(relation))
        else {
            return false;
        };
        if !self.edges.insert((parent, relation, child)) {
            return false;
        }

        links.push(child);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}
