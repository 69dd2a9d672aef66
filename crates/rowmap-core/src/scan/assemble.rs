use crate::{
    error::MapError,
    model::Descriptor,
    scan::{
        identity::{IdentityMap, NodeId},
        materialize::DescriptorCache,
    },
    traits::Entity,
};

///
/// Assembler
///
/// Builds owned entity graphs from the identity map once every row has been
/// folded in, so nested collections reflect the whole scan.
///
/// A node reached again on its own path is emitted with columns only; the
/// relation it closes is not expanded a second time.
///

pub(crate) struct Assembler<'a, 'r> {
    identity: &'a IdentityMap,
    descriptors: &'a mut DescriptorCache<'r>,
    path: Vec<NodeId>,
}

impl<'a, 'r> Assembler<'a, 'r> {
    pub(crate) const fn new(
        identity: &'a IdentityMap,
        descriptors: &'a mut DescriptorCache<'r>,
    ) -> Self {
        Self {
            identity,
            descriptors,
            path: Vec::new(),
        }
    }

    pub(crate) fn assemble<E: Entity>(&mut self, node: NodeId) -> Result<E, MapError> {
        let Some(current) = self.identity.node(node) else {
            return Err(MapError::invariant(format!(
                "identity node {node} is missing while assembling entity(name={})",
                E::ENTITY_NAME
            )));
        };
        let Some(instance) = current.instance.downcast_ref::<E>() else {
            return Err(MapError::invariant(format!(
                "identity node {node} (key {:?}) does not hold entity(name={})",
                current.key,
                E::ENTITY_NAME
            )));
        };

        let mut entity = instance.clone();
        if self.path.contains(&node) {
            return Ok(entity);
        }

        let descriptor = self.descriptors.get::<E>()?;

        self.path.push(node);
        let attached = self.attach_relations(&descriptor, &mut entity, node);
        self.path.pop();
        attached?;

        Ok(entity)
    }

    fn attach_relations<E: Entity>(
        &mut self,
        descriptor: &Descriptor<E>,
        entity: &mut E,
        node: NodeId,
    ) -> Result<(), MapError> {
        let identity = self.identity;
        for (index, relation) in descriptor.relations.iter().enumerate() {
            let children = identity.links(node, index);
            if children.is_empty() {
                continue;
            }

            (relation.hooks.assemble)(entity, self, children)?;
        }

        Ok(())
    }
}
