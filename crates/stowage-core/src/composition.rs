//! Composition queries over the entity model.
//!
//! These answer which composition paths of an entity end in attachment storage.
//! They are pure functions of an immutable [`EntityGraph`].

use std::collections::HashSet;

use crate::models::{AttachmentPath, EntityGraph, EntityId};

/// Every composition path from `entity` that ends in an entity tagged as media,
/// in relationship declaration order.
///
/// Entities already on the current path are not re-entered, so traversal
/// terminates on any cycle. A sub-entity reachable through several branches is
/// still reported once per branch.
pub fn attachment_paths(graph: &EntityGraph, entity: EntityId) -> Vec<AttachmentPath> {
    let mut result = Vec::new();
    let mut path = Vec::new();
    let mut on_path = HashSet::new();
    collect_paths(graph, entity, &mut path, &mut on_path, &mut result);
    result
}

fn collect_paths(
    graph: &EntityGraph,
    entity: EntityId,
    path: &mut Vec<String>,
    on_path: &mut HashSet<EntityId>,
    result: &mut Vec<AttachmentPath>,
) {
    let Some(model) = graph.entity(entity) else {
        return;
    };
    on_path.insert(entity);

    for composition in &model.compositions {
        let Some(target) = graph.entity(composition.target) else {
            continue;
        };

        path.push(composition.name.clone());
        if target.is_media {
            result.push(AttachmentPath::from(path.clone()));
        }
        if !on_path.contains(&composition.target) {
            collect_paths(graph, composition.target, path, on_path, result);
        }
        path.pop();
    }

    on_path.remove(&entity);
}

/// Whether `entity` composes attachment storage within two levels: a direct
/// composition target is tagged, or one of that target's own targets is.
pub fn has_attachment_composition(graph: &EntityGraph, entity: EntityId) -> bool {
    let Some(model) = graph.entity(entity) else {
        return false;
    };

    model.compositions.iter().any(|composition| {
        graph.entity(composition.target).is_some_and(|target| {
            target.is_media
                || target
                    .compositions
                    .iter()
                    .any(|nested| is_attachment_entity(graph, nested.target))
        })
    })
}

/// Whether `entity` itself is tagged as attachment storage.
pub fn is_attachment_entity(graph: &EntityGraph, entity: EntityId) -> bool {
    graph.entity(entity).is_some_and(|model| model.is_media)
}

/// Read-only attachment view over one entity, obtained from [`EntityGraph::attachments`].
#[derive(Debug, Clone, Copy)]
pub struct AttachmentCapabilities<'a> {
    graph: &'a EntityGraph,
    entity: EntityId,
}

impl<'a> AttachmentCapabilities<'a> {
    pub(crate) fn new(graph: &'a EntityGraph, entity: EntityId) -> Self {
        Self { graph, entity }
    }

    pub fn has_attachment_composition(&self) -> bool {
        has_attachment_composition(self.graph, self.entity)
    }

    pub fn attachment_paths(&self) -> Vec<AttachmentPath> {
        attachment_paths(self.graph, self.entity)
    }

    pub fn is_attachment_entity(&self) -> bool {
        is_attachment_entity(self.graph, self.entity)
    }
}
