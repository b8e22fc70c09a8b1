//! Entity model graph.
//!
//! Entities live in an arena owned by [`EntityGraph`]; an [`EntityId`] is the
//! entity's identity. Compositions may form cycles, including an entity
//! composing itself.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::composition::AttachmentCapabilities;
use crate::error::{AttachmentError, AttachmentResult};

/// Identity of an entity inside its [`EntityGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

/// A named composition relationship from one entity to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub name: String,
    pub target: EntityId,
}

/// A node of the application data model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityModel {
    pub name: String,
    /// Tagged as attachment/media storage
    pub is_media: bool,
    /// Compositions in declaration order
    pub compositions: Vec<Composition>,
}

/// Sequence of relationship names leading from a root entity to an attachment entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentPath(Vec<String>);

impl AttachmentPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for AttachmentPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl Display for AttachmentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Deserialize)]
struct GraphDocument {
    entities: Vec<EntityDocument>,
}

#[derive(Debug, Deserialize)]
struct EntityDocument {
    name: String,
    #[serde(default)]
    media: bool,
    #[serde(default)]
    compositions: Vec<CompositionDocument>,
}

#[derive(Debug, Deserialize)]
struct CompositionDocument {
    name: String,
    target: String,
}

/// Read-only data model built once at startup
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: Vec<EntityModel>,
    by_name: HashMap<String, EntityId>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. Names are unique within a graph.
    pub fn add_entity(
        &mut self,
        name: impl Into<String>,
        is_media: bool,
    ) -> AttachmentResult<EntityId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(AttachmentError::Configuration(format!(
                "Entity {} is declared twice",
                name
            )));
        }

        let id = EntityId(self.entities.len());
        self.entities.push(EntityModel {
            name: name.clone(),
            is_media,
            compositions: Vec::new(),
        });
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Declare a composition `parent.name -> target`.
    pub fn add_composition(
        &mut self,
        parent: EntityId,
        name: impl Into<String>,
        target: EntityId,
    ) -> AttachmentResult<()> {
        let name = name.into();
        if self.entity(target).is_none() {
            return Err(AttachmentError::Configuration(format!(
                "Composition {} targets an unknown entity",
                name
            )));
        }

        let entity = self.entities.get_mut(parent.0).ok_or_else(|| {
            AttachmentError::Configuration(format!(
                "Composition {} declared on an unknown entity",
                name
            ))
        })?;

        if entity.compositions.iter().any(|c| c.name == name) {
            return Err(AttachmentError::Configuration(format!(
                "Composition {}.{} is declared twice",
                entity.name, name
            )));
        }

        entity.compositions.push(Composition { name, target });
        Ok(())
    }

    /// Build a graph from a JSON document:
    /// `{ "entities": [ { "name", "media", "compositions": [ { "name", "target" } ] } ] }`
    pub fn from_json(json: &str) -> AttachmentResult<Self> {
        let document: GraphDocument = serde_json::from_str(json)?;
        let mut graph = EntityGraph::new();

        for entity in &document.entities {
            graph.add_entity(entity.name.clone(), entity.media)?;
        }

        for entity in &document.entities {
            let parent = graph.by_name[&entity.name];
            for composition in &entity.compositions {
                let target = graph.find(&composition.target).ok_or_else(|| {
                    AttachmentError::Configuration(format!(
                        "Composition {}.{} targets unknown entity {}",
                        entity.name, composition.name, composition.target
                    ))
                })?;
                graph.add_composition(parent, composition.name.clone(), target)?;
            }
        }

        Ok(graph)
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityModel> {
        self.entities.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityModel)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(idx, entity)| (EntityId(idx), entity))
    }

    /// Attachment queries for one entity
    pub fn attachments(&self, id: EntityId) -> AttachmentCapabilities<'_> {
        AttachmentCapabilities::new(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut graph = EntityGraph::new();
        graph.add_entity("Books", false).unwrap();
        assert!(graph.add_entity("Books", false).is_err());
    }

    #[test]
    fn test_duplicate_composition_rejected() {
        let mut graph = EntityGraph::new();
        let books = graph.add_entity("Books", false).unwrap();
        let files = graph.add_entity("Files", true).unwrap();
        graph.add_composition(books, "attachments", files).unwrap();
        assert!(graph.add_composition(books, "attachments", files).is_err());
    }

    #[test]
    fn test_from_json_keeps_declaration_order() {
        let graph = EntityGraph::from_json(
            r#"{
                "entities": [
                    { "name": "Books", "compositions": [
                        { "name": "covers", "target": "Media" },
                        { "name": "chapters", "target": "Chapters" }
                    ] },
                    { "name": "Chapters" },
                    { "name": "Media", "media": true }
                ]
            }"#,
        )
        .unwrap();

        let books = graph.find("Books").unwrap();
        let names: Vec<_> = graph
            .entity(books)
            .unwrap()
            .compositions
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["covers", "chapters"]);
        assert!(graph.entity(graph.find("Media").unwrap()).unwrap().is_media);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_from_json_rejects_unknown_target() {
        let result = EntityGraph::from_json(
            r#"{ "entities": [ { "name": "Books", "compositions": [ { "name": "x", "target": "Nope" } ] } ] }"#,
        );
        assert!(matches!(result, Err(AttachmentError::Configuration(_))));
    }

    #[test]
    fn test_path_display_joins_segments() {
        let path = AttachmentPath::from(vec!["chapters".to_string(), "figures".to_string()]);
        assert_eq!(path.to_string(), "chapters.figures");
        assert_eq!(path.len(), 2);
    }
}
