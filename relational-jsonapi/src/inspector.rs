//! Inference of the fields and relationships of every entity in a schema.
//!
//! The [`Inspector`] turns a [`SchemaSnapshot`] into one [`EntityInfo`] record per graph node. A
//! record sorts every field the entity exposes into one of three [`Field`] categories:
//! * _own_ fields are the scalar attributes stored on the entity, including the identity field,
//! * _to-one_ fields are the relations the entity holds, each leading to exactly one instance of
//!   the related entity,
//! * _to-many_ fields are collections: the reverse views of other entities' to-one relations and
//!   both sides of every many-to-many relation.
//!
//! Inheritance makes this more subtle than reading declarations. Every concrete descendant of an
//! entity inherits the parent's relations, so the same logical relation shows up once per level of
//! the chain. The inspector groups these candidates by the relation they came from and keeps one
//! entity per lineage, according to the configured [`InheritedEdgePolicy`].
//!
//! Finally, each record lists its _auth paths_: the relationship paths from the entity to the
//! _principal_ entity (the type of the authenticated subject), which the resource layer ORs
//! together into an authorization filter. See [`EntityInfo::auth_user_paths`].

use crate::schema::{EntityName, SchemaError, SchemaSnapshot, UnknownEntitySnafu};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use snafu::OptionExt;
use std::collections::{BTreeMap, BTreeSet};

mod auth_paths;
mod extract;

pub(crate) use auth_paths::compute_auth_paths;

use extract::Extractor;

/// A field of an entity, as seen by clients.
///
/// Two fields are interchangeable if they have the same name, category and related entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// A scalar attribute.
    Own { name: String },
    /// A reference to exactly one instance of `related_entity`.
    ToOne {
        name: String,
        related_entity: EntityName,
    },
    /// A collection of instances of `related_entity`.
    ToMany {
        name: String,
        related_entity: EntityName,
    },
}

/// The category of a [`Field`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    Own,
    ToOne,
    ToMany,
}

impl Field {
    pub fn own(name: impl Into<String>) -> Self {
        Self::Own { name: name.into() }
    }

    pub fn to_one(name: impl Into<String>, related_entity: impl Into<EntityName>) -> Self {
        Self::ToOne {
            name: name.into(),
            related_entity: related_entity.into(),
        }
    }

    pub fn to_many(name: impl Into<String>, related_entity: impl Into<EntityName>) -> Self {
        Self::ToMany {
            name: name.into(),
            related_entity: related_entity.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Own { name } | Self::ToOne { name, .. } | Self::ToMany { name, .. } => name,
        }
    }

    /// The entity at the other end of a relation, or [`None`] for an own field.
    pub fn related_entity(&self) -> Option<&EntityName> {
        match self {
            Self::Own { .. } => None,
            Self::ToOne { related_entity, .. } | Self::ToMany { related_entity, .. } => {
                Some(related_entity)
            }
        }
    }

    pub fn category(&self) -> FieldCategory {
        match self {
            Self::Own { .. } => FieldCategory::Own,
            Self::ToOne { .. } => FieldCategory::ToOne,
            Self::ToMany { .. } => FieldCategory::ToMany,
        }
    }
}

/// The declared relation underlying an edge of the relationship graph.
///
/// A relation is identified by the concrete entity whose table holds it and its declared name.
/// Both the forward edge and every reverse view of a relation share the same identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RelationId {
    pub(crate) holder: EntityName,
    pub(crate) field: String,
}

/// A relation field of an entity together with the relation it traverses.
#[derive(Clone, Debug)]
pub(crate) struct Edge {
    pub(crate) field: Field,
    pub(crate) relation: RelationId,
}

/// Everything the inspector knows about one entity.
#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq, Eq)]
pub struct EntityInfo {
    pub fields_own: Vec<Field>,
    pub fields_to_one: Vec<Field>,
    pub fields_to_many: Vec<Field>,
    /// Relationship paths from this entity to the principal.
    ///
    /// The principal itself has the single, empty path. An entity with no paths cannot be
    /// accessed by anyone.
    pub auth_user_paths: Vec<String>,
    pub is_principal: bool,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub(crate) edges: Vec<Edge>,
}

impl EntityInfo {
    /// All relation fields, to-one first.
    pub fn relations(&self) -> impl Iterator<Item = &Field> {
        self.fields_to_one.iter().chain(&self.fields_to_many)
    }
}

/// Which entity to keep when a relation is inherited by several levels of an inheritance chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritedEdgePolicy {
    /// Keep the most specific entity of each lineage.
    #[default]
    MostDerived,
    /// Keep the entity which declares the relation.
    Declaring,
}

/// Configuration of the [`Inspector`].
#[derive(Clone, Debug, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct InspectorConfig {
    /// The separator between field names in an auth path.
    #[derivative(Default(value = "String::from(\"__\")"))]
    pub path_separator: String,
    pub inherited_edges: InheritedEdgePolicy,
    /// The longest auth path to search for.
    ///
    /// The number of paths can grow exponentially in dense relationship graphs. Without a limit,
    /// every path is enumerated.
    pub max_auth_path_depth: Option<usize>,
}

impl InspectorConfig {
    pub fn path_separator(mut self, separator: impl Into<String>) -> Self {
        self.path_separator = separator.into();
        self
    }

    pub fn inherited_edges(mut self, policy: InheritedEdgePolicy) -> Self {
        self.inherited_edges = policy;
        self
    }

    pub fn max_auth_path_depth(mut self, depth: usize) -> Self {
        self.max_auth_path_depth = Some(depth);
        self
    }
}

/// Builds the relationship graph of a schema.
#[derive(Clone, Copy, Debug)]
pub struct Inspector<'a> {
    schema: &'a SchemaSnapshot,
    config: &'a InspectorConfig,
}

impl<'a> Inspector<'a> {
    pub fn new(schema: &'a SchemaSnapshot, config: &'a InspectorConfig) -> Self {
        Self { schema, config }
    }

    /// Compute the [`EntityInfo`] of every entity, with auth paths leading to `principal`.
    pub fn inspect(&self, principal: &str) -> Result<Inspection, SchemaError> {
        let principal_def = self.schema.get(principal).context(UnknownEntitySnafu {
            entity: principal,
            referenced_by: "principal designation",
        })?;
        // A proxy principal stands for its concrete entity.
        let principal = if principal_def.is_proxy() {
            self.schema.concrete(principal)?.name.clone()
        } else {
            principal_def.name.clone()
        };

        let extractor = Extractor::new(self.schema, self.config.inherited_edges);
        let mut entities = BTreeMap::new();
        for def in self.schema.concrete_entities() {
            let name = def.name.as_str();
            let to_one = extractor.fields_to_one(name)?;
            let to_many = extractor.fields_to_many(name)?;
            let info = EntityInfo {
                fields_own: extractor.fields_own(name),
                fields_to_one: to_one.iter().map(|edge| edge.field.clone()).collect(),
                fields_to_many: to_many.iter().map(|edge| edge.field.clone()).collect(),
                auth_user_paths: vec![],
                is_principal: self.schema.is_a(name, principal.as_str()),
                edges: to_one.into_iter().chain(to_many).collect(),
            };
            tracing::debug!(
                entity = name,
                own = info.fields_own.len(),
                to_one = info.fields_to_one.len(),
                to_many = info.fields_to_many.len(),
                "inspected entity"
            );
            entities.insert(def.name.clone(), info);
        }

        compute_auth_paths(&mut entities, self.config);

        for def in self.schema.entities().filter(|def| def.is_proxy()) {
            let concrete = self.schema.concrete(def.name.as_str())?;
            if let Some(info) = entities.get(&concrete.name).cloned() {
                entities.insert(def.name.clone(), info);
            }
        }

        let abstract_entities = self
            .schema
            .entities()
            .filter(|def| def.is_abstract())
            .map(|def| def.name.clone())
            .collect();
        tracing::info!(
            "inspected {} entities with principal {}",
            entities.len(),
            principal
        );
        Ok(Inspection {
            principal,
            entities,
            abstract_entities,
        })
    }
}

/// The [`EntityInfo`] of every entity in a schema.
///
/// An inspection is a read-only snapshot. When the schema changes, a new inspection is built from
/// scratch.
#[derive(Clone, Debug)]
pub struct Inspection {
    principal: EntityName,
    entities: BTreeMap<EntityName, EntityInfo>,
    abstract_entities: BTreeSet<EntityName>,
}

impl Inspection {
    /// The entity designated as the authenticated subject.
    pub fn principal(&self) -> &EntityName {
        &self.principal
    }

    pub fn get(&self, entity: &str) -> Option<&EntityInfo> {
        self.entities.get(entity)
    }

    /// Look up the record of a graph node.
    ///
    /// Unlike [`get`](Self::get), this distinguishes abstract entities, which exist in the schema
    /// but are never graph nodes, from entities which do not exist at all.
    pub fn info(&self, entity: &str) -> Result<&EntityInfo, SchemaError> {
        if let Some(info) = self.entities.get(entity) {
            return Ok(info);
        }
        if self.abstract_entities.contains(entity) {
            return Err(SchemaError::AbstractEntity {
                entity: entity.into(),
            });
        }
        Err(SchemaError::UnknownEntity {
            entity: entity.into(),
            referenced_by: "inspection lookup".into(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityName, &EntityInfo)> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
