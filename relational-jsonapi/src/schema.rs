//! Description of the entity types an application persists.
//!
//! The rest of this crate never talks to a database. Instead, the host application describes its
//! data model once, as a [`SchemaSnapshot`], and every other component works over that immutable
//! value. A snapshot is a list of [`EntityDef`]s, each of which declares:
//! * the scalar fields stored directly on the entity, each with a flag saying whether it may be
//!   exposed to clients,
//! * the to-one relations the entity holds (foreign keys), with an optional name for the reverse
//!   view of the relation on the target,
//! * the many-to-many relations the entity declares, again with an optional reverse name,
//! * the entity's position in an inheritance chain: an optional parent and a [`EntityKind`].
//!
//! Inheritance follows the familiar ORM conventions. An [`Abstract`](EntityKind::Abstract) entity
//! is never a node of the relationship graph; its declarations are merged into each concrete
//! descendant. A [`Concrete`](EntityKind::Concrete) entity with a concrete parent extends the
//! parent's table, so it sees every field of the parent and adds its own. A
//! [`Proxy`](EntityKind::Proxy) is an alias for its parent which declares nothing of its own.
//!
//! Snapshots can be built by hand with [`SchemaBuilder`], derived from Rust structs with the
//! [`macro@Entity`] derive macro, or deserialized from JSON with [`SchemaSnapshot::from_json`].

use convert_case::{Case, Casing};
use derivative::Derivative;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

pub use relational_jsonapi_derive::Entity;

/// Errors in the definition of a schema.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SchemaError {
    #[snafu(display("entity {} is defined more than once", entity))]
    DuplicateEntity { entity: EntityName },

    #[snafu(display("entity {} is not part of the schema (referenced by {})", entity, referenced_by))]
    UnknownEntity {
        entity: EntityName,
        referenced_by: String,
    },

    #[snafu(display("entity {} is abstract and cannot be used as a graph node", entity))]
    AbstractEntity { entity: EntityName },

    #[snafu(display("relation {}.{} targets abstract entity {}", owner, relation, target))]
    AbstractTarget {
        owner: EntityName,
        relation: String,
        target: EntityName,
    },

    #[snafu(display("proxy entity {} is invalid: {}", entity, reason))]
    InvalidProxy { entity: EntityName, reason: String },

    #[snafu(display("abstract entity {} cannot inherit from concrete entity {}", entity, parent))]
    AbstractWithConcreteParent {
        entity: EntityName,
        parent: EntityName,
    },

    #[snafu(display("the inheritance chain of {} contains a cycle", entity))]
    InheritanceCycle { entity: EntityName },

    #[snafu(display("malformed schema document: {}", source))]
    Json { source: serde_json::Error },
}

/// The stable name of an entity type, like `Post`.
#[derive(
    Clone, Debug, Display, From, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct EntityName(String);

impl EntityName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityName {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

impl From<&EntityName> for EntityName {
    fn from(name: &EntityName) -> Self {
        name.clone()
    }
}

impl Borrow<str> for EntityName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for EntityName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntityName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// How an entity participates in the relationship graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// An entity with its own table and its own node in the graph.
    #[default]
    Concrete,
    /// A base which only contributes declarations to its concrete descendants.
    Abstract,
    /// An alias for its parent, sharing the parent's graph node.
    Proxy,
}

/// A scalar attribute of an entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarDef {
    pub name: String,
    /// Whether the field may be exposed to clients.
    #[serde(default = "serializable")]
    pub serialize: bool,
}

fn serializable() -> bool {
    true
}

/// A relation declared on an entity, either to-one or many-to-many.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub target: EntityName,
    /// The name of the reverse view of this relation on `target`.
    ///
    /// The placeholders `{class}` and `{namespace}` are replaced with the canonical name and the
    /// namespace of the concrete entity holding the relation. This allows an abstract base to
    /// declare relations whose reverse names differ in each concrete descendant.
    #[serde(default)]
    pub related_name: Option<String>,
}

impl RelationDef {
    pub fn new(name: impl Into<String>, target: impl Into<EntityName>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            related_name: None,
        }
    }

    pub fn related_name(mut self, related_name: impl Into<String>) -> Self {
        self.related_name = Some(related_name.into());
        self
    }
}

impl<N: Into<String>, T: Into<EntityName>> From<(N, T)> for RelationDef {
    fn from((name, target): (N, T)) -> Self {
        Self::new(name, target)
    }
}

/// The declaration of a single entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: EntityName,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub parent: Option<EntityName>,
    /// The identity field, if declared at this level of the inheritance chain.
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<ScalarDef>,
    #[serde(default)]
    pub to_one: Vec<RelationDef>,
    #[serde(default)]
    pub many_to_many: Vec<RelationDef>,
}

impl EntityDef {
    fn new(name: impl Into<EntityName>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            id_field: None,
            namespace: None,
            description: None,
            fields: vec![],
            to_one: vec![],
            many_to_many: vec![],
        }
    }

    pub fn concrete(name: impl Into<EntityName>) -> Self {
        Self::new(name, EntityKind::Concrete)
    }

    pub fn abstract_entity(name: impl Into<EntityName>) -> Self {
        Self::new(name, EntityKind::Abstract)
    }

    pub fn proxy(name: impl Into<EntityName>, parent: impl Into<EntityName>) -> Self {
        Self::new(name, EntityKind::Proxy).parent(parent)
    }

    pub fn parent(mut self, parent: impl Into<EntityName>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn id(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(ScalarDef {
            name: name.into(),
            serialize: true,
        });
        self
    }

    /// Declare a scalar field which is never exposed to clients.
    pub fn private_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(ScalarDef {
            name: name.into(),
            serialize: false,
        });
        self
    }

    pub fn to_one(mut self, relation: impl Into<RelationDef>) -> Self {
        self.to_one.push(relation.into());
        self
    }

    pub fn many_to_many(mut self, relation: impl Into<RelationDef>) -> Self {
        self.many_to_many.push(relation.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == EntityKind::Abstract
    }

    pub fn is_proxy(&self) -> bool {
        self.kind == EntityKind::Proxy
    }

    pub fn is_concrete(&self) -> bool {
        self.kind == EntityKind::Concrete
    }
}

/// A Rust type which describes an entity in the schema.
///
/// This trait is usually implemented with the [`macro@Entity`] derive macro.
pub trait Entity: 'static {
    /// The name of the entity type.
    const NAME: &'static str;

    /// Describe this entity's fields, relations and position in the inheritance chain.
    fn describe() -> EntityDef;
}

/// A marker type used in the definition of an [`Entity`] to declare a to-one relation.
#[derive(Derivative)]
#[derivative(
    Clone(bound = ""),
    Copy(bound = ""),
    Debug(bound = ""),
    Default(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    Hash(bound = "")
)]
pub struct ToOne<T: Entity>(PhantomData<fn(&T)>);

/// A marker type used in the definition of an [`Entity`] to declare a many-to-many relation.
#[derive(Derivative)]
#[derivative(
    Clone(bound = ""),
    Copy(bound = ""),
    Debug(bound = ""),
    Default(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    Hash(bound = "")
)]
pub struct Many<T: Entity>(PhantomData<fn(&T)>);

/// Collects entity definitions and validates them into a [`SchemaSnapshot`].
#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDef>,
}

impl SchemaBuilder {
    /// Add the entity described by the Rust type `T`.
    pub fn entity<T: Entity>(self) -> Self {
        self.def(T::describe())
    }

    /// Add an entity definition.
    pub fn def(mut self, def: EntityDef) -> Self {
        self.entities.push(def);
        self
    }

    pub fn build(self) -> Result<SchemaSnapshot, SchemaError> {
        SchemaSnapshot::try_from(self.entities)
    }
}

/// An immutable, validated description of every entity type in an application.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<EntityDef>", into = "Vec<EntityDef>")]
pub struct SchemaSnapshot {
    entities: Vec<EntityDef>,
    index: HashMap<EntityName, usize>,
}

impl TryFrom<Vec<EntityDef>> for SchemaSnapshot {
    type Error = SchemaError;

    fn try_from(entities: Vec<EntityDef>) -> Result<Self, Self::Error> {
        let mut index = HashMap::new();
        for (i, def) in entities.iter().enumerate() {
            ensure!(
                index.insert(def.name.clone(), i).is_none(),
                DuplicateEntitySnafu { entity: &def.name }
            );
        }
        let schema = Self { entities, index };
        for def in &schema.entities {
            schema.validate(def)?;
        }
        tracing::debug!("validated schema with {} entities", schema.entities.len());
        Ok(schema)
    }
}

impl From<SchemaSnapshot> for Vec<EntityDef> {
    fn from(schema: SchemaSnapshot) -> Self {
        schema.entities
    }
}

impl SchemaSnapshot {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Load a schema from a JSON array of entity definitions.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        serde_json::from_str::<Vec<EntityDef>>(json)
            .context(JsonSnafu)?
            .try_into()
    }

    pub fn get(&self, name: &str) -> Option<&EntityDef> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// All entities, in definition order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.iter()
    }

    /// The entities which are nodes of the relationship graph in their own right.
    pub fn concrete_entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.iter().filter(|def| def.is_concrete())
    }

    /// The proper ancestors of `name`, nearest first.
    pub fn ancestors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a EntityDef> + 'a {
        let mut next = self.get(name).and_then(|def| def.parent.as_ref());
        std::iter::from_fn(move || {
            let def = self.get(next?.as_str())?;
            next = def.parent.as_ref();
            Some(def)
        })
    }

    /// The inheritance chain ending at `name`, root first, including `name` itself.
    pub fn lineage(&self, name: &str) -> Vec<&EntityDef> {
        let Some(def) = self.get(name) else { return vec![]; };
        let mut lineage = self.ancestors(name).collect::<Vec<_>>();
        lineage.reverse();
        lineage.push(def);
        lineage
    }

    /// Is `name` a proper descendant of `ancestor`?
    pub fn is_descendant(&self, name: &str, ancestor: &str) -> bool {
        self.ancestors(name).any(|def| def.name == ancestor)
    }

    /// Is `name` either `ancestor` itself or one of its descendants?
    pub fn is_a(&self, name: &str, ancestor: &str) -> bool {
        name == ancestor || self.is_descendant(name, ancestor)
    }

    /// Resolve `name` to the concrete entity whose graph node it uses.
    ///
    /// Proxies resolve to their nearest concrete ancestor. Abstract entities have no graph node, so
    /// asking for one is an error.
    pub fn concrete(&self, name: &str) -> Result<&EntityDef, SchemaError> {
        let mut def = self.get(name).context(UnknownEntitySnafu {
            entity: name,
            referenced_by: "graph lookup",
        })?;
        while def.is_proxy() {
            let Some(parent) = def.parent.as_ref().and_then(|p| self.get(p.as_str())) else {
                return InvalidProxySnafu {
                    entity: &def.name,
                    reason: "missing parent",
                }
                .fail();
            };
            def = parent;
        }
        ensure!(!def.is_abstract(), AbstractEntitySnafu { entity: &def.name });
        Ok(def)
    }

    /// The default identifier of an entity: its lowercased type name, without separators.
    ///
    /// Proxies use the name of their concrete entity, so that an alias never changes the names
    /// derived from the entity it stands for.
    pub fn canonical_name(&self, name: &str) -> String {
        let name = match self.concrete(name) {
            Ok(def) => def.name.as_str(),
            Err(_) => name,
        };
        name.to_case(Case::Flat)
    }

    /// The name of the identity field of `name`.
    ///
    /// The identity is the first one declared along the inheritance chain, starting from the
    /// root. If none is declared, it is `id`.
    pub fn identity_field(&self, name: &str) -> &str {
        self.lineage(name)
            .into_iter()
            .find_map(|def| def.id_field.as_deref())
            .unwrap_or("id")
    }

    fn validate(&self, def: &EntityDef) -> Result<(), SchemaError> {
        if let Some(parent) = &def.parent {
            let parent_def = self.get(parent.as_str()).context(UnknownEntitySnafu {
                entity: parent,
                referenced_by: def.name.to_string(),
            })?;
            ensure!(
                !def.is_abstract() || parent_def.is_abstract(),
                AbstractWithConcreteParentSnafu {
                    entity: &def.name,
                    parent,
                }
            );
            ensure!(
                !def.is_proxy() || !parent_def.is_abstract(),
                InvalidProxySnafu {
                    entity: &def.name,
                    reason: "the parent of a proxy must not be abstract",
                }
            );
        }
        if def.is_proxy() {
            ensure!(
                def.parent.is_some(),
                InvalidProxySnafu {
                    entity: &def.name,
                    reason: "a proxy needs a parent",
                }
            );
            ensure!(
                def.fields.is_empty()
                    && def.to_one.is_empty()
                    && def.many_to_many.is_empty()
                    && def.id_field.is_none(),
                InvalidProxySnafu {
                    entity: &def.name,
                    reason: "a proxy cannot declare fields",
                }
            );
        }

        let mut seen = HashSet::new();
        let mut next = Some(def);
        while let Some(current) = next {
            ensure!(
                seen.insert(&current.name),
                InheritanceCycleSnafu { entity: &def.name }
            );
            next = current.parent.as_ref().and_then(|p| self.get(p.as_str()));
        }

        for relation in def.to_one.iter().chain(&def.many_to_many) {
            let target = self
                .get(relation.target.as_str())
                .context(UnknownEntitySnafu {
                    entity: &relation.target,
                    referenced_by: format!("{}.{}", def.name, relation.name),
                })?;
            ensure!(
                !target.is_abstract(),
                AbstractTargetSnafu {
                    owner: &def.name,
                    relation: &relation.name,
                    target: &relation.target,
                }
            );
        }
        Ok(())
    }
}
