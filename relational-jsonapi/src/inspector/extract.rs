//! Extraction of the fields of a single entity from the schema.

use super::{Edge, Field, InheritedEdgePolicy, RelationId};
use crate::schema::{EntityDef, RelationDef, SchemaError, SchemaSnapshot};
use itertools::Itertools;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RelationKind {
    ToOne,
    ManyToMany,
}

impl RelationKind {
    fn declared(self, def: &EntityDef) -> &[RelationDef] {
        match self {
            Self::ToOne => &def.to_one,
            Self::ManyToMany => &def.many_to_many,
        }
    }
}

/// A relation visible to some entity, along with the concrete entity holding it.
///
/// Relations declared on an abstract entity are held by the first concrete entity below it in the
/// inheritance chain.
#[derive(Clone, Copy, Debug)]
struct Declared<'a> {
    relation: &'a RelationDef,
    holder: &'a EntityDef,
}

impl<'a> Declared<'a> {
    fn id(&self) -> RelationId {
        RelationId {
            holder: self.holder.name.clone(),
            field: self.relation.name.clone(),
        }
    }
}

/// An entity which might be on the other side of a to-many edge.
#[derive(Clone, Debug)]
struct Candidate<'a> {
    name: String,
    related: &'a EntityDef,
    relation: RelationId,
}

pub(super) struct Extractor<'a> {
    schema: &'a SchemaSnapshot,
    policy: InheritedEdgePolicy,
}

impl<'a> Extractor<'a> {
    pub(super) fn new(schema: &'a SchemaSnapshot, policy: InheritedEdgePolicy) -> Self {
        Self { schema, policy }
    }

    /// The identity and every serializable scalar field of `entity`, root of the lineage first.
    pub(super) fn fields_own(&self, entity: &str) -> Vec<Field> {
        let id = self.schema.identity_field(entity);
        std::iter::once(Field::own(id))
            .chain(
                self.schema
                    .lineage(entity)
                    .into_iter()
                    .flat_map(|def| &def.fields)
                    .filter(|field| field.serialize && field.name != id)
                    .map(|field| Field::own(&field.name)),
            )
            .unique()
            .collect()
    }

    /// Every to-one relation declared on `entity` or inherited by it.
    pub(super) fn fields_to_one(&self, entity: &str) -> Result<Vec<Edge>, SchemaError> {
        let edges = self
            .declared(entity, RelationKind::ToOne)
            .into_iter()
            .map(|declared| {
                let target = self.schema.concrete(declared.relation.target.as_str())?;
                Ok(Edge {
                    field: Field::to_one(&declared.relation.name, &target.name),
                    relation: declared.id(),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(edges
            .into_iter()
            .unique_by(|edge| edge.field.clone())
            .collect())
    }

    /// The reverse views of relations targeting `entity`, plus its own many-to-many relations.
    ///
    /// Relations targeting a concrete ancestor of `entity` also target `entity`, since its rows are
    /// rows of the ancestor.
    pub(super) fn fields_to_many(&self, entity: &str) -> Result<Vec<Edge>, SchemaError> {
        let targets = self
            .schema
            .lineage(entity)
            .into_iter()
            .filter(|def| def.is_concrete())
            .map(|def| def.name.as_str())
            .collect::<HashSet<_>>();

        // A relation from an entity to itself has no reverse view on that entity. Relations
        // between different levels of one hierarchy still do.
        let mut candidates = vec![];
        for other in self.schema.concrete_entities() {
            for kind in [RelationKind::ToOne, RelationKind::ManyToMany] {
                for declared in self.declared(other.name.as_str(), kind) {
                    let target = self.schema.concrete(declared.relation.target.as_str())?;
                    if other.name == entity && target.name == entity {
                        continue;
                    }
                    if targets.contains(target.name.as_str()) {
                        candidates.push(Candidate {
                            name: self.reverse_name(&declared),
                            related: other,
                            relation: declared.id(),
                        });
                    }
                }
            }
        }

        let mut edges = self
            .prune(entity, candidates)
            .into_iter()
            .map(|candidate| Edge {
                field: Field::to_many(candidate.name, &candidate.related.name),
                relation: candidate.relation,
            })
            .collect::<Vec<_>>();
        for declared in self.declared(entity, RelationKind::ManyToMany) {
            let target = self.schema.concrete(declared.relation.target.as_str())?;
            edges.push(Edge {
                field: Field::to_many(&declared.relation.name, &target.name),
                relation: declared.id(),
            });
        }
        Ok(edges
            .into_iter()
            .unique_by(|edge| edge.field.clone())
            .collect())
    }

    fn declared(&self, entity: &str, kind: RelationKind) -> Vec<Declared<'a>> {
        let lineage = self.schema.lineage(entity);
        let mut declared = vec![];
        for (i, &def) in lineage.iter().enumerate() {
            let Some(&holder) = lineage[i..].iter().find(|def| def.is_concrete()) else {
                continue;
            };
            declared.extend(
                kind.declared(def)
                    .iter()
                    .map(|relation| Declared { relation, holder }),
            );
        }
        declared
    }

    fn reverse_name(&self, declared: &Declared) -> String {
        let class = self.schema.canonical_name(declared.holder.name.as_str());
        match &declared.relation.related_name {
            Some(template) => template.replace("{class}", &class).replace(
                "{namespace}",
                declared.holder.namespace.as_deref().unwrap_or_default(),
            ),
            None => format!("{}_set", class),
        }
    }

    /// Keep one candidate per lineage for each underlying relation.
    ///
    /// Candidates for the same relation whose entities are not ancestors of one another are all
    /// kept, even if they end up with the same name.
    fn prune(&self, entity: &str, candidates: Vec<Candidate<'a>>) -> Vec<Candidate<'a>> {
        let superseded = |candidate: &Candidate, other: &Candidate| {
            let (candidate, other) = (candidate.related.name.as_str(), other.related.name.as_str());
            match self.policy {
                InheritedEdgePolicy::MostDerived => self.schema.is_descendant(other, candidate),
                InheritedEdgePolicy::Declaring => self.schema.is_descendant(candidate, other),
            }
        };
        let (kept, dropped): (Vec<_>, Vec<_>) = candidates.iter().partition(|candidate| {
            !candidates.iter().any(|other| {
                other.relation == candidate.relation && superseded(*candidate, other)
            })
        });
        for candidate in dropped {
            tracing::debug!(
                entity,
                name = %candidate.name,
                related = %candidate.related.name,
                "dropping inherited duplicate of to-many edge"
            );
        }
        kept.into_iter().cloned().collect()
    }
}
