//! The registry of resources exposed by an API.
//!
//! A [`Registry`] owns a [`SchemaSnapshot`], the [`Inspection`] of that snapshot for a fixed
//! principal, and every registered [`Resource`]. Registration is all-or-nothing: a resource whose
//! name collides with an existing one, or whose presence would make some relation ambiguous, is
//! rejected and the registry is left exactly as it was.
//!
//! Mutation goes through `&mut self`. A registry shared between threads must be wrapped in a lock
//! by the application, or built once at startup and shared read-only.

use crate::{
    auth::AuthFilter,
    inspector::{Inspection, Inspector, InspectorConfig},
    request::IncludePath,
    resource::{merge_configs, Resource, ResourceConfig, ResourceDescriptor},
    schema::{EntityName, SchemaError, SchemaSnapshot},
};
use snafu::{OptionExt, Snafu};
use std::collections::HashMap;
use std::sync::Arc;

/// Errors encountered while registering or looking up resources.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("resource name {} conflicts with existing resource {}", name, existing))]
    NameConflict { name: String, existing: String },
    #[snafu(display(
        "relation {} of resource {} is ambiguous between fields {}",
        key,
        resource,
        fields.join(", ")
    ))]
    AmbiguousRelation {
        resource: String,
        key: String,
        fields: Vec<String>,
    },
    #[snafu(display("resource must have a name or an entity"))]
    MissingName,
    #[snafu(display("no resource named {}", name))]
    UnknownResource { name: String },
    #[snafu(display("resource {} has no relation {}", resource, relation))]
    UnknownRelation { resource: String, relation: String },
    #[snafu(context(false), display("{}", source))]
    Schema { source: SchemaError },
}

/// An `include` path resolved through the relations of a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inclusion {
    /// The relation keys as requested by the client.
    pub path: Vec<String>,
    /// The underlying entity fields, one per key.
    pub fields: Vec<String>,
    /// The fields joined by the path separator, in the same form as an auth path.
    pub query: String,
    /// The resource at the end of the path.
    pub resource: String,
}

/// The resources of one API.
#[derive(Clone, Debug)]
pub struct Registry {
    schema: Arc<SchemaSnapshot>,
    config: InspectorConfig,
    principal: EntityName,
    inspection: Arc<Inspection>,
    resources: Vec<Resource>,
}

impl Registry {
    /// Create an empty registry, inspecting `schema` with `principal` as the authenticated subject.
    pub fn new(schema: Arc<SchemaSnapshot>, principal: impl Into<EntityName>) -> Result<Self, Error> {
        Self::with_config(schema, principal, InspectorConfig::default())
    }

    pub fn with_config(
        schema: Arc<SchemaSnapshot>,
        principal: impl Into<EntityName>,
        config: InspectorConfig,
    ) -> Result<Self, Error> {
        let principal = principal.into();
        let inspection = Inspector::new(&schema, &config).inspect(principal.as_str())?;
        Ok(Self {
            schema,
            config,
            principal,
            inspection: Arc::new(inspection),
            resources: vec![],
        })
    }

    pub fn schema(&self) -> &Arc<SchemaSnapshot> {
        &self.schema
    }

    pub fn inspection(&self) -> &Inspection {
        &self.inspection
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Add a resource.
    ///
    /// # Errors
    ///
    /// Fails, leaving the registry unchanged, if
    /// * the configuration has neither a name nor an entity
    /// * the entity is abstract or not in the schema
    /// * the name or plural name collides with the name or plural name of an existing resource
    /// * with the new resource present, some resource would expose two relations under the same
    ///   key
    pub fn register(&mut self, config: ResourceConfig) -> Result<&Resource, Error> {
        let resource = match Resource::new(config, &self.schema, &self.inspection) {
            Ok(resource) => resource,
            Err(err) => {
                tracing::warn!("rejected resource: {}", err);
                return Err(err);
            }
        };
        if let Err(err) = self.check_names(&resource) {
            tracing::warn!("rejected resource {}: {}", resource.name(), err);
            return Err(err);
        }

        // Adding a resource can expose relations in the descriptors of other resources, so every
        // descriptor is checked with the new resource in place.
        self.resources.push(resource);
        if let Err(err) = self.validate() {
            let rejected = self.resources.pop();
            tracing::warn!(
                "rejected resource {}: {}",
                rejected.as_ref().map_or("", Resource::name),
                err
            );
            return Err(err);
        }

        let resource = &self.resources[self.resources.len() - 1];
        tracing::info!(
            name = resource.name(),
            plural = resource.plural_name(),
            entity = ?resource.entity(),
            "registered resource"
        );
        Ok(resource)
    }

    /// Add a resource whose configuration is `config` with `overrides` applied on top.
    pub fn register_with(
        &mut self,
        config: ResourceConfig,
        overrides: ResourceConfig,
    ) -> Result<&Resource, Error> {
        self.register(merge_configs([config, overrides]))
    }

    fn check_names(&self, new: &Resource) -> Result<(), Error> {
        for existing in &self.resources {
            if existing.name() == new.name()
                || existing.name() == new.plural_name()
                || existing.plural_name() == new.name()
            {
                return NameConflictSnafu {
                    name: new.name(),
                    existing: existing.name(),
                }
                .fail();
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        let resources = self.exposure_map();
        for resource in &self.resources {
            resource.describe(&resources)?;
        }
        Ok(())
    }

    /// Look up a resource by name.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|resource| resource.name() == name)
    }

    /// Every resource by name, in order of registration.
    pub fn resource_map(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources
            .iter()
            .map(|resource| (resource.name(), resource))
    }

    /// The resource exposing each entity.
    ///
    /// Virtual resources are not included. If several resources expose the same entity, the one
    /// registered last is used.
    pub fn model_resource_map(&self) -> HashMap<&EntityName, &Resource> {
        self.resources
            .iter()
            .filter_map(|resource| Some((resource.entity()?, resource)))
            .collect()
    }

    /// The resource through which each entity is reachable by relations.
    ///
    /// An entity without a resource of its own is reached through the resource of its nearest
    /// ancestor which has one, since its rows are rows of that ancestor.
    fn exposure_map(&self) -> HashMap<&EntityName, &Resource> {
        let resources = self.model_resource_map();
        self.schema
            .entities()
            .filter_map(|def| {
                let resource = std::iter::once(def)
                    .chain(self.schema.ancestors(def.name.as_str()))
                    .find_map(|def| resources.get(&def.name).copied())?;
                Some((&def.name, resource))
            })
            .collect()
    }

    /// Describe the fields of the resource `name` in terms of the other resources.
    pub fn descriptor(&self, name: &str) -> Result<ResourceDescriptor, Error> {
        let resource = self.resource(name).context(UnknownResourceSnafu { name })?;
        resource.describe(&self.exposure_map())
    }

    /// Describe every resource, in order of registration.
    pub fn descriptors(&self) -> Result<Vec<ResourceDescriptor>, Error> {
        let resources = self.exposure_map();
        self.resources
            .iter()
            .map(|resource| resource.describe(&resources))
            .collect()
    }

    /// Replace the schema.
    ///
    /// The schema is inspected from scratch and every resource is recomputed against it. If any
    /// resource is no longer valid, the registry keeps the old schema and returns the error.
    pub fn reload(&mut self, schema: Arc<SchemaSnapshot>) -> Result<(), Error> {
        let inspection = Inspector::new(&schema, &self.config).inspect(self.principal.as_str())?;
        let resources = self
            .resources
            .iter()
            .map(|resource| Resource::new(resource.config().clone(), &schema, &inspection))
            .collect::<Result<Vec<_>, _>>()?;
        let reloaded = Self {
            schema,
            config: self.config.clone(),
            principal: self.principal.clone(),
            inspection: Arc::new(inspection),
            resources,
        };
        reloaded.validate()?;

        *self = reloaded;
        tracing::info!(
            "reloaded schema with {} entities and {} resources",
            self.inspection.len(),
            self.resources.len()
        );
        Ok(())
    }

    /// Resolve `include` paths starting at the resource `name`.
    pub fn include_structure(
        &self,
        name: &str,
        includes: &[IncludePath],
    ) -> Result<Vec<Inclusion>, Error> {
        let start = self.resource(name).context(UnknownResourceSnafu { name })?;
        let resources = self.exposure_map();
        includes
            .iter()
            .map(|include| {
                let mut current = start;
                let mut fields = vec![];
                for key in include.iter() {
                    let descriptor = current.describe(&resources)?;
                    let field = descriptor
                        .relation(key)
                        .context(UnknownRelationSnafu {
                            resource: current.name(),
                            relation: key,
                        })?;
                    let related = field.related_resource.as_deref().unwrap_or_default();
                    current = self
                        .resource(related)
                        .context(UnknownResourceSnafu { name: related })?;
                    fields.push(field.name.clone());
                }
                Ok(Inclusion {
                    path: include.to_vec(),
                    query: fields.join(&self.config.path_separator),
                    fields,
                    resource: current.name().into(),
                })
            })
            .collect()
    }

    /// The filter selecting the rows of the resource `name` visible to `principal`.
    pub fn auth_filter<T: Clone>(
        &self,
        name: &str,
        principal: Option<T>,
    ) -> Result<AuthFilter<T>, Error> {
        let resource = self.resource(name).context(UnknownResourceSnafu { name })?;
        Ok(resource.auth_filter(principal, &self.config.path_separator))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        fixtures, init_logging,
        resource::FieldDescriptor,
        schema::{EntityDef, RelationDef},
    };
    use std::collections::BTreeMap;

    fn blog() -> Registry {
        let mut registry = Registry::new(Arc::new(fixtures::blog()), "User").unwrap();
        for entity in ["User", "Author", "Post", "Comment", "Tag"] {
            registry.register(ResourceConfig::for_entity(entity)).unwrap();
        }
        registry
    }

    #[test]
    fn test_static_assertions() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }

    #[test]
    fn test_name_conflict() {
        init_logging();

        let schema = SchemaSnapshot::builder()
            .def(EntityDef::concrete("User"))
            .def(EntityDef::concrete("Article").field("title"))
            .build()
            .unwrap();
        let mut registry = Registry::new(Arc::new(schema), "User").unwrap();
        registry
            .register(ResourceConfig::for_entity("Article").name("news"))
            .unwrap();

        let err = registry
            .register(ResourceConfig::virtual_resource("news"))
            .unwrap_err();
        assert!(matches!(err, Error::NameConflict { .. }), "{err}");
        assert_eq!(registry.resource_map().count(), 1);
        assert_eq!(
            registry.resource("news").unwrap().entity().unwrap(),
            "Article"
        );
    }

    #[test]
    fn test_plural_conflicts() {
        init_logging();

        let mut registry = Registry::new(Arc::new(fixtures::blog()), "User").unwrap();
        registry.register(ResourceConfig::for_entity("Post")).unwrap();

        // New plural equals existing singular.
        let err = registry
            .register(ResourceConfig::virtual_resource("pos").plural_name("post"))
            .unwrap_err();
        assert!(matches!(err, Error::NameConflict { .. }), "{err}");

        // New singular equals existing plural.
        let err = registry
            .register(ResourceConfig::virtual_resource("posts"))
            .unwrap_err();
        assert!(matches!(err, Error::NameConflict { .. }), "{err}");

        assert_eq!(
            registry.resource_map().map(|(name, _)| name).collect::<Vec<_>>(),
            ["post"]
        );
    }

    #[test]
    fn test_invalid_configs() {
        init_logging();

        let mut registry = Registry::new(Arc::new(fixtures::inheritance()), "User").unwrap();
        let err = registry
            .register(ResourceConfig::for_entity("AAbstract"))
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::Schema {
                    source: SchemaError::AbstractEntity { .. }
                }
            ),
            "{err}"
        );
        let err = registry
            .register(ResourceConfig::for_entity("Missing"))
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::Schema {
                    source: SchemaError::UnknownEntity { .. }
                }
            ),
            "{err}"
        );
        let err = registry.register(ResourceConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingName), "{err}");
        assert_eq!(registry.resource_map().count(), 0);
    }

    #[test]
    fn test_unknown_principal() {
        let err = Registry::new(Arc::new(fixtures::blog()), "Nobody").unwrap_err();
        assert!(matches!(err, Error::Schema { .. }), "{err}");
    }

    #[test]
    fn test_resource_meta() {
        init_logging();

        let mut registry = Registry::new(Arc::new(fixtures::inheritance()), "User").unwrap();
        let resource = registry
            .register_with(
                ResourceConfig::for_entity("B").description("a b"),
                ResourceConfig::default().name("test"),
            )
            .unwrap();
        assert_eq!(resource.name(), "test");
        assert_eq!(resource.plural_name(), "tests");
        assert_eq!(resource.description(), "a b");
        assert!(resource.is_model());
        assert!(resource.is_inherited());
        assert!(!resource.is_principal());

        let resource = registry.register(ResourceConfig::for_entity("AA")).unwrap();
        assert_eq!(resource.name(), "aa");
        assert!(!resource.is_inherited());

        let resource = registry.register(ResourceConfig::for_entity("User")).unwrap();
        assert!(resource.is_principal());

        let resource = registry
            .register(ResourceConfig::for_entity("BProxy"))
            .unwrap();
        assert_eq!(resource.name(), "bproxy");
        assert_eq!(resource.info().unwrap().auth_user_paths, ["user"]);
    }

    #[test]
    fn test_descriptor_keys() {
        init_logging();

        let schema = SchemaSnapshot::builder()
            .def(EntityDef::concrete("User"))
            .def(EntityDef::concrete("Author").field("name"))
            .def(
                EntityDef::concrete("Post")
                    .field("title")
                    .to_one(("author", "Author")),
            )
            .build()
            .unwrap();
        let mut registry = Registry::new(Arc::new(schema), "User").unwrap();
        registry.register(ResourceConfig::for_entity("Author")).unwrap();
        registry.register(ResourceConfig::for_entity("Post")).unwrap();

        let post = registry.descriptor("post").unwrap();
        assert_eq!(
            post.fields_to_one,
            BTreeMap::from([(
                "author".to_string(),
                FieldDescriptor::relation("author", "author")
            )])
        );
        assert_eq!(
            post.fields_own.keys().collect::<Vec<_>>(),
            ["id", "title"]
        );

        let author = registry.descriptor("author").unwrap();
        assert_eq!(
            author.fields_to_many,
            BTreeMap::from([(
                "posts".to_string(),
                FieldDescriptor::relation("post_set", "post")
            )])
        );
        assert_eq!(
            author.fields_own.keys().collect::<Vec<_>>(),
            ["id", "name"]
        );
        assert_eq!(author.relation("posts").unwrap().name, "post_set");

        let err = registry.descriptor("comment").unwrap_err();
        assert!(matches!(err, Error::UnknownResource { .. }), "{err}");
    }

    #[test]
    fn test_hidden_relations() {
        init_logging();

        let mut registry = Registry::new(Arc::new(fixtures::blog()), "User").unwrap();
        registry
            .register(ResourceConfig::for_entity("Comment"))
            .unwrap();

        // Neither posts nor users are exposed yet.
        let comment = registry.descriptor("comment").unwrap();
        assert!(comment.fields_to_one.is_empty());
        assert_eq!(
            comment.fields_own.keys().collect::<Vec<_>>(),
            ["body", "id"]
        );

        registry
            .register(ResourceConfig::for_entity("User").exclude(["comment_set"]))
            .unwrap();
        let comment = registry.descriptor("comment").unwrap();
        assert_eq!(
            comment.fields_to_one.keys().collect::<Vec<_>>(),
            ["user"]
        );
        let user = registry.descriptor("user").unwrap();
        assert!(user.fields_to_many.is_empty());
        // Private fields are never exposed.
        assert_eq!(user.fields_own.keys().collect::<Vec<_>>(), ["id", "username"]);
        assert_eq!(user.auth_user_paths, [""]);
    }

    #[test]
    fn test_include_exclude() {
        init_logging();

        let mut registry = Registry::new(Arc::new(fixtures::blog()), "User").unwrap();
        registry
            .register(
                ResourceConfig::for_entity("User")
                    .include(["display_name"])
                    .exclude(["username"]),
            )
            .unwrap();
        let user = registry.descriptor("user").unwrap();
        assert_eq!(
            user.fields_own.keys().collect::<Vec<_>>(),
            ["display_name", "id"]
        );
    }

    #[test]
    fn test_ambiguous_key() {
        init_logging();

        let schema = SchemaSnapshot::builder()
            .def(EntityDef::concrete("User"))
            .def(
                EntityDef::concrete("Review")
                    .to_one(RelationDef::new("author", "User").related_name("authored"))
                    .to_one(RelationDef::new("reviewer", "User").related_name("reviewed")),
            )
            .build()
            .unwrap();
        let mut registry = Registry::new(Arc::new(schema.clone()), "User").unwrap();
        registry.register(ResourceConfig::for_entity("Review")).unwrap();

        // Exposing users makes both relations of a review visible under the same key.
        let err = registry
            .register(ResourceConfig::for_entity("User"))
            .unwrap_err();
        match err {
            Error::AmbiguousRelation { key, fields, .. } => {
                assert_eq!(key, "user");
                assert_eq!(fields, ["author", "reviewer"]);
            }
            err => panic!("expected ambiguous relation, got {err}"),
        }
        assert!(registry.resource("user").is_none());
        assert!(registry.descriptor("review").unwrap().fields_to_one.is_empty());

        // Hiding one of the relations makes the other unambiguous.
        let mut registry = Registry::new(Arc::new(schema), "User").unwrap();
        registry
            .register(ResourceConfig::for_entity("User").exclude(["authored"]))
            .unwrap();
        registry
            .register(ResourceConfig::for_entity("Review").exclude(["author"]))
            .unwrap();
        let review = registry.descriptor("review").unwrap();
        assert_eq!(review.relation("user").unwrap().name, "reviewer");
        let user = registry.descriptor("user").unwrap();
        assert_eq!(user.relation("reviews").unwrap().name, "reviewed");
    }

    #[test]
    fn test_ambiguous_reverse_name() {
        init_logging();

        // Unrelated subtypes share a declared reverse name.
        let schema = SchemaSnapshot::builder()
            .def(EntityDef::concrete("User"))
            .def(
                EntityDef::abstract_entity("Pet")
                    .to_one(RelationDef::new("owner", "User").related_name("pets")),
            )
            .def(EntityDef::concrete("Cat").parent("Pet"))
            .def(EntityDef::concrete("Dog").parent("Pet"))
            .build()
            .unwrap();
        let mut registry = Registry::new(Arc::new(schema), "User").unwrap();
        registry.register(ResourceConfig::for_entity("User")).unwrap();
        registry.register(ResourceConfig::for_entity("Cat")).unwrap();
        assert_eq!(
            registry.descriptor("user").unwrap().relation("cats").unwrap().name,
            "pets"
        );

        let err = registry
            .register(ResourceConfig::for_entity("Dog"))
            .unwrap_err();
        match err {
            Error::AmbiguousRelation { key, fields, .. } => {
                assert_eq!(key, "pets");
                assert_eq!(fields, ["cats", "dogs"]);
            }
            err => panic!("expected ambiguous relation, got {err}"),
        }
        assert!(registry.resource("dog").is_none());
        assert_eq!(registry.resource_map().count(), 2);
    }

    #[test]
    fn test_subtype_reached_through_ancestor() {
        init_logging();

        // Posts with pictures have no resource of their own, so the relation from authors is
        // exposed through the post resource.
        let registry = blog();
        let author = registry.descriptor("author").unwrap();
        assert_eq!(
            author.fields_to_many,
            BTreeMap::from([(
                "posts".to_string(),
                FieldDescriptor::relation("post_set", "post")
            )])
        );

        let mut registry = Registry::new(Arc::new(fixtures::inheritance()), "User").unwrap();
        registry.register(ResourceConfig::for_entity("A")).unwrap();
        registry.register(ResourceConfig::for_entity("AOne")).unwrap();
        let aone = registry.descriptor("aone").unwrap();
        assert_eq!(
            aone.fields_to_many,
            BTreeMap::from([("as".to_string(), FieldDescriptor::relation("a_set", "a"))])
        );
        let inclusions = registry
            .include_structure("aone", &[IncludePath::from(vec!["as".to_string()])])
            .unwrap();
        assert_eq!(inclusions[0].resource, "a");

        // Sibling subtypes behind one resource show a single relation.
        let schema = SchemaSnapshot::builder()
            .def(EntityDef::concrete("User"))
            .def(EntityDef::concrete("Pet").to_one(("owner", "User")))
            .def(EntityDef::concrete("Cat").parent("Pet"))
            .def(EntityDef::concrete("Dog").parent("Pet"))
            .build()
            .unwrap();
        let mut registry = Registry::new(Arc::new(schema), "User").unwrap();
        registry.register(ResourceConfig::for_entity("User")).unwrap();
        registry.register(ResourceConfig::for_entity("Pet")).unwrap();
        let user = registry.descriptor("user").unwrap();
        assert_eq!(
            user.fields_to_many,
            BTreeMap::from([(
                "pets".to_string(),
                FieldDescriptor::relation("pet_set", "pet")
            )])
        );
    }

    #[test]
    fn test_model_resource_map() {
        init_logging();

        let mut registry = blog();
        registry
            .register(ResourceConfig::for_entity("Post").name("article"))
            .unwrap();
        let resources = registry.model_resource_map();
        assert_eq!(resources.len(), 5);
        assert_eq!(resources[&EntityName::from("Post")].name(), "article");
        assert!(!resources.contains_key(&EntityName::from("PostWithPicture")));

        registry
            .register(ResourceConfig::virtual_resource("stats"))
            .unwrap();
        assert_eq!(registry.model_resource_map().len(), 5);
        assert_eq!(registry.resource_map().count(), 7);
    }

    #[test]
    fn test_include_structure() {
        init_logging();

        let registry = blog();
        let includes = [
            IncludePath::from(vec!["post".to_string(), "author".to_string()]),
            IncludePath::from(vec!["user".to_string()]),
        ];
        let inclusions = registry.include_structure("comment", &includes).unwrap();
        assert_eq!(
            inclusions,
            [
                Inclusion {
                    path: vec!["post".into(), "author".into()],
                    fields: vec!["post".into(), "author".into()],
                    query: "post__author".into(),
                    resource: "author".into(),
                },
                Inclusion {
                    path: vec!["user".into()],
                    fields: vec!["user".into()],
                    query: "user".into(),
                    resource: "user".into(),
                },
            ]
        );

        let err = registry
            .include_structure("comment", &[IncludePath::from(vec!["tags".to_string()])])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRelation { .. }), "{err}");
    }

    #[test]
    fn test_reload() {
        init_logging();

        let mut registry = blog();
        let before = registry.descriptors().unwrap();

        // A schema without tags cannot back the tag resource.
        let shrunk = SchemaSnapshot::builder()
            .def(EntityDef::concrete("User"))
            .build()
            .unwrap();
        let err = registry.reload(Arc::new(shrunk)).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }), "{err}");
        assert_eq!(registry.descriptors().unwrap(), before);

        // Adding a field shows up in the descriptors after a reload.
        let mut defs = Vec::from(fixtures::blog());
        for def in &mut defs {
            if def.name == "Tag" {
                *def = def.clone().field("color");
            }
        }
        let grown = SchemaSnapshot::try_from(defs).unwrap();
        registry.reload(Arc::new(grown)).unwrap();
        let tag = registry.descriptor("tag").unwrap();
        assert!(tag.fields_own.contains_key("color"));
        assert_eq!(registry.resource_map().count(), 5);
    }

    #[test]
    fn test_auth_filter() {
        init_logging();

        let mut registry = Registry::new(Arc::new(fixtures::blog()), "User").unwrap();
        registry
            .register(ResourceConfig::for_entity("Comment").authenticated(true))
            .unwrap();
        registry.register(ResourceConfig::for_entity("Tag")).unwrap();

        assert_eq!(
            registry.auth_filter("comment", Some(7)).unwrap(),
            AuthFilter::Any(vec![
                AuthFilter::Path {
                    path: vec!["user".into()],
                    principal: 7
                },
                AuthFilter::Path {
                    path: vec!["post".into(), "author".into(), "user".into()],
                    principal: 7
                },
            ])
        );
        assert_eq!(
            registry.auth_filter::<i32>("comment", None).unwrap(),
            AuthFilter::Nothing
        );
        assert_eq!(registry.auth_filter("tag", Some(7)).unwrap(), AuthFilter::All);
    }
}
