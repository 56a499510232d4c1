//! Resources: the named views of entities which are exposed to clients.
//!
//! A resource is configured with a [`ResourceConfig`], a plain structure in which every setting is
//! optional. Configurations compose: [`merge_configs`] folds a list of partial configurations,
//! ordered from the most generic to the most specific, into one. When a configuration is
//! registered, the [`Registry`](crate::registry::Registry) resolves it against the schema into a
//! [`ResourceComputed`], and the pair becomes a [`Resource`].
//!
//! A resource is described to the request handling layer by a [`ResourceDescriptor`], which maps
//! each field a client can see to the underlying entity field and, for relations, to the resource
//! on the other side. Relations leading to entities which have no resource of their own are not
//! visible.

use crate::{
    auth::AuthFilter,
    inspector::{EntityInfo, Field, Inspection},
    registry::{AmbiguousRelationSnafu, Error, MissingNameSnafu},
    schema::{EntityName, SchemaSnapshot},
};
use convert_case::{Case, Casing};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet, HashMap};

/// The page size used when a resource does not configure one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// An operation a client may perform on a resource.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[display(fmt = "GET")]
    Get,
    #[display(fmt = "POST")]
    Post,
    #[display(fmt = "PUT")]
    Put,
    #[display(fmt = "DELETE")]
    Delete,
}

/// User-supplied configuration of a resource.
///
/// Every setting is optional, so that partial configurations can be merged. Settings which are
/// still unset after merging take their defaults at registration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// The name of the resource. Defaults to the lowercased name of the entity.
    pub name: Option<String>,
    /// The plural name of the resource. Defaults to the name followed by `s`.
    pub plural_name: Option<String>,
    /// The entity backing this resource. A resource without an entity is virtual.
    pub entity: Option<EntityName>,
    /// Defaults to `GET` only.
    pub allowed_methods: Option<BTreeSet<Method>>,
    /// Extra attributes to expose, which are not fields of the entity.
    pub fieldnames_include: Option<Vec<String>>,
    /// Fields to hide.
    pub fieldnames_exclude: Option<Vec<String>>,
    pub page_size: Option<usize>,
    /// Whether rows are filtered by their relationship to the authenticated subject.
    pub authenticated: Option<bool>,
    /// Defaults to the documentation of the entity.
    pub description: Option<String>,
}

impl ResourceConfig {
    /// A configuration for a resource backed by `entity`.
    pub fn for_entity(entity: impl Into<EntityName>) -> Self {
        Self {
            entity: Some(entity.into()),
            ..Default::default()
        }
    }

    /// A configuration for a virtual resource.
    pub fn virtual_resource(name: impl Into<String>) -> Self {
        Self::default().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn plural_name(mut self, plural_name: impl Into<String>) -> Self {
        self.plural_name = Some(plural_name.into());
        self
    }

    pub fn allow(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.allowed_methods = Some(methods.into_iter().collect());
        self
    }

    pub fn include<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fieldnames_include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fieldnames_exclude = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = Some(authenticated);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override the settings of `self` with every setting present in `other`.
    pub fn merge(self, other: Self) -> Self {
        Self {
            name: other.name.or(self.name),
            plural_name: other.plural_name.or(self.plural_name),
            entity: other.entity.or(self.entity),
            allowed_methods: other.allowed_methods.or(self.allowed_methods),
            fieldnames_include: other.fieldnames_include.or(self.fieldnames_include),
            fieldnames_exclude: other.fieldnames_exclude.or(self.fieldnames_exclude),
            page_size: other.page_size.or(self.page_size),
            authenticated: other.authenticated.or(self.authenticated),
            description: other.description.or(self.description),
        }
    }
}

/// Merge partial configurations, ordered from base to derived.
///
/// Settings in later configurations override the same settings in earlier ones.
pub fn merge_configs(configs: impl IntoIterator<Item = ResourceConfig>) -> ResourceConfig {
    configs
        .into_iter()
        .fold(ResourceConfig::default(), ResourceConfig::merge)
}

/// Properties of a resource derived from its configuration and the schema at registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceComputed {
    pub name: String,
    pub plural_name: String,
    pub entity: Option<EntityName>,
    pub entity_info: Option<EntityInfo>,
    pub description: String,
    /// The identity field of the entity, or `id` for a virtual resource.
    pub id_field: String,
    /// Whether the entity is the principal, or a subtype of it.
    pub is_principal: bool,
    /// Whether the entity extends another concrete entity.
    pub is_inherited: bool,
}

impl ResourceComputed {
    pub(crate) fn compute(
        config: &ResourceConfig,
        schema: &SchemaSnapshot,
        inspection: &Inspection,
    ) -> Result<Self, Error> {
        let (entity_info, description, is_inherited) = match &config.entity {
            Some(entity) => {
                let info = inspection.info(entity.as_str())?;
                let def = schema.get(entity.as_str());
                (
                    Some(info.clone()),
                    def.and_then(|def| def.description.clone()),
                    schema
                        .ancestors(entity.as_str())
                        .any(|def| def.is_concrete()),
                )
            }
            None => (None, None, false),
        };
        let name = match (&config.name, &config.entity) {
            (Some(name), _) => name.clone(),
            (None, Some(entity)) => entity.as_str().to_case(Case::Flat),
            (None, None) => return MissingNameSnafu.fail(),
        };
        let plural_name = config
            .plural_name
            .clone()
            .unwrap_or_else(|| format!("{name}s"));
        let id_field = config
            .entity
            .as_ref()
            .map_or("id", |entity| schema.identity_field(entity.as_str()))
            .to_string();
        Ok(Self {
            is_principal: entity_info.as_ref().map_or(false, |info| info.is_principal),
            id_field,
            name,
            plural_name,
            entity: config.entity.clone(),
            entity_info,
            description: config
                .description
                .clone()
                .or(description)
                .unwrap_or_default(),
            is_inherited,
        })
    }
}

/// A registered resource.
#[derive(Clone, Debug)]
pub struct Resource {
    config: ResourceConfig,
    computed: ResourceComputed,
}

impl Resource {
    pub(crate) fn new(
        config: ResourceConfig,
        schema: &SchemaSnapshot,
        inspection: &Inspection,
    ) -> Result<Self, Error> {
        let computed = ResourceComputed::compute(&config, schema, inspection)?;
        Ok(Self { config, computed })
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn computed(&self) -> &ResourceComputed {
        &self.computed
    }

    pub fn name(&self) -> &str {
        &self.computed.name
    }

    pub fn plural_name(&self) -> &str {
        &self.computed.plural_name
    }

    pub fn entity(&self) -> Option<&EntityName> {
        self.computed.entity.as_ref()
    }

    pub fn info(&self) -> Option<&EntityInfo> {
        self.computed.entity_info.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.computed.description
    }

    pub fn id_field(&self) -> &str {
        &self.computed.id_field
    }

    /// Whether the resource is backed by an entity.
    pub fn is_model(&self) -> bool {
        self.computed.entity.is_some()
    }

    pub fn is_principal(&self) -> bool {
        self.computed.is_principal
    }

    pub fn is_inherited(&self) -> bool {
        self.computed.is_inherited
    }

    pub fn allows(&self, method: Method) -> bool {
        match &self.config.allowed_methods {
            Some(methods) => methods.contains(&method),
            None => method == Method::Get,
        }
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn requires_authentication(&self) -> bool {
        self.config.authenticated.unwrap_or(false)
    }

    /// The filter selecting the rows of this resource visible to `principal`.
    pub fn auth_filter<T>(&self, principal: Option<T>, separator: &str) -> AuthFilter<T>
    where
        T: Clone,
    {
        if !self.requires_authentication() {
            return AuthFilter::All;
        }
        let (Some(principal), Some(info)) = (principal, self.info()) else {
            return AuthFilter::Nothing;
        };
        AuthFilter::for_paths(&info.auth_user_paths, separator, principal)
    }

    fn is_excluded(&self, field: &str) -> bool {
        self.config
            .fieldnames_exclude
            .iter()
            .flatten()
            .any(|excluded| excluded == field)
    }

    /// Describe the fields of this resource in terms of the resources in `resources`.
    ///
    /// `resources` maps each entity to the resource through which it is reached. Relations to
    /// entities which are not in the map are hidden.
    pub(crate) fn describe(
        &self,
        resources: &HashMap<&EntityName, &Resource>,
    ) -> Result<ResourceDescriptor, Error> {
        let mut descriptor = ResourceDescriptor {
            name: self.name().into(),
            plural_name: self.plural_name().into(),
            entity: self.entity().cloned(),
            id_field: self.id_field().into(),
            fields_own: BTreeMap::new(),
            fields_to_one: BTreeMap::new(),
            fields_to_many: BTreeMap::new(),
            auth_user_paths: vec![],
        };

        let own = self
            .info()
            .into_iter()
            .flat_map(|info| info.fields_own.iter().map(Field::name));
        let include = self.config.fieldnames_include.iter().flatten();
        for field in own.chain(include.map(String::as_str)) {
            if !self.is_excluded(field) {
                descriptor
                    .fields_own
                    .insert(field.into(), FieldDescriptor::own(field));
            }
        }

        let Some(info) = self.info() else { return Ok(descriptor); };
        descriptor.auth_user_paths = info.auth_user_paths.clone();
        for field in &info.fields_to_one {
            let Some(related) = self.exposed(field, resources) else { continue; };
            self.insert_relation(&mut descriptor.fields_to_one, related.name(), field, related)?;
        }
        for field in &info.fields_to_many {
            let Some(related) = self.exposed(field, resources) else { continue; };
            self.insert_relation(
                &mut descriptor.fields_to_many,
                related.plural_name(),
                field,
                related,
            )?;
        }

        // Distinct keys may still share a field name, if unrelated entities synthesized the same
        // reverse name. Such a field name does not identify a relation.
        let mut names = HashMap::new();
        for (key, field) in &descriptor.fields_to_many {
            if let Some(other) = names.insert(field.name.as_str(), key.as_str()) {
                return AmbiguousRelationSnafu {
                    resource: self.name(),
                    key: &field.name,
                    fields: vec![other.to_string(), key.clone()],
                }
                .fail();
            }
        }
        Ok(descriptor)
    }

    fn exposed<'r>(
        &self,
        field: &Field,
        resources: &HashMap<&EntityName, &'r Resource>,
    ) -> Option<&'r Resource> {
        if self.is_excluded(field.name()) {
            return None;
        }
        resources.get(field.related_entity()?).copied()
    }

    fn insert_relation(
        &self,
        fields: &mut BTreeMap<String, FieldDescriptor>,
        key: &str,
        field: &Field,
        related: &Resource,
    ) -> Result<(), Error> {
        match fields.entry(key.into()) {
            Entry::Vacant(e) => {
                e.insert(FieldDescriptor {
                    name: field.name().into(),
                    related_resource: Some(related.name().into()),
                });
                Ok(())
            }
            // Sibling subtypes exposed through a shared ancestor see one relation twice.
            Entry::Occupied(e)
                if e.get().name == field.name()
                    && e.get().related_resource.as_deref() == Some(related.name()) =>
            {
                Ok(())
            }
            Entry::Occupied(e) => AmbiguousRelationSnafu {
                resource: self.name(),
                key,
                fields: vec![e.get().name.clone(), field.name().to_string()],
            }
            .fail(),
        }
    }
}

/// A field of a resource, as seen by clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// The name of the underlying entity field.
    pub name: String,
    /// The resource on the other side of a relation.
    pub related_resource: Option<String>,
}

impl FieldDescriptor {
    pub fn own(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            related_resource: None,
        }
    }

    pub fn relation(name: impl Into<String>, related_resource: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            related_resource: Some(related_resource.into()),
        }
    }
}

/// The client's view of a resource.
///
/// Own fields are keyed by field name, to-one fields by the name of the related resource and
/// to-many fields by the plural name of the related resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub plural_name: String,
    pub entity: Option<EntityName>,
    /// The field holding the identity of a row.
    pub id_field: String,
    pub fields_own: BTreeMap<String, FieldDescriptor>,
    pub fields_to_one: BTreeMap<String, FieldDescriptor>,
    pub fields_to_many: BTreeMap<String, FieldDescriptor>,
    pub auth_user_paths: Vec<String>,
}

impl ResourceDescriptor {
    /// Find a relation by its key.
    pub fn relation(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields_to_one
            .get(key)
            .or_else(|| self.fields_to_many.get(key))
    }
}
