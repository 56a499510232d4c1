//! Serialization of records into JSON:API documents.
//!
//! A document holds the identity (under `id`) and the visible attributes of one record, and a
//! `links` object with the identities of related records. Attributes and links are keyed exactly
//! like the maps of the [`ResourceDescriptor`] the document is built from, so a client sees the
//! same names in documents as in query parameters.
//!
//! Attributes are normally read from the record itself. A resource can replace the serialization
//! of individual fields with [`Serializers`].

use crate::resource::ResourceDescriptor;
use derivative::Derivative;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

/// A row which can be serialized into a document.
pub trait Record {
    /// The identity of the row, held in the field `id_field`.
    fn id(&self, id_field: &str) -> Value;

    /// The value of a scalar field, or [`None`] if the row has no such field.
    fn attribute(&self, field: &str) -> Option<Value>;

    /// The identity of the row referenced by a to-one field, or [`None`] if it is unset.
    fn to_one_id(&self, field: &str) -> Option<Value>;

    /// The identities of the rows related through a to-many field.
    fn to_many_ids(&self, field: &str) -> Vec<Value>;
}

/// A record in the form of a JSON object.
///
/// Related rows may be given either as bare identities or as objects with an `id`.
impl Record for Map<String, Value> {
    fn id(&self, id_field: &str) -> Value {
        self.get(id_field).cloned().unwrap_or_default()
    }

    fn attribute(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }

    fn to_one_id(&self, field: &str) -> Option<Value> {
        match self.get(field)? {
            Value::Null => None,
            related => Some(related_id(related)),
        }
    }

    fn to_many_ids(&self, field: &str) -> Vec<Value> {
        match self.get(field) {
            Some(Value::Array(related)) => related.iter().map(related_id).collect(),
            _ => vec![],
        }
    }
}

fn related_id(related: &Value) -> Value {
    match related {
        Value::Object(related) => related.get("id").cloned().unwrap_or_default(),
        id => id.clone(),
    }
}

/// Custom serialization of a single field.
pub type FieldSerializer<R> = Box<dyn Fn(&R) -> Value + Send + Sync>;

/// Custom field serializers of a resource, by field name.
#[derive(Derivative)]
#[derivative(Default(bound = ""))]
pub struct Serializers<R> {
    serializers: HashMap<String, FieldSerializer<R>>,
}

impl<R> Debug for Serializers<R> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_set().entries(self.serializers.keys()).finish()
    }
}

impl<R> Serializers<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `field` with `serializer` instead of reading it from the record.
    pub fn with<F>(mut self, field: impl Into<String>, serializer: F) -> Self
    where
        F: Fn(&R) -> Value + Send + Sync + 'static,
    {
        self.insert(field, serializer);
        self
    }

    pub fn insert<F>(&mut self, field: impl Into<String>, serializer: F)
    where
        F: Fn(&R) -> Value + Send + Sync + 'static,
    {
        self.serializers.insert(field.into(), Box::new(serializer));
    }

    /// Serialize `field` as the JSON representation of whatever `get` returns.
    pub fn with_serialize<F, T>(self, field: impl Into<String>, get: F) -> Self
    where
        F: Fn(&R) -> T + Send + Sync + 'static,
        T: Serialize,
    {
        self.with(field, move |record| {
            serde_json::to_value(get(record)).unwrap_or_else(|err| {
                tracing::warn!("failed to serialize field: {}", err);
                Value::Null
            })
        })
    }

    pub fn get(&self, field: &str) -> Option<&FieldSerializer<R>> {
        self.serializers.get(field)
    }
}

/// Build the document of `record`.
///
/// The identity is always included, under `id` whatever the name of the identity field. If
/// `fields` is given, only those attributes and links are included.
pub fn dump_document<R: Record>(
    descriptor: &ResourceDescriptor,
    record: &R,
    serializers: &Serializers<R>,
    fields: Option<&[String]>,
) -> Value {
    let visible = |key: &str| fields.map_or(true, |fields| fields.iter().any(|f| f == key));

    let mut document = Map::new();
    document.insert("id".into(), record.id(&descriptor.id_field));
    for (key, field) in &descriptor.fields_own {
        if field.name == descriptor.id_field || !visible(key) {
            continue;
        }
        let value = match serializers.get(key) {
            Some(serialize) => serialize(record),
            None => record.attribute(&field.name).unwrap_or_default(),
        };
        document.insert(key.clone(), value);
    }

    let mut links = Map::new();
    for (key, field) in &descriptor.fields_to_one {
        if visible(key) {
            links.insert(key.clone(), record.to_one_id(&field.name).unwrap_or_default());
        }
    }
    for (key, field) in &descriptor.fields_to_many {
        if visible(key) {
            links.insert(key.clone(), Value::Array(record.to_many_ids(&field.name)));
        }
    }
    if !links.is_empty() {
        document.insert("links".into(), Value::Object(links));
    }
    Value::Object(document)
}

/// Build a collection document, with the documents of `records` under the plural name of the
/// resource.
pub fn dump_documents<'r, R, I>(
    descriptor: &ResourceDescriptor,
    records: I,
    serializers: &Serializers<R>,
    fields: Option<&[String]>,
) -> Value
where
    R: Record + 'r,
    I: IntoIterator<Item = &'r R>,
{
    let documents = records
        .into_iter()
        .map(|record| dump_document(descriptor, record, serializers, fields))
        .collect();
    let mut data = Map::new();
    data.insert(descriptor.plural_name.clone(), Value::Array(documents));
    Value::Object(data)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        fixtures, init_logging,
        registry::Registry,
        resource::ResourceConfig,
        schema::{EntityDef, SchemaSnapshot},
    };
    use serde_json::json;
    use std::sync::Arc;

    struct Post {
        id: u64,
        title: String,
        author: Option<u64>,
        comments: Vec<u64>,
    }

    impl Record for Post {
        fn id(&self, _id_field: &str) -> Value {
            json!(self.id)
        }

        fn attribute(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(json!(self.id)),
                "title" => Some(json!(self.title)),
                _ => None,
            }
        }

        fn to_one_id(&self, field: &str) -> Option<Value> {
            match field {
                "author" => self.author.map(|id| json!(id)),
                _ => None,
            }
        }

        fn to_many_ids(&self, field: &str) -> Vec<Value> {
            match field {
                "comment_set" => self.comments.iter().map(|id| json!(id)).collect(),
                _ => vec![],
            }
        }
    }

    fn blog() -> Registry {
        let mut registry = Registry::new(Arc::new(fixtures::blog()), "User").unwrap();
        for entity in ["Author", "Post", "Comment"] {
            registry.register(ResourceConfig::for_entity(entity)).unwrap();
        }
        registry
    }

    fn post() -> Post {
        Post {
            id: 1,
            title: "Hello".into(),
            author: Some(2),
            comments: vec![3, 4],
        }
    }

    #[test]
    fn test_dump_document() {
        init_logging();

        let descriptor = blog().descriptor("post").unwrap();
        let document = dump_document(&descriptor, &post(), &Serializers::new(), None);
        assert_eq!(
            document,
            json!({
                "id": 1,
                "title": "Hello",
                "links": {
                    "author": 2,
                    "comments": [3, 4],
                },
            })
        );

        let orphan = Post {
            author: None,
            comments: vec![],
            ..post()
        };
        let document = dump_document(&descriptor, &orphan, &Serializers::new(), None);
        assert_eq!(document["links"], json!({"author": null, "comments": []}));
    }

    #[test]
    fn test_custom_serializers() {
        init_logging();

        let descriptor = blog().descriptor("post").unwrap();
        let serializers = Serializers::new()
            .with("title", |post: &Post| json!(post.title.to_uppercase()))
            .with_serialize("id", |post: &Post| post.id * 10);
        let document = dump_document(&descriptor, &post(), &serializers, None);
        assert_eq!(document["title"], "HELLO");
        // The identity is not an attribute.
        assert_eq!(document["id"], 1);
    }

    #[test]
    fn test_sparse_fields() {
        init_logging();

        let descriptor = blog().descriptor("post").unwrap();
        let fields = ["author".to_string()];
        let document = dump_document(&descriptor, &post(), &Serializers::new(), Some(&fields));
        assert_eq!(document, json!({"id": 1, "links": {"author": 2}}));
    }

    #[test]
    fn test_json_records() {
        init_logging();

        let descriptor = blog().descriptor("comment").unwrap();
        let records = [
            json!({"id": 5, "body": "first", "post": {"id": 1}, "user": 7}),
            json!({"id": 6, "body": "second", "post": 1, "user": null}),
        ]
        .into_iter()
        .map(|record| match record {
            Value::Object(record) => record,
            _ => unreachable!(),
        })
        .collect::<Vec<_>>();
        let documents = dump_documents(&descriptor, &records, &Serializers::new(), None);
        // Users are not exposed, so there is no user link.
        assert_eq!(
            documents,
            json!({
                "comments": [
                    {"id": 5, "body": "first", "links": {"post": 1}},
                    {"id": 6, "body": "second", "links": {"post": 1}},
                ]
            })
        );
    }

    #[test]
    fn test_identity_field() {
        init_logging();

        let schema = SchemaSnapshot::builder()
            .def(EntityDef::concrete("User"))
            .def(
                EntityDef::concrete("Item")
                    .id("pk")
                    .field("name")
                    .to_one(("owner", "User")),
            )
            .build()
            .unwrap();
        let mut registry = Registry::new(Arc::new(schema), "User").unwrap();
        registry.register(ResourceConfig::for_entity("User")).unwrap();
        registry.register(ResourceConfig::for_entity("Item")).unwrap();
        let descriptor = registry.descriptor("item").unwrap();
        assert_eq!(descriptor.id_field, "pk");

        let Value::Object(record) = json!({"pk": 9, "name": "lamp", "owner": 1}) else {
            unreachable!()
        };
        assert_eq!(
            dump_document(&descriptor, &record, &Serializers::new(), None),
            json!({"id": 9, "name": "lamp", "links": {"user": 1}})
        );
        let fields = ["name".to_string()];
        assert_eq!(
            dump_document(&descriptor, &record, &Serializers::new(), Some(&fields)),
            json!({"id": 9, "name": "lamp"})
        );
    }
}
