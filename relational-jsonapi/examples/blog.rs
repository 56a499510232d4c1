use clap::Parser;
use relational_jsonapi::{
    document::{dump_documents, Serializers},
    prelude::*,
    registry,
    request::RequestParser,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

////////////////////////////////////////////////////////////////////////////////////////////////////
// Schema
//

/// Someone who can log in.
#[derive(Entity)]
pub struct User {
    id: u64,
    username: String,
    #[entity(private)]
    password: String,
}

/// A blog post.
#[derive(Entity)]
pub struct Post {
    id: u64,
    title: String,
    author: ToOne<User>,
    tags: Many<Tag>,
}

#[derive(Entity)]
pub struct Comment {
    id: u64,
    body: String,
    post: ToOne<Post>,
    user: ToOne<User>,
}

#[derive(Entity)]
pub struct Tag {
    id: u64,
    name: String,
}

pub fn registry() -> Result<Registry, registry::Error> {
    let schema = SchemaSnapshot::builder()
        .entity::<User>()
        .entity::<Post>()
        .entity::<Comment>()
        .entity::<Tag>()
        .build()?;
    let mut registry = Registry::new(Arc::new(schema), "User")?;
    registry.register(ResourceConfig::for_entity("User"))?;
    registry.register(
        ResourceConfig::for_entity("Post")
            .allow([Method::Get, Method::Post])
            .authenticated(true),
    )?;
    registry.register(ResourceConfig::for_entity("Comment").authenticated(true))?;
    registry.register(ResourceConfig::for_entity("Tag"))?;
    Ok(registry)
}

////////////////////////////////////////////////////////////////////////////////////////////////////
// Test data
//

fn rows(resource: &str) -> Vec<Map<String, Value>> {
    let rows = match resource {
        "user" => json!([
            {"id": 1, "username": "alice", "post_set": [1], "comment_set": [2]},
            {"id": 2, "username": "bob", "post_set": [], "comment_set": [1]},
        ]),
        "post" => json!([
            {"id": 1, "title": "Hello", "author": 1, "tags": [1], "comment_set": [1, 2]},
        ]),
        "comment" => json!([
            {"id": 1, "body": "First", "post": 1, "user": 2},
            {"id": 2, "body": "Thanks", "post": {"id": 1}, "user": 1},
        ]),
        "tag" => json!([
            {"id": 1, "name": "rust", "post_set": [1]},
        ]),
        _ => json!([]),
    };
    let Value::Array(rows) = rows else { return vec![]; };
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

#[derive(Clone, Debug, Parser)]
pub struct Options {
    /// The resource to show.
    #[clap(long, env = "EXAMPLE_RESOURCE", default_value = "comment")]
    resource: String,

    /// JSON:API query parameters, like `fields[comment]=body&include=post.author`.
    #[clap(long, default_value = "")]
    query: String,

    /// The identity of the authenticated user.
    #[clap(long)]
    principal: Option<u64>,
}

fn main() -> color_eyre::Result<()> {
    relational_jsonapi::init_logging();
    let opt = Options::parse();

    let registry = registry()?;
    let descriptor = registry.descriptor(&opt.resource)?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    println!(
        "visible to {:?}: {:?}",
        opt.principal,
        registry.auth_filter(&opt.resource, opt.principal)?
    );

    let params = RequestParser::parse_query(&opt.query)?;
    for inclusion in registry.include_structure(&opt.resource, &params.include)? {
        println!(
            "include {} from {} through {}",
            inclusion.path.join("."),
            inclusion.resource,
            inclusion.query
        );
    }

    let fields = params
        .fields
        .as_ref()
        .and_then(|fields| fields.for_resource(&descriptor.name, true));
    let serializers = Serializers::new().with("username", |user: &Map<String, Value>| {
        json!(user
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_uppercase))
    });
    let data = dump_documents(&descriptor, &rows(&opt.resource), &serializers, fields);
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use relational_jsonapi::init_logging;

    #[test]
    fn test_registry() {
        init_logging();

        let registry = registry().unwrap();
        let post = registry.descriptor("post").unwrap();
        assert_eq!(post.relation("user").unwrap().name, "author");
        assert_eq!(post.relation("comments").unwrap().name, "comment_set");
        assert_eq!(post.relation("tags").unwrap().name, "tags");
        assert_eq!(post.auth_user_paths, ["author", "comment_set__user"]);

        let comment = registry.descriptor("comment").unwrap();
        assert_eq!(comment.auth_user_paths, ["user", "post__author"]);
        assert!(registry.resource("post").unwrap().allows(Method::Post));
        assert!(!registry.resource("comment").unwrap().allows(Method::Post));
    }

    #[test]
    fn test_documents() {
        init_logging();

        let registry = registry().unwrap();
        let descriptor = registry.descriptor("comment").unwrap();
        let data = dump_documents(&descriptor, &rows("comment"), &Serializers::new(), None);
        assert_eq!(
            data["comments"][1],
            json!({"id": 2, "body": "Thanks", "links": {"post": 1, "user": 1}})
        );
    }
}
