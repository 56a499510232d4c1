//! Derive macros for the `relational_jsonapi` crate.

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod entity;
mod helpers;

/// Derive an implementation of `Entity` for a struct.
///
/// The generated implementation describes the struct as an entity of the schema. The entity is
/// named after the struct, and each field of the struct becomes a field of the entity:
/// * A field of type `ToOne<T>` (or `Option<ToOne<T>>`) declares a to-one relation to the entity
///   `T`.
/// * A field of type `Many<T>` declares a many-to-many relation to the entity `T`.
/// * A field named `id`, or marked with the [`id`](#field-attributes) attribute, is the identity of
///   the entity.
/// * Every other field is a scalar field.
///
/// Documentation (doc comments or the `#[doc = "..."]` attribute) on the struct becomes the
/// description of the entity, which is the default description of resources exposing it.
///
/// # Examples
///
/// ```
/// use relational_jsonapi::prelude::*;
/// use std::sync::Arc;
///
/// /// A user account.
/// #[derive(Entity)]
/// struct User {
///     id: u64,
///     username: String,
///     /// Never shown to clients.
///     #[entity(private)]
///     password: String,
/// }
///
/// #[derive(Entity)]
/// struct Post {
///     id: u64,
///     title: String,
///     #[entity(related_name("posts"))]
///     author: ToOne<User>,
///     tags: Many<Tag>,
/// }
///
/// #[derive(Entity)]
/// struct Tag {
///     id: u64,
///     name: String,
/// }
///
/// /// A post with a picture, stored as an extension of the post table.
/// #[derive(Entity)]
/// #[entity(parent(Post))]
/// struct PicturePost {
///     picture_url: String,
/// }
///
/// let schema = SchemaSnapshot::builder()
///     .entity::<User>()
///     .entity::<Post>()
///     .entity::<Tag>()
///     .entity::<PicturePost>()
///     .build()
///     .unwrap();
/// let registry = Registry::new(Arc::new(schema), "User").unwrap();
/// let post = registry.inspection().get("PicturePost").unwrap();
/// assert_eq!(post.auth_user_paths, ["author"]);
/// ```
///
/// # Struct attributes
///
/// | Attribute     | Description                                             | Arg     | Required |
/// |---------------|---------------------------------------------------------|---------|----------|
/// | name          | Override the name of the entity. The default is the name of the struct. | ident | no |
/// | abstract_base | Mark the entity as abstract. An abstract entity is never exposed itself; its fields and relations are merged into its concrete descendants. | n/a | no |
/// | parent        | The parent of this entity in an inheritance chain. | type | no |
/// | proxy         | Make this entity a proxy for the given concrete entity. A proxy cannot declare fields or a parent. | type | no |
/// | namespace     | The namespace of the entity, substituted for `{namespace}` in reverse relation names. | string | no |
///
/// # Field attributes
///
/// | Attribute     | Description                                             | Arg    | Required |
/// |---------------|---------------------------------------------------------|---------|----------|
/// | id            | Use this field as the identity of the entity. This attribute can be omitted if the field is named `id`. | n/a | no |
/// | private       | Never expose this scalar field to clients. | n/a | no |
/// | related_name  | The name of the reverse view of this relation on the target entity. The placeholders `{class}` and `{namespace}` are replaced by the name and namespace of the entity holding the relation. The default is the lowercase name of the entity holding the relation followed by `_set`. | string | no |
/// | skip          | Do not include this field in the entity. | n/a | no |
#[proc_macro_derive(Entity, attributes(entity))]
pub fn entity(input: TokenStream) -> TokenStream {
    entity::derive(parse_macro_input!(input)).into()
}
