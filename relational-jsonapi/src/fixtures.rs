//! Schemas shared by the tests of several modules.

use crate::schema::{EntityDef, RelationDef, SchemaSnapshot};

/// A small blog, with a diamond of relations between comments and users.
pub fn blog() -> SchemaSnapshot {
    SchemaSnapshot::builder()
        .def(
            EntityDef::concrete("User")
                .field("username")
                .private_field("password"),
        )
        .def(
            EntityDef::concrete("Author")
                .field("name")
                .to_one(("user", "User")),
        )
        .def(
            EntityDef::concrete("Post")
                .field("title")
                .to_one(("author", "Author")),
        )
        .def(
            EntityDef::concrete("PostWithPicture")
                .parent("Post")
                .field("picture_url"),
        )
        .def(
            EntityDef::concrete("Comment")
                .field("body")
                .to_one(("post", "Post"))
                .to_one(("user", "User")),
        )
        .def(
            EntityDef::concrete("Tag")
                .field("name")
                .many_to_many(RelationDef::new("posts", "Post").related_name("posts_tagged")),
        )
        .build()
        .unwrap()
}

/// A multi-level inheritance chain `AAbstract -> AA -> A -> B`, with relations declared at every
/// level, explicit and templated reverse names, and a proxy of `B`.
pub fn inheritance() -> SchemaSnapshot {
    SchemaSnapshot::builder()
        .def(EntityDef::concrete("User").field("username"))
        .def(EntityDef::concrete("AAbstractOne").field("field"))
        .def(EntityDef::concrete("AAbstractManyToMany").field("field"))
        .def(EntityDef::concrete("AOne").field("field"))
        .def(EntityDef::concrete("AManyToMany").field("field"))
        .def(
            EntityDef::abstract_entity("AAbstract")
                .field("field_abstract")
                .to_one(("a_abstract_one", "AAbstractOne"))
                .many_to_many(
                    RelationDef::new("a_abstract_many_to_manys", "AAbstractManyToMany")
                        .related_name("{namespace}_{class}_related"),
                ),
        )
        .def(
            EntityDef::concrete("AA")
                .parent("AAbstract")
                .namespace("testapp")
                .to_one(("user", "User")),
        )
        .def(
            EntityDef::concrete("A")
                .parent("AA")
                .field("field_a")
                .to_one(("a_one", "AOne"))
                .many_to_many(("a_many_to_manys", "AManyToMany")),
        )
        .def(EntityDef::concrete("B").parent("A").field("field_b"))
        .def(EntityDef::concrete("BMany").to_one(RelationDef::new("b", "B").related_name("bmanys")))
        .def(
            EntityDef::concrete("BManyToMany")
                .many_to_many(RelationDef::new("bs", "B").related_name("bmanytomanys")),
        )
        .def(EntityDef::proxy("BProxy", "B"))
        .build()
        .unwrap()
}
