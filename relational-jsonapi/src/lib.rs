//! Relational JSON:API infers the shape of a JSON:API from the relational model of an application.
//!
//! Given a description of every persisted entity type and the relations between them, this crate
//! works out what each exposed resource looks like to clients and who may see which rows. It
//! consists of several layers:
//!
//! * A [schema] layer, where the host application describes its data model: entity types, their
//!   scalar fields, their to-one and many-to-many relations and their inheritance chains. A schema
//!   can be built by hand, loaded from JSON or derived from Rust structs.
//! * An [inspector], which analyzes the relationship graph of a schema. For every entity, it sorts
//!   fields into own, to-one and to-many fields, synthesizes names for the reverse sides of
//!   relations, and finds every relationship path leading to the _principal_ entity, the type of
//!   the authenticated subject.
//! * A [registry] of [resource]s, the named, configurable views of entities which are exposed to
//!   clients. The registry guarantees that resource names are unambiguous and describes each
//!   resource's fields in terms of other resources.
//! * Helpers for the request handling layer: a JSON:API [request] parameter parser, [auth]orization
//!   filters built from the principal paths, and [document] serialization.
//!
//! Transport, persistence and authentication backends are left to the application. The core is
//! synchronous and works over immutable snapshots, so it can be shared freely between threads.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub mod auth;
pub mod document;
pub mod inspector;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod resource;
pub mod schema;

#[cfg(test)]
mod fixtures;

/// Initialize tracing.
pub fn init_logging() {
    static ONCE: Once = Once::new();

    ONCE.call_once(|| {
        color_eyre::install().unwrap();
        tracing_subscriber::fmt()
            .with_ansi(true)
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    });
}
