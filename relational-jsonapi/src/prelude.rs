//! Common items that you will always want in scope when describing and exposing a model.

pub use crate::{
    auth::{AuthFilter, Authenticator},
    inspector::{Field, InspectorConfig},
    registry::Registry,
    resource::{Method, ResourceConfig},
    schema::{Entity, EntityDef, Many, SchemaSnapshot, ToOne},
};
