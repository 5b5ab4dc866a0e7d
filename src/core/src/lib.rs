//! Sentra core: the declarative rule model and its supporting machinery.
//!
//! This crate owns everything the proxy evaluates at request time but
//! loads at configuration time: rules and their compiled route templates,
//! the YAML document shape operators write, attribute extraction
//! directives, the permission expression DSL, the synthesized
//! resource/relation types, and the background-refreshed rule cache.

pub mod attribute;
pub mod cache;
pub mod config;
pub mod error;
pub mod expression;
pub mod rule;
pub mod types;

pub use attribute::{compose, coerce_values, Attribute, AttributeSource, AttributeType};
pub use cache::{RuleCache, RuleSource};
pub use error::{CoreError, Result};
pub use expression::{Comparison, Expression};
pub use rule::{
    Backend, Frontend, HookSpec, HookSpecs, MiddlewareSpec, MiddlewareSpecs, RouteTemplate, Rule,
    Ruleset,
};
pub use types::{namespace_id, Object, Permission, RelationSpec, RelationV2, Resource, Subject};
