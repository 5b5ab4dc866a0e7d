//! Sentra proxy: a rule-driven, authorization-aware reverse proxy pipeline.
//!
//! Inbound requests run through a request-phase middleware chain (rule
//! matching, identity injection, prefix rewriting, attribute-driven
//! authorization) and, after the backend call, a response-phase hook chain
//! that synthesizes resources and relations into the external
//! authorization graph. Rules come from the shared [`sentra_core`] cache;
//! backends and graph services are reached through the collaborator traits
//! in [`services`].

pub mod context;
pub mod error;
pub mod extract;
pub mod hook;
pub mod matcher;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod services;

pub use context::RequestContext;
pub use error::{ProxyError, Result, ServiceError};
pub use metrics::ProxyMetrics;
pub use pipeline::{Collaborators, Pipeline, PipelineConfig};
