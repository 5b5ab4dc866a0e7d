//! Collaborator interfaces consumed by the pipeline
//!
//! All of these are implemented outside the core: the backend forwarder,
//! the external authorization authority, the resource/relation stores, and
//! identity/group resolution. The pipeline only ever holds them behind
//! `Arc<dyn Trait>` seams.

use crate::error::ServiceError;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, Response};
use sentra_core::{RelationV2, Resource};

/// Result type for collaborator calls
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Sends the fully-prepared request to the resolved backend.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Perform the backend call and return its response.
    async fn forward(&self, req: Request<Bytes>) -> ServiceResult<Response<Bytes>>;
}

/// External authorization authority storing and evaluating relation tuples.
#[async_trait]
pub trait Authority: Send + Sync {
    /// Whether `principal` holds `permission` on the resource.
    async fn check_authz(
        &self,
        principal: &str,
        namespace: &str,
        resource_id: &str,
        permission: &str,
    ) -> ServiceResult<bool>;
}

/// Resource store the hook chain synthesizes into.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Create or update a resource; the returned copy carries its id.
    async fn upsert(&self, resource: Resource) -> ServiceResult<Resource>;
}

/// Relation store the hook chain synthesizes into.
#[async_trait]
pub trait RelationService: Send + Sync {
    /// Create a relation edge.
    async fn create(&self, relation: RelationV2) -> ServiceResult<RelationV2>;
}

/// Resolves human-facing subject/object references (email, slug) to
/// canonical ids before a relation is stored.
#[async_trait]
pub trait RelationTransformer: Send + Sync {
    /// Rewrite the relation with canonical ids.
    async fn transform(&self, relation: RelationV2) -> ServiceResult<RelationV2>;
}

/// The caller's resolved identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Canonical user id
    pub id: String,
    /// User email
    pub email: String,
}

/// Resolves the caller of the current request.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve the caller from the inbound request headers.
    async fn resolve(&self, headers: &HeaderMap) -> ServiceResult<Identity>;
}

/// A group principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    /// Canonical group id
    pub id: String,
    /// Human-facing slug
    pub slug: String,
}

/// Resolves group slugs to canonical groups.
#[async_trait]
pub trait GroupService: Send + Sync {
    /// Look a group up by its slug.
    async fn get_by_slug(&self, slug: &str) -> ServiceResult<Group>;
}
