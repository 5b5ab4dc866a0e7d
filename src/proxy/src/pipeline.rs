//! Pipeline assembly
//!
//! Composes the request-phase middleware chain and the response-phase hook
//! chain bottom-up from their terminal stages. The finished pipeline is a
//! single [`Middleware`] handle plus a per-request entry point.

use crate::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::hook::authz::AuthzHook;
use crate::hook::{Hook, Terminal};
use crate::metrics::ProxyMetrics;
use crate::middleware::authz::AuthzMiddleware;
use crate::middleware::forward::ForwardAdapter;
use crate::middleware::identity::IdentityInjector;
use crate::middleware::observability::Observability;
use crate::middleware::prefix::Prefix;
use crate::middleware::route_label::RouteLabel;
use crate::middleware::rulematch::RuleMatch;
use crate::middleware::Middleware;
use crate::services::{
    Authority, Forwarder, GroupService, IdentityService, RelationService, RelationTransformer,
    ResourceService,
};
use bytes::Bytes;
use http::header::HeaderName;
use http::{Request, Response};
use sentra_core::RuleCache;
use std::sync::Arc;

/// Pipeline-level configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Header carrying the injected canonical user id
    pub user_id_header: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { user_id_header: "x-user-id".to_string() }
    }
}

/// The external collaborators every pipeline instance is wired to.
#[derive(Clone)]
pub struct Collaborators {
    /// Backend transport
    pub forwarder: Arc<dyn Forwarder>,
    /// Authorization authority
    pub authority: Arc<dyn Authority>,
    /// Resource store
    pub resources: Arc<dyn ResourceService>,
    /// Relation store
    pub relations: Arc<dyn RelationService>,
    /// Relation id canonicalizer
    pub transformer: Arc<dyn RelationTransformer>,
    /// Caller identity resolution
    pub identity: Arc<dyn IdentityService>,
    /// Group slug resolution
    pub groups: Arc<dyn GroupService>,
}

/// A fully-composed proxy pipeline.
pub struct Pipeline {
    chain: Arc<dyn Middleware>,
    metrics: ProxyMetrics,
}

impl Pipeline {
    /// Compose the pipeline over the shared rule cache and collaborators.
    ///
    /// Request-phase order, outermost first: observability, rule match,
    /// route label, identity injection, prefix rewrite, authorization,
    /// forward. Response-phase order: authz synthesis, then the terminal.
    pub fn build(
        config: &PipelineConfig,
        cache: Arc<RuleCache>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let user_id_header = HeaderName::from_bytes(config.user_id_header.as_bytes())
            .map_err(|e| ProxyError::Config(format!("invalid user id header name: {e}")))?;
        let metrics = ProxyMetrics::new()
            .map_err(|e| ProxyError::Config(format!("failed to build metrics: {e}")))?;

        let terminal: Arc<dyn Hook> = Arc::new(Terminal::new());
        let hooks: Arc<dyn Hook> = Arc::new(AuthzHook::new(
            Arc::clone(&terminal),
            terminal,
            user_id_header.clone(),
            collaborators.resources,
            collaborators.relations,
            collaborators.transformer,
            metrics.clone(),
        ));

        let forward: Arc<dyn Middleware> =
            Arc::new(ForwardAdapter::new(collaborators.forwarder, hooks));
        let authz: Arc<dyn Middleware> = Arc::new(AuthzMiddleware::new(
            forward,
            user_id_header.clone(),
            collaborators.authority,
            collaborators.groups,
        ));
        let prefix: Arc<dyn Middleware> = Arc::new(Prefix::new(authz));
        let identity: Arc<dyn Middleware> =
            Arc::new(IdentityInjector::new(prefix, collaborators.identity, user_id_header));
        let route_label: Arc<dyn Middleware> = Arc::new(RouteLabel::new(identity));
        let rulematch: Arc<dyn Middleware> = Arc::new(RuleMatch::new(route_label, cache));
        let chain: Arc<dyn Middleware> = Arc::new(Observability::new(rulematch));

        Ok(Self { chain, metrics })
    }

    /// Run one request through the whole pipeline.
    pub async fn serve(&self, req: Request<Bytes>) -> Response<Bytes> {
        let mut ctx = RequestContext::new();
        self.chain.handle(&mut ctx, req).await
    }

    /// Counters the hook chain increments; register these on the host's
    /// prometheus registry.
    pub fn metrics(&self) -> &ProxyMetrics {
        &self.metrics
    }
}
