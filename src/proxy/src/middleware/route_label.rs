//! Route-label post-processor
//!
//! Records the matched frontend pattern as the request's route label so
//! spans and metrics key on the template (`/api/items/{id}`) instead of
//! the raw path, keeping cardinality bounded.

use super::{Info, Middleware};
use crate::context::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::sync::Arc;
use tracing::debug;

/// Names the request after its matched route template.
pub struct RouteLabel {
    next: Arc<dyn Middleware>,
}

impl RouteLabel {
    /// Stage constructor.
    pub fn new(next: Arc<dyn Middleware>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Middleware for RouteLabel {
    fn info(&self) -> Info {
        Info { name: "route_label", description: "names spans after the matched route" }
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request<Bytes>) -> Response<Bytes> {
        if let Some(rule) = &ctx.rule {
            let label = format!("{} {}", req.method(), rule.frontend.path);
            debug!(route = %label, "route label attached");
            ctx.route_label = Some(label);
        }
        self.next.handle(ctx, req).await
    }
}
