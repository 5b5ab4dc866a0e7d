//! Rule-match stage

use super::{status_response, Info, Middleware};
use crate::context::RequestContext;
use crate::matcher::RouteMatcher;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use sentra_core::RuleCache;
use std::sync::Arc;
use tracing::debug;

/// Selects the rule governing this request and attaches it, together with
/// the captured path-template variables, to the request context.
///
/// Requests matching no rule are rejected with 404 rather than forwarded
/// unauthorized.
pub struct RuleMatch {
    next: Arc<dyn Middleware>,
    cache: Arc<RuleCache>,
}

impl RuleMatch {
    /// Stage over the shared rule cache.
    pub fn new(next: Arc<dyn Middleware>, cache: Arc<RuleCache>) -> Self {
        Self { next, cache }
    }
}

#[async_trait]
impl Middleware for RuleMatch {
    fn info(&self) -> Info {
        Info { name: "rulematch", description: "attaches the matching rule to the request" }
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request<Bytes>) -> Response<Bytes> {
        // snapshot taken once; a concurrent refresh never affects this request
        let matcher = RouteMatcher::new(self.cache.snapshot());
        match matcher.match_route(req.uri().path(), req.method()) {
            Some((rule, params)) => {
                debug!(pattern = %rule.frontend.path, "rule matched");
                ctx.rule = Some(rule);
                ctx.path_params = params;
                self.next.handle(ctx, req).await
            }
            None => {
                debug!(path = req.uri().path(), "no rule matched");
                status_response(StatusCode::NOT_FOUND)
            }
        }
    }
}
