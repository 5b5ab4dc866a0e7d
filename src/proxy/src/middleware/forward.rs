//! Forwarding adapter: the innermost chain stage

use super::{status_response, Info, Middleware};
use crate::context::RequestContext;
use crate::hook::Hook;
use crate::services::Forwarder;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::error;

/// Hands the fully-prepared request to the forwarder collaborator and
/// drives the response-phase hook chain over the backend's answer.
pub struct ForwardAdapter {
    forwarder: Arc<dyn Forwarder>,
    hooks: Arc<dyn Hook>,
}

impl ForwardAdapter {
    /// Adapter over the forwarder and the composed hook chain.
    pub fn new(forwarder: Arc<dyn Forwarder>, hooks: Arc<dyn Hook>) -> Self {
        Self { forwarder, hooks }
    }
}

#[async_trait]
impl Middleware for ForwardAdapter {
    fn info(&self) -> Info {
        Info { name: "forward", description: "performs the backend call" }
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request<Bytes>) -> Response<Bytes> {
        // snapshot after every request-phase mutation so hooks see what
        // the backend saw
        ctx.snapshot_outbound(&req);

        match self.forwarder.forward(req).await {
            Ok(res) => self.hooks.serve(ctx, res, None).await,
            Err(err) => {
                error!(error = %err, "backend call failed");
                status_response(StatusCode::BAD_GATEWAY)
            }
        }
    }
}
