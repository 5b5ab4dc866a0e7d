//! Request-phase middleware chain
//!
//! Each stage is a value holding its successor; the pipeline builder
//! composes them bottom-up, so conceptually top-down the order is:
//! observability, rule match, route label, identity injection, prefix
//! rewrite, authorization, forward.

pub mod authz;
pub mod forward;
pub mod identity;
pub mod observability;
pub mod prefix;
pub mod route_label;
pub mod rulematch;

use crate::context::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};

/// Static description of a pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct Info {
    /// Stage name; also the key looked up in a rule's spec lists
    pub name: &'static str,
    /// What the stage does
    pub description: &'static str,
}

/// A request interceptor in the proxy chain.
///
/// A stage either delegates to its successor (possibly after mutating the
/// request/context) or responds directly, aborting the rest of the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Stage description.
    fn info(&self) -> Info;

    /// Process the request.
    async fn handle(&self, ctx: &mut RequestContext, req: Request<Bytes>) -> Response<Bytes>;
}

/// Empty-bodied response with the given status. Pipeline failures never
/// leak internal state into payloads.
pub(crate) fn status_response(status: StatusCode) -> Response<Bytes> {
    let mut res = Response::new(Bytes::new());
    *res.status_mut() = status;
    res
}
