//! Path-prefix rewrite stage

use super::{Info, Middleware};
use crate::context::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, Uri};
use std::sync::Arc;
use tracing::debug;

/// Strips the matched backend's path prefix before forwarding. Inert when
/// the rule has no prefix or the path does not carry it.
pub struct Prefix {
    next: Arc<dyn Middleware>,
}

impl Prefix {
    /// Stage constructor.
    pub fn new(next: Arc<dyn Middleware>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Middleware for Prefix {
    fn info(&self) -> Info {
        Info { name: "prefix", description: "strips the backend path prefix" }
    }

    async fn handle(&self, ctx: &mut RequestContext, mut req: Request<Bytes>) -> Response<Bytes> {
        let prefix = ctx
            .rule
            .as_ref()
            .map(|r| r.backend.prefix.clone())
            .unwrap_or_default();

        if !prefix.is_empty() {
            if let Some(rewritten) = strip_prefix(req.uri(), &prefix) {
                debug!(from = %req.uri(), to = %rewritten, "path prefix stripped");
                *req.uri_mut() = rewritten;
            }
        }
        self.next.handle(ctx, req).await
    }
}

fn strip_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let stripped = uri.path().strip_prefix(prefix)?;
    let path = if stripped.starts_with('/') {
        stripped.to_string()
    } else {
        format!("/{stripped}")
    };
    let rewritten = match uri.query() {
        Some(q) => format!("{path}?{q}"),
        None => path,
    };
    rewritten.parse().ok()
}
