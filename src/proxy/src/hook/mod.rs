//! Response-phase hook chain
//!
//! A chain-of-responsibility over two continuations: `next` proceeds to
//! the following hook, `escape` aborts the remaining chain and returns the
//! response as-is, optionally after marking it as an error. Each concrete
//! hook is constructed with both successor handles injected; no dynamic
//! registration happens at runtime.

pub mod authz;

use crate::context::RequestContext;
use crate::error::ProxyError;
use async_trait::async_trait;
use bytes::Bytes;
use http::Response;

/// Static description of a hook.
#[derive(Debug, Clone, Copy)]
pub struct Info {
    /// Hook name; also the key looked up in a rule's hook list
    pub name: &'static str,
    /// What the hook does
    pub description: &'static str,
}

/// A response-phase handler.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Hook description.
    fn info(&self) -> Info;

    /// Process the backend response. `failure` carries an error attached
    /// by an earlier hook escaping the chain.
    async fn serve(
        &self,
        ctx: &RequestContext,
        res: Response<Bytes>,
        failure: Option<ProxyError>,
    ) -> Response<Bytes>;
}

/// Terminal hook closing both continuations: stamps the failure status
/// onto the response (with an empty body) when one is attached, otherwise
/// returns the response unchanged.
pub struct Terminal;

impl Terminal {
    /// Terminal constructor.
    pub fn new() -> Self {
        Self
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for Terminal {
    fn info(&self) -> Info {
        Info { name: "terminal", description: "closes the hook chain" }
    }

    async fn serve(
        &self,
        _ctx: &RequestContext,
        mut res: Response<Bytes>,
        failure: Option<ProxyError>,
    ) -> Response<Bytes> {
        if let Some(err) = failure {
            *res.status_mut() = err.status();
            *res.body_mut() = Bytes::new();
        }
        res
    }
}
