//! Per-request processing context
//!
//! Each inbound request owns one context exclusively for its whole
//! pipeline; nothing here is shared across requests. The matched rule and
//! path-template variables are attached by the rule-match middleware, and
//! the forward adapter snapshots the final outbound request (after all
//! request-phase mutations) so the hook chain can still read it after the
//! backend call consumed the request.

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri};
use sentra_core::Rule;
use std::collections::HashMap;
use std::sync::Arc;

/// State owned by one request's pipeline run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Rule selected by the matcher, if any
    pub rule: Option<Arc<Rule>>,
    /// Path-template variables captured during matching
    pub path_params: HashMap<String, String>,
    /// Route label recorded for span naming / metric cardinality control
    pub route_label: Option<String>,
    /// Method of the forwarded request
    pub method: Method,
    /// URI of the forwarded request (after prefix rewriting)
    pub uri: Uri,
    /// Headers of the forwarded request (after identity injection)
    pub headers: HeaderMap,
    /// Fully-buffered body of the forwarded request
    pub body: Bytes,
}

impl RequestContext {
    /// Fresh context for one inbound request.
    pub fn new() -> Self {
        Self {
            rule: None,
            path_params: HashMap::new(),
            route_label: None,
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Record the final outbound request before it is handed to the
    /// forwarder. Bodies are `Bytes`, so the snapshot is cheap and later
    /// reads never exhaust anything.
    pub fn snapshot_outbound(&mut self, req: &Request<Bytes>) {
        self.method = req.method().clone();
        self.uri = req.uri().clone();
        self.headers = req.headers().clone();
        self.body = req.body().clone();
    }

}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
