//! Identity injection stage

use super::{status_response, Info, Middleware};
use crate::context::RequestContext;
use crate::services::IdentityService;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::{HeaderValue, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::warn;

/// Resolves the caller and injects the canonical user id as a header for
/// every downstream stage and the backend itself.
pub struct IdentityInjector {
    next: Arc<dyn Middleware>,
    identity: Arc<dyn IdentityService>,
    user_id_header: HeaderName,
}

impl IdentityInjector {
    /// Stage over the identity collaborator.
    pub fn new(
        next: Arc<dyn Middleware>,
        identity: Arc<dyn IdentityService>,
        user_id_header: HeaderName,
    ) -> Self {
        Self { next, identity, user_id_header }
    }
}

#[async_trait]
impl Middleware for IdentityInjector {
    fn info(&self) -> Info {
        Info { name: "identity", description: "injects the caller's resolved identity" }
    }

    async fn handle(&self, ctx: &mut RequestContext, mut req: Request<Bytes>) -> Response<Bytes> {
        let user = match self.identity.resolve(req.headers()).await {
            Ok(user) => user,
            Err(err) => {
                warn!(error = %err, "failed to resolve caller identity");
                return status_response(StatusCode::UNAUTHORIZED);
            }
        };

        let value = match HeaderValue::from_str(&user.id) {
            Ok(value) => value,
            Err(_) => {
                warn!(user = %user.id, "resolved user id is not a valid header value");
                return status_response(StatusCode::UNAUTHORIZED);
            }
        };
        req.headers_mut().insert(self.user_id_header.clone(), value);

        self.next.handle(ctx, req).await
    }
}
