//! Attribute-driven authorization stage
//!
//! Decides, against the external authorization authority, whether the
//! resolved caller may invoke the matched route. Fails closed: a rule that
//! activates this stage with no permissions, an extraction failure, or an
//! authority error all reject the request.

use super::{status_response, Info, Middleware};
use crate::context::RequestContext;
use crate::error::{ProxyError, Result, ServiceError};
use crate::extract::{Extractor, SourceView};
use crate::services::{Authority, GroupService};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::{Request, Response, StatusCode};
use sentra_core::{coerce_values, Attribute, MiddlewareSpec, Permission, Rule};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Namespace whose resources are addressed by slug and must be resolved
/// to canonical group ids before the authority is consulted.
const GROUP_NAMESPACE: &str = "group";

/// Typed form of this stage's free-form rule config.
#[derive(Debug, Default, Deserialize)]
struct AuthzConfig {
    #[serde(default)]
    permissions: Vec<Permission>,
    #[serde(default)]
    attributes: HashMap<String, Attribute>,
}

/// Authorization decision stage.
pub struct AuthzMiddleware {
    next: Arc<dyn Middleware>,
    user_id_header: HeaderName,
    authority: Arc<dyn Authority>,
    groups: Arc<dyn GroupService>,
}

impl AuthzMiddleware {
    /// Stage over the authority and group collaborators.
    pub fn new(
        next: Arc<dyn Middleware>,
        user_id_header: HeaderName,
        authority: Arc<dyn Authority>,
        groups: Arc<dyn GroupService>,
    ) -> Self {
        Self { next, user_id_header, authority, groups }
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        rule: &Rule,
        spec: &MiddlewareSpec,
        req: &Request<Bytes>,
    ) -> Result<()> {
        if rule.backend.namespace.is_empty() {
            return Err(ProxyError::Config(
                "namespace is not defined for this rule".to_string(),
            ));
        }

        let config: AuthzConfig =
            serde_json::from_value(Value::Object(spec.config.clone()))
                .map_err(|e| ProxyError::Config(format!("failed to decode authz config: {e}")))?;

        // zero permissions is a misconfiguration, not an open door
        if config.permissions.is_empty() {
            warn!(pattern = %rule.frontend.path, "authz middleware active with no permissions");
            return Err(ProxyError::Unauthorized);
        }

        let user = req
            .headers()
            .get(&self.user_id_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut attrs: HashMap<String, Value> = HashMap::new();
        attrs.insert("namespace".to_string(), Value::String(rule.backend.namespace.clone()));
        attrs.insert("user".to_string(), Value::String(user.clone()));

        let extractor = Extractor::for_request(
            SourceView { headers: req.headers(), body: req.body() },
            req.uri().query(),
            &ctx.path_params,
        );
        extractor.extract_all(&config.attributes, &mut attrs)?;
        for (key, value) in &ctx.path_params {
            attrs.insert(key.clone(), Value::String(value.clone()));
        }

        for permission in &config.permissions {
            debug!(permission = %permission.name, "checking permission");

            if !permission.expression.is_empty() {
                let gate = permission.expression.clone().enrich(&attrs);
                match gate.evaluate() {
                    Ok(Some(false)) => continue,
                    Ok(_) => {}
                    Err(err) => {
                        // a broken gate never satisfies its permission
                        warn!(error = %err, permission = %permission.name, "expression evaluation failed");
                        continue;
                    }
                }
            }

            let resource_id = self.resolve_resource(permission, &attrs).await?;
            let allowed = self
                .authority
                .check_authz(&user, &permission.namespace, &resource_id, &permission.name)
                .await?;
            if allowed {
                info!(user = %user, permission = %permission.name, "authz check successful");
                return Ok(());
            }
        }

        Err(ProxyError::Unauthorized)
    }

    /// Resolve the permission's target resource. Group-namespace resources
    /// are addressed by slug unless already a canonical UUID.
    async fn resolve_resource(
        &self,
        permission: &Permission,
        attrs: &HashMap<String, Value>,
    ) -> Result<String> {
        let names = coerce_values(attrs.get(&permission.attribute))?;
        let name = names.into_iter().next().ok_or_else(|| {
            ProxyError::Extraction(format!(
                "permission attribute {} not extracted",
                permission.attribute
            ))
        })?;

        if permission.namespace == GROUP_NAMESPACE && uuid::Uuid::parse_str(&name).is_err() {
            let group = self.groups.get_by_slug(&name).await?;
            return Ok(group.id);
        }
        Ok(name)
    }
}

#[async_trait]
impl Middleware for AuthzMiddleware {
    fn info(&self) -> Info {
        Info { name: "authz", description: "attribute-driven authorization" }
    }

    async fn handle(&self, ctx: &mut RequestContext, req: Request<Bytes>) -> Response<Bytes> {
        let Some(rule) = ctx.rule.clone() else {
            return self.next.handle(ctx, req).await;
        };
        let Some(spec) = rule.middlewares.get(self.info().name) else {
            // the rule does not activate authorization
            return self.next.handle(ctx, req).await;
        };

        match self.authorize(ctx, &rule, spec, &req).await {
            Ok(()) => self.next.handle(ctx, req).await,
            Err(ProxyError::Unauthorized) => {
                info!(path = req.uri().path(), "caller not allowed");
                status_response(StatusCode::UNAUTHORIZED)
            }
            Err(err @ (ProxyError::NotFound(_) | ProxyError::Service(ServiceError::NotFound(_)))) => {
                info!(error = %err, "permission resource does not exist");
                status_response(StatusCode::NOT_FOUND)
            }
            Err(err) => {
                warn!(error = %err, "authorization failed");
                status_response(StatusCode::UNAUTHORIZED)
            }
        }
    }
}
