//! Authorization-graph synthesis hook
//!
//! After a permitted call succeeds, this hook turns extracted attributes
//! into resources and ownership/role relations in the external
//! authorization graph. Resource synthesis is fatal on failure; relation
//! synthesis is best-effort per spec: one missing subject does not abort
//! its siblings, but every failure is counted.

use super::{Hook, Info};
use crate::context::RequestContext;
use crate::error::{ProxyError, Result};
use crate::extract::{Extractor, SourceView};
use crate::metrics::ProxyMetrics;
use crate::services::{RelationService, RelationTransformer, ResourceService};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::Response;
use sentra_core::{
    coerce_values, compose, namespace_id, Attribute, HookSpec, Object, RelationSpec, RelationV2,
    Resource, Rule, Subject,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Typed form of this hook's free-form rule config.
#[derive(Debug, Default, Deserialize)]
struct AuthzHookConfig {
    /// Human-facing action label, carried into logs
    #[serde(default)]
    action: String,
    #[serde(default)]
    attributes: HashMap<String, Attribute>,
    #[serde(default)]
    relations: Vec<RelationSpec>,
}

/// Resource/relation synthesis hook.
pub struct AuthzHook {
    next: Arc<dyn Hook>,
    escape: Arc<dyn Hook>,
    user_id_header: HeaderName,
    resources: Arc<dyn ResourceService>,
    relations: Arc<dyn RelationService>,
    transformer: Arc<dyn RelationTransformer>,
    metrics: ProxyMetrics,
}

impl AuthzHook {
    /// Hook with both continuations and its collaborators injected.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        next: Arc<dyn Hook>,
        escape: Arc<dyn Hook>,
        user_id_header: HeaderName,
        resources: Arc<dyn ResourceService>,
        relations: Arc<dyn RelationService>,
        transformer: Arc<dyn RelationTransformer>,
        metrics: ProxyMetrics,
    ) -> Self {
        Self { next, escape, user_id_header, resources, relations, transformer, metrics }
    }

    async fn synthesize(
        &self,
        ctx: &RequestContext,
        rule: &Rule,
        spec: &HookSpec,
        res: &Response<Bytes>,
        resource_created: &mut bool,
    ) -> Result<()> {
        let config: AuthzHookConfig =
            serde_json::from_value(Value::Object(spec.config.clone())).map_err(|e| {
                ProxyError::Config(format!("failed to decode authz hook config: {e}"))
            })?;

        if rule.backend.namespace.is_empty() {
            return Err(ProxyError::Internal(
                "namespace variable not defined in rules".to_string(),
            ));
        }

        let user = ctx
            .headers
            .get(&self.user_id_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut attrs: HashMap<String, Value> = HashMap::new();
        attrs.insert("namespace".to_string(), Value::String(rule.backend.namespace.clone()));
        attrs.insert("user".to_string(), Value::String(user));

        let extractor = Extractor::for_exchange(
            SourceView { headers: &ctx.headers, body: &ctx.body },
            SourceView { headers: res.headers(), body: res.body() },
            ctx.uri.query(),
            &ctx.path_params,
        );
        extractor.extract_all(&config.attributes, &mut attrs)?;
        for (key, value) in &ctx.path_params {
            attrs.insert(key.clone(), Value::String(value.clone()));
        }

        for resource in build_resources(&attrs)? {
            let created = self.resources.upsert(resource).await?;
            *resource_created = true;
            info!(
                resource = %created.name,
                id = %created.id,
                action = %config.action,
                "resource synthesized"
            );

            for rel in &config.relations {
                let subject_ids = match coerce_values(attrs.get(&rel.subject_id_attribute)) {
                    Ok(ids) => ids,
                    Err(err) => {
                        warn!(error = %err, attribute = %rel.subject_id_attribute, "bad subject attribute");
                        self.count_relation_failure(rel);
                        continue;
                    }
                };
                let Some(subject_id) = subject_ids.into_iter().next() else {
                    warn!(
                        attribute = %rel.subject_id_attribute,
                        "cannot create relation: subject attribute not extracted"
                    );
                    self.count_relation_failure(rel);
                    continue;
                };

                let relation = RelationV2 {
                    object: Object {
                        id: created.id.clone(),
                        namespace_id: created.namespace_id.clone(),
                    },
                    subject: Subject {
                        id: subject_id,
                        role_id: rel.role.clone(),
                        namespace: rel.subject_principal.clone(),
                    },
                };
                if let Err(err) = self.create_relation(relation).await {
                    self.count_relation_failure(rel);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn create_relation(&self, relation: RelationV2) -> Result<()> {
        let transformed = self.transformer.transform(relation).await?;
        let created = self.relations.create(transformed).await?;
        info!(
            role = %created.subject.role_id,
            subject = %created.subject.id,
            namespace = %created.subject.namespace,
            "relation created"
        );
        Ok(())
    }

    fn count_relation_failure(&self, rel: &RelationSpec) {
        self.metrics
            .relation_creation_failed
            .with_label_values(&[&rel.role, &rel.subject_principal])
            .inc();
    }
}

/// Cross-product of `{project} x {composed resource names}`.
fn build_resources(attrs: &HashMap<String, Value>) -> Result<Vec<Resource>> {
    let projects = coerce_values(attrs.get("project"))?;
    let names = coerce_values(attrs.get("resource"))?;
    let namespaces = coerce_values(attrs.get("namespace"))?;
    let types = coerce_values(attrs.get("resource_type"))?;

    let backend_namespace = namespaces.first().map(String::as_str).unwrap_or_default();
    let resource_type = types.first().map(String::as_str).unwrap_or_default();
    if projects.is_empty()
        || names.is_empty()
        || backend_namespace.is_empty()
        || resource_type.is_empty()
    {
        return Err(ProxyError::Extraction(
            "namespace, resource_type, project, and resource attributes are required".to_string(),
        ));
    }

    let composed: Vec<String> = names.iter().map(|name| compose(name, attrs)).collect();
    let mut resources = Vec::with_capacity(projects.len() * composed.len());
    for project in &projects {
        for name in &composed {
            resources.push(Resource {
                id: String::new(),
                name: name.clone(),
                project_id: project.clone(),
                namespace_id: namespace_id(backend_namespace, resource_type),
            });
        }
    }
    Ok(resources)
}

#[async_trait]
impl Hook for AuthzHook {
    fn info(&self) -> Info {
        Info { name: "authz", description: "synthesizes authorization-graph entries" }
    }

    async fn serve(
        &self,
        ctx: &RequestContext,
        res: Response<Bytes>,
        failure: Option<ProxyError>,
    ) -> Response<Bytes> {
        // an exchange that already failed is never a synthesis source
        if failure.is_some() || res.status().as_u16() >= 400 {
            return self.escape.serve(ctx, res, failure).await;
        }

        let Some(rule) = ctx.rule.clone() else {
            return self.next.serve(ctx, res, None).await;
        };
        let Some(spec) = rule.hooks.get(self.info().name) else {
            // the hook is inert for this rule
            return self.next.serve(ctx, res, None).await;
        };

        let mut resource_created = false;
        match self.synthesize(ctx, &rule, spec, &res, &mut resource_created).await {
            Ok(()) => self.next.serve(ctx, res, None).await,
            Err(err) => {
                if !resource_created {
                    self.metrics
                        .resource_creation_failed
                        .with_label_values(&[ctx.method.as_str(), res.status().as_str()])
                        .inc();
                }
                warn!(error = %err, "authz hook escaped");
                self.escape.serve(ctx, res, Some(err)).await
            }
        }
    }
}
