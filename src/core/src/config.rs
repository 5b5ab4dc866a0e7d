//! Operator-facing YAML rule documents
//!
//! Rule files group frontends under the backend they route to; the proxy
//! works on the flat [`Rule`](crate::rule::Rule) form, so documents are
//! flattened in declaration order after parsing.

use crate::error::{CoreError, Result};
use crate::rule::{Backend, Frontend, HookSpec, HookSpecs, MiddlewareSpec, MiddlewareSpecs, Rule, Ruleset};
use serde::Deserialize;
use serde_json::Value;

/// Top-level shape of one rule file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesetDoc {
    /// Declared rules
    #[serde(default)]
    pub rules: Vec<RuleDoc>,
}

/// One rule entry grouping backends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleDoc {
    /// Backends addressed by this entry
    #[serde(default)]
    pub backends: Vec<BackendDoc>,
}

/// A backend target and the frontends routed to it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendDoc {
    /// Backend name, used as the authorization namespace
    pub name: String,
    /// Backend base URL
    pub target: String,
    /// Path prefix stripped before forwarding
    #[serde(default)]
    pub prefix: String,
    /// Frontends routed to this backend
    #[serde(default)]
    pub frontends: Vec<FrontendDoc>,
}

/// An inbound route and its middleware/hook activations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontendDoc {
    /// Optional human-facing action label
    #[serde(default)]
    pub action: String,
    /// Path pattern
    pub path: String,
    /// HTTP method
    #[serde(default)]
    pub method: String,
    /// Middleware activations in declared order
    #[serde(default)]
    pub middlewares: Vec<SpecDoc>,
    /// Hook activations in declared order
    #[serde(default)]
    pub hooks: Vec<SpecDoc>,
}

/// Named activation with a free-form config map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecDoc {
    /// Middleware or hook name
    pub name: String,
    /// Free-form configuration
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
}

/// Parse one YAML rule document.
pub fn parse_ruleset(raw: &str) -> Result<RulesetDoc> {
    serde_yaml::from_str(raw).map_err(|e| CoreError::InvalidRuleConfig(e.to_string()))
}

/// Flatten a nested document into rules in declaration order.
///
/// Frontend patterns are left uncompiled; batch compilation is the cache's
/// job so a bad pattern can reject the whole batch.
pub fn flatten(doc: &RulesetDoc) -> Ruleset {
    let mut rules = Vec::new();
    for entry in &doc.rules {
        for backend in &entry.backends {
            for frontend in &backend.frontends {
                let middlewares = frontend
                    .middlewares
                    .iter()
                    .map(|s| MiddlewareSpec { name: s.name.clone(), config: s.config.clone() })
                    .collect();
                let hooks = frontend
                    .hooks
                    .iter()
                    .map(|s| HookSpec { name: s.name.clone(), config: s.config.clone() })
                    .collect();

                rules.push(Rule {
                    frontend: Frontend {
                        path: frontend.path.clone(),
                        method: frontend.method.clone(),
                        template: None,
                    },
                    backend: Backend {
                        url: backend.target.clone(),
                        namespace: backend.name.clone(),
                        prefix: backend.prefix.clone(),
                    },
                    middlewares: MiddlewareSpecs(middlewares),
                    hooks: HookSpecs(hooks),
                });
            }
        }
    }
    Ruleset { rules }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
rules:
  - backends:
      - name: ns1
        target: http://backend.local
        prefix: /edge
        frontends:
          - action: create_item
            path: /api/items
            method: POST
            middlewares:
              - name: authz
                config:
                  permissions:
                    - name: item_create
                      namespace: ns1
                      attribute: resource
            hooks:
              - name: authz
                config:
                  attributes:
                    resource:
                      type: json_payload
                      key: name
          - path: /api/items/{id}
            method: GET
"#;

    #[test]
    fn parses_and_flattens_in_declaration_order() {
        let doc = parse_ruleset(SAMPLE).unwrap();
        let ruleset = flatten(&doc);

        assert_eq!(ruleset.rules.len(), 2);
        let first = &ruleset.rules[0];
        assert_eq!(first.frontend.path, "/api/items");
        assert_eq!(first.frontend.method, "POST");
        assert_eq!(first.backend.namespace, "ns1");
        assert_eq!(first.backend.url, "http://backend.local");
        assert_eq!(first.backend.prefix, "/edge");
        assert!(first.middlewares.get("authz").is_some());
        assert!(first.hooks.get("authz").is_some());

        let second = &ruleset.rules[1];
        assert_eq!(second.frontend.path, "/api/items/{id}");
        assert!(second.middlewares.get("authz").is_none());
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(parse_ruleset("rules: [{backends: [}]").is_err());
    }

    #[test]
    fn empty_document_flattens_to_no_rules() {
        let ruleset = flatten(&parse_ruleset("rules: []").unwrap());
        assert!(ruleset.rules.is_empty());
    }
}
