//! Rule model: one routing + policy unit and its compiled matcher

use crate::error::{CoreError, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Compiled form of a frontend path pattern.
///
/// `{name}` placeholders become named captures matching a single path
/// segment; every other character is matched literally. The whole pattern
/// is anchored, so a template matches the full path or not at all.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    regex: Regex,
    params: Vec<String>,
}

impl RouteTemplate {
    /// Compile a path pattern into an anchored matcher.
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut expanded = String::with_capacity(pattern.len() + 16);
        let mut params = Vec::new();

        expanded.push('^');
        let mut rest = pattern;
        while let Some(open) = rest.find('{') {
            expanded.push_str(&regex::escape(&rest[..open]));
            let tail = &rest[open + 1..];
            let close = tail.find('}').ok_or_else(|| CoreError::InvalidRuleConfig(
                format!("unterminated path parameter in pattern {pattern:?}"),
            ))?;
            let name = &tail[..close];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(CoreError::InvalidRuleConfig(format!(
                    "invalid path parameter name {name:?} in pattern {pattern:?}"
                )));
            }
            expanded.push_str(&format!("(?P<{name}>[^/]+)"));
            params.push(name.to_string());
            rest = &tail[close + 1..];
        }
        expanded.push_str(&regex::escape(rest));
        expanded.push('$');

        let regex = Regex::new(&expanded).map_err(|source| CoreError::PatternCompile {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex, params })
    }

    /// Whether the template matches a full request path.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match a path and capture its template variables.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let mut vars = HashMap::with_capacity(self.params.len());
        for name in &self.params {
            if let Some(m) = caps.name(name) {
                vars.insert(name.clone(), m.as_str().to_string());
            }
        }
        Some(vars)
    }
}

/// Inbound matcher of a rule: path pattern plus HTTP method.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frontend {
    /// Path pattern, possibly containing `{param}` placeholders
    pub path: String,
    /// HTTP method; empty matches any method
    #[serde(default)]
    pub method: String,
    /// Matcher derived from `path` at load time
    #[serde(skip)]
    pub template: Option<RouteTemplate>,
}

/// Outbound target of a rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Backend {
    /// Backend base URL
    pub url: String,
    /// Authorization namespace the backend's resources live in
    #[serde(default)]
    pub namespace: String,
    /// Path prefix stripped before forwarding
    #[serde(default)]
    pub prefix: String,
}

/// Named middleware activation with free-form per-name configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiddlewareSpec {
    /// Middleware name
    pub name: String,
    /// Free-form key/value configuration, decoded into a typed struct at use
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
}

/// Ordered middleware activations for one rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiddlewareSpecs(pub Vec<MiddlewareSpec>);

impl MiddlewareSpecs {
    /// First spec whose name matches; duplicates are never deduplicated.
    pub fn get(&self, name: &str) -> Option<&MiddlewareSpec> {
        self.0.iter().find(|s| s.name == name)
    }
}

/// Named hook activation with free-form per-name configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookSpec {
    /// Hook name
    pub name: String,
    /// Free-form key/value configuration, decoded into a typed struct at use
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
}

/// Ordered hook activations for one rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookSpecs(pub Vec<HookSpec>);

impl HookSpecs {
    /// First spec whose name matches; duplicates are never deduplicated.
    pub fn get(&self, name: &str) -> Option<&HookSpec> {
        self.0.iter().find(|s| s.name == name)
    }
}

/// One routing + policy unit: a frontend matcher, a backend target, and
/// the ordered middleware/hook activations that apply to matched traffic.
///
/// Rules are held immutably for the lifetime of a cache generation and
/// replaced wholesale on refresh.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rule {
    /// Inbound matcher
    pub frontend: Frontend,
    /// Outbound target
    pub backend: Backend,
    /// Request-phase middleware activations, in declared order
    #[serde(default)]
    pub middlewares: MiddlewareSpecs,
    /// Response-phase hook activations, in declared order
    #[serde(default)]
    pub hooks: HookSpecs,
}

impl Rule {
    /// Compile the frontend pattern in place.
    pub fn compile(&mut self) -> Result<()> {
        self.frontend.template = Some(RouteTemplate::compile(&self.frontend.path)?);
        Ok(())
    }
}

/// A batch of rules loaded from one configuration document.
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    /// Rules in declaration order
    pub rules: Vec<Rule>,
}
