//! Route matcher over a rule-cache snapshot

use http::Method;
use sentra_core::Rule;
use std::collections::HashMap;
use std::sync::Arc;

/// Matches inbound requests against the active ruleset.
///
/// Tie-break policy: first-declared-wins. Rules are scanned in ruleset
/// declaration order and the first frontend whose template and method both
/// match is selected; later overlapping patterns never shadow earlier ones.
pub struct RouteMatcher {
    rules: Arc<Vec<Arc<Rule>>>,
}

impl RouteMatcher {
    /// Matcher over one cache snapshot.
    pub fn new(rules: Arc<Vec<Arc<Rule>>>) -> Self {
        Self { rules }
    }

    /// Find the single rule matching `path` and `method`, along with the
    /// path-template variables it captured. No match is not an error.
    ///
    /// The returned handle shares the snapshot's allocation; matching never
    /// clones the rule or its compiled pattern.
    pub fn match_route(
        &self,
        path: &str,
        method: &Method,
    ) -> Option<(Arc<Rule>, HashMap<String, String>)> {
        for rule in self.rules.iter() {
            if !method_matches(&rule.frontend.method, method) {
                continue;
            }
            let Some(template) = rule.frontend.template.as_ref() else {
                continue;
            };
            if let Some(params) = template.captures(path) {
                return Some((Arc::clone(rule), params));
            }
        }
        None
    }
}

fn method_matches(rule_method: &str, method: &Method) -> bool {
    rule_method.is_empty() || rule_method.eq_ignore_ascii_case(method.as_str())
}
