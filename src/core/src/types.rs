//! Synthesized authorization-graph types and per-rule policy declarations

use crate::expression::Expression;
use serde::Deserialize;

/// A node in the external authorization graph, synthesized from extracted
/// attributes after a permitted call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    /// Canonical id, assigned by the resource service on upsert
    pub id: String,
    /// Resource name
    pub name: String,
    /// Owning project
    pub project_id: String,
    /// Namespace the resource lives in (`backend_namespace/resource_type`)
    pub namespace_id: String,
}

/// Object side of a relation edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    /// Resource id
    pub id: String,
    /// Resource namespace
    pub namespace_id: String,
}

/// Subject side of a relation edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    /// Principal id, possibly a human-facing reference before transformation
    pub id: String,
    /// Role granted to the subject on the object
    pub role_id: String,
    /// Principal namespace (user, group, ...)
    pub namespace: String,
}

/// An edge in the external authorization graph linking a synthesized
/// resource to a principal under a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationV2 {
    /// The resource end of the edge
    pub object: Object,
    /// The principal end of the edge
    pub subject: Subject,
}

/// One permission to check during the authorization middleware.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Permission {
    /// Permission name checked against the authority
    pub name: String,
    /// Namespace of the target resource
    #[serde(default)]
    pub namespace: String,
    /// Which extracted attribute names the target resource
    #[serde(default)]
    pub attribute: String,
    /// Optional conditional gate; empty means always check
    #[serde(default)]
    pub expression: Expression,
}

/// One relation to synthesize during the response hook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationSpec {
    /// Role granted on the synthesized resource
    pub role: String,
    /// Principal namespace of the subject
    #[serde(default)]
    pub subject_principal: String,
    /// Extracted attribute holding the subject id
    #[serde(default, rename = "subject_id_attribute")]
    pub subject_id_attribute: String,
}

/// Namespace id of a synthesized resource.
pub fn namespace_id(backend_namespace: &str, resource_type: &str) -> String {
    format!("{backend_namespace}/{resource_type}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_id_joins_backend_and_type() {
        assert_eq!(namespace_id("ns1", "kind"), "ns1/kind");
    }

    #[test]
    fn permission_yaml_shape() {
        let p: Permission = serde_yaml::from_str(
            "name: item_create\nnamespace: ns1\nattribute: resource\n",
        )
        .unwrap();
        assert_eq!(p.name, "item_create");
        assert!(p.expression.is_empty());
    }

    #[test]
    fn relation_spec_yaml_shape() {
        let r: RelationSpec = serde_yaml::from_str(
            "role: owner\nsubject_principal: user\nsubject_id_attribute: user\n",
        )
        .unwrap();
        assert_eq!(r.role, "owner");
        assert_eq!(r.subject_id_attribute, "user");
    }
}
