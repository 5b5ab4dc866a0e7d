//! Failure counters for the synthesis side channel

use prometheus::{IntCounterVec, Opts, Registry};

/// Counters incremented synchronously on the hook chain's failure paths.
#[derive(Clone)]
pub struct ProxyMetrics {
    /// Resource upsert/synthesis failures, tagged with request method and
    /// response status
    pub(crate) resource_creation_failed: IntCounterVec,
    /// Relation creation failures, tagged with role and subject principal
    pub(crate) relation_creation_failed: IntCounterVec,
}

impl ProxyMetrics {
    /// Build the counter vectors. They are not registered anywhere yet;
    /// call [`ProxyMetrics::register_on`] with the host's registry.
    pub fn new() -> prometheus::Result<Self> {
        let resource_creation_failed = IntCounterVec::new(
            Opts::new(
                "sentra_proxy_resource_creation_failed_total",
                "Resources the authz hook failed to synthesize",
            ),
            &["method", "status"],
        )?;
        let relation_creation_failed = IntCounterVec::new(
            Opts::new(
                "sentra_proxy_relation_creation_failed_total",
                "Relations the authz hook failed to create",
            ),
            &["role", "subject_principal"],
        )?;
        Ok(Self { resource_creation_failed, relation_creation_failed })
    }

    /// Register both counters on `registry`.
    pub fn register_on(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.resource_creation_failed.clone()))?;
        registry.register(Box::new(self.relation_creation_failed.clone()))?;
        Ok(())
    }

    /// Current resource-failure count for a label pair. Mostly useful in
    /// tests and health probes.
    pub fn resource_failures(&self, method: &str, status: &str) -> u64 {
        self.resource_creation_failed.with_label_values(&[method, status]).get()
    }

    /// Current relation-failure count for a label pair.
    pub fn relation_failures(&self, role: &str, subject_principal: &str) -> u64 {
        self.relation_creation_failed.with_label_values(&[role, subject_principal]).get()
    }
}
