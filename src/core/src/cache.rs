//! Rule source and the process-wide rule cache
//!
//! The cache holds the active ruleset as an atomic snapshot. Readers take
//! an `Arc` under a short-held lock and never block on a refresh in
//! progress; a refresh either fully replaces the snapshot or, on any
//! parse/compile error, leaves the previous one untouched.

use crate::config::{self, RulesetDoc};
use crate::error::Result;
use crate::rule::Rule;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Backing store for rule documents (file tree, object-storage blob,
/// relational table). Implemented outside the core.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Fetch every rule document.
    async fn get_all(&self) -> Result<Vec<RulesetDoc>>;

    /// Staleness probe: whether the store changed after `since`.
    async fn is_updated(&self, since: SystemTime) -> bool;
}

/// Shared, read-mostly cache of compiled rules.
///
/// Rules are stored behind individual `Arc`s so a match hands out a cheap
/// handle instead of cloning the rule and its compiled pattern.
pub struct RuleCache {
    source: Arc<dyn RuleSource>,
    rules: RwLock<Arc<Vec<Arc<Rule>>>>,
    refreshed_at: RwLock<Option<SystemTime>>,
}

impl RuleCache {
    /// Create an empty cache over a rule source.
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self {
            source,
            rules: RwLock::new(Arc::new(Vec::new())),
            refreshed_at: RwLock::new(None),
        }
    }

    /// Current snapshot. The lock is released before returning; the
    /// snapshot stays valid for the whole request even across refreshes.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Rule>>> {
        Arc::clone(&self.rules.read())
    }

    /// Replace the snapshot wholesale from the source.
    ///
    /// All-or-nothing: if any document fails to parse or any frontend
    /// pattern fails to compile, the previous snapshot is retained and the
    /// error returned.
    pub async fn refresh(&self) -> Result<()> {
        let docs = self.source.get_all().await?;
        let rules = compile_batch(&docs)?;

        let count = rules.len();
        *self.rules.write() = Arc::new(rules);
        *self.refreshed_at.write() = Some(SystemTime::now());
        debug!(rule_count = count, "rule cache refreshed");
        Ok(())
    }

    /// Spawn the background refresh task.
    ///
    /// The first tick fires immediately, so the task also performs the
    /// initial load. Refresh failures are logged and the previous snapshot
    /// kept (availability over freshness).
    pub fn start(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let refreshed_at = *self.refreshed_at.read();
                if let Some(since) = refreshed_at {
                    if !self.source.is_updated(since).await {
                        continue;
                    }
                }
                if let Err(err) = self.refresh().await {
                    warn!(error = %err, "rule cache refresh failed, keeping previous ruleset");
                }
            }
        })
    }
}

/// Flatten and compile a batch of documents.
fn compile_batch(docs: &[RulesetDoc]) -> Result<Vec<Arc<Rule>>> {
    let mut rules = Vec::new();
    for doc in docs {
        let mut ruleset = config::flatten(doc);
        for rule in &mut ruleset.rules {
            rule.compile()?;
        }
        rules.extend(ruleset.rules.into_iter().map(Arc::new));
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_ruleset;
    use anyhow::anyhow;
    use parking_lot::Mutex;

    struct StubSource {
        docs: Mutex<Result<Vec<RulesetDoc>>>,
        updated: bool,
    }

    impl StubSource {
        fn with_yaml(raw: &str) -> Arc<Self> {
            Arc::new(Self {
                docs: Mutex::new(Ok(vec![parse_ruleset(raw).unwrap()])),
                updated: true,
            })
        }

        fn set_yaml(&self, raw: &str) {
            *self.docs.lock() = Ok(vec![parse_ruleset(raw).unwrap()]);
        }

        fn set_error(&self) {
            *self.docs.lock() = Err(anyhow!("source unavailable").into());
        }
    }

    #[async_trait]
    impl RuleSource for StubSource {
        async fn get_all(&self) -> Result<Vec<RulesetDoc>> {
            match &*self.docs.lock() {
                Ok(docs) => Ok(docs.clone()),
                Err(err) => Err(anyhow!("{err}").into()),
            }
        }

        async fn is_updated(&self, _since: SystemTime) -> bool {
            self.updated
        }
    }

    const GOOD: &str = r#"
rules:
  - backends:
      - name: ns1
        target: http://backend.local
        frontends:
          - path: /api/items
            method: POST
"#;

    // second frontend carries an unterminated path parameter
    const BAD_PATTERN: &str = r#"
rules:
  - backends:
      - name: ns1
        target: http://backend.local
        frontends:
          - path: /api/items
            method: POST
          - path: /api/items/{id
            method: GET
"#;

    #[tokio::test]
    async fn refresh_replaces_snapshot() {
        let source = StubSource::with_yaml(GOOD);
        let cache = RuleCache::new(source);

        assert!(cache.snapshot().is_empty());
        cache.refresh().await.unwrap();

        let rules = cache.snapshot();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].frontend.template.is_some());
    }

    #[tokio::test]
    async fn bad_pattern_rejects_whole_batch() {
        let source = StubSource::with_yaml(GOOD);
        let cache = RuleCache::new(Arc::clone(&source) as Arc<dyn RuleSource>);
        cache.refresh().await.unwrap();

        source.set_yaml(BAD_PATTERN);
        assert!(cache.refresh().await.is_err());

        // previous snapshot intact, including the rule that would have
        // compiled fine on its own
        let rules = cache.snapshot();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].frontend.path, "/api/items");
    }

    #[tokio::test]
    async fn source_error_retains_previous_snapshot() {
        let source = StubSource::with_yaml(GOOD);
        let cache = RuleCache::new(Arc::clone(&source) as Arc<dyn RuleSource>);
        cache.refresh().await.unwrap();

        source.set_error();
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_survives_replacement() {
        let source = StubSource::with_yaml(GOOD);
        let cache = RuleCache::new(Arc::clone(&source) as Arc<dyn RuleSource>);
        cache.refresh().await.unwrap();

        let held = cache.snapshot();
        source.set_yaml("rules: []");
        cache.refresh().await.unwrap();

        assert_eq!(held.len(), 1);
        assert!(cache.snapshot().is_empty());
    }
}
