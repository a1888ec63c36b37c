use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::RetryPolicy;
use crate::locator::PhotoLocator;
use crate::model::photo_album::PhotoSet;

/// Re-reads an entity's photo set after a mutation.
///
/// An empty listing is retried after `policy.delay()` to ride out the
/// store's read-after-write lag. At most two passes are made per call,
/// however large `policy.max_attempts` is configured.
pub struct Reconciler {
    locator: Arc<PhotoLocator>,
    policy: RetryPolicy,
}

impl Reconciler {
    pub fn new(locator: Arc<PhotoLocator>, policy: RetryPolicy) -> Self {
        Reconciler { locator, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Returns `None` for a blank name, otherwise the last observed set.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self, name: &str) -> Option<PhotoSet> {
        let attempts = self.policy.attempts();
        let mut last = None;

        for attempt in 1..=attempts {
            let set = self.locator.locate_all(name).await?;
            if !set.is_empty() {
                tracing::debug!(attempt, count = set.len(), "reconciled photo set");
                return Some(set);
            }
            last = Some(set);

            if attempt < attempts {
                tracing::debug!(attempt, delay_ms = self.policy.delay_ms, "empty photo set, retrying");
                tokio::time::sleep(self.policy.delay()).await;
            }
        }

        tracing::info!("no photos after reconciliation");
        last
    }

    /// Runs [`Reconciler::reconcile`] as a detached task. Dropping the handle
    /// discards the result; the task still runs to completion.
    pub fn spawn(self: &Arc<Self>, name: impl Into<String>) -> JoinHandle<Option<PhotoSet>> {
        let this = Arc::clone(self);
        let name = name.into();
        tokio::spawn(async move { this.reconcile(&name).await })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{LocatorConfig, StoreConfig};
    use crate::store::MemoryStore;

    async fn reconciler(paths: Vec<&str>) -> (Arc<MemoryStore>, Arc<Reconciler>) {
        let store = Arc::new(MemoryStore::new(&StoreConfig::default()).with_objects(paths).await);
        let locator = Arc::new(PhotoLocator::new(store.clone(), LocatorConfig::default()));
        (store, Arc::new(Reconciler::new(locator, RetryPolicy::default())))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_once_after_an_empty_listing() {
        let (store, reconciler) = reconciler(vec!["Luna/luna1.jpg"]).await;
        // the first pass lists the root twice and probes two folders
        store.stall_listings(4).await;

        let started = tokio::time::Instant::now();
        let set = reconciler.reconcile("Luna").await.unwrap();
        assert_eq!(set.len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_two_attempts() {
        let (store, reconciler) = reconciler(vec![]).await;

        let set = reconciler.reconcile("Luna").await.unwrap();
        assert!(set.is_empty());
        let per_pass = store.calls() / 2;
        assert!(per_pass > 0);
        assert_eq!(store.calls(), per_pass * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_attempts_are_capped_at_two() {
        let store = Arc::new(MemoryStore::new(&StoreConfig::default()));
        let locator = Arc::new(PhotoLocator::new(store.clone(), LocatorConfig::default()));
        let single = Reconciler::new(locator.clone(), RetryPolicy { max_attempts: 1, delay_ms: 10 });
        single.reconcile("Luna").await.unwrap();
        let per_pass = store.calls();

        let eager = Reconciler::new(locator, RetryPolicy { max_attempts: 10, delay_ms: 10 });
        eager.reconcile("Luna").await.unwrap();
        assert_eq!(store.calls(), per_pass * 3);
    }

    #[tokio::test]
    async fn non_empty_set_needs_no_retry() {
        let (store, reconciler) = reconciler(vec!["Luna/luna1.jpg"]).await;
        reconciler.reconcile("Luna").await.unwrap();
        let first = store.calls();

        reconciler.reconcile("Luna").await.unwrap();
        assert_eq!(store.calls(), first * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_result_can_be_awaited_or_dropped() {
        let (_, reconciler) = reconciler(vec!["Tom/tom1.jpg"]).await;

        let handle = reconciler.spawn("Tom");
        let set = handle.await.unwrap().unwrap();
        assert_eq!(set.name(), "Tom");

        drop(reconciler.spawn("Nobody"));
    }
}
