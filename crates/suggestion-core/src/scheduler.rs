use crate::config::EngineConfig;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Debounced trigger for analysis passes, keyed by tenant.
///
/// Content changes only reset a timestamp; the first change of a burst also
/// queues the tenant. The worker waits until a tenant has been quiet for the
/// debounce period, then runs one pass. Passes run one at a time.
pub struct PassScheduler {
    pending: Arc<DashMap<String, Instant>>,
    pass_tx: mpsc::Sender<String>,
    debounce: Duration,
}

impl PassScheduler {
    pub fn new(debounce: Duration) -> (Self, mpsc::Receiver<String>) {
        let (pass_tx, pass_rx) = mpsc::channel(1000);
        (
            Self {
                pending: Arc::new(DashMap::new()),
                pass_tx,
                debounce,
            },
            pass_rx,
        )
    }

    pub fn from_config(config: &EngineConfig) -> (Self, mpsc::Receiver<String>) {
        Self::new(config.debounce())
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub async fn on_content_change(&self, tenant: &str) {
        use dashmap::mapref::entry::Entry;
        // Check-and-insert in one step so two concurrent calls cannot both
        // queue the tenant.
        let is_new = match self.pending.entry(tenant.to_string()) {
            Entry::Occupied(mut e) => {
                e.insert(Instant::now());
                false
            }
            Entry::Vacant(e) => {
                e.insert(Instant::now());
                true
            }
        };
        if is_new {
            if let Err(e) = self.pass_tx.send(tenant.to_string()).await {
                tracing::error!("Pass scheduler channel send failed (worker gone?): {}", e);
            }
        }
    }

    pub fn is_pending(&self, tenant: &str) -> bool {
        self.pending.contains_key(tenant)
    }

    pub fn is_ready(&self, tenant: &str) -> bool {
        self.pending
            .get(tenant)
            .is_some_and(|changed| changed.elapsed() >= self.debounce)
    }

    /// Remove the tenant's entry if it has settled. A change arriving after
    /// this point queues a fresh pass.
    fn take_ready(&self, tenant: &str) -> bool {
        self.pending
            .remove_if(tenant, |_, changed| changed.elapsed() >= self.debounce)
            .is_some()
    }

    /// Drop every pending change, e.g. after a forced full pass.
    pub fn clear_pending(&self) {
        self.pending.clear();
    }

    /// Process the queue until every sender is gone, calling `run_pass` with
    /// the tenant once its changes have settled.
    pub async fn run_worker<F, Fut>(self: Arc<Self>, mut rx: mpsc::Receiver<String>, mut run_pass: F)
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = ()>,
    {
        tracing::info!("Pass scheduler worker started");
        while let Some(tenant) = rx.recv().await {
            let settled = loop {
                tokio::time::sleep(self.debounce).await;
                if self.take_ready(&tenant) {
                    break true;
                }
                if !self.pending.contains_key(&tenant) {
                    break false;
                }
            };
            if !settled {
                tracing::debug!("Pending pass for {} was cleared, skipping", tenant);
                continue;
            }
            tracing::debug!("Running suggestion pass for {}", tenant);
            run_pass(tenant).await;
        }
        tracing::info!("Pass scheduler worker stopped");
    }
}
