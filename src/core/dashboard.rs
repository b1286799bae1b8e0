//! Owns the state behind the asset dashboard: the last fetched forest, the
//! user's selection and the handles it needs to talk to the backend.
//!
//! Every mutation goes through the backend first and, on success, the whole
//! forest is fetched and rebuilt again. The tree is never patched locally.

use crate::core::api::AssetApi;
use crate::core::currency::CurrencyRateProvider;
use crate::core::distribution::{Distribution, compute_distribution, distribution_nodes};
use crate::core::error::{ApiError, Result};
use crate::core::mutation::{
    AssetDraft, AssetUpdate, BatchReport, MoveTarget, NewAsset, check_move,
};
use crate::core::notice::{Notice, Notifier};
use crate::core::selection::Selection;
use crate::core::task::BackgroundTask;
use crate::core::tree::{Forest, build_tree_with_orphans};
use crate::core::valuation::converted_total_value;
use crate::providers::util::with_retry;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

const FETCH_RETRIES: usize = 2;
const FETCH_RETRY_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded { nodes: usize },
    /// Another refresh was still running, nothing was fetched
    AlreadyPending,
}

/// Clears the pending flag when the refresh finishes, however it finishes.
struct PendingGuard<'a>(&'a AtomicBool);

impl<'a> PendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Dashboard {
    api: Arc<dyn AssetApi>,
    rates: Arc<dyn CurrencyRateProvider + Send + Sync>,
    notifier: Arc<dyn Notifier>,
    user_id: String,
    forest: RwLock<Forest>,
    selection: Mutex<Selection>,
    refreshing: AtomicBool,
    generation: AtomicU64,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn AssetApi>,
        rates: Arc<dyn CurrencyRateProvider + Send + Sync>,
        notifier: Arc<dyn Notifier>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            rates,
            notifier,
            user_id: user_id.into(),
            forest: RwLock::new(Forest::default()),
            selection: Mutex::new(Selection::new()),
            refreshing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            last_refresh: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Fetches and rebuilds the forest unless a refresh is already running.
    pub async fn reload(&self) -> Result<ReloadOutcome> {
        let Some(_guard) = PendingGuard::acquire(&self.refreshing) else {
            debug!("Refresh already pending, skipping");
            return Ok(ReloadOutcome::AlreadyPending);
        };
        let nodes = self.fetch_and_rebuild().await?;
        Ok(ReloadOutcome::Reloaded { nodes })
    }

    /// Fetches and rebuilds the forest regardless of any pending refresh.
    /// Returns the number of nodes in the new forest.
    pub async fn force_reload(&self) -> Result<usize> {
        self.fetch_and_rebuild().await
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    async fn fetch_and_rebuild(&self) -> Result<usize> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, user = %self.user_id, "Fetching assets");

        let fetched = with_retry(
            || self.api.list_assets(&self.user_id),
            FETCH_RETRIES,
            FETCH_RETRY_DELAY_MS,
        )
        .await;

        if self.generation.load(Ordering::Acquire) != generation {
            debug!(generation, "Reload superseded by a newer one");
            return Err(ApiError::Cancelled);
        }

        match fetched {
            Ok(records) => {
                let (forest, orphans) = build_tree_with_orphans(&records);
                for orphan in &orphans {
                    warn!(
                        id = %orphan.id,
                        parent = orphan.parent_id.as_deref().unwrap_or_default(),
                        "Asset is not reachable from any root, leaving it out"
                    );
                }
                let nodes = forest.node_count();
                *self.forest.write().await = forest;
                self.lock_selection().clear();
                *self.last_refresh.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(Utc::now());
                info!(records = records.len(), nodes, "Asset tree rebuilt");
                Ok(nodes)
            }
            Err(err) => {
                // any failed fetch leaves the tree without data
                *self.forest.write().await = Forest::default();
                if !err.is_benign() {
                    self.notifier.notify(Notice::Disconnected(err.to_string()));
                }
                Err(err)
            }
        }
    }

    /// Turns a backend failure into a notice. Benign errors stay silent.
    fn report(&self, err: &ApiError) {
        if err.is_benign() {
            return;
        }
        let notice = if err.is_disconnected() {
            Notice::Disconnected(err.to_string())
        } else {
            Notice::OperationFailed(err.to_string())
        };
        self.notifier.notify(notice);
    }

    /// Sends a backend call and reports its failure, leaving state untouched.
    async fn submit<F>(&self, call: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        call.await.inspect_err(|err| self.report(err))
    }

    /// Reload that follows a successful mutation. Its error has already been
    /// reported, the mutation itself still succeeded.
    async fn refresh_after_mutation(&self) {
        match self.force_reload().await {
            Ok(_) | Err(ApiError::Cancelled) => {}
            Err(err) => debug!("Reload after mutation failed: {err}"),
        }
    }

    pub async fn forest(&self) -> Forest {
        self.forest.read().await.clone()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total value of the forest converted into `target_currency`.
    ///
    /// Works on a snapshot so slow rate lookups never hold up a reload.
    pub async fn total(&self, target_currency: &str) -> f64 {
        let forest = self.forest().await;
        let mut total = 0.0;
        for root in &forest.roots {
            total += converted_total_value(root, &*self.rates, target_currency).await;
        }
        total
    }

    /// Breakdown for the current selection.
    pub async fn distribution(&self, target_currency: &str) -> Distribution {
        let selection = self.selection();
        let forest = self.forest().await;
        let nodes = distribution_nodes(&selection, &forest);
        let mut distribution = compute_distribution(&nodes, &*self.rates, target_currency).await;
        distribution.filtered = !selection.is_empty();
        distribution
    }

    fn lock_selection(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn selection(&self) -> Selection {
        self.lock_selection().clone()
    }

    pub fn select(&self, id: impl Into<String>) {
        self.lock_selection().insert(id);
    }

    pub fn toggle(&self, id: &str) {
        self.lock_selection().toggle(id);
    }

    pub fn clear_selection(&self) {
        self.lock_selection().clear();
    }

    /// Moves a single node. Returns `Ok(false)` for a no-op move, which
    /// issues no call.
    pub async fn move_node(&self, node_id: &str, target: &MoveTarget) -> Result<bool> {
        let changed = check_move(&*self.forest.read().await, node_id, target)?;
        if !changed {
            debug!(node = node_id, %target, "Node already under target");
            return Ok(false);
        }

        let update = AssetUpdate::reparent(node_id, &self.user_id, target);
        self.submit(self.api.update_asset(&update)).await?;
        info!(node = node_id, %target, "Moved asset");
        self.refresh_after_mutation().await;
        Ok(true)
    }

    /// Moves `dragged_id`, or the whole selection when the dragged node is
    /// part of a multi-node selection. Moves run one after another and are
    /// not rolled back when one of them fails.
    pub async fn move_selected(&self, dragged_id: &str, target: &MoveTarget) -> Result<BatchReport> {
        let selection = self.selection();
        let ids = if selection.len() > 1 && selection.contains(dragged_id) {
            selection.to_vec()
        } else {
            vec![dragged_id.to_string()]
        };
        self.move_many(&ids, target).await
    }

    pub async fn move_many(&self, ids: &[String], target: &MoveTarget) -> Result<BatchReport> {
        let forest = self.forest().await;
        let mut report = BatchReport::default();

        for id in ids {
            match check_move(&forest, id, target) {
                Ok(false) => report.unchanged.push(id.clone()),
                Ok(true) => {
                    let update = AssetUpdate::reparent(id, &self.user_id, target);
                    match self.api.update_asset(&update).await {
                        Ok(()) => report.succeeded.push(id.clone()),
                        Err(err) => {
                            warn!(node = %id, "Move failed: {err}");
                            report.failed.push((id.clone(), err));
                        }
                    }
                }
                Err(err) => {
                    debug!(node = %id, "Move rejected locally: {err}");
                    report.failed.push((id.clone(), err));
                }
            }
        }

        self.finish_batch("Moved", &report).await;
        Ok(report)
    }

    pub async fn delete_many(&self, ids: &[String]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for id in ids {
            match self.api.delete_asset(id, &self.user_id).await {
                Ok(()) => report.succeeded.push(id.clone()),
                Err(err) => {
                    warn!(node = %id, "Delete failed: {err}");
                    report.failed.push((id.clone(), err));
                }
            }
        }
        self.finish_batch("Deleted", &report).await;
        Ok(report)
    }

    async fn finish_batch(&self, verb: &str, report: &BatchReport) {
        let message = if report.is_complete_success() {
            format!("{verb} {} asset(s)", report.success_count())
        } else {
            format!(
                "{verb} {} asset(s), {} failed",
                report.success_count(),
                report.failure_count()
            )
        };
        self.notifier.notify(Notice::Info(message));

        if report.success_count() > 0 {
            self.refresh_after_mutation().await;
        }
        if report.is_complete_success() {
            self.lock_selection().clear();
        }
    }

    pub async fn add_group(&self, name: &str, parent_id: Option<&str>) -> Result<()> {
        if let Some(parent) = parent_id {
            self.ensure_group(parent).await?;
        }
        let asset = NewAsset::group(name, parent_id, &self.user_id)?;
        self.submit(self.api.add_asset(&asset)).await?;
        info!(name, "Added group");
        self.refresh_after_mutation().await;
        Ok(())
    }

    pub async fn add_asset(&self, draft: &AssetDraft) -> Result<()> {
        let asset = NewAsset::from_draft(draft, &self.user_id)?;
        self.ensure_group(&draft.parent_id).await?;
        self.submit(self.api.add_asset(&asset)).await?;
        info!(name = %asset.description, kind = %asset.kind, "Added asset");
        self.refresh_after_mutation().await;
        Ok(())
    }

    async fn ensure_group(&self, id: &str) -> Result<()> {
        let forest = self.forest.read().await;
        match forest.find(id) {
            Some(node) if node.is_group() => Ok(()),
            Some(_) => Err(ApiError::InvalidTarget(id.to_string())),
            None => Err(ApiError::NotFound(id.to_string())),
        }
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<()> {
        let update = AssetUpdate::rename(id, &self.user_id, name)?;
        if self.forest.read().await.find(id).is_none() {
            return Err(ApiError::NotFound(id.to_string()));
        }
        self.submit(self.api.update_asset(&update)).await?;
        self.refresh_after_mutation().await;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.submit(self.api.delete_asset(id, &self.user_id)).await?;
        info!(id, "Deleted asset");
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Periodically reloads the forest until the returned handle is stopped
    /// or dropped. Ticks that find a refresh still pending are skipped.
    pub fn start_auto_refresh(self: &Arc<Self>, interval: Duration) -> BackgroundTask {
        let dashboard = Arc::clone(self);
        BackgroundTask::spawn("auto-refresh", async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match dashboard.reload().await {
                    Ok(outcome) => debug!(?outcome, "Auto refresh"),
                    Err(err) => debug!("Auto refresh failed: {err}"),
                }
            }
        })
    }
}
