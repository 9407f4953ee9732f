use std::collections::HashSet;
use std::sync::Arc;

use alsync_core::{AlistClient, ApiError, FsEntry};
use thiserror::Error;

use super::conflict::{self, FileFacts, Verdict};
use super::deletion;
use super::filter::ExclusionFilter;
use super::observer::SyncObserver;
use super::paths::join_path;
use super::prune;
use super::tasks::TaskDeduplicator;

const DEFAULT_UTC_ASSUME_OFFSET_HOURS: i64 = 8;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("source directory does not exist: {0}")]
    SourceMissing(String),
    #[error("failed to process {name} in {dir}")]
    ItemFailed { dir: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAction {
    None,
    Delete,
    MoveToTrash,
}

/// One source -> destination reconciliation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPair {
    pub source: String,
    pub destination: String,
}

pub struct SyncPolicy {
    delete_action: DeleteAction,
    move_source: bool,
    filter: ExclusionFilter,
    utc_assume_offset_hours: i64,
}

impl SyncPolicy {
    pub fn new(delete_action: DeleteAction, move_source: bool, filter: ExclusionFilter) -> Self {
        // Move mode drains the source tree, so "destination extra" detection
        // is meaningless; the two options are mutually exclusive.
        let delete_action = if move_source {
            DeleteAction::None
        } else {
            delete_action
        };
        Self {
            delete_action,
            move_source,
            filter,
            utc_assume_offset_hours: DEFAULT_UTC_ASSUME_OFFSET_HOURS,
        }
    }

    pub fn with_utc_assume_offset(mut self, hours: i64) -> Self {
        self.utc_assume_offset_hours = hours;
        self
    }

    pub fn delete_action(&self) -> DeleteAction {
        self.delete_action
    }

    pub fn move_source(&self) -> bool {
        self.move_source
    }
}

/// Performs one source -> destination pass: depth-first over the source
/// tree with an explicit work stack, copying new and changed entries,
/// reconciling deletions, and (in move mode) pruning drained directories.
/// Holds no state between runs beyond what the remote service stores.
pub struct TreeReconciler {
    client: AlistClient,
    policy: SyncPolicy,
    observer: Arc<dyn SyncObserver>,
    tasks: TaskDeduplicator,
    mounts: Option<Vec<String>>,
}

impl TreeReconciler {
    pub fn new(client: AlistClient, policy: SyncPolicy, observer: Arc<dyn SyncObserver>) -> Self {
        Self {
            client,
            policy,
            observer,
            tasks: TaskDeduplicator::new(),
            mounts: None,
        }
    }

    pub async fn synchronize(&mut self, pair: &SyncPair) -> Result<(), SyncError> {
        self.refresh_in_flight().await;

        self.observer.info(&format!(
            "starting sync {} -> {}",
            pair.source, pair.destination
        ));
        if self.client.stat(&pair.source).await?.is_none() {
            return Err(SyncError::SourceMissing(pair.source.clone()));
        }
        self.ensure_directory(&pair.destination).await?;

        let mut stack = vec![(pair.source.clone(), pair.destination.clone())];
        while let Some((src_dir, dst_dir)) = stack.pop() {
            self.reconcile_directory(&src_dir, &dst_dir, &mut stack)
                .await?;
        }

        if self.policy.move_source() {
            prune::prune_empty(&self.client, self.observer.as_ref(), &pair.source).await;
        }

        self.observer.info(&format!(
            "finished sync {} -> {}",
            pair.source, pair.destination
        ));
        Ok(())
    }

    async fn reconcile_directory(
        &mut self,
        src_dir: &str,
        dst_dir: &str,
        stack: &mut Vec<(String, String)>,
    ) -> Result<(), SyncError> {
        if self.policy.filter.is_excluded(src_dir) {
            self.observer
                .info(&format!("excluded directory, skipping: {src_dir}"));
            return Ok(());
        }

        // A listing failure is treated like an empty directory; the branch
        // is skipped without failing the pass.
        let entries = match self.client.list(src_dir).await {
            Ok(entries) => entries,
            Err(err) => {
                self.observer
                    .warn(&format!("failed to list {src_dir}: {err}"));
                Vec::new()
            }
        };

        if self.policy.delete_action() != DeleteAction::None {
            let source_names: HashSet<String> =
                entries.iter().map(|entry| entry.name.clone()).collect();
            self.reconcile_deletions(dst_dir, &source_names).await;
        }

        for entry in &entries {
            if entry.is_dir {
                let src_child = join_path(src_dir, &entry.name);
                let dst_child = join_path(dst_dir, &entry.name);
                if let Err(err) = self.ensure_directory(&dst_child).await {
                    self.observer
                        .error(&format!("failed to create {dst_child}: {err}"));
                    return Err(SyncError::ItemFailed {
                        dir: src_dir.to_string(),
                        name: entry.name.clone(),
                    });
                }
                stack.push((src_child, dst_child));
            } else {
                self.reconcile_file(src_dir, dst_dir, entry).await?;
            }
        }
        Ok(())
    }

    async fn reconcile_file(
        &mut self,
        src_dir: &str,
        dst_dir: &str,
        entry: &FsEntry,
    ) -> Result<(), SyncError> {
        let src_path = join_path(src_dir, &entry.name);
        let dst_path = join_path(dst_dir, &entry.name);

        if !self.policy.filter.allows_name(&entry.name) {
            self.observer
                .info(&format!("no allow pattern matches {src_path}, skipping"));
            return Ok(());
        }
        if self.tasks.is_in_flight(src_dir, dst_dir, &src_path) {
            self.observer
                .info(&format!("copy already in flight for {src_path}, skipping"));
            return Ok(());
        }

        let destination = match self.client.stat(&dst_path).await {
            Ok(value) => value,
            Err(err) => {
                self.observer
                    .error(&format!("failed to stat {dst_path}: {err}"));
                return Err(self.item_failed(src_dir, &entry.name));
            }
        };
        let Some(destination) = destination else {
            return self.copy_file(src_dir, dst_dir, &entry.name).await;
        };

        let verdict = conflict::resolve(
            FileFacts {
                size: entry.size,
                modified: entry.modified.as_deref(),
            },
            FileFacts {
                size: destination.size,
                modified: destination.modified.as_deref(),
            },
            self.policy.move_source(),
            self.policy.utc_assume_offset_hours,
        );

        match verdict {
            Verdict::Skip => {
                self.observer
                    .info(&format!("destination up to date for {src_path}, skipping"));
                Ok(())
            }
            Verdict::SkipAndRemoveSource => {
                // Destination already holds this file; drain it from the source.
                if let Err(err) = self.client.remove(src_dir, &[&entry.name]).await {
                    self.observer
                        .error(&format!("failed to remove source file {src_path}: {err}"));
                    return Err(self.item_failed(src_dir, &entry.name));
                }
                self.observer
                    .info(&format!("removed drained source file {src_path}"));
                Ok(())
            }
            Verdict::Overwrite => {
                if let Err(err) = self.client.remove(dst_dir, &[&entry.name]).await {
                    self.observer
                        .error(&format!("failed to remove outdated {dst_path}: {err}"));
                    return Err(self.item_failed(src_dir, &entry.name));
                }
                self.copy_file(src_dir, dst_dir, &entry.name).await
            }
        }
    }

    async fn copy_file(&self, src_dir: &str, dst_dir: &str, name: &str) -> Result<(), SyncError> {
        match self.client.copy_entry(src_dir, dst_dir, name).await {
            Ok(()) => {
                self.observer
                    .info(&format!("copied {name} from {src_dir} to {dst_dir}"));
                Ok(())
            }
            Err(err) => {
                self.observer
                    .error(&format!("failed to copy {name} from {src_dir}: {err}"));
                Err(self.item_failed(src_dir, name))
            }
        }
    }

    /// Best-effort mirror of deletions: destination-only names are removed
    /// or quarantined per the policy. Failures are logged and never abort
    /// the parent traversal.
    async fn reconcile_deletions(&mut self, dst_dir: &str, source_names: &HashSet<String>) {
        let destination = match self.client.list(dst_dir).await {
            Ok(entries) => entries,
            Err(err) => {
                self.observer
                    .warn(&format!("failed to list {dst_dir} for deletion: {err}"));
                return;
            }
        };
        let extra = deletion::extra_names(
            source_names,
            destination.iter().map(|entry| entry.name.as_str()),
        );

        for name in &extra {
            match self.policy.delete_action() {
                DeleteAction::Delete => {
                    match self.client.remove(dst_dir, &[name]).await {
                        Ok(()) => self
                            .observer
                            .info(&format!("removed destination-only entry {dst_dir}/{name}")),
                        Err(err) => self
                            .observer
                            .warn(&format!("failed to remove {dst_dir}/{name}: {err}")),
                    };
                }
                DeleteAction::MoveToTrash => {
                    let mounts = self.storage_mounts().await;
                    let Some(trash_dir) = deletion::quarantine_dir(dst_dir, mounts) else {
                        self.observer.warn(&format!(
                            "no storage mount covers {dst_dir}, keeping {name}"
                        ));
                        continue;
                    };
                    if let Err(err) = self.ensure_directory(&trash_dir).await {
                        self.observer
                            .warn(&format!("failed to prepare quarantine {trash_dir}: {err}"));
                        continue;
                    }
                    match self.client.move_entry(dst_dir, &trash_dir, name).await {
                        Ok(()) => self
                            .observer
                            .info(&format!("quarantined {dst_dir}/{name} into {trash_dir}")),
                        Err(err) => self
                            .observer
                            .warn(&format!("failed to quarantine {dst_dir}/{name}: {err}")),
                    };
                }
                DeleteAction::None => {}
            }
        }
    }

    async fn ensure_directory(&self, path: &str) -> Result<(), ApiError> {
        if self.client.stat(path).await?.is_none() {
            self.client.mkdir(path).await?;
            self.observer.info(&format!("created directory {path}"));
        }
        Ok(())
    }

    /// Kicks a retry of previously failed copy tasks (result only logged)
    /// and snapshots the not-yet-finished ones for in-flight deduplication.
    async fn refresh_in_flight(&mut self) {
        if let Err(err) = self.client.retry_failed_copy_tasks().await {
            self.observer
                .warn(&format!("retry of failed copy tasks did not go through: {err}"));
        }
        match self.client.undone_copy_tasks().await {
            Ok(names) => self.tasks.load(names, self.observer.as_ref()),
            Err(err) => {
                self.observer
                    .warn(&format!("failed to fetch in-flight copy tasks: {err}"));
                self.tasks.clear();
            }
        }
    }

    /// Storage mounts are fetched lazily on first quarantine computation and
    /// cached for the rest of the run.
    async fn storage_mounts(&mut self) -> &[String] {
        if self.mounts.is_none() {
            let mounts = match self.client.storage_mounts().await {
                Ok(mounts) => mounts,
                Err(err) => {
                    self.observer
                        .warn(&format!("failed to fetch storage mounts: {err}"));
                    Vec::new()
                }
            };
            self.mounts = Some(mounts);
        }
        self.mounts.as_deref().unwrap_or(&[])
    }

    fn item_failed(&self, dir: &str, name: &str) -> SyncError {
        SyncError::ItemFailed {
            dir: dir.to_string(),
            name: name.to_string(),
        }
    }
}
