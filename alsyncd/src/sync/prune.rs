use alsync_core::AlistClient;

use super::observer::SyncObserver;
use super::paths::{join_path, split_parent};

/// Removes directories left empty under `root` after a move-oriented pass.
/// Directories are collected depth-first (ancestors always recorded before
/// their descendants), then swept child-first so a parent emptied by its
/// children's removal is itself removed. `root` is never touched.
/// Best-effort throughout: listing or removal failures leave the directory
/// in place.
pub async fn prune_empty(client: &AlistClient, observer: &dyn SyncObserver, root: &str) {
    let mut collected = Vec::new();
    let mut stack = vec![root.to_string()];
    while let Some(dir) = stack.pop() {
        let entries = match client.list(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                observer.warn(&format!("failed to list {dir} while pruning: {err}"));
                continue;
            }
        };
        for entry in entries.iter().filter(|entry| entry.is_dir) {
            let child = join_path(&dir, &entry.name);
            collected.push(child.clone());
            stack.push(child);
        }
    }

    for dir in collected.iter().rev() {
        let empty = match client.list(dir).await {
            Ok(entries) => entries.is_empty(),
            Err(_) => false,
        };
        if !empty {
            continue;
        }
        let Some((parent, name)) = split_parent(dir) else {
            continue;
        };
        match client.remove(&parent, &[&name]).await {
            Ok(()) => observer.info(&format!("removed empty directory {dir}")),
            Err(err) => observer.warn(&format!("failed to remove empty directory {dir}: {err}")),
        }
    }
}
