//! Cleanup sweep for completed todos.
//!
//! # Invariants
//! - Only todos seen as done in the initial snapshot are deleted; todos
//!   completed during the sweep wait for the next run.
//! - All deletes of one sweep commit together or not at all.
//! - A sweep with nothing to delete performs no writes.

use crate::repo::todo_repo::{RepoResult, TodoQuery, TodoRepository};
use log::{error, info};
use std::time::{Duration, Instant};

/// Cadence of the scheduled sweep.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10);

/// Deletes every todo currently marked done and returns how many were removed.
///
/// This is the single implementation behind both the on-demand executable and
/// the scheduled job.
pub fn clean_done_todos(repo: &dyn TodoRepository) -> RepoResult<usize> {
    let started_at = Instant::now();
    let ids: Vec<_> = repo
        .list_todos(&TodoQuery::done(true))?
        .into_iter()
        .map(|todo| todo.id)
        .collect();

    if ids.is_empty() {
        return Ok(0);
    }

    let mut removed = 0;
    let result = repo.run_in_transaction(&mut |scoped| {
        removed = 0;
        for id in &ids {
            // Already gone counts as success.
            if scoped.delete_todo(*id)? {
                removed += 1;
            }
        }
        Ok(())
    });

    match result {
        Ok(()) => {
            info!(
                "event=todo_cleanup module=service status=ok matched={} removed={} duration_ms={}",
                ids.len(),
                removed,
                started_at.elapsed().as_millis()
            );
            Ok(removed)
        }
        Err(err) => {
            error!(
                "event=todo_cleanup module=service status=error matched={} error={}",
                ids.len(),
                err
            );
            Err(err)
        }
    }
}
