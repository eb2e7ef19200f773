//! Concurrent execution of purge tasks.
//!
//! Keys are derived for every task up front. Tasks sharing a key form a
//! group that runs sequentially, so later pages of a group replay the cache
//! entry written by the first one. Groups run concurrently on a [`JoinSet`].

use crate::engine::PurgeEngine;
use crate::planner::{PurgeContext, Task};
use crate::rewrite::{OutputRewriter, read_html, references_cached_bundle};
use crate::Result;
use futures::future::join_all;
use sitepurge_cache::CacheKey;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Rewritten from a cache entry without calling the engine.
    CacheHit,
    /// Purged by the engine and cached.
    Purged,
    /// The task failed; its HTML was left untouched.
    Failed {
        /// Rendered error.
        error: String,
    },
}

/// Result of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// HTML file the task worked on.
    pub output_path: PathBuf,
    /// Key of the task, absent when it could not be derived.
    pub cache_key: Option<CacheKey>,
    /// How the task finished.
    pub status: TaskStatus,
    /// Stylesheets written by the task.
    pub written: Vec<PathBuf>,
}

impl TaskOutcome {
    fn failed(output_path: PathBuf, cache_key: Option<CacheKey>, error: impl ToString) -> Self {
        Self {
            output_path,
            cache_key,
            status: TaskStatus::Failed {
                error: error.to_string(),
            },
            written: Vec::new(),
        }
    }

    /// Whether the task failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.status, TaskStatus::Failed { .. })
    }
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Whether the pipeline was skipped (non-static output).
    pub skipped: bool,
    /// Per-task outcomes, sorted by output path.
    pub outcomes: Vec<TaskOutcome>,
    /// Bundles emptied during cleanup.
    pub truncated: Vec<PathBuf>,
}

impl BuildReport {
    /// Report for a build the pipeline did not touch.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    fn count(&self, f: impl Fn(&TaskStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }

    /// Tasks replayed from the cache.
    #[must_use]
    pub fn cache_hits(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::CacheHit))
    }

    /// Tasks purged by the engine.
    #[must_use]
    pub fn purged(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Purged))
    }

    /// Tasks that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Failed { .. }))
    }

    /// Whether every task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Every stylesheet written by a task.
    #[must_use]
    pub fn written_files(&self) -> HashSet<PathBuf> {
        self.outcomes
            .iter()
            .flat_map(|o| o.written.iter().cloned())
            .collect()
    }
}

/// Runs purge tasks against one engine and output tree.
#[derive(Clone)]
pub struct TaskExecutor {
    engine: Arc<dyn PurgeEngine>,
    rewriter: OutputRewriter,
    context: Arc<PurgeContext>,
}

impl TaskExecutor {
    /// Executor purging with `engine` and rewriting through `rewriter`.
    #[must_use]
    pub fn new(engine: Arc<dyn PurgeEngine>, rewriter: OutputRewriter, context: PurgeContext) -> Self {
        Self {
            engine,
            rewriter,
            context: Arc::new(context),
        }
    }

    /// Run every task, isolating failures per task.
    pub async fn run(&self, tasks: Vec<Task>) -> Vec<TaskOutcome> {
        info!("Purge started for {} pages", tasks.len());

        let keys = join_all(tasks.iter().map(|task| task.cache_key(&self.context))).await;

        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut groups: BTreeMap<CacheKey, Vec<Task>> = BTreeMap::new();
        for (task, key) in tasks.into_iter().zip(keys) {
            match key {
                Ok(key) => groups.entry(key).or_default().push(task),
                Err(e) => {
                    warn!(output = %task.output_path.display(), error = %e, "Failed to derive cache key");
                    outcomes.push(TaskOutcome::failed(task.output_path, None, e));
                }
            }
        }

        let mut join_set = JoinSet::new();
        let mut members: HashMap<tokio::task::Id, (CacheKey, Vec<PathBuf>)> = HashMap::new();
        for (key, group) in groups {
            let paths = group.iter().map(|t| t.output_path.clone()).collect();
            let executor = self.clone();
            let group_key = key.clone();
            let handle = join_set.spawn(async move { executor.run_group(&group_key, group).await });
            members.insert(handle.id(), (key, paths));
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, group_outcomes)) => outcomes.extend(group_outcomes),
                Err(e) => {
                    let Some((key, paths)) = members.remove(&e.id()) else {
                        continue;
                    };
                    warn!(key = %key, error = %e, "Purge task group panicked");
                    let message = format!("Purge task panicked: {e}");
                    outcomes.extend(
                        paths
                            .into_iter()
                            .map(|path| TaskOutcome::failed(path, Some(key.clone()), &message)),
                    );
                }
            }
        }

        outcomes.sort_by(|a, b| a.output_path.cmp(&b.output_path));
        outcomes
    }

    async fn run_group(&self, key: &CacheKey, group: Vec<Task>) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(group.len());
        for task in group {
            let outcome = match self.run_task(key, &task).await {
                Ok((status, written)) => {
                    debug!(output = %task.output_path.display(), key = %key, status = ?status, "Purged page");
                    TaskOutcome {
                        output_path: task.output_path,
                        cache_key: Some(key.clone()),
                        status,
                        written,
                    }
                }
                Err(e) => {
                    warn!(output = %task.output_path.display(), key = %key, error = %e, "Purge failed");
                    TaskOutcome::failed(task.output_path, Some(key.clone()), e)
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn run_task(&self, key: &CacheKey, task: &Task) -> Result<(TaskStatus, Vec<PathBuf>)> {
        let html = read_html(&task.output_path).await?;
        let entries = self.rewriter.cache().get(key);
        if references_cached_bundle(&html, &entries) {
            let written = self
                .rewriter
                .apply_cached(&task.output_path, html, &entries)
                .await?;
            return Ok((TaskStatus::CacheHit, written));
        }
        if !entries.is_empty() {
            debug!(output = %task.output_path.display(), key = %key, "Cached bundles no longer linked, purging again");
        }

        let request = task.purge_request(&self.context, &html);
        let results = self.engine.purge(&request).await?;
        let written = self
            .rewriter
            .apply_purged(key, &task.output_path, html, &results)
            .await?;
        Ok((TaskStatus::Purged, written))
    }
}
