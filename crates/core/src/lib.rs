//! Per-page CSS purging for static site builds
//!
//! This crate wires the pipeline together:
//! - Build and purge configuration ([`options`])
//! - The purge engine contract and selector extractors ([`engine`])
//! - Task planning from resolved routes ([`planner`])
//! - Concurrent execution with per-task outcomes ([`executor`])
//! - HTML rewriting and bundle cleanup ([`rewrite`])
//! - Host lifecycle hooks driving one build ([`session`])
//!
//! # Lifecycle
//!
//! A host creates a [`BuildSession`] per build and calls its [`BuildHooks`]
//! in order: configuration, module-parsed events, bundle ready, routes
//! resolved, build done. Only the last step touches the filesystem.

mod error;
pub mod engine;
pub mod executor;
pub mod options;
pub mod planner;
pub mod rewrite;
pub mod session;

pub use error::{Error, Result};

pub use engine::{
    CommandPurgeEngine, DefaultExtractor, PurgeEngine, PurgeRequest, PurgeResult, RegexExtractor,
    SelectorExtractor, extractor_for,
};
pub use executor::{BuildReport, TaskExecutor, TaskOutcome, TaskStatus};
pub use options::{BuildConfig, ContentSource, DEFAULT_ASSETS_DIR, OutputMode, PurgeOptions};
pub use planner::{AssetMap, PurgeContext, ResolvedRoute, RoutePart, Task, plan_tasks};
pub use rewrite::{OutputRewriter, rename_references, truncate_bundles};
pub use session::{BuildDone, BuildHooks, BuildSession, discover_bundles};
