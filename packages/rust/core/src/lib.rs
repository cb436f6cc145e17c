//! Reconciliation core for CommentKeeper.
//!
//! Derives each published post's canonical path, decides create/update/skip
//! per item against the stored bot annotations, sweeps orphans, and
//! orchestrates one pass end to end.

pub mod engine;
pub mod identity;
pub mod pipeline;

pub use engine::{Decision, Engine, ReconcileMode, SkipReason, decide};
pub use identity::{canonical_path, href_for, item_path, resolve_slug};
pub use pipeline::{PassContext, plan, plan_pass, reconcile, run_pass};
