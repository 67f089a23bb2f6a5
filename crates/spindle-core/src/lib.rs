//! spindle-core
//!
//! In-process asynchronous task manager. Callers submit units of work, a
//! fixed pool of workers executes them under per-attempt deadlines, and
//! every task stays queryable, cancellable, and (when failed) retryable
//! for the lifetime of the process.
//!
//! Modules:
//! - **task**: task domain (id, status state machine, record, cancel token)
//! - **registry**: shared id -> record store, the single source of truth
//! - **queue**: bounded FIFO of ids connecting submission to execution
//! - **worker**: the worker pool and the per-attempt execution loop
//! - **workload**: injectable unit-of-work abstraction + synthetic impl
//! - **retry**: attempt policy (deadline, retry ceiling, backoff)
//! - **manager**: submit/status/cancel/list/retry/stop orchestration
//! - **error**: caller-visible error taxonomy

pub mod error;
pub mod manager;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod task;
pub mod worker;
pub mod workload;
