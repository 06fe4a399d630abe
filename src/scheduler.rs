//! Deferred execution of thunks.
//!
//! Each scheduled thunk is dispatched to its own detached worker thread:
//! the caller returns immediately, the worker sleeps out the delay and then
//! applies the thunk in a fresh evaluator. Both the thunk and the calling
//! environment chain are snapshotted at dispatch time, so a scheduled task
//! never observes (or corrupts) mutations performed by the main task after
//! `schedule` returned. Pending tasks are abandoned on interpreter
//! shutdown; no ordering is guaranteed between tasks with equal delays.

use std::thread;
use std::time::Duration;

use crate::atom::Atom;
use crate::env::{Env, SnapshotMap};
use crate::eval::Evaluator;

/// Dispatches `thunk` to run after roughly `delay_ms` milliseconds.
///
/// The environment is snapshotted first and the thunk through the same
/// memo, so a thunk whose closure points into the calling chain lands on
/// the cloned frames and the snapshot forms one isolated graph.
pub fn spawn(thunk: &Atom, env: &Env, delay_ms: u64) {
    let mut seen = SnapshotMap::default();
    let env_snapshot = env.snapshot(&mut seen);
    let thunk_snapshot = thunk.snapshot(&mut seen);

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(delay_ms));
        let evaluator = Evaluator::new();
        let call = Atom::list(vec![thunk_snapshot]);
        if let Err(err) = evaluator.eval(&call, &env_snapshot) {
            eprintln!("[schedule] error: {}", err);
        }
    });
}
