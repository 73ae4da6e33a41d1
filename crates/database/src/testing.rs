//! An in-memory pool that plays back scripted outcomes.

use crate::failure::DbFailure;
use crate::pool::{ConnectionPool, PoolFactory};
use async_trait::async_trait;
use core_types::{QueryRequest, Rows};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Script {
    queries: Mutex<VecDeque<Result<Rows, DbFailure>>>,
    /// Played once `queries` runs dry. `None` means an empty success.
    steady: Mutex<Option<Result<Rows, DbFailure>>>,
    pings: Mutex<VecDeque<Result<(), DbFailure>>>,
    calls: AtomicUsize,
    built: AtomicUsize,
    closed: AtomicUsize,
    seen: Mutex<Vec<QueryRequest>>,
}

/// Every pool it builds shares one script, so outcomes carry across rebuilds.
#[derive(Clone, Default)]
pub(crate) struct ScriptedFactory {
    script: Arc<Script>,
}

impl ScriptedFactory {
    /// Queues outcomes for successive `fetch_all` calls.
    pub(crate) fn queue(self, outcomes: impl IntoIterator<Item = Result<Rows, DbFailure>>) -> Self {
        self.script.queries.lock().extend(outcomes);
        self
    }

    /// Outcome for every call after the queue is exhausted.
    pub(crate) fn always(self, outcome: Result<Rows, DbFailure>) -> Self {
        *self.script.steady.lock() = Some(outcome);
        self
    }

    pub(crate) fn pings(self, outcomes: impl IntoIterator<Item = Result<(), DbFailure>>) -> Self {
        self.script.pings.lock().extend(outcomes);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn built(&self) -> usize {
        self.script.built.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.script.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<QueryRequest> {
        self.script.seen.lock().clone()
    }
}

pub(crate) struct ScriptedPool {
    script: Arc<Script>,
    closed: AtomicBool,
}

impl PoolFactory for ScriptedFactory {
    type Pool = ScriptedPool;

    fn build(&self) -> ScriptedPool {
        self.script.built.fetch_add(1, Ordering::SeqCst);
        ScriptedPool { script: Arc::clone(&self.script), closed: AtomicBool::new(false) }
    }
}

#[async_trait]
impl ConnectionPool for ScriptedPool {
    async fn fetch_all(&self, request: &QueryRequest) -> Result<Rows, DbFailure> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        self.script.seen.lock().push(request.clone());
        if let Some(outcome) = self.script.queries.lock().pop_front() {
            return outcome;
        }
        self.script.steady.lock().clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ping(&self) -> Result<(), DbFailure> {
        self.script.pings.lock().pop_front().unwrap_or(Ok(()))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.script.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Builds a row from `(column, value)` pairs.
pub(crate) fn row(pairs: &[(&str, serde_json::Value)]) -> core_types::Row {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}
