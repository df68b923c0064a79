// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Coalescing of concurrent identical work.
//!
//! Callers that ask for the same key while a run is in flight wait for that
//! run and receive a clone of its result. Once the run finishes the key is
//! forgotten, so results (including failures) are never reused by later
//! callers. If the caller driving a run is dropped, one of the remaining
//! waiters starts the work again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;

/// Result of [`SingleFlight::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight<T> {
    pub value: T,
    /// `true` when another caller did the work
    pub shared: bool,
}

type Calls<T> = HashMap<String, Arc<OnceCell<T>>>;

pub struct SingleFlight<T> {
    calls: Mutex<Calls<T>>,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key`, or join the run already in flight for it.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = self
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let mut led = false;
        let value = cell
            .get_or_init(|| {
                led = true;
                work()
            })
            .await
            .clone();

        let mut calls = self.lock();
        if calls.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            calls.remove(key);
        }

        Flight {
            value,
            shared: !led,
        }
    }

    /// Number of keys with a run in flight
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Calls<T>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_caller_runs_work() {
        let flights = SingleFlight::new();
        let flight = flights.run("k", || async { 42 }).await;

        assert_eq!(flight.value, 42);
        assert!(!flight.shared);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let flights = SingleFlight::new();
        let counter = AtomicUsize::new(0);
        let runs = &counter;

        let work = move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            "done".to_string()
        };

        let (a, b) = tokio::join!(flights.run("k", work), flights.run("k", work));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(a.value, "done");
        assert_eq!(b.value, "done");
        assert!(a.shared != b.shared);
    }

    #[tokio::test]
    async fn test_different_keys_run_independently() {
        let flights = SingleFlight::new();
        let counter = AtomicUsize::new(0);
        let runs = &counter;

        let work = move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
        };

        tokio::join!(flights.run("a", work), flights.run("b", work));

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_finished_run_is_not_reused() {
        let flights = SingleFlight::new();

        let first = flights.run("k", || async { 1 }).await;
        let second = flights.run("k", || async { 2 }).await;

        assert_eq!(first.value, 1);
        assert_eq!(second.value, 2);
        assert!(!second.shared);
    }

    #[tokio::test]
    async fn test_waiter_takes_over_when_leader_is_dropped() {
        let flights = Arc::new(SingleFlight::new());

        let leader = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move {
                flights
                    .run("k", || std::future::pending::<u32>())
                    .await
                    .value
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();
        let _ = leader.await;

        let flight = flights.run("k", || async { 7 }).await;
        assert_eq!(flight.value, 7);
        assert!(!flight.shared);
        assert_eq!(flights.in_flight(), 0);
    }
}
