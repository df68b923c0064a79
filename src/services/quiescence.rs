// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Network quiescence: the page counts as loaded once no more than
//! `max_in_flight` requests have been outstanding for a full `idle` window.

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiescenceWindow {
    pub max_in_flight: usize,
    pub idle: Duration,
}

impl Default for QuiescenceWindow {
    /// At most two open requests for 500 ms
    fn default() -> Self {
        Self {
            max_in_flight: 2,
            idle: Duration::from_millis(500),
        }
    }
}

/// Tracks outstanding requests by id and when the page last went quiet.
///
/// Start and finish events arrive on separate streams, so a finish may be
/// seen before its start. Finished ids are remembered and a late start for
/// one of them is ignored.
#[derive(Debug)]
pub struct QuiescenceTracker {
    window: QuiescenceWindow,
    in_flight: HashSet<String>,
    completed: HashSet<String>,
    quiet_since: Option<Instant>,
}

impl QuiescenceTracker {
    /// Starts quiet at `now`.
    pub fn new(window: QuiescenceWindow, now: Instant) -> Self {
        Self {
            window,
            in_flight: HashSet::new(),
            completed: HashSet::new(),
            quiet_since: Some(now),
        }
    }

    pub fn request_started(&mut self, id: impl Into<String>, now: Instant) {
        let id = id.into();
        if !self.completed.contains(&id) {
            self.in_flight.insert(id);
        }
        self.refresh(now);
    }

    /// Finished or failed.
    pub fn request_finished(&mut self, id: &str, now: Instant) {
        self.in_flight.remove(id);
        self.completed.insert(id.to_string());
        self.refresh(now);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// When the page settles if nothing else happens; `None` while busy.
    pub fn settles_at(&self) -> Option<Instant> {
        self.quiet_since.map(|since| since + self.window.idle)
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.settles_at().is_some_and(|at| now >= at)
    }

    fn refresh(&mut self, now: Instant) {
        if self.in_flight.len() > self.window.max_in_flight {
            self.quiet_since = None;
        } else if self.quiet_since.is_none() {
            self.quiet_since = Some(now);
        }
    }
}
