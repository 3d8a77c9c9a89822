// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 authwatch contributors

//! Snapshot publishing: the full pipeline run plus subscriber fan-out.
//!
//! Every trigger (periodic tick, HTTP request, new subscriber) performs
//! the whole resolve, read, aggregate run from scratch. There is no cache
//! shared between the push and pull paths, so both are trivially consistent
//! and a degraded run only ever yields an empty-but-valid snapshot.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local};
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

use crate::allowlist;
use crate::config::{AllowlistConfig, Config};
use crate::extract::Extractor;
use crate::stats::{self, Snapshot};

/// The log-to-statistics pipeline. Holds only configuration and the
/// compiled patterns; every [`snapshot`](Pipeline::snapshot) call allocates
/// its own counters and result.
pub struct Pipeline {
    log_path: PathBuf,
    allowlist: AllowlistConfig,
    extractor: Extractor,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            log_path: PathBuf::from(&config.general.log_path),
            allowlist: config.allowlist.clone(),
            extractor: Extractor::new(),
        }
    }

    /// Compute one fresh snapshot: rebuild the allowlist, re-read the whole
    /// log, fold. Never fails; degraded inputs produce empty views.
    pub fn snapshot(&self) -> Snapshot {
        let allow = if self.allowlist.enabled {
            allowlist::resolve(&self.allowlist.command)
        } else {
            HashSet::new()
        };
        // syslog timestamps carry no year; take it from the clock now
        let year = Local::now().year();
        stats::aggregate_log(&self.log_path, &allow, &self.extractor, year)
    }
}

/// Fan-out of snapshots to subscribed viewers.
///
/// Subscribers are plain mpsc channels; the transport that owns the other
/// end (a push connection, the headless console) is outside the pipeline.
/// Within one broadcast cycle every subscriber receives the same
/// `Arc<Snapshot>` instance.
pub struct Broadcaster {
    subscribers: Mutex<Vec<mpsc::Sender<Arc<Snapshot>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber, delivering `initial` immediately so a
    /// fresh viewer never waits a full interval for its first data.
    pub async fn subscribe(&self, initial: Arc<Snapshot>) -> mpsc::Receiver<Arc<Snapshot>> {
        let (tx, rx) = mpsc::channel(16);
        let _ = tx.send(initial).await;
        self.subscribers.lock().await.push(tx);
        rx
    }

    /// Deliver one snapshot to every live subscriber, pruning closed ones.
    /// A subscriber with a full channel misses this update rather than
    /// stalling the broadcast cycle for everyone else.
    pub async fn publish(&self, snapshot: Arc<Snapshot>) {
        let mut subs = self.subscribers.lock().await;
        subs.retain(|tx| !tx.is_closed());
        for tx in subs.iter() {
            let _ = tx.try_send(snapshot.clone());
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        let mut subs = self.subscribers.lock().await;
        subs.retain(|tx| !tx.is_closed());
        subs.len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic broadcast task: every `interval`, run the pipeline once and
/// fan the result out. Runs until the process exits.
pub async fn run_publisher(pipeline: Arc<Pipeline>, broadcaster: Arc<Broadcaster>, interval: Duration) {
    loop {
        sleep(interval).await;
        let snapshot = Arc::new(pipeline.snapshot());
        broadcaster.publish(snapshot).await;
    }
}
