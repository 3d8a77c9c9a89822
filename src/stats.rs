// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 authwatch contributors

//! Aggregation of extracted failure events into summary statistics.
//!
//! Every fold allocates its own counters and returns an immutable
//! [`Snapshot`]. There is no long-lived aggregate anywhere, so concurrent
//! computations never share mutable state and need no locking.
//!
//! Policy on failure: a log that cannot be read yields the all-empty
//! snapshot, never a partial fold (partial totals would misrepresent the
//! data) and never an error to the caller. Malformed lines are skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Serialize;

use crate::extract::Extractor;

/// Failure count for one targeted username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCount {
    pub user: String,
    pub count: u64,
}

/// Failure count for one source address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: u64,
}

/// Failure count for one hour bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub time: String,
    pub count: u64,
}

/// One fully-computed, immutable set of the three aggregate views.
///
/// `top_users` and `top_ips` hold at most the 10 highest counts; `hourly`
/// is unbounded and sorted ascending by label. `Default` is the all-empty
/// snapshot used when the log source is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub top_users: Vec<UserCount>,
    pub top_ips: Vec<IpCount>,
    pub hourly: Vec<HourCount>,
}

/// How many entries the user and ip views keep.
const TOP_N: usize = 10;

/// Insertion-ordered counter: ties in the top-N cut are broken by
/// first-seen order during the fold, keeping output stable.
#[derive(Default)]
struct Counter {
    entries: HashMap<String, (u64, usize)>,
}

impl Counter {
    fn bump(&mut self, key: &str) {
        let order = self.entries.len();
        self.entries
            .entry(key.to_string())
            .and_modify(|e| e.0 += 1)
            .or_insert((1, order));
    }

    fn top(self, n: usize) -> Vec<(String, u64)> {
        let mut items: Vec<(String, u64, usize)> = self
            .entries
            .into_iter()
            .map(|(k, (count, order))| (k, count, order))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        items.truncate(n);
        items.into_iter().map(|(k, count, _)| (k, count)).collect()
    }
}

/// Fold log lines into a fresh [`Snapshot`], dropping events whose source
/// address is in `allow`. Pure function of its inputs.
pub fn aggregate<'a, I>(lines: I, allow: &HashSet<String>, extractor: &Extractor, year: i32) -> Snapshot
where
    I: IntoIterator<Item = &'a str>,
{
    let mut users = Counter::default();
    let mut ips = Counter::default();
    let mut hours: BTreeMap<String, u64> = BTreeMap::new();

    for line in lines {
        if let Some(event) = extractor.extract(line, year) {
            if allow.contains(&event.ip) {
                continue;
            }
            users.bump(&event.user);
            ips.bump(&event.ip);
            *hours.entry(event.hour).or_insert(0) += 1;
        }
    }

    Snapshot {
        top_users: users
            .top(TOP_N)
            .into_iter()
            .map(|(user, count)| UserCount { user, count })
            .collect(),
        top_ips: ips
            .top(TOP_N)
            .into_iter()
            .map(|(ip, count)| IpCount { ip, count })
            .collect(),
        hourly: hours
            .into_iter()
            .map(|(time, count)| HourCount { time, count })
            .collect(),
    }
}

/// Read and fold the whole log file. Unreadable file → empty snapshot.
pub fn aggregate_log(path: &Path, allow: &HashSet<String>, extractor: &Extractor, year: i32) -> Snapshot {
    // Read as bytes and convert lossily: auth logs occasionally contain
    // invalid UTF-8 and a stray byte must not empty the whole snapshot.
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(_) => return Snapshot::default(),
    };
    let text = String::from_utf8_lossy(&bytes);
    aggregate(text.lines(), allow, extractor, year)
}
