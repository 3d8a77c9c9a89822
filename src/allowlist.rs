// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 authwatch contributors

//! Known-address allowlist from host session history.
//!
//! Addresses that have a prior legitimate session (as reported by an
//! external command, `last -i` by default) are excluded from attack
//! statistics. The resolver fails open: if the command is missing, errors,
//! or exits non-zero, it returns an empty set and the pipeline degrades to
//! "no allowlist". Showing more noise beats stalling.

use std::collections::HashSet;
use std::process::{Command, Stdio};

use regex::Regex;

/// Run the session-history command and collect known source addresses.
///
/// `command` is a whitespace-split program + args, e.g. `"last -i"`.
/// Any failure to run it yields an empty set.
pub fn resolve(command: &str) -> HashSet<String> {
    let mut parts = command.split_whitespace();
    let program = match parts.next() {
        Some(p) => p,
        None => return HashSet::new(),
    };

    let output = Command::new(program)
        .args(parts)
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(out) if out.status.success() => {
            known_ips(&String::from_utf8_lossy(&out.stdout))
        }
        _ => HashSet::new(),
    }
}

/// Parse session-history output: one record per line, third whitespace
/// token taken as a known address when it starts with a dotted quad.
/// Malformed records are skipped, not errors.
pub fn known_ips(output: &str) -> HashSet<String> {
    let ipv4 = Regex::new(r"^\d+\.\d+\.\d+\.\d+").expect("invalid ipv4 pattern");
    let mut ips = HashSet::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 3 && ipv4.is_match(parts[2]) {
            ips.insert(parts[2].to_string());
        }
    }
    ips
}
