// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 authwatch contributors

//! Failed-login event extraction from raw auth.log lines.
//!
//! Each line goes through two mandatory checks: the leading three
//! whitespace tokens must parse as a `Mon DD HH:MM:SS` timestamp, and the
//! remainder must match one of the known failure patterns. Patterns are
//! tried in order and the first match wins. Pattern order is load-bearing;
//! never convert this to a best-match scheme.
//!
//! syslog timestamps carry no year, so the caller supplies one (normally
//! the current year). Logs spanning a December/January rollover will label
//! old entries with the new year; the source format gives us nothing to
//! disambiguate with.

use chrono::NaiveDateTime;
use regex::Regex;

/// One parsed authentication failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Hour bucket label, e.g. "2026-06-22 08:00"
    pub hour: String,
    /// Username the attempt targeted
    pub user: String,
    /// Source address of the attempt
    pub ip: String,
}

/// Compiled failure patterns, built once and reused across folds.
pub struct Extractor {
    patterns: Vec<Regex>,
}

impl Extractor {
    pub fn new() -> Self {
        // Order matters: first match wins.
        let patterns = vec![
            Regex::new(r"Failed password for (?P<user>\w+) from (?P<ip>\d+\.\d+\.\d+\.\d+)(?: port \d+)?")
                .expect("invalid failed-password pattern"),
            Regex::new(r"Invalid user (?P<user>\w+) from (?P<ip>\d+\.\d+\.\d+\.\d+)")
                .expect("invalid invalid-user pattern"),
        ];
        Self { patterns }
    }

    /// Parse one log line into an [`Event`], or `None` if the line has no
    /// valid leading timestamp or matches no failure pattern.
    pub fn extract(&self, line: &str, year: i32) -> Option<Event> {
        let hour = hour_label(line, year)?;
        for pat in &self.patterns {
            if let Some(caps) = pat.captures(line) {
                return Some(Event {
                    hour,
                    user: caps["user"].to_string(),
                    ip: caps["ip"].to_string(),
                });
            }
        }
        None
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the first three whitespace tokens of a line as `Mon DD HH:MM:SS`
/// and bucket to the hour, injecting `year` (syslog omits it).
fn hour_label(line: &str, year: i32) -> Option<String> {
    let mut tokens = line.split_whitespace();
    let month = tokens.next()?;
    let day = tokens.next()?;
    let time = tokens.next()?;
    let stamp = format!("{} {} {} {}", year, month, day, time);
    let dt = NaiveDateTime::parse_from_str(&stamp, "%Y %b %d %H:%M:%S").ok()?;
    Some(dt.format("%Y-%m-%d %H:00").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_password_line() {
        let ex = Extractor::new();
        let line = "Jun 22 08:15:20 host sshd[812]: Failed password for root from 10.0.0.5 port 2222 ssh2";
        let event = ex.extract(line, 2024).unwrap();
        assert_eq!(event.user, "root");
        assert_eq!(event.ip, "10.0.0.5");
        assert_eq!(event.hour, "2024-06-22 08:00");
    }

    #[test]
    fn test_failed_password_without_port() {
        let ex = Extractor::new();
        let line = "Jun 22 08:15:20 host sshd: Failed password for admin from 192.168.1.9";
        let event = ex.extract(line, 2024).unwrap();
        assert_eq!(event.user, "admin");
        assert_eq!(event.ip, "192.168.1.9");
    }

    #[test]
    fn test_invalid_user_line() {
        let ex = Extractor::new();
        let line = "Dec  3 23:59:01 host sshd[99]: Invalid user oracle from 203.0.113.7";
        let event = ex.extract(line, 2025).unwrap();
        assert_eq!(event.user, "oracle");
        assert_eq!(event.ip, "203.0.113.7");
        assert_eq!(event.hour, "2025-12-03 23:00");
    }

    #[test]
    fn test_first_pattern_wins() {
        // A line matching both patterns is attributed by the first one.
        let ex = Extractor::new();
        let line = "Jun 22 08:15:20 host sshd: Failed password for bob from 10.0.0.5; Invalid user carol from 10.0.0.6";
        let event = ex.extract(line, 2024).unwrap();
        assert_eq!(event.user, "bob");
        assert_eq!(event.ip, "10.0.0.5");
    }

    #[test]
    fn test_combined_invalid_user_form_matches_neither() {
        // sshd's "Failed password for invalid user X from ..." fits neither
        // pattern: the first needs `for <word> from` directly, the second
        // is capital-I "Invalid". Such lines are dropped.
        let ex = Extractor::new();
        let line = "Jun 22 08:15:20 host sshd: Failed password for invalid user oracle from 10.0.0.5 port 22";
        assert!(ex.extract(line, 2024).is_none());
    }

    #[test]
    fn test_no_pattern_match() {
        let ex = Extractor::new();
        let line = "Jun 22 08:15:20 host sshd[812]: Accepted password for root from 10.0.0.5 port 2222";
        assert!(ex.extract(line, 2024).is_none());
    }

    #[test]
    fn test_bad_timestamp_skips_matching_line() {
        // Pattern would match, but the timestamp check is mandatory first.
        let ex = Extractor::new();
        let line = "??? 99 huh Failed password for root from 10.0.0.5";
        assert!(ex.extract(line, 2024).is_none());
    }

    #[test]
    fn test_too_few_tokens() {
        let ex = Extractor::new();
        assert!(ex.extract("Jun 22", 2024).is_none());
        assert!(ex.extract("", 2024).is_none());
    }

    #[test]
    fn test_impossible_date_rejected() {
        let ex = Extractor::new();
        let line = "Feb 30 08:15:20 host sshd: Failed password for root from 10.0.0.5";
        assert!(ex.extract(line, 2024).is_none());
    }

    #[test]
    fn test_year_injected_into_label() {
        let ex = Extractor::new();
        let line = "Jan  1 00:00:01 host sshd: Invalid user guest from 198.51.100.2";
        let event = ex.extract(line, 2030).unwrap();
        assert_eq!(event.hour, "2030-01-01 00:00");
    }
}
