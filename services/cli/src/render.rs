//! Plain-text rendering of session state and backend entities

use api::{ScanHistory, SigninHistory, SigninResponse, UserWithCookie};
use chrono::{DateTime, Utc};
use common::SessionState;
use common::format::{format_date, format_relative_time, truncate};
use std::fmt::Write;

const COOKIE_WIDTH: usize = 24;
const PAYLOAD_WIDTH: usize = 48;

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

pub fn session(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "endpoint:  {}", or_unset(&state.api_endpoint));
    let _ = writeln!(out, "user id:   {}", or_unset(&state.user_id));
    let _ = writeln!(out, "user name: {}", or_unset(&state.user_name));
    let _ = writeln!(out, "scan mode: {}", state.scan_mode);
    out
}

/// One line per user; the session user is marked with `*`
pub fn users(users: &[UserWithCookie], current_user: &str) -> String {
    if users.is_empty() {
        return "No users.\n".to_string();
    }

    let mut out = String::new();
    for entry in users {
        let marker = if entry.user.id == current_user { '*' } else { ' ' };
        let auto = if entry.user.is_auto { "auto" } else { "manual" };
        let cookie = if entry.has_cookie() {
            format!(
                "cookie {} (expires {})",
                truncate(&entry.latest_cookie, COOKIE_WIDTH),
                format_date(&entry.expires)
            )
        } else {
            "no cookie".to_string()
        };
        let _ = writeln!(
            out,
            "{} {}  {}  [{}]  {}",
            marker, entry.user.id, entry.user.name, auto, cookie
        );
    }
    out
}

pub fn scan_history(entries: &[ScanHistory], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return "No scans.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{}  {}  by {}  {}",
            entry.id,
            format_relative_time(&entry.created_at, now),
            entry.user_id,
            truncate(&entry.result, PAYLOAD_WIDTH)
        );
    }
    out
}

pub fn signin_history(entries: &[SigninHistory], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return "No sign-in attempts.\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{}", signin_line(entry, now));
    }
    out
}

fn signin_line(entry: &SigninHistory, now: DateTime<Utc>) -> String {
    let outcome = match entry.response_code {
        Some(code) if entry.succeeded() => format!("ok {}", code),
        Some(code) => format!("failed {}", code),
        None => "no response".to_string(),
    };
    let source = entry
        .scan_history_id
        .as_deref()
        .map(|id| format!("scan {}", id))
        .unwrap_or_else(|| "digital".to_string());
    format!(
        "{}  {}  user {}  {}  ({})",
        entry.id,
        format_relative_time(&entry.created_at, now),
        entry.user_id,
        outcome,
        source
    )
}

pub fn signin_response(response: &SigninResponse, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Scan {} recorded: {}",
        response.scan_result.id,
        truncate(&response.scan_result.result, PAYLOAD_WIDTH)
    );

    let succeeded = response
        .signin_results
        .iter()
        .filter(|result| result.succeeded())
        .count();
    let _ = writeln!(
        out,
        "{}/{} sign-in(s) succeeded",
        succeeded,
        response.signin_results.len()
    );
    for result in &response.signin_results {
        let _ = writeln!(out, "  {}", signin_line(result, now));
    }
    out
}
