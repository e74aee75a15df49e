//! The rules that decide whether a SysV, Upstart or OpenRC service is running.
//!
//! Init scripts report their state in many inconsistent ways, so the decision is an ordered chain
//! of heuristics. Each rule returns `None` when it has no opinion, and the first opinion wins.

/// Exit codes the LSB reserves for "not running" style answers to `status`, plus `EX_UNAVAILABLE`.
const LSB_NOT_RUNNING_CODES: &[i32] = &[1, 2, 3, 4, 69];

const DEAD_PHRASES: &[&str] = &[
    "could not access pid file",
    "is dead and pid file exists",
    "dead but subsys locked",
    "dead but pid file exists",
];

/// Upstart job state from `initctl status <name>`.
pub(crate) fn upstart_job(stdout: &str) -> Option<bool> {
    if stdout.contains("stop/waiting") {
        Some(false)
    } else if stdout.contains("start/running") {
        Some(true)
    } else {
        None
    }
}

/// OpenRC always has an opinion: the service is running exactly when it says "started".
pub(crate) fn openrc(stdout: &str) -> bool {
    stdout.contains("started")
}

pub(crate) fn openrc_crashed(stderr: &str) -> bool {
    stderr.contains("crashed")
}

pub(crate) fn lsb_exit_code(exit_code: i32) -> Option<bool> {
    if LSB_NOT_RUNNING_CODES.contains(&exit_code) {
        Some(false)
    } else {
        None
    }
}

/// Looks for keywords in a one-line status message. Verbose output is ignored because scripts
/// that print a lot tend to mention these words in passing.
pub(crate) fn status_keywords(service: &str, stdout: &str) -> Option<bool> {
    if stdout.matches('\n').count() > 1 {
        return None;
    }
    // the service name itself could contain a keyword, e.g. "runit" or "stopwatch"
    let clean = stdout.to_lowercase().replace(&service.to_lowercase(), "");
    if clean.contains("stop") {
        Some(false)
    } else if clean.contains("run") {
        Some(!clean.contains("not "))
    } else if clean.contains("start") && !clean.contains("not ") {
        Some(true)
    } else if DEAD_PHRASES.iter().any(|phrase| clean.contains(phrase)) {
        Some(false)
    } else {
        None
    }
}

/// A clean exit from `status` with nothing else to go on is taken to mean running.
pub(crate) fn zero_exit(exit_code: i32) -> Option<bool> {
    if exit_code == 0 {
        Some(true)
    } else {
        None
    }
}

/// `service iptables status` prints the rule tables instead of a state.
pub(crate) fn iptables_rules(service: &str, stdout: &str) -> Option<bool> {
    if service == "iptables" && stdout.contains("ACCEPT") {
        Some(true)
    } else {
        None
    }
}

/// Applies the rules that only need the `status` probe, in order, to a state that earlier sources
/// may already have settled.
pub(crate) fn settle(
    earlier: Option<bool>,
    service: &str,
    exit_code: i32,
    stdout: &str,
) -> Option<bool> {
    earlier
        .or_else(|| lsb_exit_code(exit_code))
        .or_else(|| status_keywords(service, stdout))
        .or_else(|| zero_exit(exit_code))
        .or_else(|| iptables_rules(service, stdout))
}
