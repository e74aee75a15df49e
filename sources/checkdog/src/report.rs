//! The result shapes shared by every check: what was observed, what was wanted, and whether they
//! disagree.

use crate::command::CommandVerdict;
use crate::error::Error;
use crate::host::Probe;
use crate::iptables::IptablesVerdict;
use crate::pidfile::PidfileVerdict;
use crate::ps::PsVerdict;
use crate::rpm::RpmVerdict;
use crate::service::ServiceVerdict;
use crate::systemd::SystemdVerdict;
use serde::Serialize;
use similar::udiff::unified_diff;
use similar::Algorithm;

/// One checked dimension. `got` is `None` when the dimension was skipped, for example the running
/// state of a service that isn't defined.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct Check<T> {
    pub(crate) got: Option<T>,
    pub(crate) want: Option<T>,
    pub(crate) changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) condition: Option<String>,
}

impl<T: PartialEq> Check<T> {
    /// `changed` is only ever true when there was something wanted to compare against.
    pub(crate) fn observed(got: T, want: Option<T>) -> Self {
        let changed = want.as_ref().map_or(false, |want| *want != got);
        Self {
            got: Some(got),
            want,
            changed,
            method: None,
            condition: None,
        }
    }

    pub(crate) fn skipped(want: Option<T>) -> Self {
        Self {
            got: None,
            want,
            changed: false,
            method: None,
            condition: None,
        }
    }

    pub(crate) fn method<S: Into<String>>(mut self, method: S) -> Self {
        self.method = Some(method.into());
        self
    }

    pub(crate) fn condition<S: Into<String>>(mut self, condition: S) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// Whether something (a package, a process) exists.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub(crate) fn from_bool(present: bool) -> Self {
        if present {
            Presence::Present
        } else {
            Presence::Absent
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(Presence::Present),
            "absent" => Some(Presence::Absent),
            _ => None,
        }
    }
}

impl Default for Presence {
    fn default() -> Self {
        Presence::Present
    }
}

/// Whether a service is running.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RunState {
    Started,
    Stopped,
}

impl RunState {
    pub(crate) fn from_running(running: bool) -> Self {
        if running {
            RunState::Started
        } else {
            RunState::Stopped
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(RunState::Started),
            "stopped" => Some(RunState::Stopped),
            _ => None,
        }
    }
}

/// The verdict of whichever check was run.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum Report {
    Service(ServiceVerdict),
    Systemd(SystemdVerdict),
    Rpm(RpmVerdict),
    Ps(PsVerdict),
    Pidfile(PidfileVerdict),
    Command(CommandVerdict),
    Iptables(IptablesVerdict),
}

impl Report {
    pub(crate) fn changed(&self) -> bool {
        match self {
            Report::Service(v) => v.changed,
            Report::Systemd(v) => v.changed,
            Report::Rpm(v) => v.changed,
            Report::Ps(v) => v.changed,
            Report::Pidfile(v) => v.changed,
            Report::Command(v) => v.changed,
            Report::Iptables(v) => v.changed,
        }
    }
}

/// What gets printed instead of a verdict when a check fails after running commands.
#[derive(Debug, Serialize)]
pub(crate) struct Failure<'a> {
    pub(crate) failed: bool,
    pub(crate) msg: String,
    pub(crate) probes: &'a [Probe],
}

impl<'a> Failure<'a> {
    pub(crate) fn from_error(err: &'a Error) -> Option<Self> {
        err.trail().map(|probes| Failure {
            failed: true,
            msg: err.to_string(),
            probes,
        })
    }
}

/// Unified diff of what was wanted against what was found.
pub(crate) fn diff(want: &str, got: &str, want_header: &str, got_header: &str) -> String {
    unified_diff(
        Algorithm::Myers,
        want,
        got,
        3,
        Some((want_header, got_header)),
    )
}
