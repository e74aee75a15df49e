//! Checks systemd units with `systemctl`.

use crate::config::Config;
use crate::error::Result;
use crate::host::{require_bin, Filesystem, Invocation, Probe, Runner};
use crate::report::{Check, RunState};
use serde::Serialize;

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SystemdRequest {
    pub(crate) unit: String,
    pub(crate) state: Option<RunState>,
    pub(crate) enabled: Option<bool>,
    pub(crate) defined: Option<bool>,
    /// Talk to the calling user's service manager instead of the system's.
    pub(crate) user: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct SystemdVerdict {
    pub(crate) name: String,
    pub(crate) defined: Check<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) state: Option<Check<RunState>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) enabled: Option<Check<bool>>,
    pub(crate) changed: bool,
    pub(crate) probes: Vec<Probe>,
}

struct Systemctl<'a> {
    path: String,
    user: bool,
    runner: &'a dyn Runner,
}

impl Systemctl<'_> {
    fn run(&self, args: &[&str]) -> Result<Probe> {
        let mut invocation = Invocation::new(self.path.as_str());
        if self.user {
            invocation = invocation.arg("--user");
        }
        self.runner.run(&invocation.args(args.iter().copied()))
    }
}

pub(crate) fn check(
    request: &SystemdRequest,
    config: &Config,
    runner: &dyn Runner,
    fs: &dyn Filesystem,
) -> Result<SystemdVerdict> {
    let systemctl = Systemctl {
        path: require_bin(fs, "systemctl", &config.bin_dirs)?
            .display()
            .to_string(),
        user: request.user,
        runner,
    };
    let unit = request.unit.as_str();
    let mut probes = Vec::new();

    let probe = systemctl.run(&["show", "--property", "LoadState", unit])?;
    let found = is_loaded(&probe);
    probes.push(probe);
    let defined = Check::observed(found, request.defined);

    let state = match request.state {
        None => None,
        Some(want) if !found => Some(Check::skipped(Some(want))),
        Some(want) => {
            let probe = systemctl.run(&["is-active", unit])?;
            let got = RunState::from_running(answer_is(&probe, "active"));
            probes.push(probe);
            Some(Check::observed(got, Some(want)))
        }
    };

    let enabled = match request.enabled {
        None => None,
        Some(want) if !found => Some(Check::skipped(Some(want))),
        Some(want) => {
            let probe = systemctl.run(&["is-enabled", unit])?;
            let got = answer_is(&probe, "enabled");
            probes.push(probe);
            Some(Check::observed(got, Some(want)))
        }
    };

    let changed = defined.changed
        || state.as_ref().map_or(false, |c| c.changed)
        || enabled.as_ref().map_or(false, |c| c.changed);

    Ok(SystemdVerdict {
        name: unit.to_string(),
        defined,
        state,
        enabled,
        changed,
        probes,
    })
}

/// A unit exists unless systemd reports its `LoadState` as `not-found`.
fn is_loaded(probe: &Probe) -> bool {
    if !probe.succeeded() {
        return false;
    }
    // values can span lines when wrapped in {}, so only look at key=value lines
    probe
        .stdout
        .lines()
        .filter_map(|line| {
            let mut split = line.splitn(2, '=');
            Some((split.next()?, split.next()?))
        })
        .any(|(key, value)| key == "LoadState" && value != "not-found")
}

fn answer_is(probe: &Probe, expected: &str) -> bool {
    probe.succeeded() && probe.stdout.trim_end_matches('\n') == expected
}
