//! Checks whether processes matching a pattern are running.

use crate::config::Config;
use crate::error::{self, Result};
use crate::host::{require_bin, Filesystem, Invocation, Probe, Runner};
use crate::report::{Check, Presence};
use log::debug;
use serde::Serialize;
use snafu::ensure;

/// The pattern that stands for "any process at all".
pub(crate) const ANY_PROCESS: &str = "*";

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct PsRequest {
    pub(crate) pattern: String,
    pub(crate) state: Presence,
    /// Match against the full command line rather than the process name.
    pub(crate) match_full: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct PsVerdict {
    pub(crate) pattern: String,
    pub(crate) state: Check<Presence>,
    /// The `ps` listing of whatever matched.
    pub(crate) stdout: String,
    pub(crate) changed: bool,
    pub(crate) probes: Vec<Probe>,
}

pub(crate) fn check(
    request: &PsRequest,
    config: &Config,
    runner: &dyn Runner,
    fs: &dyn Filesystem,
) -> Result<PsVerdict> {
    let ps = require_bin(fs, "ps", &config.bin_dirs)?;
    let mut probes = Vec::new();

    let listing = if request.pattern == ANY_PROCESS {
        let probe = runner.run(&Invocation::bin(&ps).arg("auxww"))?;
        ensure!(
            probe.succeeded(),
            error::ProbeFailed {
                probe: probe.clone()
            }
        );
        let stdout = probe.stdout.clone();
        probes.push(probe);
        stdout
    } else {
        let pgrep = require_bin(fs, "pgrep", &config.bin_dirs)?;
        let mut invocation = Invocation::bin(pgrep);
        if request.match_full {
            invocation = invocation.arg("-f");
        }
        let probe = runner.run(&invocation.arg(request.pattern.as_str()))?;
        // 1 means nothing matched
        ensure!(
            probe.exit_code == 0 || probe.exit_code == 1,
            error::ProbeFailed {
                probe: probe.clone()
            }
        );
        let pids = probe
            .stdout
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(",");
        probes.push(probe);
        debug!("'{}' matched pids [{}]", request.pattern, pids);

        if pids.is_empty() {
            String::new()
        } else {
            let invocation = Invocation::bin(&ps).args(vec!["uww", "-p", pids.as_str()]);
            let probe = runner.run(&invocation)?;
            ensure!(
                probe.succeeded(),
                error::ProbeFailed {
                    probe: probe.clone()
                }
            );
            let stdout = probe.stdout.clone();
            probes.push(probe);
            stdout
        }
    };

    let present = !listing.trim().is_empty();
    let state = Check::observed(Presence::from_bool(present), Some(request.state));
    Ok(PsVerdict {
        pattern: request.pattern.clone(),
        changed: state.changed,
        state,
        stdout: listing,
        probes,
    })
}
