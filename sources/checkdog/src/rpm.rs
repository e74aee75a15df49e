//! Checks whether an rpm package is installed.

use crate::config::Config;
use crate::error::{self, Result};
use crate::host::{require_bin, Filesystem, Invocation, Probe, Runner};
use crate::report::{Check, Presence};
use serde::Serialize;
use snafu::ensure;

const NOT_INSTALLED: &str = "is not installed";

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct RpmRequest {
    pub(crate) name: String,
    pub(crate) state: Presence,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct RpmVerdict {
    pub(crate) name: String,
    pub(crate) state: Check<Presence>,
    /// What `rpm -q` said, usually the full name-version-release.
    pub(crate) stdout: String,
    pub(crate) changed: bool,
    pub(crate) probes: Vec<Probe>,
}

pub(crate) fn check(
    request: &RpmRequest,
    config: &Config,
    runner: &dyn Runner,
    fs: &dyn Filesystem,
) -> Result<RpmVerdict> {
    let rpm = require_bin(fs, "rpm", &config.bin_dirs)?;
    // the "not installed" message is localized
    let invocation = Invocation::bin(rpm)
        .arg("-q")
        .arg(request.name.as_str())
        .env("LANG", "C")
        .env("LC_ALL", "C")
        .env("LC_MESSAGES", "C");
    let probe = runner.run(&invocation)?;

    let missing = probe.stdout.contains(NOT_INSTALLED);
    ensure!(
        probe.succeeded() || missing,
        error::ProbeFailed {
            probe: probe.clone()
        }
    );

    let state = Check::observed(Presence::from_bool(!missing), Some(request.state));
    Ok(RpmVerdict {
        name: request.name.clone(),
        stdout: probe.stdout.trim().to_string(),
        changed: state.changed,
        state,
        probes: vec![probe],
    })
}
