//! Checks whether the process named by a pidfile is alive and looks like the expected program.

use crate::config::Config;
use crate::error::{self, Result};
use crate::host::{Filesystem, Invocation, Probe, Runner};
use crate::report::{Check, Presence};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;
use snafu::ResultExt;
use std::io;
use std::path::{Path, PathBuf};

lazy_static! {
    /// The process name in `/proc/<pid>/stat` is wrapped in parentheses.
    static ref STAT_COMM: Regex = Regex::new(r"\(([^)]+)\)").unwrap();
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct PidfileRequest {
    pub(crate) path: PathBuf,
    /// Regex the process name (or full command line) has to match.
    pub(crate) pattern: String,
    pub(crate) state: Presence,
    pub(crate) match_full: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct PidfileVerdict {
    pub(crate) path: PathBuf,
    pub(crate) pid: Option<String>,
    pub(crate) state: Check<Presence>,
    pub(crate) changed: bool,
    pub(crate) probes: Vec<Probe>,
}

pub(crate) fn check(
    request: &PidfileRequest,
    config: &Config,
    runner: &dyn Runner,
    fs: &dyn Filesystem,
) -> Result<PidfileVerdict> {
    let pattern = Regex::new(&request.pattern).context(error::InvalidPattern {
        pattern: request.pattern.as_str(),
    })?;
    let mut probes = Vec::new();

    let pid = match read_optional(fs, &request.path).context(error::PidfileRead {
        path: request.path.as_path(),
    })? {
        Some(contents) => Some(contents.trim().to_string()).filter(|pid| !pid.is_empty()),
        None => {
            debug!("pidfile {} does not exist", request.path.display());
            None
        }
    };

    let present = match &pid {
        None => false,
        Some(pid) => {
            // only for the record, the proc files decide
            if let Some(ps) = fs.find_bin("ps", &config.bin_dirs) {
                let invocation = Invocation::bin(ps).args(vec!["uww", "-p", pid.as_str()]);
                probes.push(runner.run(&invocation)?);
            }
            match match_target(fs, &config.proc_dir, pid, request.match_full)? {
                Some(target) => {
                    debug!("matching '{}' against '{:?}'", request.pattern, target);
                    pattern.is_match(&target)
                }
                None => {
                    debug!("no process behind pid {}", pid);
                    false
                }
            }
        }
    };

    let state = Check::observed(Presence::from_bool(present), Some(request.state));
    Ok(PidfileVerdict {
        path: request.path.clone(),
        pid,
        changed: state.changed,
        state,
        probes,
    })
}

/// The text the pattern is matched against: the raw command line, NUL separators included, or
/// the process name. `None` when there's no such process.
fn match_target(
    fs: &dyn Filesystem,
    proc_dir: &Path,
    pid: &str,
    full: bool,
) -> Result<Option<String>> {
    let file = if full { "cmdline" } else { "stat" };
    let path = proc_dir.join(pid).join(file);
    let contents = match read_optional(fs, &path).context(error::ProcRead { path: &path })? {
        Some(contents) => contents,
        None => return Ok(None),
    };
    if full {
        Ok(Some(contents))
    } else {
        Ok(STAT_COMM
            .captures(&contents)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()))
    }
}

/// Treats a missing file as `None` and any other error as an error.
fn read_optional(fs: &dyn Filesystem, path: &Path) -> io::Result<Option<String>> {
    match fs.read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
