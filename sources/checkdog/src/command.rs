//! Runs an arbitrary command and compares its exit code or output with what's expected.

use crate::error::{self, Result};
use crate::host::{Invocation, Probe, Runner};
use crate::report::{self, Check};
use serde::Serialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::convert::TryFrom;
use std::path::PathBuf;
use std::time::Instant;

/// The one thing about the command's result that is being checked.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Expectation {
    Rc(i32),
    Stdout(String),
    Stderr(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct CommandRequest {
    pub(crate) cmd: String,
    /// Run through `/bin/sh -c` instead of splitting into words.
    pub(crate) shell: bool,
    pub(crate) chdir: Option<PathBuf>,
    pub(crate) want: Expectation,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct CommandVerdict {
    pub(crate) cmd: String,
    pub(crate) rc: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) result: Check<Expectation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) diff: Option<String>,
    pub(crate) elapsed_ms: u64,
    pub(crate) changed: bool,
    pub(crate) probes: Vec<Probe>,
}

pub(crate) fn check(request: &CommandRequest, runner: &dyn Runner) -> Result<CommandVerdict> {
    ensure!(
        !request.cmd.trim().is_empty(),
        error::EmptyCommand {
            command: request.cmd.as_str()
        }
    );

    let mut invocation = if request.shell {
        Invocation::shell(request.cmd.as_str())
    } else {
        let words = shell_words::split(&request.cmd).context(error::CommandParse {
            command: request.cmd.as_str(),
        })?;
        let mut words = words.into_iter();
        // split can still produce nothing, e.g. for a lone pair of quotes
        let program = words.next().filter(|p| !p.is_empty()).context(error::EmptyCommand {
            command: request.cmd.as_str(),
        })?;
        Invocation::new(program).args(words)
    };
    if let Some(dir) = &request.chdir {
        invocation = invocation.current_dir(dir);
    }

    let start = Instant::now();
    let probe = runner.run(&invocation)?;
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let rc = probe.exit_code;
    let stdout = strip_newlines(&probe.stdout);
    let stderr = strip_newlines(&probe.stderr);

    let (got, diff) = match &request.want {
        Expectation::Rc(_) => (Expectation::Rc(rc), None),
        Expectation::Stdout(want) => (
            Expectation::Stdout(stdout.clone()),
            stream_diff(want, &stdout, "want_stdout", "result.stdout"),
        ),
        Expectation::Stderr(want) => (
            Expectation::Stderr(stderr.clone()),
            stream_diff(want, &stderr, "want_stderr", "result.stderr"),
        ),
    };
    let result = Check::observed(got, Some(request.want.clone()));

    Ok(CommandVerdict {
        cmd: request.cmd.clone(),
        rc,
        stdout,
        stderr,
        changed: result.changed,
        result,
        diff,
        elapsed_ms,
        probes: vec![probe],
    })
}

fn strip_newlines(s: &str) -> String {
    s.trim_end_matches(|c| c == '\r' || c == '\n').to_string()
}

/// Only multi-line output is worth a diff.
fn stream_diff(want: &str, got: &str, want_header: &str, got_header: &str) -> Option<String> {
    if want == got || !got.contains('\n') {
        return None;
    }
    Some(report::diff(
        &format!("{}\n", want),
        &format!("{}\n", got),
        want_header,
        got_header,
    ))
}
