//! Compares the live firewall rules with a rendered rules template.
//!
//! `iptables-save` output carries comments and packet counters that change all the time, so it's
//! normalized before the comparison.

use crate::error::{self, Result};
use crate::host::{Filesystem, Invocation, Probe, Runner};
use crate::report;
use lazy_static::lazy_static;
use log::debug;
use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use serde::Serialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub(crate) const DEFAULT_EXECUTABLE: &str = "iptables-save";

const TEMPLATE_NAME: &str = "rules";

lazy_static! {
    static ref CHAIN_COUNTERS: Regex = Regex::new(r"\[\d+:\d+\]$").unwrap();
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct IptablesRequest {
    pub(crate) src: PathBuf,
    /// The dump command, split into words before running.
    pub(crate) executable: String,
    pub(crate) vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct IptablesVerdict {
    pub(crate) src: PathBuf,
    /// The rendered template.
    pub(crate) want: String,
    /// The normalized dump.
    pub(crate) got: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) diff: Option<String>,
    pub(crate) changed: bool,
    pub(crate) probes: Vec<Probe>,
}

pub(crate) fn check(
    request: &IptablesRequest,
    runner: &dyn Runner,
    fs: &dyn Filesystem,
) -> Result<IptablesVerdict> {
    let want = render(request, fs)?;

    let mut words = shell_words::split(&request.executable)
        .context(error::CommandParse {
            command: request.executable.as_str(),
        })?
        .into_iter();
    let program = words.next().context(error::EmptyCommand {
        command: request.executable.as_str(),
    })?;
    let probe = runner.run(&Invocation::new(program).args(words))?;
    ensure!(
        probe.succeeded(),
        error::ProbeFailed {
            probe: probe.clone()
        }
    );

    let got = cook(&probe.stdout);
    let changed = got != want;
    let diff = if changed {
        debug!("live rules differ from {}", request.src.display());
        Some(report::diff(
            &want,
            &got,
            "template result",
            "remote iptables-save cooked result",
        ))
    } else {
        None
    };

    Ok(IptablesVerdict {
        src: request.src.clone(),
        want,
        got,
        diff,
        changed,
        probes: vec![probe],
    })
}

/// Renders the template with the request's variables plus `template_path`. Referencing anything
/// else is an error rather than an empty string.
fn render(request: &IptablesRequest, fs: &dyn Filesystem) -> Result<String> {
    let path = request.src.as_path();
    let source = fs
        .read_to_string(path)
        .context(error::TemplateRead { path })?;

    let mut vars = request.vars.clone();
    vars.insert("template_path".to_string(), path.display().to_string());

    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_keep_trailing_newline(true);
    env.add_template(TEMPLATE_NAME, &source)
        .context(error::TemplateRender { path })?;
    env.get_template(TEMPLATE_NAME)
        .and_then(|template| template.render(&vars))
        .context(error::TemplateRender { path })
}

/// Normalizes `iptables-save` output so it can be compared with a template: comments go, chain
/// counters are zeroed, and trailing spaces after rules are dropped.
pub(crate) fn cook(dump: &str) -> String {
    dump.replace("\r\n", "\n")
        .split('\n')
        .filter(|line| !line.starts_with('#'))
        .map(|line| {
            if line.starts_with(':') {
                CHAIN_COUNTERS.replace(line, "[0:0]").into_owned()
            } else if line.starts_with("-A") {
                line.trim_end_matches(' ').to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
