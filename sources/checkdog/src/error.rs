//! Provides the list of errors for `checkdog`.

use crate::host::Probe;
use snafu::Snafu;
use std::path::PathBuf;

/// Describes the last probe of a trail, which is the one that left the check undecided.
fn last_probe(trail: &[Probe]) -> String {
    match trail.last() {
        Some(probe) => format!(
            "'{}' exited {}, stderr: '{}'",
            probe.command,
            probe.exit_code,
            probe.stderr.trim_end()
        ),
        None => String::from("no commands were run"),
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub(crate) enum Error {
    #[snafu(display(
        "Unable to determine whether service '{}' is running: {}",
        service,
        last_probe(trail)
    ))]
    AmbiguousState { service: String, trail: Vec<Probe> },

    #[snafu(display("Unable to locate required binary '{}'", name))]
    BinaryNotFound { name: String },

    #[snafu(display("Unable to split command line '{}': {}", command, source))]
    CommandParse {
        command: String,
        source: shell_words::ParseError,
    },

    #[snafu(display("Failed to parse config file {}: {}", path.display(), source))]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("Failed to read config file {}: {}", path.display(), source))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("No command given: '{}'", command))]
    EmptyCommand { command: String },

    #[snafu(display("Invalid pattern '{}': {}", pattern, source))]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[snafu(display("Cannot read pidfile {}: {}", path.display(), source))]
    PidfileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Error starting command '{}': {}", command, source))]
    ProbeExecution {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display(
        "Command '{}' failed with exit code {}, stderr: '{}'",
        probe.command,
        probe.exit_code,
        probe.stderr.trim_end()
    ))]
    ProbeFailed { probe: Probe },

    #[snafu(display("Cannot read {}: {}", path.display(), source))]
    ProcRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Error serializing to JSON: {}", source))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("Failed to read template {}: {}", path.display(), source))]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to render template {}: {}", path.display(), source))]
    TemplateRender {
        path: PathBuf,
        source: minijinja::Error,
    },

    #[snafu(display("No service or tool found for '{}': {}", service, reason))]
    ToolingNotFound {
        service: String,
        reason: String,
        trail: Vec<Probe>,
    },

    #[snafu(display(
        "Checking whether service '{}' is {} is not supported with {}",
        service,
        operation,
        tooling
    ))]
    UnsupportedOperation {
        service: String,
        operation: String,
        tooling: String,
        trail: Vec<Probe>,
    },

    #[snafu(display("Usage error."))]
    Usage { message: Option<String> },
}

impl Error {
    /// The probes that were run before the error, for errors that carry them.
    pub(crate) fn trail(&self) -> Option<&[Probe]> {
        match self {
            Error::AmbiguousState { trail, .. }
            | Error::ToolingNotFound { trail, .. }
            | Error::UnsupportedOperation { trail, .. } => Some(trail.as_slice()),
            Error::ProbeFailed { probe } => Some(std::slice::from_ref(probe)),
            _ => None,
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
