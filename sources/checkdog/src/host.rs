//! The two collaborators every check needs from the host: something that runs commands and
//! captures their output, and something that answers questions about the filesystem.

use crate::error::{self, Result};
use log::trace;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The captured result of running one external command. Probes are evidence; nothing modifies
/// them once they have been captured.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct Probe {
    pub(crate) command: String,
    /// The exit code, or -1 if the process was killed by a signal.
    pub(crate) exit_code: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

impl Probe {
    pub(crate) fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// A command line to run, without any shell interpretation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Invocation {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) env: Vec<(String, String)>,
    pub(crate) dir: Option<PathBuf>,
}

impl Invocation {
    pub(crate) fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            dir: None,
        }
    }

    /// Uses the display form of `path` as the program.
    pub(crate) fn bin<P: AsRef<Path>>(path: P) -> Self {
        Self::new(path.as_ref().display().to_string())
    }

    /// Runs `script` with `/bin/sh -c`.
    pub(crate) fn shell<S: Into<String>>(script: S) -> Self {
        Self::new("/bin/sh").arg("-c").arg(script)
    }

    pub(crate) fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(crate) fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub(crate) fn current_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(&self.program).chain(self.args.iter());
        write!(f, "{}", shell_words::join(words))
    }
}

/// Runs external commands to completion and captures their output.
pub(crate) trait Runner {
    fn run(&self, invocation: &Invocation) -> Result<Probe>;
}

/// Runs commands on the local host. Each call blocks until the child exits; there is no timeout.
pub(crate) struct SystemRunner {}

impl Runner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<Probe> {
        let command = invocation.to_string();
        trace!("running '{}'", command);
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &invocation.dir {
            cmd.current_dir(dir);
        }
        let output = cmd.output().context(error::ProbeExecution {
            command: command.clone(),
        })?;
        let probe = Probe {
            command,
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(output.stdout.as_slice()).into(),
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into(),
        };
        trace!(
            "'{}' exited {}\nstdout:\n{}\nstderr:\n{}",
            probe.command,
            probe.exit_code,
            probe.stdout,
            probe.stderr
        );
        Ok(probe)
    }
}

/// Answers the filesystem questions the checks ask.
pub(crate) trait Filesystem {
    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Resolves an executable name by searching `dirs` first and then `PATH`.
    fn find_bin(&self, name: &str, dirs: &[PathBuf]) -> Option<PathBuf>;
}

pub(crate) struct LocalFilesystem {}

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn find_bin(&self, name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
        let path_var = std::env::var_os("PATH").unwrap_or_else(OsString::new);
        let found = dirs
            .iter()
            .cloned()
            .chain(std::env::split_paths(&path_var))
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate));
        trace!("located '{}' at {:?}", name, found);
        found
    }
}

/// Like `find_bin`, for checks that can't do anything without the binary.
pub(crate) fn require_bin(fs: &dyn Filesystem, name: &str, dirs: &[PathBuf]) -> Result<PathBuf> {
    fs.find_bin(name, dirs)
        .context(error::BinaryNotFound { name })
}

fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}
