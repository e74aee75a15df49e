//! Stand-ins for the host, so checks can be exercised against canned command output.

use crate::error::{self, Result};
use crate::host::{Filesystem, Invocation, Probe, Runner};
use snafu::ResultExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Answers commands by their exact command line. Commands it doesn't know fail to start.
#[derive(Default)]
pub(crate) struct MockRunner {
    probes: HashMap<String, Probe>,
    calls: RefCell<Vec<String>>,
}

impl MockRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(self, command: &str, exit_code: i32, stdout: &str) -> Self {
        self.on_stderr(command, exit_code, stdout, "")
    }

    pub(crate) fn on_stderr(
        mut self,
        command: &str,
        exit_code: i32,
        stdout: &str,
        stderr: &str,
    ) -> Self {
        self.probes.insert(
            command.to_string(),
            Probe {
                command: command.to_string(),
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    /// Every command line run so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Runner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<Probe> {
        let command = invocation.to_string();
        self.calls.borrow_mut().push(command.clone());
        match self.probes.get(&command) {
            Some(probe) => Ok(probe.clone()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such mock command"))
                .context(error::ProbeExecution { command }),
        }
    }
}

/// A filesystem made of a few files. Binaries live in `/sbin` unless placed elsewhere.
#[derive(Default)]
pub(crate) struct MockFilesystem {
    files: HashMap<PathBuf, String>,
    bins: HashMap<String, PathBuf>,
}

impl MockFilesystem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn file<P: Into<PathBuf>>(mut self, path: P, contents: &str) -> Self {
        self.files.insert(path.into(), contents.to_string());
        self
    }

    pub(crate) fn bin(self, name: &str) -> Self {
        let path = PathBuf::from("/sbin").join(name);
        self.bin_at(name, path)
    }

    pub(crate) fn bins(self, names: &[&str]) -> Self {
        names.iter().fold(self, |fs, name| fs.bin(name))
    }

    pub(crate) fn bin_at<P: Into<PathBuf>>(mut self, name: &str, path: P) -> Self {
        self.bins.insert(name.to_string(), path.into());
        self
    }
}

impl Filesystem for MockFilesystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
    }

    fn find_bin(&self, name: &str, _dirs: &[PathBuf]) -> Option<PathBuf> {
        self.bins.get(name).cloned()
    }
}
