use crate::error::{self, Result};
use log::debug;
use serde::Deserialize;
use snafu::ResultExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_CONFIG_PATH: &str = "/etc/checkdog.toml";

/// Where to look for things on the host. Every key is optional in the TOML file.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// Directories searched for system binaries before `PATH`.
    pub(crate) bin_dirs: Vec<PathBuf>,
    pub(crate) init_script_dir: PathBuf,
    pub(crate) upstart_job_dir: PathBuf,
    pub(crate) proc_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bin_dirs: vec!["/sbin", "/usr/sbin", "/bin", "/usr/bin"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            init_script_dir: PathBuf::from("/etc/init.d"),
            upstart_job_dir: PathBuf::from("/etc/init"),
            proc_dir: PathBuf::from("/proc"),
        }
    }
}

impl Config {
    /// Loads the default config file, falling back to the built-in defaults if it doesn't exist.
    pub(crate) fn new() -> Result<Self> {
        match fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(s) => Self::parse(&s, DEFAULT_CONFIG_PATH),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
            Err(e) => Err(e).context(error::ConfigRead {
                path: DEFAULT_CONFIG_PATH,
            }),
        }
    }

    pub(crate) fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).context(error::ConfigRead { path })?;
        Self::parse(&s, path)
    }

    fn parse<P: AsRef<Path>>(s: &str, path: P) -> Result<Self> {
        toml::from_str(s).context(error::ConfigParse {
            path: path.as_ref(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use std::fs::write;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_defaults() {
        let t = TempDir::new().unwrap();
        let path = t.path().join("checkdog.toml");
        write(
            &path,
            r#"
            bin_dirs = ["/opt/tools/bin"]
            init_script_dir = "/etc/rc.d/init.d"
            "#,
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.bin_dirs, vec![PathBuf::from("/opt/tools/bin")]);
        assert_eq!(config.init_script_dir, PathBuf::from("/etc/rc.d/init.d"));
        assert_eq!(config.upstart_job_dir, PathBuf::from("/etc/init"));
        assert_eq!(config.proc_dir, PathBuf::from("/proc"));
    }

    #[test]
    fn missing_explicit_file() {
        let t = TempDir::new().unwrap();
        let err = Config::from_file(t.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn bad_toml() {
        let t = TempDir::new().unwrap();
        let path = t.path().join("checkdog.toml");
        write(&path, "bin_dirs = 7").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
