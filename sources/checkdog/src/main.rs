/*!
# Introduction

`checkdog` answers one question about a host: is this thing in the state I want it in?
It looks at a service, a systemd unit, an rpm package, a set of processes, a pidfile, the result
of a command, or the live firewall rules, and prints a JSON verdict saying what it found, what was
wanted, and whether the two differ. It never changes anything.

```text
checkdog service httpd --state started --enabled yes
checkdog rpm openssh-server
checkdog command 'grep -q ^PermitRootLogin /etc/ssh/sshd_config' --want-rc 0
```

# Services

Services that aren't managed by systemd are checked against whichever tooling governs them on
the host. Upstart is preferred, then OpenRC, then the SysV enable tools (`update-rc.d`, then
`insserv`, then `chkconfig`). Whether the service is running is decided by querying Upstart or
OpenRC where possible, and otherwise by interpreting the answer of the init script's `status`
action, which isn't standardized across distributions.

# Exit Status

`0` when everything matches, `3` when something differs, `1` when the check itself failed and
`2` for usage errors. Every command that was run is listed in the verdict under `probes`, and
failures that happen after commands were run print those commands to stdout too.

# Configuration

An optional TOML file, `/etc/checkdog.toml` unless `--config` says otherwise, can move the places
`checkdog` looks in:

```toml
bin_dirs = ["/sbin", "/usr/sbin", "/bin", "/usr/bin"]
init_script_dir = "/etc/init.d"
upstart_job_dir = "/etc/init"
proc_dir = "/proc"
```
*/

#![deny(rust_2018_idioms, unreachable_pub, missing_copy_implementations)]

mod args;
mod command;
mod config;
mod error;
mod host;
mod iptables;
#[cfg(test)]
mod mock;
mod pidfile;
mod ps;
mod report;
mod rpm;
mod running;
mod service;
mod systemd;

use crate::args::{parse_args, Command, USAGE};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::{Filesystem, LocalFilesystem, Runner, SystemRunner};
use crate::report::{Failure, Report};
use crate::service::ServiceStateResolver;
use log::{info, trace};
use serde::Serialize;
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};
use snafu::ResultExt;
use std::sync::Once;
use std::{env, process};

/// Exit code for a successful check whose target isn't in the wanted state.
const EXIT_CHANGED: i32 = 3;

fn main() -> ! {
    process::exit(
        match main_inner(env::args(), &SystemRunner {}, &LocalFilesystem {}) {
            Ok(report) => match print_json(&report) {
                Ok(()) if report.changed() => EXIT_CHANGED,
                Ok(()) => 0,
                Err(err) => {
                    eprintln!("{}", err);
                    1
                }
            },
            Err(err) => {
                if let Error::Usage { message } = err {
                    if let Some(message) = message {
                        eprintln!("{}\n", message)
                    }
                    eprintln!("{}", USAGE);
                    2
                } else {
                    eprintln!("{}", err);
                    if let Some(failure) = Failure::from_error(&err) {
                        if let Err(err) = print_json(&failure) {
                            eprintln!("{}", err);
                        }
                    }
                    1
                }
            }
        },
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context(error::SerializeJson)?;
    println!("{}", json);
    Ok(())
}

/// To facilitate testing of `main_inner` function, ensure that the logger is only initialized once.
static INIT_LOGGER_ONCE: Once = Once::new();

/// pub(crate) for testing.
pub(crate) fn main_inner<A>(args: A, runner: &dyn Runner, fs: &dyn Filesystem) -> Result<Report>
where
    A: Iterator<Item = String>,
{
    let arguments = parse_args(args)?;
    INIT_LOGGER_ONCE.call_once(|| {
        // TerminalMode::Stderr keeps stdout for the verdict.
        if let Err(e) = TermLogger::init(
            arguments.log_level,
            LogConfig::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ) {
            info!("Term logger init returned an error: {}", e)
        }
        trace!("logger initialized");
    });
    let config = match &arguments.config_path {
        None => Config::new()?,
        Some(filepath) => Config::from_file(filepath)?,
    };
    trace!("{:?}", config);

    let report = match &arguments.command {
        Command::Service(request) => {
            Report::Service(ServiceStateResolver::new(&config, runner, fs).resolve(request)?)
        }
        Command::Systemd(request) => Report::Systemd(systemd::check(request, &config, runner, fs)?),
        Command::Rpm(request) => Report::Rpm(rpm::check(request, &config, runner, fs)?),
        Command::Ps(request) => Report::Ps(ps::check(request, &config, runner, fs)?),
        Command::Pidfile(request) => Report::Pidfile(pidfile::check(request, &config, runner, fs)?),
        Command::Exec(request) => Report::Command(command::check(request, runner)?),
        Command::Iptables(request) => Report::Iptables(iptables::check(request, runner, fs)?),
    };
    info!(
        "check finished, {}",
        if report.changed() {
            "target differs from the wanted state"
        } else {
            "target is in the wanted state"
        }
    );
    Ok(report)
}
