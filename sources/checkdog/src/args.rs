use crate::command::{CommandRequest, Expectation};
use crate::error::{self, Error, Result};
use crate::iptables::{IptablesRequest, DEFAULT_EXECUTABLE};
use crate::pidfile::PidfileRequest;
use crate::ps::PsRequest;
use crate::report::{Presence, RunState};
use crate::rpm::RpmRequest;
use crate::service::ServiceRequest;
use crate::systemd::SystemdRequest;
use simplelog::LevelFilter;
use snafu::{ensure, OptionExt};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

const SERVICE: &str = "service";
const SYSTEMD: &str = "systemd";
const RPM: &str = "rpm";
const PS: &str = "ps";
const PIDFILE: &str = "pidfile";
const COMMAND: &str = "command";
const IPTABLES: &str = "iptables";

/// The check to run, with everything it needs to know about the target.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum Command {
    Service(ServiceRequest),
    Systemd(SystemdRequest),
    Rpm(RpmRequest),
    Ps(PsRequest),
    Pidfile(PidfileRequest),
    Exec(CommandRequest),
    Iptables(IptablesRequest),
}

#[derive(Debug)]
pub(crate) struct Arguments {
    pub(crate) command: Command,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) log_level: LevelFilter,
}

/// The usage message for --help.
pub(crate) const USAGE: &str = r"USAGE:
checkdog <SUBCOMMAND> <TARGET> <OPTIONS>

SUBCOMMANDS:
    service <name>          Check a service run by Upstart, OpenRC or SysV init scripts.
        [ --state started|stopped ]
        [ --enabled yes|no ]
        [ --defined yes|no ]

    systemd <unit>          Check a systemd unit.
        [ --state started|stopped ]
        [ --enabled yes|no ]
        [ --defined yes|no ]
        [ --user ]

    rpm <name>              Check whether an rpm package is installed.
        [ --state present|absent ]

    ps <pattern>            Check for processes matching a pattern, '*' for any process.
        [ --state present|absent ]
        [ --match-full ]

    pidfile <path>          Check the process named by a pidfile.
        --pattern <regex>
        [ --state present|absent ]
        [ --match-full ]

    command <command line>  Run a command and check its result. Exactly one --want option.
        [ --want-rc <code> | --want-stdout <text> | --want-stderr <text> ]
        [ --shell ]
        [ --chdir <dir> ]

    iptables <template>     Compare the live firewall rules with a rules template.
        [ --executable <command line> ]
        [ --var <key>=<value> ]...

GLOBAL OPTIONS:
    [ --config <path> ]     Path to the TOML config file.
    [ --log-level trace|debug|info|warn|error ]

EXIT STATUS:
    0 when the target is in the wanted state, 3 when it is not, 1 on errors, 2 on usage errors.
";

/// Options collected before we know which subcommand they belong to.
#[derive(Debug, Default)]
struct Options {
    state: Option<String>,
    enabled: Option<bool>,
    defined: Option<bool>,
    user: bool,
    match_full: bool,
    pattern: Option<String>,
    shell: bool,
    chdir: Option<PathBuf>,
    want: Vec<Expectation>,
    executable: Option<String>,
    vars: BTreeMap<String, String>,
    /// Every subcommand option given, to reject the ones that don't apply.
    given: Vec<&'static str>,
}

impl Options {
    fn only(&self, subcommand: &str, allowed: &[&str]) -> Result<()> {
        match self.given.iter().find(|option| !allowed.contains(*option)) {
            Some(option) => error::Usage {
                message: format!("{} does not apply to '{}'", option, subcommand),
            }
            .fail(),
            None => Ok(()),
        }
    }
}

/// Parses the command line arguments.
pub(crate) fn parse_args<A>(args: A) -> Result<Arguments>
where
    A: Iterator<Item = String>,
{
    let mut config_path = None;
    let mut log_level = None;
    let mut options = Options::default();
    let mut positional = Vec::new();
    let mut iter = args.skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let val = iter.next().context(error::Usage {
                    message: String::from("Did not give argument to --config"),
                })?;
                config_path = Some(PathBuf::from(val));
            }
            "--log-level" => {
                let val = iter.next().context(error::Usage {
                    message: String::from("Did not give argument to --log-level"),
                })?;
                log_level = Some(LevelFilter::from_str(&val).ok().context(error::Usage {
                    message: format!("Invalid log level '{}'", val),
                })?);
            }
            "--help" | "-h" => return Err(Error::Usage { message: None }),
            "--user" => flag(&mut options.given, "--user", &mut options.user),
            "--match-full" => {
                flag(&mut options.given, "--match-full", &mut options.match_full)
            }
            "--shell" => flag(&mut options.given, "--shell", &mut options.shell),
            "--state" => {
                options.given.push("--state");
                options.state = Some(value(&mut iter, "--state")?);
            }
            "--enabled" => {
                options.given.push("--enabled");
                options.enabled = Some(yes_no("--enabled", &value(&mut iter, "--enabled")?)?);
            }
            "--defined" => {
                options.given.push("--defined");
                options.defined = Some(yes_no("--defined", &value(&mut iter, "--defined")?)?);
            }
            "--pattern" => {
                options.given.push("--pattern");
                options.pattern = Some(value(&mut iter, "--pattern")?);
            }
            "--chdir" => {
                options.given.push("--chdir");
                options.chdir = Some(PathBuf::from(value(&mut iter, "--chdir")?));
            }
            "--want-rc" => {
                options.given.push("--want-rc");
                let val = value(&mut iter, "--want-rc")?;
                let rc = val.parse().ok().context(error::Usage {
                    message: format!("Invalid exit code for --want-rc: '{}'", val),
                })?;
                options.want.push(Expectation::Rc(rc));
            }
            "--want-stdout" => {
                options.given.push("--want-stdout");
                options
                    .want
                    .push(Expectation::Stdout(value(&mut iter, "--want-stdout")?));
            }
            "--want-stderr" => {
                options.given.push("--want-stderr");
                options
                    .want
                    .push(Expectation::Stderr(value(&mut iter, "--want-stderr")?));
            }
            "--executable" => {
                options.given.push("--executable");
                options.executable = Some(value(&mut iter, "--executable")?);
            }
            "--var" => {
                options.given.push("--var");
                let val = value(&mut iter, "--var")?;
                let mut split = val.splitn(2, '=');
                match (split.next(), split.next()) {
                    (Some(key), Some(v)) if !key.is_empty() => {
                        options.vars.insert(key.to_string(), v.to_string());
                    }
                    _ => {
                        return error::Usage {
                            message: format!("Expected key=value for --var, got '{}'", val),
                        }
                        .fail()
                    }
                }
            }
            // The target of `command` can be anything, so only the second positional is exempt
            s if !s.starts_with('-') || positional.len() == 1 => positional.push(s.to_string()),
            unknown => {
                return Err(Error::Usage {
                    message: Some(format!("Unexpected argument: '{}'", unknown)),
                });
            }
        }
    }

    let mut positional = positional.into_iter();
    let subcommand = positional.next().context(error::Usage {
        message: Some(String::from("Subcommand not found.")),
    })?;
    let target = positional.next().context(error::Usage {
        message: format!("No target given for '{}'", subcommand),
    })?;
    if let Some(extra) = positional.next() {
        return error::Usage {
            message: format!("Unexpected argument: '{}'", extra),
        }
        .fail();
    }

    Ok(Arguments {
        command: build_command(&subcommand, target, options)?,
        config_path,
        log_level: log_level.unwrap_or(LevelFilter::Info),
    })
}

fn build_command(subcommand: &str, target: String, mut options: Options) -> Result<Command> {
    match subcommand {
        SERVICE => {
            options.only(subcommand, &["--state", "--enabled", "--defined"])?;
            let state = run_state(options.state.as_deref())?;
            ensure!(
                state.is_some() || options.enabled.is_some() || options.defined.is_some(),
                error::Usage {
                    message: String::from("One of --state, --enabled or --defined is required")
                }
            );
            Ok(Command::Service(ServiceRequest {
                name: target,
                state,
                enabled: options.enabled,
                defined: options.defined,
            }))
        }
        SYSTEMD => {
            options.only(subcommand, &["--state", "--enabled", "--defined", "--user"])?;
            let state = run_state(options.state.as_deref())?;
            ensure!(
                state.is_some() || options.enabled.is_some() || options.defined.is_some(),
                error::Usage {
                    message: String::from("One of --state, --enabled or --defined is required")
                }
            );
            Ok(Command::Systemd(SystemdRequest {
                unit: target,
                state,
                enabled: options.enabled,
                defined: options.defined,
                user: options.user,
            }))
        }
        RPM => {
            options.only(subcommand, &["--state"])?;
            Ok(Command::Rpm(RpmRequest {
                name: target,
                state: presence(options.state.as_deref())?,
            }))
        }
        PS => {
            options.only(subcommand, &["--state", "--match-full"])?;
            Ok(Command::Ps(PsRequest {
                pattern: target,
                state: presence(options.state.as_deref())?,
                match_full: options.match_full,
            }))
        }
        PIDFILE => {
            options.only(subcommand, &["--state", "--match-full", "--pattern"])?;
            let state = presence(options.state.as_deref())?;
            Ok(Command::Pidfile(PidfileRequest {
                path: PathBuf::from(target),
                pattern: options.pattern.context(error::Usage {
                    message: String::from("--pattern is required for 'pidfile'"),
                })?,
                state,
                match_full: options.match_full,
            }))
        }
        COMMAND => {
            options.only(
                subcommand,
                &[
                    "--want-rc",
                    "--want-stdout",
                    "--want-stderr",
                    "--shell",
                    "--chdir",
                ],
            )?;
            ensure!(
                options.want.len() == 1,
                error::Usage {
                    message: String::from(
                        "Exactly one of --want-rc, --want-stdout or --want-stderr is required"
                    )
                }
            );
            Ok(Command::Exec(CommandRequest {
                cmd: target,
                shell: options.shell,
                chdir: options.chdir,
                want: options.want.remove(0),
            }))
        }
        IPTABLES => {
            options.only(subcommand, &["--executable", "--var"])?;
            Ok(Command::Iptables(IptablesRequest {
                src: PathBuf::from(target),
                executable: options
                    .executable
                    .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string()),
                vars: options.vars,
            }))
        }
        unk => error::Usage {
            message: format!("Unknown command: '{}'", unk),
        }
        .fail(),
    }
}

fn flag(given: &mut Vec<&'static str>, name: &'static str, value: &mut bool) {
    given.push(name);
    *value = true;
}

fn value<I: Iterator<Item = String>>(iter: &mut I, name: &str) -> Result<String> {
    iter.next().context(error::Usage {
        message: format!("Did not give argument to {}", name),
    })
}

fn yes_no(name: &str, val: &str) -> Result<bool> {
    match val {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        _ => error::Usage {
            message: format!("Expected yes or no for {}, got '{}'", name, val),
        }
        .fail(),
    }
}

fn run_state(val: Option<&str>) -> Result<Option<RunState>> {
    val.map(|s| {
        RunState::parse(s).context(error::Usage {
            message: format!("Expected started or stopped for --state, got '{}'", s),
        })
    })
    .transpose()
}

/// Presence defaults to present when --state isn't given.
fn presence(val: Option<&str>) -> Result<Presence> {
    match val {
        None => Ok(Presence::default()),
        Some(s) => Presence::parse(s).context(error::Usage {
            message: format!("Expected present or absent for --state, got '{}'", s),
        }),
    }
}

#[cfg(test)]
fn argv(raw: &[&str]) -> impl Iterator<Item = String> {
    std::iter::once("/bin/checkdog")
        .chain(raw.iter().copied())
        .map(String::from)
        .collect::<Vec<_>>()
        .into_iter()
}

#[test]
fn parse_args_service() {
    let args = parse_args(argv(&[
        "service",
        "httpd",
        "--state",
        "started",
        "--enabled",
        "yes",
    ]))
    .unwrap();
    assert_eq!(
        args.command,
        Command::Service(ServiceRequest {
            name: "httpd".to_string(),
            state: Some(RunState::Started),
            enabled: Some(true),
            defined: None,
        })
    );
    assert_eq!(args.config_path, None);
    assert_eq!(args.log_level, LevelFilter::Info);
}

#[test]
fn parse_args_global_options() {
    let args = parse_args(argv(&[
        "--log-level",
        "trace",
        "systemd",
        "--config",
        "/some/path",
        "sshd",
        "--defined",
        "true",
        "--user",
    ]))
    .unwrap();
    assert_eq!(args.config_path, Some(PathBuf::from("/some/path")));
    assert_eq!(args.log_level, LevelFilter::Trace);
    match args.command {
        Command::Systemd(request) => {
            assert_eq!(request.unit, "sshd");
            assert!(request.user);
            assert_eq!(request.defined, Some(true));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn parse_args_service_needs_a_dimension() {
    let result = parse_args(argv(&["service", "httpd"]));
    assert!(matches!(result, Err(Error::Usage { message: Some(_) })));
}

#[test]
fn parse_args_presence_defaults() {
    let args = parse_args(argv(&["rpm", "bash"])).unwrap();
    assert_eq!(
        args.command,
        Command::Rpm(RpmRequest {
            name: "bash".to_string(),
            state: Presence::Present,
        })
    );
}

#[test]
fn parse_args_pidfile_needs_pattern() {
    assert!(parse_args(argv(&["pidfile", "/run/sshd.pid"])).is_err());
    let args = parse_args(argv(&[
        "pidfile",
        "/run/sshd.pid",
        "--pattern",
        "^sshd$",
        "--state",
        "absent",
    ]))
    .unwrap();
    match args.command {
        Command::Pidfile(request) => {
            assert_eq!(request.pattern, "^sshd$");
            assert_eq!(request.state, Presence::Absent);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn parse_args_command() {
    let args = parse_args(argv(&[
        "command",
        "grep -q foo /etc/hosts",
        "--want-rc",
        "1",
        "--chdir",
        "/tmp",
    ]))
    .unwrap();
    assert_eq!(
        args.command,
        Command::Exec(CommandRequest {
            cmd: "grep -q foo /etc/hosts".to_string(),
            shell: false,
            chdir: Some(PathBuf::from("/tmp")),
            want: Expectation::Rc(1),
        })
    );
}

#[test]
fn parse_args_command_target_may_look_like_an_option() {
    let args = parse_args(argv(&["command", "-x", "--want-stdout", ""])).unwrap();
    match args.command {
        Command::Exec(request) => assert_eq!(request.cmd, "-x"),
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn parse_args_command_needs_one_expectation() {
    assert!(parse_args(argv(&["command", "true"])).is_err());
    assert!(parse_args(argv(&[
        "command",
        "true",
        "--want-rc",
        "0",
        "--want-stdout",
        "x"
    ]))
    .is_err());
}

#[test]
fn parse_args_iptables_vars() {
    let args = parse_args(argv(&[
        "iptables",
        "/etc/rules.j2",
        "--var",
        "ssh_port=22",
        "--var",
        "motd=a=b",
    ]))
    .unwrap();
    match args.command {
        Command::Iptables(request) => {
            assert_eq!(request.executable, DEFAULT_EXECUTABLE);
            assert_eq!(request.vars["ssh_port"], "22");
            assert_eq!(request.vars["motd"], "a=b");
        }
        other => panic!("unexpected command {:?}", other),
    }
    assert!(parse_args(argv(&["iptables", "/etc/rules.j2", "--var", "nokey"])).is_err());
}

#[test]
fn parse_args_option_for_other_subcommand() {
    let result = parse_args(argv(&["rpm", "bash", "--match-full"]));
    assert!(result.is_err());
}

#[test]
fn parse_args_bad_values() {
    assert!(parse_args(argv(&["service", "httpd", "--state", "running"])).is_err());
    assert!(parse_args(argv(&["service", "httpd", "--enabled", "maybe"])).is_err());
    assert!(parse_args(argv(&["rpm", "bash", "--log-level", "loud"])).is_err());
    assert!(parse_args(argv(&["rpm", "bash", "--state"])).is_err());
}

#[test]
fn parse_args_bad_command() {
    assert!(parse_args(argv(&["nope", "x"])).is_err());
    assert!(parse_args(argv(&["--config", "/some/path"])).is_err());
    assert!(parse_args(argv(&["rpm"])).is_err());
    assert!(parse_args(argv(&["rpm", "bash", "extra"])).is_err());
}
