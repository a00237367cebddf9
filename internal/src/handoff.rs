use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::config::{DaemonConfig, PathsConfig};

pub const LDAP_URL: &str = "ldap:///";
pub const LDAPI_URL: &str = "ldapi:///";
pub const LDAPS_URL: &str = "ldaps:///";

/// The final slapd invocation that replaces this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub program: PathBuf,
    pub config_dir: PathBuf,
    pub log_level: u32,
    pub urls: Vec<&'static str>,
    pub user: Option<String>,
    pub group: Option<String>,
}

impl Handoff {
    pub fn new(program: PathBuf, paths: &PathsConfig, daemon: &DaemonConfig, tls: bool) -> Self {
        let mut urls = vec![LDAP_URL, LDAPI_URL];
        if tls {
            urls.push(LDAPS_URL);
        }

        Self {
            program,
            config_dir: paths.config_dir.clone(),
            log_level: daemon.log_level,
            urls,
            user: daemon.user.clone(),
            group: daemon.group.clone(),
        }
    }

    /// Arguments passed to slapd, program name excluded
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-d".into(),
            self.log_level.to_string().into(),
            "-F".into(),
            self.config_dir.clone().into(),
            "-h".into(),
            self.urls.join(" ").into(),
        ];

        if let Some(user) = &self.user {
            args.extend(["-u".into(), user.into()]);
        }

        if let Some(group) = &self.group {
            args.extend(["-g".into(), group.into()]);
        }

        args
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args());
        cmd
    }

    /// Replace the current process with slapd. Returns only on failure.
    pub fn exec(&self) -> std::io::Error {
        tracing::info!(
            "Handing off to {} {:?}",
            self.program.display(),
            self.args()
        );
        self.command().exec()
    }
}
