use std::path::PathBuf;

use thiserror::Error;

/// Mistakes in the operator supplied configuration. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SLAPD_PASSWORD_FILE is not set. Point it to a file containing the admin password")]
    MissingPasswordFile,

    #[error("SLAPD_DOMAIN is not set. Set it to the directory domain, for example example.com")]
    MissingDomain,

    #[error("domain {domain:?} is malformed: {reason}")]
    MalformedDomain { domain: String, reason: &'static str },

    #[error("admin DN {dn:?} must start with a cn= component")]
    MalformedAdminDn { dn: String },

    #[error("cannot read password file {path}: {source}")]
    UnreadablePasswordFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("password file {path} is empty")]
    EmptyPasswordFile { path: PathBuf },
}

/// Failures of the external OpenLDAP tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("cannot run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("{tool} failed with exit code {code}: {stderr}")]
    Failed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("{tool} produced no output")]
    EmptyOutput { tool: String },
}

impl ToolError {
    /// Exit code the entrypoint should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::Failed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}
