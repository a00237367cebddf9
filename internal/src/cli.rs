use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ToolsConfig;
use crate::error::ToolError;

/// slapadd database numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    Config = 0,
    Data = 1,
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// External OpenLDAP utilities the bootstrap relies on
#[allow(async_fn_in_trait)]
pub trait Toolchain {
    /// Salted hash of `password`, as printed by slappasswd
    async fn hash_password(&self, password: &str) -> Result<String>;

    /// Populate `store` from the LDIF file at `ldif`
    async fn load(&self, store: Store, ldif: &Path) -> Result<()>;
}

/// Runs the real binaries found on PATH or configured explicitly
#[derive(Debug, Clone)]
pub struct SlapTools {
    pub tools: ToolsConfig,
    pub config_dir: PathBuf,
}

impl SlapTools {
    pub fn new(tools: ToolsConfig, config_dir: PathBuf) -> Self {
        Self { tools, config_dir }
    }

    fn tool_name(program: &Path) -> String {
        program.display().to_string()
    }

    async fn execute_cmd(
        &self,
        program: &Path,
        cmd: &mut Command,
        stdin: Option<&[u8]>,
    ) -> Result<std::process::Output, ToolError> {
        let tool = Self::tool_name(program);

        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let spawn_err = |source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_err)?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await.map_err(spawn_err)?;
            // closing the pipe signals end of input
            drop(pipe);
        }

        let waited = if let Some(timeout_s) = self.tools.timeout_seconds {
            timeout(Duration::from_secs(timeout_s), child.wait_with_output())
                .await
                .map_err(|_| ToolError::Timeout {
                    tool: tool.clone(),
                    seconds: timeout_s,
                })?
        } else {
            child.wait_with_output().await
        };
        let output = waited.map_err(spawn_err)?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                tool,
                code: output.status.code().unwrap_or(1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

impl Toolchain for SlapTools {
    async fn hash_password(&self, password: &str) -> Result<String> {
        let program = &self.tools.slappasswd;
        let mut cmd = Command::new(program);
        cmd.args(["-n", "-T", "/dev/stdin"]);

        let output = self
            .execute_cmd(program, &mut cmd, Some(password.as_bytes()))
            .await?;

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if hash.is_empty() {
            return Err(ToolError::EmptyOutput {
                tool: Self::tool_name(program),
            }
            .into());
        }

        Ok(hash)
    }

    async fn load(&self, store: Store, ldif: &Path) -> Result<()> {
        let program = &self.tools.slapadd;
        let mut cmd = Command::new(program);
        cmd.arg("-n")
            .arg(store.to_string())
            .arg("-F")
            .arg(&self.config_dir)
            .arg("-l")
            .arg(ldif);

        let output = self.execute_cmd(program, &mut cmd, None).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("{} -n {store}: {}", Self::tool_name(program), stderr.trim());
        }

        Ok(())
    }
}
