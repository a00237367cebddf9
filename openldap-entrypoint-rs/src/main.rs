use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use internal::{
    cli::SlapTools, handoff::Handoff, limits, Bootstrap, ConfigError, FileConfig, Inputs,
    Outcome, Settings, ToolError,
};
use tracing_subscriber::EnvFilter;

const CONFIG_ERROR_CODE: u8 = 2;

/// Exit code when exec of slapd itself fails, as a shell would report it
const EXEC_ERROR_CODE: u8 = 127;

#[derive(Parser)]
#[clap(version, about)]
pub struct Args {
    /// Path to the TOML configuration file
    #[clap(short, long, env = "SLAPD_ENTRYPOINT_CONFIG")]
    config: Option<PathBuf>,

    /// File holding the plaintext admin password
    #[clap(long, env = "SLAPD_PASSWORD_FILE")]
    password_file: Option<PathBuf>,

    /// DNS domain the directory suffix is derived from
    #[clap(long, env = "SLAPD_DOMAIN")]
    domain: Option<String>,

    /// Organization name of the root entry [default: SUSE]
    #[clap(long, env = "SLAPD_ORGANIZATION")]
    organization: Option<String>,

    /// Admin DN [default: cn=admin,<suffix>]
    #[clap(long, env = "SLAPD_ADMIN_DN")]
    admin_dn: Option<String>,

    /// Enable TLS. Any non-empty value in the environment enables it
    #[clap(long, env = "SLAPD_TLS", num_args = 0..=1, default_missing_value = "1")]
    tls: Option<String>,

    /// slapd debug level
    #[clap(short = 'L', long)]
    log_level: Option<u32>,
}

impl Args {
    fn inputs(&self) -> Inputs {
        Inputs {
            password_file: self.password_file.clone(),
            domain: self.domain.clone(),
            organization: self.organization.clone(),
            admin_dn: self.admin_dn.clone(),
            tls: self.tls.as_deref().is_some_and(|tls| !tls.is_empty()),
        }
    }
}

async fn bootstrap(args: Args) -> Result<Handoff> {
    if let Err(e) = limits::raise_nofile(limits::NOFILE_LIMIT) {
        tracing::warn!(
            "Cannot raise open files limit to {}: {}",
            limits::NOFILE_LIMIT,
            e
        );
    }

    let settings = Settings::resolve(args.inputs())?;

    let mut config: FileConfig = if let Some(conf) = &args.config {
        FileConfig::load(conf)?
    } else {
        Default::default()
    };

    if let Some(log_level) = args.log_level {
        config.daemon.log_level = log_level;
    }

    let tools = SlapTools::new(config.tools.clone(), config.paths.config_dir.clone());
    let bootstrap = Bootstrap::new(settings, config, tools);

    let (outcome, handoff) = bootstrap.run().await?;
    let state = match outcome {
        Outcome::Initialized => "initialized",
        Outcome::AlreadyInitialized => "already initialized",
    };
    tracing::info!("Directory {} {}", bootstrap.settings.suffix, state);

    Ok(handoff)
}

fn exit_code(error: &anyhow::Error) -> ExitCode {
    for cause in error.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ExitCode::from(CONFIG_ERROR_CODE);
        }
        if let Some(tool_error) = cause.downcast_ref::<ToolError>() {
            return ExitCode::from(u8::try_from(tool_error.exit_code()).unwrap_or(1));
        }
    }
    ExitCode::FAILURE
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match bootstrap(args).await {
        Ok(handoff) => {
            let error = handoff.exec();
            tracing::error!("Cannot exec {}: {}", handoff.program.display(), error);
            ExitCode::from(EXEC_ERROR_CODE)
        }
        Err(error) => {
            tracing::error!("Error: {:#}", error);
            exit_code(&error)
        }
    }
}
