use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dn::{admin_display_name, Suffix};
use crate::error::ConfigError;

pub const DEFAULT_ORGANIZATION: &str = "SUSE";
pub const DEFAULT_LOG_LEVEL: u32 = 256;

fn default_config_dir() -> PathBuf {
    PathBuf::from("/etc/openldap/slapd.d")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/ldap")
}

fn default_marker() -> PathBuf {
    PathBuf::from("data.mdb")
}

fn default_client_preset() -> PathBuf {
    PathBuf::from("/etc/openldap/ldap.conf")
}

fn default_legacy_config() -> PathBuf {
    PathBuf::from("/etc/openldap/slapd.conf")
}

fn default_config_ldif() -> PathBuf {
    PathBuf::from("/tmp/slapd-config.ldif")
}

fn default_seed_ldif() -> PathBuf {
    PathBuf::from("/tmp/slapd-seed.ldif")
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("/etc/openldap/schema")
}

fn default_module_dir() -> PathBuf {
    PathBuf::from("/usr/lib64/openldap")
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("/run/slapd")
}

fn default_ca_certificate() -> PathBuf {
    PathBuf::from("/etc/openldap/certs/ca.crt")
}

fn default_certificate() -> PathBuf {
    PathBuf::from("/etc/openldap/certs/tls.crt")
}

fn default_certificate_key() -> PathBuf {
    PathBuf::from("/etc/openldap/certs/tls.key")
}

fn default_preset_uri() -> String {
    "ldap://localhost".to_string()
}

fn default_require_cert() -> String {
    "allow".to_string()
}

fn default_slappasswd() -> PathBuf {
    PathBuf::from("slappasswd")
}

fn default_slapadd() -> PathBuf {
    PathBuf::from("slapadd")
}

fn default_slapd() -> PathBuf {
    PathBuf::from("slapd")
}

fn default_log_level() -> u32 {
    DEFAULT_LOG_LEVEL
}

#[derive(Deserialize, Debug, Clone)]
pub struct PathsConfig {
    /// cn=config store handed to slapd with -F
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Persistence marker, relative to `data_dir` unless absolute
    #[serde(default = "default_marker")]
    pub marker: PathBuf,

    #[serde(default = "default_client_preset")]
    pub client_preset: PathBuf,

    #[serde(default = "default_legacy_config")]
    pub legacy_config: PathBuf,

    #[serde(default = "default_config_ldif")]
    pub config_ldif: PathBuf,

    #[serde(default = "default_seed_ldif")]
    pub seed_ldif: PathBuf,

    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    #[serde(default = "default_module_dir")]
    pub module_dir: PathBuf,

    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            data_dir: default_data_dir(),
            marker: default_marker(),
            client_preset: default_client_preset(),
            legacy_config: default_legacy_config(),
            config_ldif: default_config_ldif(),
            seed_ldif: default_seed_ldif(),
            schema_dir: default_schema_dir(),
            module_dir: default_module_dir(),
            run_dir: default_run_dir(),
        }
    }
}

impl PathsConfig {
    pub fn marker_path(&self) -> PathBuf {
        self.data_dir.join(&self.marker)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TlsConfig {
    #[serde(default = "default_ca_certificate")]
    pub ca_certificate: PathBuf,

    #[serde(default = "default_certificate")]
    pub certificate: PathBuf,

    #[serde(default = "default_certificate_key")]
    pub certificate_key: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            ca_certificate: default_ca_certificate(),
            certificate: default_certificate(),
            certificate_key: default_certificate_key(),
        }
    }
}

/// Values written to the client side ldap.conf
#[derive(Deserialize, Debug, Clone)]
pub struct PresetConfig {
    #[serde(default = "default_preset_uri")]
    pub uri: String,

    /// TLS_REQCERT policy
    #[serde(default = "default_require_cert")]
    pub require_cert: String,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            uri: default_preset_uri(),
            require_cert: default_require_cert(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ToolsConfig {
    #[serde(default = "default_slappasswd")]
    pub slappasswd: PathBuf,

    #[serde(default = "default_slapadd")]
    pub slapadd: PathBuf,

    #[serde(default = "default_slapd")]
    pub slapd: PathBuf,

    pub timeout_seconds: Option<u64>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            slappasswd: default_slappasswd(),
            slapadd: default_slapadd(),
            slapd: default_slapd(),
            timeout_seconds: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DaemonConfig {
    #[serde(default = "default_log_level")]
    pub log_level: u32,

    pub user: Option<String>,
    pub group: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user: None,
            group: None,
        }
    }
}

/// Optional TOML file tuning where things live
#[derive(Deserialize, Debug, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub tls: TlsConfig,

    #[serde(default)]
    pub preset: PresetConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file {}", path.display()))?;
        toml::from_str(&file)
            .with_context(|| format!("cannot parse configuration file {}", path.display()))
    }
}

/// Raw operator input, as found in the environment
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub password_file: Option<PathBuf>,
    pub domain: Option<String>,
    pub organization: Option<String>,
    pub admin_dn: Option<String>,
    pub tls: bool,
}

/// Validated settings, every default already resolved
#[derive(Debug, Clone)]
pub struct Settings {
    pub password_file: PathBuf,
    pub domain: String,
    pub suffix: Suffix,
    pub organization: String,
    pub admin_dn: String,
    /// `cn` of the admin role entry
    pub admin_name: String,
    pub tls: bool,
}

impl Settings {
    pub fn resolve(inputs: Inputs) -> Result<Self, ConfigError> {
        let password_file = inputs
            .password_file
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingPasswordFile)?;
        let domain = inputs
            .domain
            .filter(|domain| !domain.is_empty())
            .ok_or(ConfigError::MissingDomain)?;

        let suffix = Suffix::from_domain(&domain)?;

        let organization = inputs
            .organization
            .filter(|org| !org.is_empty())
            .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string());

        let admin_dn = inputs
            .admin_dn
            .filter(|dn| !dn.is_empty())
            .unwrap_or_else(|| suffix.default_admin());
        let admin_name = admin_display_name(&admin_dn)?;

        Ok(Self {
            password_file,
            domain,
            suffix,
            organization,
            admin_dn,
            admin_name,
            tls: inputs.tls,
        })
    }
}
