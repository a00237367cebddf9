use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{PresetConfig, TlsConfig};

pub fn client_preset(preset: &PresetConfig, tls: &TlsConfig) -> String {
    format!(
        "URI {uri}\nTLS_CACERT {ca}\nTLS_REQCERT {reqcert}\n",
        uri = preset.uri,
        ca = tls.ca_certificate.display(),
        reqcert = preset.require_cert,
    )
}

/// Rewrite the ldap.conf used by the client tools inside the container
pub fn write_client_preset(path: &Path, preset: &PresetConfig, tls: &TlsConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    std::fs::write(path, client_preset(preset, tls))
        .with_context(|| format!("cannot write client preset {}", path.display()))
}

/// slapd prefers slapd.conf over slapd.d when both exist
pub fn remove_legacy_config(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("cannot remove legacy config {}", path.display()))
        }
    }
}
