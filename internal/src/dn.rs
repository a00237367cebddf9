use crate::error::ConfigError;

/// Characters that would need escaping inside an RDN value
const DN_SPECIAL: &[char] = &[',', '+', '"', '\\', '<', '>', ';', '=', '#'];

const ADMIN_RDN: &str = "cn=admin";

/// Root of the directory tree, derived from a DNS domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffix {
    labels: Vec<String>,
}

impl Suffix {
    /// `example.com` -> `dc=example,dc=com`
    pub fn from_domain(domain: &str) -> Result<Self, ConfigError> {
        let malformed = |reason| ConfigError::MalformedDomain {
            domain: domain.to_string(),
            reason,
        };

        if domain.trim().is_empty() {
            return Err(malformed("no labels"));
        }

        let labels = domain
            .split('.')
            .map(|label| {
                if label.is_empty() {
                    Err(malformed("empty label"))
                } else if label.chars().any(char::is_whitespace) {
                    Err(malformed("label contains whitespace"))
                } else if label.contains(DN_SPECIAL) {
                    Err(malformed("label contains a DN special character"))
                } else {
                    Ok(label.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { labels })
    }

    /// First domain label, used as the `dc` of the root entry
    pub fn first_label(&self) -> &str {
        // from_domain never yields zero labels
        &self.labels[0]
    }

    pub fn default_admin(&self) -> String {
        format!("{ADMIN_RDN},{self}")
    }
}

impl std::fmt::Display for Suffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dn = self
            .labels
            .iter()
            .map(|label| format!("dc={label}"))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&dn)
    }
}

/// `cn=root,dc=example,dc=com` -> `root`
pub fn admin_display_name(admin_dn: &str) -> Result<String, ConfigError> {
    let malformed = || ConfigError::MalformedAdminDn {
        dn: admin_dn.to_string(),
    };

    let first = admin_dn.split(',').next().unwrap_or_default().trim();
    let (attr, value) = first.split_once('=').ok_or_else(malformed)?;

    if !attr.trim().eq_ignore_ascii_case("cn") || value.trim().is_empty() {
        return Err(malformed());
    }

    Ok(value.trim().to_string())
}
