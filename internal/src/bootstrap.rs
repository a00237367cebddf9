use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::{Store, Toolchain};
use crate::config::{FileConfig, Settings};
use crate::documents::{config_document, seed_document};
use crate::error::ConfigError;
use crate::handoff::Handoff;
use crate::ldif::Document;
use crate::preset::{remove_legacy_config, write_client_preset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Both stores were populated by this run
    Initialized,

    /// Persistence marker found, nothing was touched
    AlreadyInitialized,
}

pub struct Bootstrap<T> {
    pub settings: Settings,
    pub config: FileConfig,
    pub tools: T,
}

fn read_password(path: &Path) -> Result<String, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::UnreadablePasswordFile {
            path: path.to_path_buf(),
            source,
        })?;

    let password = content.trim_end_matches(['\n', '\r']);
    if password.is_empty() {
        return Err(ConfigError::EmptyPasswordFile {
            path: path.to_path_buf(),
        });
    }

    Ok(password.to_string())
}

/// Generated documents carry the root password hash, keep them private
fn write_document(path: &Path, doc: &Document) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .with_context(|| format!("cannot create {}", path.display()))?;

    // mode() only applies to newly created files
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("cannot restrict permissions of {}", path.display()))?;

    file.write_all(doc.to_ldif().as_bytes())
        .with_context(|| format!("cannot write {}", path.display()))
}

/// Drop a loaded document so the root password hash does not linger
fn remove_document(path: &Path) -> Result<()> {
    std::fs::remove_file(path).with_context(|| format!("cannot remove {}", path.display()))
}

impl<T: Toolchain> Bootstrap<T> {
    pub fn new(settings: Settings, config: FileConfig, tools: T) -> Self {
        Self {
            settings,
            config,
            tools,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.config.paths.marker_path().exists()
    }

    /// Everything up to, but excluding, the exec of slapd
    pub async fn run(&self) -> Result<(Outcome, Handoff)> {
        let paths = &self.config.paths;

        write_client_preset(&paths.client_preset, &self.config.preset, &self.config.tls)?;
        tracing::info!("Wrote client preset {}", paths.client_preset.display());

        let outcome = if self.is_initialized() {
            tracing::info!(
                "Found {}, skipping initialization",
                paths.marker_path().display()
            );
            Outcome::AlreadyInitialized
        } else {
            self.initialize().await?;
            Outcome::Initialized
        };

        let handoff = Handoff::new(
            self.config.tools.slapd.clone(),
            paths,
            &self.config.daemon,
            self.settings.tls,
        );

        Ok((outcome, handoff))
    }

    async fn initialize(&self) -> Result<()> {
        let paths = &self.config.paths;
        let settings = &self.settings;

        tracing::info!(
            "Initializing {} ({}) for {} (admin {}, tls {})",
            settings.suffix,
            settings.domain,
            settings.organization,
            settings.admin_dn,
            settings.tls
        );

        let password = read_password(&settings.password_file)?;
        let hash = self
            .tools
            .hash_password(&password)
            .await
            .context("cannot hash the admin password")?;

        if remove_legacy_config(&paths.legacy_config)? {
            tracing::info!("Removed legacy {}", paths.legacy_config.display());
        }

        for dir in [&paths.config_dir, &paths.data_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }

        let config = config_document(settings, paths, &self.config.tls, &hash);
        println!("{config}");
        write_document(&paths.config_ldif, &config)?;
        self.tools
            .load(Store::Config, &paths.config_ldif)
            .await
            .context("cannot load the configuration database")?;
        remove_document(&paths.config_ldif)?;
        tracing::info!("Loaded cn=config into {}", paths.config_dir.display());

        let seed = seed_document(settings);
        write_document(&paths.seed_ldif, &seed)?;
        self.tools
            .load(Store::Data, &paths.seed_ldif)
            .await
            .context("cannot load the seed entries")?;
        remove_document(&paths.seed_ldif)?;
        tracing::info!("Loaded {} seed entries", seed.entries().count());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::config::{Inputs, PathsConfig};
    use crate::error::ToolError;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Hash(String),
        Load(Store, String),
    }

    /// Records every call; a data load creates the marker like slapadd does
    #[derive(Default)]
    struct FakeTools {
        calls: Mutex<Vec<Call>>,
        marker: Option<PathBuf>,
        fail_on: Option<Store>,
    }

    impl FakeTools {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Toolchain for FakeTools {
        async fn hash_password(&self, password: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Hash(password.to_string()));
            Ok("{SSHA}fakehash".to_string())
        }

        async fn load(&self, store: Store, ldif: &Path) -> Result<()> {
            let content = std::fs::read_to_string(ldif)?;
            self.calls.lock().unwrap().push(Call::Load(store, content));

            if self.fail_on == Some(store) {
                return Err(ToolError::Failed {
                    tool: "slapadd".to_string(),
                    code: 1,
                    stderr: "invalid entry".to_string(),
                }
                .into());
            }

            if let (Store::Data, Some(marker)) = (store, &self.marker) {
                std::fs::write(marker, b"")?;
            }

            Ok(())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        config: FileConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            std::fs::write(root.join("password"), "s3cret\n").unwrap();

            let config = FileConfig {
                paths: PathsConfig {
                    config_dir: root.join("slapd.d"),
                    data_dir: root.join("data"),
                    client_preset: root.join("ldap.conf"),
                    legacy_config: root.join("slapd.conf"),
                    config_ldif: root.join("config.ldif"),
                    seed_ldif: root.join("seed.ldif"),
                    ..Default::default()
                },
                ..Default::default()
            };

            Self { dir, config }
        }

        fn settings(&self, tls: bool) -> Settings {
            Settings::resolve(Inputs {
                password_file: Some(self.dir.path().join("password")),
                domain: Some("example.com".to_string()),
                tls,
                ..Default::default()
            })
            .unwrap()
        }

        fn tools(&self) -> FakeTools {
            FakeTools {
                marker: Some(self.config.paths.marker_path()),
                ..Default::default()
            }
        }

        fn bootstrap(&self, tls: bool, tools: FakeTools) -> Bootstrap<FakeTools> {
            Bootstrap::new(self.settings(tls), self.config.clone(), tools)
        }
    }

    #[tokio::test]
    async fn first_run_hashes_and_loads_both_stores() {
        let fixture = Fixture::new();
        let bootstrap = fixture.bootstrap(false, fixture.tools());

        let (outcome, handoff) = bootstrap.run().await.unwrap();
        assert_eq!(outcome, Outcome::Initialized);
        assert_eq!(handoff.urls, vec!["ldap:///", "ldapi:///"]);

        let calls = bootstrap.tools.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], Call::Hash("s3cret".to_string()));

        let Call::Load(Store::Config, config) = &calls[1] else {
            panic!("expected config load, got {:?}", calls[1]);
        };
        assert!(config.contains("olcSuffix: dc=example,dc=com\n"));
        assert!(config.contains("olcRootPW: {SSHA}fakehash\n"));
        assert!(!config.contains("s3cret"));
        assert!(!config.contains("olcTLS"));

        let Call::Load(Store::Data, seed) = &calls[2] else {
            panic!("expected data load, got {:?}", calls[2]);
        };
        assert!(seed.starts_with("dn: dc=example,dc=com\n"));
        assert!(seed.contains("dn: cn=admin,dc=example,dc=com\n"));

        assert!(fixture.config.paths.client_preset.exists());
        assert!(fixture.config.paths.config_dir.is_dir());
    }

    #[tokio::test]
    async fn loaded_documents_are_removed() {
        let fixture = Fixture::new();
        let bootstrap = fixture.bootstrap(false, fixture.tools());
        bootstrap.run().await.unwrap();

        assert_eq!(bootstrap.tools.calls().len(), 3);
        assert!(!fixture.config.paths.config_ldif.exists());
        assert!(!fixture.config.paths.seed_ldif.exists());
    }

    #[tokio::test]
    async fn existing_marker_skips_everything() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(&fixture.config.paths.data_dir).unwrap();
        std::fs::write(fixture.config.paths.marker_path(), b"").unwrap();
        std::fs::write(&fixture.config.paths.legacy_config, b"legacy").unwrap();

        let bootstrap = fixture.bootstrap(true, fixture.tools());
        let (outcome, handoff) = bootstrap.run().await.unwrap();

        assert_eq!(outcome, Outcome::AlreadyInitialized);
        assert!(bootstrap.tools.calls().is_empty());
        assert!(!fixture.config.paths.config_ldif.exists());
        assert!(!fixture.config.paths.seed_ldif.exists());
        assert!(fixture.config.paths.legacy_config.exists());
        assert_eq!(handoff.urls.len(), 3);

        // the preset has no gating condition
        assert!(fixture.config.paths.client_preset.exists());
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let fixture = Fixture::new();

        let first = fixture.bootstrap(false, fixture.tools());
        assert_eq!(first.run().await.unwrap().0, Outcome::Initialized);

        let second = fixture.bootstrap(false, fixture.tools());
        assert_eq!(second.run().await.unwrap().0, Outcome::AlreadyInitialized);
        assert!(second.tools.calls().is_empty());
    }

    #[tokio::test]
    async fn tls_entries_are_generated() {
        let fixture = Fixture::new();
        let bootstrap = fixture.bootstrap(true, fixture.tools());
        let (_, handoff) = bootstrap.run().await.unwrap();

        let Call::Load(Store::Config, config) = &bootstrap.tools.calls()[1] else {
            panic!("expected config load");
        };
        assert!(config.contains("olcTLSCertificateFile: "));
        assert!(config.contains("olcSecurity: tls=1\n"));
        assert_eq!(handoff.urls, vec!["ldap:///", "ldapi:///", "ldaps:///"]);
    }

    #[tokio::test]
    async fn config_load_failure_stops_before_seed() {
        let fixture = Fixture::new();
        let tools = FakeTools {
            fail_on: Some(Store::Config),
            ..fixture.tools()
        };
        let bootstrap = fixture.bootstrap(false, tools);

        let err = bootstrap.run().await.unwrap_err();
        assert!(err.chain().any(|e| e.downcast_ref::<ToolError>().is_some()));

        let calls = bootstrap.tools.calls();
        assert_eq!(calls.len(), 2);
        assert!(!fixture.config.paths.seed_ldif.exists());
        assert!(!fixture.config.paths.marker_path().exists());
    }

    #[tokio::test]
    async fn unreadable_password_file_is_fatal() {
        let fixture = Fixture::new();
        std::fs::remove_file(fixture.dir.path().join("password")).unwrap();

        let bootstrap = fixture.bootstrap(false, fixture.tools());
        let err = bootstrap.run().await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnreadablePasswordFile { .. })
        ));
        assert!(bootstrap.tools.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_password_file_is_fatal() {
        let fixture = Fixture::new();
        std::fs::write(fixture.dir.path().join("password"), "\n").unwrap();

        let bootstrap = fixture.bootstrap(false, fixture.tools());
        let err = bootstrap.run().await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::EmptyPasswordFile { .. })
        ));
        assert!(bootstrap.tools.calls().is_empty());
    }

    #[tokio::test]
    async fn legacy_config_is_removed_on_first_run() {
        let fixture = Fixture::new();
        std::fs::write(&fixture.config.paths.legacy_config, b"legacy").unwrap();

        let bootstrap = fixture.bootstrap(false, fixture.tools());
        bootstrap.run().await.unwrap();
        assert!(!fixture.config.paths.legacy_config.exists());
    }

    #[test]
    fn documents_are_private() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.ldif");
        write_document(&path, &Document::new()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn existing_document_is_made_private() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.ldif");
        std::fs::write(&path, "stale").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_document(&path, &Document::new()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
