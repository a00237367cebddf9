use std::path::Path;

use crate::config::{PathsConfig, Settings, TlsConfig};
use crate::ldif::{Document, Entry};

/// Schema files included into cn=schema, in load order
pub const SCHEMAS: &[&str] = &["core", "cosine", "inetorgperson", "nis"];

const BACKEND_MODULE: &str = "back_mdb.la";

const INDEXES: &[&str] = &[
    "objectClass eq",
    "cn,uid eq",
    "uidNumber,gidNumber eq",
    "member,memberUid eq",
];

const FRONTEND_ACLS: &[&str] = &[
    r#"to dn.base="" by * read"#,
    r#"to dn.base="cn=Subschema" by * read"#,
    "to attrs=userPassword by self write by anonymous auth by * none",
    "to * by self write by users read by anonymous auth",
];

/// Root over ldapi keeps managing cn=config after the bootstrap
const CONFIG_ACL: &str =
    "to * by dn.exact=gidNumber=0+uidNumber=0,cn=peercred,cn=external,cn=auth manage by * break";

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Document loaded into store 0 (cn=config)
pub fn config_document(
    settings: &Settings,
    paths: &PathsConfig,
    tls: &TlsConfig,
    root_pw_hash: &str,
) -> Document {
    let mut doc = Document::new();

    doc.push(
        Entry::new("cn=config")
            .attr("objectClass", "olcGlobal")
            .attr("cn", "config")
            .attr("olcArgsFile", display(&paths.run_dir.join("slapd.args")))
            .attr("olcPidFile", display(&paths.run_dir.join("slapd.pid")))
            .attr_if(
                settings.tls,
                "olcTLSCACertificateFile",
                display(&tls.ca_certificate),
            )
            .attr_if(
                settings.tls,
                "olcTLSCertificateFile",
                display(&tls.certificate),
            )
            .attr_if(
                settings.tls,
                "olcTLSCertificateKeyFile",
                display(&tls.certificate_key),
            ),
    );

    doc.push(
        Entry::new("cn=module,cn=config")
            .attr("objectClass", "olcModuleList")
            .attr("cn", "module")
            .attr("olcModulepath", display(&paths.module_dir))
            .attr("olcModuleload", BACKEND_MODULE),
    );

    doc.push(
        Entry::new("cn=schema,cn=config")
            .attr("objectClass", "olcSchemaConfig")
            .attr("cn", "schema"),
    );
    for schema in SCHEMAS {
        let file = paths.schema_dir.join(format!("{schema}.ldif"));
        doc.include(format!("file://{}", file.display()));
    }

    doc.push(
        Entry::new("olcDatabase=frontend,cn=config")
            .attrs("objectClass", ["olcDatabaseConfig", "olcFrontendConfig"])
            .attr("olcDatabase", "frontend")
            .attrs("olcAccess", FRONTEND_ACLS.iter().copied()),
    );

    doc.push(
        Entry::new("olcDatabase=config,cn=config")
            .attr("objectClass", "olcDatabaseConfig")
            .attr("olcDatabase", "config")
            .attr("olcAccess", CONFIG_ACL),
    );

    doc.push(
        Entry::new("olcDatabase=mdb,cn=config")
            .attrs("objectClass", ["olcDatabaseConfig", "olcMdbConfig"])
            .attr("olcDatabase", "mdb")
            .attr("olcDbDirectory", display(&paths.data_dir))
            .attr("olcSuffix", settings.suffix.to_string())
            .attr("olcRootDN", settings.admin_dn.as_str())
            .attr("olcRootPW", root_pw_hash)
            .attrs("olcDbIndex", INDEXES.iter().copied())
            .attr_if(settings.tls, "olcSecurity", "tls=1"),
    );

    doc
}

/// Document loaded into store 1, just enough for the admin to bind
pub fn seed_document(settings: &Settings) -> Document {
    let suffix = settings.suffix.to_string();
    let mut doc = Document::new();

    doc.push(
        Entry::new(suffix.as_str())
            .attrs("objectClass", ["top", "dcObject", "organization"])
            .attr("o", settings.organization.as_str())
            .attr("dc", settings.suffix.first_label())
            .attr("description", settings.organization.as_str()),
    );

    doc.push(
        Entry::new(settings.admin_dn.as_str())
            .attr("objectClass", "organizationalRole")
            .attr("cn", settings.admin_name.as_str())
            .attr("description", "Directory Manager"),
    );

    doc
}
