//! Building and writing the ServiceAccount kubeconfig.

use std::{fs, io, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rustkube::{ClusterSpec, ContextSpec, KubeConfig, UserSpec};
use tracing::debug;

use crate::{source::CaSource, Error, Result};

/// How the generated cluster entry will verify the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trust {
    /// Base64 encoded CA bundle.
    CaData(String),
    /// No CA could be found; TLS verification is disabled. Carries the
    /// warning to show the user.
    Insecure(String),
}

pub fn resolve_trust(ca: &CaSource) -> Trust {
    match ca {
        CaSource::Inline(data) => Trust::CaData(data.clone()),
        CaSource::File(path) => match fs::read(path) {
            Ok(pem) => Trust::CaData(STANDARD.encode(pem)),
            Err(err) => Trust::Insecure(format!(
                "Warning: Failed to read CA certificate {}: {err}\nSetting insecure-skip-tls-verify: true",
                path.display()
            )),
        },
        CaSource::None => Trust::Insecure(
            "Warning: No CA certificate data found. Setting insecure-skip-tls-verify: true".into(),
        ),
    }
}

/// Everything that ends up in the generated file.
#[derive(Debug, Clone)]
pub struct Credentials<'a> {
    pub cluster_name: &'a str,
    pub server: &'a str,
    pub trust: &'a Trust,
    pub user: &'a str,
    pub token: &'a str,
    pub context_name: &'a str,
    pub namespace: &'a str,
}

/// A kubeconfig holding exactly one cluster, one user and one context,
/// with that context selected.
pub fn build(creds: &Credentials<'_>) -> KubeConfig {
    let mut cluster = ClusterSpec {
        server: creds.server.to_owned(),
        ..ClusterSpec::default()
    };
    match creds.trust {
        Trust::CaData(data) => cluster.certificate_authority_data = Some(data.clone()),
        Trust::Insecure(_) => cluster.insecure_skip_tls_verify = true,
    }

    let mut kc = KubeConfig {
        current_context: creds.context_name.to_owned(),
        ..KubeConfig::default()
    };
    kc.clusters.insert(creds.cluster_name.to_owned(), cluster);
    kc.users
        .insert(creds.user.to_owned(), UserSpec::with_token(creds.token));
    kc.contexts.insert(
        creds.context_name.to_owned(),
        ContextSpec {
            cluster: creds.cluster_name.to_owned(),
            user: creds.user.to_owned(),
            namespace: Some(creds.namespace.to_owned()),
        },
    );
    kc
}

/// Write `kc` to `path` and restrict it to its owner.
///
/// A permission failure leaves the written file in place.
pub fn write(kc: KubeConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|source| Error::OutputDirError {
                path: dir.to_owned(),
                source,
            })?;
        }
    }

    rustkube::write_config(kc, path).map_err(Error::WriteError)?;

    restrict_permissions(path).map_err(|source| Error::PermissionError {
        path: path.to_owned(),
        source,
    })?;
    debug!(path = %path.display(), "wrote kubeconfig");
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
