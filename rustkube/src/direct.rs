use std::{
    fs,
    io::Write as _,
    path::{Path, PathBuf},
};

use serde::*;
use serde_yaml::Value as YamlValue;

use crate::Error;

/// Accept `null` as well as a missing key for list fields; kubectl writes
/// `users: null` into freshly created files.
fn nullable_vec<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(de)?.unwrap_or_default())
}

fn is_false(value: &bool) -> bool {
    !*value
}

// region: Context
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContextSpec {
    pub cluster: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Context {
    pub name: String,
    pub context: ContextSpec,
}
// endregion

// region: Cluster
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterSpec {
    pub server: String,
    /// Base64 encoded PEM bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure_skip_tls_verify: bool,
}

impl ClusterSpec {
    /// Rebase a relative `certificate-authority` path onto `dir`, the
    /// directory holding the kubeconfig it was read from.
    pub fn resolve_paths(&mut self, dir: &Path) {
        if let Some(path) = &mut self.certificate_authority {
            if path.is_relative() && !path.as_os_str().is_empty() {
                *path = dir.join(&*path);
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Cluster {
    pub name: String,
    pub cluster: ClusterSpec,
}
// endregion

// region: User
/// Only bearer tokens are modelled; anything else in a user entry (client
/// certificates, exec plugins, auth providers) is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserSpec {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct User {
    pub name: String,
    pub user: UserSpec,
}
// endregion

// region: Common
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "v1")]
    V1,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    #[default]
    Config,
}

/// A kubeconfig exactly as laid out on disk.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(rename = "apiVersion", default)]
    pub api_version: ApiVersion,
    #[serde(default)]
    pub kind: Kind,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub clusters: Vec<Cluster>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub contexts: Vec<Context>,
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub preferences: YamlValue,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub users: Vec<User>,
}

impl KubeConfig {
    /// Parse the kubeconfig at `path`, rebasing relative file references
    /// onto the file's own directory.
    pub fn read_from(path: impl AsRef<Path>) -> Result<KubeConfig, Error> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        let mut kc: KubeConfig =
            serde_yaml::from_reader(file).map_err(|source| Error::Parse {
                path: path.to_owned(),
                source,
            })?;

        if let Some(dir) = path.parent() {
            for cluster in &mut kc.clusters {
                cluster.cluster.resolve_paths(dir);
            }
        }

        Ok(kc)
    }

    /// Serialize to `path`, replacing whatever is there. The handle is
    /// flushed and closed before this returns.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt as _;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(|source| Error::Write {
            path: path.to_owned(),
            source,
        })?;
        serde_yaml::to_writer(&mut file, self).map_err(|source| Error::Serialize {
            path: path.to_owned(),
            source,
        })?;
        file.flush().map_err(|source| Error::Write {
            path: path.to_owned(),
            source,
        })
    }
}
// endregion
