//! Reading the administrative kubeconfig the new one is derived from.

use std::path::{Path, PathBuf};

use rustkube::KubeConfig;
use tracing::debug;

use crate::{Error, Result};

/// Certificate authority material attached to a source cluster entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaSource {
    /// `certificate-authority-data`, still base64 encoded.
    Inline(String),
    /// `certificate-authority`, already rebased onto the kubeconfig's directory.
    File(PathBuf),
    None,
}

/// The parts of the source kubeconfig's current context that get copied
/// into the generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCluster {
    pub context: String,
    pub cluster_name: String,
    pub server: String,
    pub ca: CaSource,
}

pub fn load(path: &Path) -> Result<SourceCluster> {
    let kc = rustkube::read_config(path).map_err(|source| Error::SourceLoadError {
        path: path.to_owned(),
        source: source.into(),
    })?;
    let source = SourceCluster::from_kubeconfig(&kc)?;
    debug!(
        path = %path.display(),
        context = %source.context,
        cluster = %source.cluster_name,
        server = %source.server,
        "loaded source kubeconfig"
    );
    Ok(source)
}

impl SourceCluster {
    pub fn from_kubeconfig(kc: &KubeConfig) -> Result<Self> {
        let (context, spec) = kc
            .current_context()
            .ok_or_else(|| Error::NoCurrentContext(kc.current_context.clone()))?;
        let cluster = kc
            .cluster(&spec.cluster)
            .ok_or_else(|| Error::NoClusterForContext {
                context: context.to_owned(),
                cluster: spec.cluster.clone(),
            })?;

        let ca = match (
            &cluster.certificate_authority_data,
            &cluster.certificate_authority,
        ) {
            (Some(data), _) if !data.is_empty() => CaSource::Inline(data.clone()),
            (_, Some(path)) if !path.as_os_str().is_empty() => CaSource::File(path.clone()),
            _ => CaSource::None,
        };

        Ok(Self {
            context: context.to_owned(),
            cluster_name: spec.cluster.clone(),
            server: cluster.server.clone(),
            ca,
        })
    }
}
