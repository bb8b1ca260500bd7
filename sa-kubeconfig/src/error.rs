use std::{io, path::PathBuf};

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a run can fail. None of these are recovered from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("ServiceAccount name is required")]
    MissingRequiredInput,

    #[error("failed to load kubeconfig {}", .path.display())]
    SourceLoadError {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("no current context found (current-context: {0:?})")]
    NoCurrentContext(String),

    #[error("no cluster {cluster:?} found for current context {context:?}")]
    NoClusterForContext { context: String, cluster: String },

    #[error("failed to get ServiceAccount {name} in namespace {namespace}")]
    ServiceAccountNotFound {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("ServiceAccount {name} in namespace {namespace} has no secrets")]
    NoAssociatedSecret { name: String, namespace: String },

    #[error("failed to get secret {name}")]
    SecretReadError {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("token not found in secret {secret}")]
    TokenFieldMissing { secret: String },

    #[error("failed to create output directory {}", .path.display())]
    OutputDirError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write kubeconfig to file")]
    WriteError(#[source] rustkube::Error),

    #[error("failed to set kubeconfig file permissions on {}", .path.display())]
    PermissionError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
