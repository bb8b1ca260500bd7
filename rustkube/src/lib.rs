pub mod clean;
pub mod direct;
mod error;

use std::path::PathBuf;

pub use clean::*;
pub use error::Error;

/// `~/.kube`, when a home directory can be determined.
pub fn kube_dir() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(".kube"))
}

/// The kubeconfig kubectl falls back to when `KUBECONFIG` is unset.
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    kube_dir().map(|dir| dir.join("config"))
}
