use std::path::PathBuf;

use crate::{
    args::{Args, TokenIssuerKind},
    Error,
};

/// Fully resolved parameters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub service_account: String,
    pub namespace: String,
    pub output: PathBuf,
    pub context_name: String,
    /// Overrides the cluster name taken from the source's current context.
    pub cluster_name: Option<String>,
    /// Overrides the server URL taken from the source's current context.
    pub api_server: Option<String>,
    pub kubeconfig: PathBuf,
    pub expiry_hours: u32,
    pub token_issuer: TokenIssuerKind,
    pub kubectl: PathBuf,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl TryFrom<Args> for Config {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let service_account =
            non_empty(args.service_account).ok_or(Error::MissingRequiredInput)?;
        let context_name =
            non_empty(args.context).unwrap_or_else(|| format!("{service_account}-context"));
        let kubeconfig = args
            .kubeconfig
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(rustkube::default_kubeconfig_path)
            .unwrap_or_default();

        Ok(Self {
            service_account,
            namespace: args.namespace,
            output: args.output,
            context_name,
            cluster_name: non_empty(args.cluster),
            api_server: non_empty(args.api_server),
            kubeconfig,
            expiry_hours: args.expiry,
            token_issuer: args.token_issuer,
            kubectl: args.kubectl,
        })
    }
}
