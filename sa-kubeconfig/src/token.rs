//! Obtaining a bearer token for the ServiceAccount.
//!
//! A bound token is minted first. If that fails for any reason the token is
//! read from the first Secret the ServiceAccount references, which is how
//! clusters before 1.24 hand out long lived credentials.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use k8s_openapi::api::{
    authentication::v1::{TokenRequest, TokenRequestSpec},
    core::v1::ServiceAccount,
};
use kube::{api::PostParams, Api, Client};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{args::TokenIssuerKind, cluster::ClusterApi, config::Config, Error, Result};

/// Why the primary mechanism did not produce a token. Never fatal.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to run {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {status}: {stderr}", .program.display())]
    Exit {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("encoding TokenRequest")]
    Encode(#[source] serde_json::Error),

    #[error("TokenRequest failed")]
    Api(#[source] kube::Error),

    #[error("no token was returned")]
    Empty,
}

/// Something that can mint a time bound token for a ServiceAccount.
///
/// An `expiry_hours` of 0 leaves the lifetime up to the API server.
#[allow(async_fn_in_trait)]
pub trait TokenIssuer {
    async fn issue(
        &self,
        namespace: &str,
        service_account: &str,
        expiry_hours: u32,
    ) -> Result<String, IssueError>;
}

/// `kubectl create token`, using the same kubeconfig as the rest of the run.
#[derive(Debug, Clone)]
pub struct KubectlIssuer {
    program: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl KubectlIssuer {
    pub fn new(program: impl Into<PathBuf>, kubeconfig: Option<&Path>) -> Self {
        Self {
            program: program.into(),
            kubeconfig: kubeconfig
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_owned),
        }
    }

    fn args(&self, namespace: &str, service_account: &str, expiry_hours: u32) -> Vec<String> {
        let mut args = vec![
            "create".to_owned(),
            "token".to_owned(),
            service_account.to_owned(),
            "-n".to_owned(),
            namespace.to_owned(),
        ];
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push(format!("--kubeconfig={}", kubeconfig.display()));
        }
        if expiry_hours > 0 {
            args.push(format!("--duration={expiry_hours}h"));
        }
        args
    }
}

impl TokenIssuer for KubectlIssuer {
    async fn issue(
        &self,
        namespace: &str,
        service_account: &str,
        expiry_hours: u32,
    ) -> Result<String, IssueError> {
        let args = self.args(namespace, service_account, expiry_hours);
        debug!(program = %self.program.display(), ?args, "running token issuer");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| IssueError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(IssueError::Exit {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}

/// POST to `serviceaccounts/<name>/token` directly.
#[derive(Clone)]
pub struct TokenRequestIssuer {
    client: Client,
}

impl TokenRequestIssuer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl TokenIssuer for TokenRequestIssuer {
    async fn issue(
        &self,
        namespace: &str,
        service_account: &str,
        expiry_hours: u32,
    ) -> Result<String, IssueError> {
        let request = TokenRequest {
            spec: TokenRequestSpec {
                expiration_seconds: (expiry_hours > 0).then(|| i64::from(expiry_hours) * 3600),
                ..Default::default()
            },
            ..Default::default()
        };
        let body = serde_json::to_vec(&request).map_err(IssueError::Encode)?;

        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        let response: TokenRequest = api
            .create_subresource("token", service_account, &PostParams::default(), body)
            .await
            .map_err(IssueError::Api)?;

        response
            .status
            .map(|st| st.token)
            .filter(|token| !token.is_empty())
            .ok_or(IssueError::Empty)
    }
}

/// The primary mechanism selected on the command line.
pub enum Issuer {
    Kubectl(KubectlIssuer),
    Api(TokenRequestIssuer),
}

impl Issuer {
    pub fn for_config(config: &Config, client: &Client) -> Self {
        match config.token_issuer {
            TokenIssuerKind::Kubectl => Issuer::Kubectl(KubectlIssuer::new(
                &config.kubectl,
                Some(config.kubeconfig.as_path()),
            )),
            TokenIssuerKind::Api => Issuer::Api(TokenRequestIssuer::new(client.clone())),
        }
    }
}

impl TokenIssuer for Issuer {
    async fn issue(
        &self,
        namespace: &str,
        service_account: &str,
        expiry_hours: u32,
    ) -> Result<String, IssueError> {
        match self {
            Issuer::Kubectl(issuer) => issuer.issue(namespace, service_account, expiry_hours).await,
            Issuer::Api(issuer) => issuer.issue(namespace, service_account, expiry_hours).await,
        }
    }
}

/// Mint a bound token, falling back to the ServiceAccount's secret.
///
/// The fallback runs only after the issuer has failed or produced an empty
/// token, and is tried exactly once.
pub async fn acquire_token(
    cluster: &impl ClusterApi,
    issuer: &impl TokenIssuer,
    namespace: &str,
    service_account: &str,
    expiry_hours: u32,
) -> Result<String> {
    match issuer.issue(namespace, service_account, expiry_hours).await {
        Ok(token) if !token.trim().is_empty() => {
            debug!(%namespace, %service_account, expiry_hours, "minted bound token");
            return Ok(token);
        }
        Ok(_) => info!(
            error = %IssueError::Empty,
            "could not mint a bound token, reading the ServiceAccount's secret instead"
        ),
        Err(err) => info!(
            error = %err,
            "could not mint a bound token, reading the ServiceAccount's secret instead"
        ),
    }

    token_from_secret(cluster, namespace, service_account).await
}

/// Read the `token` key of the first Secret listed on the ServiceAccount.
pub async fn token_from_secret(
    cluster: &impl ClusterApi,
    namespace: &str,
    service_account: &str,
) -> Result<String> {
    let sa = cluster
        .get_service_account(namespace, service_account)
        .await
        .map_err(|source| Error::ServiceAccountNotFound {
            name: service_account.to_owned(),
            namespace: namespace.to_owned(),
            source,
        })?;

    let secret_name = sa
        .secrets
        .as_deref()
        .and_then(<[_]>::first)
        .and_then(|r| r.name.clone())
        .ok_or_else(|| Error::NoAssociatedSecret {
            name: service_account.to_owned(),
            namespace: namespace.to_owned(),
        })?;

    let secret = cluster
        .get_secret(namespace, &secret_name)
        .await
        .map_err(|source| Error::SecretReadError {
            name: secret_name.clone(),
            source,
        })?;

    let token = secret
        .data
        .as_ref()
        .and_then(|data| data.get("token"))
        .ok_or_else(|| Error::TokenFieldMissing {
            secret: secret_name.clone(),
        })?;

    debug!(secret = %secret_name, "read token from secret");
    Ok(String::from_utf8_lossy(&token.0).into_owned())
}
