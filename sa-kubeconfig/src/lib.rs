//! Generate a standalone kubeconfig that authenticates as one ServiceAccount.
//!
//! The cluster endpoint and CA are taken from the current context of an
//! existing (usually administrative) kubeconfig, which is also used to talk
//! to the cluster while the token is obtained.

pub mod args;
pub mod assemble;
pub mod cluster;
pub mod config;
mod error;
pub mod source;
pub mod token;

use console::style;
use tracing::info;

pub use args::Args;
pub use cluster::{ClusterApi, KubeCluster};
pub use config::Config;
pub use error::{Error, Result};
pub use source::SourceCluster;
pub use token::{Issuer, TokenIssuer};

use assemble::{Credentials, Trust};

/// Run against the cluster named by `config.kubeconfig`.
pub async fn generate(config: &Config) -> Result<()> {
    let source = source::load(&config.kubeconfig)?;
    let cluster = KubeCluster::from_kubeconfig(&config.kubeconfig).await?;
    let issuer = Issuer::for_config(config, cluster.client());

    generate_with(config, &source, &cluster, &issuer).await
}

/// Verify the ServiceAccount, obtain its token and write the kubeconfig.
pub async fn generate_with(
    config: &Config,
    source: &SourceCluster,
    cluster: &impl ClusterApi,
    issuer: &impl TokenIssuer,
) -> Result<()> {
    cluster::verify_service_account(cluster, &config.namespace, &config.service_account).await?;

    let token = token::acquire_token(
        cluster,
        issuer,
        &config.namespace,
        &config.service_account,
        config.expiry_hours,
    )
    .await?;

    let trust = assemble::resolve_trust(&source.ca);
    if let Trust::Insecure(warning) = &trust {
        println!("{}", style(warning).yellow());
    }

    let kc = assemble::build(&Credentials {
        cluster_name: config.cluster_name.as_deref().unwrap_or(&source.cluster_name),
        server: config.api_server.as_deref().unwrap_or(&source.server),
        trust: &trust,
        user: &config.service_account,
        token: &token,
        context_name: &config.context_name,
        namespace: &config.namespace,
    });
    assemble::write(kc, &config.output)?;

    info!(
        output = %config.output.display(),
        service_account = %config.service_account,
        namespace = %config.namespace,
        "kubeconfig generated"
    );
    Ok(())
}
