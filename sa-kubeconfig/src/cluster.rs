use std::path::Path;

use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client,
};
use tracing::debug;

use crate::{Error, Result};

/// The reads this tool performs against the cluster.
#[allow(async_fn_in_trait)]
pub trait ClusterApi {
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, kube::Error>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, kube::Error>;
}

/// A live cluster, authenticated with the source kubeconfig's current context.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub async fn from_kubeconfig(path: &Path) -> Result<Self> {
        let source_err = |source: Box<dyn std::error::Error + Send + Sync>| Error::SourceLoadError {
            path: path.to_owned(),
            source,
        };

        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| source_err(e.into()))?;
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| source_err(e.into()))?;
        debug!(cluster_url = %config.cluster_url, "building cluster client");
        let client = Client::try_from(config).map_err(|e| source_err(e.into()))?;

        Ok(Self::new(client))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl ClusterApi for KubeCluster {
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ServiceAccount, kube::Error> {
        Api::<ServiceAccount>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, kube::Error> {
        Api::<Secret>::namespaced(self.client.clone(), namespace)
            .get(name)
            .await
    }
}

/// Fetch the ServiceAccount, refusing to go any further if it can't be read.
pub async fn verify_service_account(
    cluster: &impl ClusterApi,
    namespace: &str,
    name: &str,
) -> Result<ServiceAccount> {
    let sa = cluster
        .get_service_account(namespace, name)
        .await
        .map_err(|source| Error::ServiceAccountNotFound {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            source,
        })?;
    debug!(%namespace, %name, "found ServiceAccount");
    Ok(sa)
}



#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use serde_json::json;

    use super::{fake::FakeCluster, mock, *};

    #[tokio::test]
    async fn verifies_existing_service_account() {
        let cluster = FakeCluster::default().with_service_account("sa-namespace", "pod-viewer", &[]);

        let sa = verify_service_account(&cluster, "sa-namespace", "pod-viewer")
            .await
            .unwrap();
        assert_eq!(sa.metadata.name.as_deref(), Some("pod-viewer"));
    }

    #[tokio::test]
    async fn missing_service_account_is_fatal() {
        let cluster = FakeCluster::default().with_service_account("other", "pod-viewer", &[]);

        let err = verify_service_account(&cluster, "sa-namespace", "pod-viewer")
            .await
            .unwrap_err();
        match err {
            Error::ServiceAccountNotFound { name, namespace, .. } => {
                assert_eq!(name, "pod-viewer");
                assert_eq!(namespace, "sa-namespace");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unusable_source_kubeconfig() {
        let dir = tempfile::tempdir().unwrap();
        let err = KubeCluster::from_kubeconfig(&dir.path().join("missing"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::SourceLoadError { .. }));
    }

    #[tokio::test]
    async fn service_account_and_secret_are_read_from_their_api_paths() {
        let (client, mut server) = mock::client();
        let cluster = KubeCluster::new(client);

        let reads = async {
            let sa = cluster
                .get_service_account("sa-namespace", "pod-viewer")
                .await
                .unwrap();
            let secret = cluster
                .get_secret("sa-namespace", "pod-viewer-token")
                .await
                .unwrap();
            (sa, secret)
        };
        let apiserver = async {
            mock::expect(
                &mut server,
                Method::GET,
                "/api/v1/namespaces/sa-namespace/serviceaccounts/pod-viewer",
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "ServiceAccount",
                    "metadata": {"name": "pod-viewer", "namespace": "sa-namespace"},
                    "secrets": [{"name": "pod-viewer-token"}],
                }),
            )
            .await;
            mock::expect(
                &mut server,
                Method::GET,
                "/api/v1/namespaces/sa-namespace/secrets/pod-viewer-token",
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "metadata": {"name": "pod-viewer-token"},
                    "data": {"token": "YWJjMTIz"},
                }),
            )
            .await;
        };

        let ((sa, secret), ()) = tokio::join!(reads, apiserver);
        assert_eq!(sa.secrets.unwrap()[0].name.as_deref(), Some("pod-viewer-token"));
        assert_eq!(secret.data.unwrap()["token"].0, b"abc123");
    }

    #[tokio::test]
    async fn api_not_found_is_service_account_not_found() {
        let (client, mut server) = mock::client();
        let cluster = KubeCluster::new(client);

        let (res, _) = tokio::join!(
            verify_service_account(&cluster, "sa-namespace", "ghost"),
            mock::expect(
                &mut server,
                Method::GET,
                "/api/v1/namespaces/sa-namespace/serviceaccounts/ghost",
                StatusCode::NOT_FOUND,
                mock::not_found("serviceaccounts", "ghost"),
            ),
        );

        match res {
            Err(Error::ServiceAccountNotFound { source, .. }) => {
                assert!(matches!(source, kube::Error::Api(ref resp) if resp.code == 404));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
