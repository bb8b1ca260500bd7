use std::{collections::BTreeMap, path::Path};

use crate::{direct, Error};
pub use crate::direct::{Cluster, ClusterSpec, Context, ContextSpec, Kind, User, UserSpec};

/// Name-keyed view of a kubeconfig.
#[derive(Debug, Clone, PartialEq)]
pub struct KubeConfig {
    pub contexts: BTreeMap<String, ContextSpec>,
    pub current_context: String,
    pub clusters: BTreeMap<String, ClusterSpec>,
    pub preferences: serde_yaml::Value,
    pub users: BTreeMap<String, UserSpec>,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            contexts: BTreeMap::new(),
            current_context: String::new(),
            clusters: BTreeMap::new(),
            preferences: serde_yaml::Value::Mapping(Default::default()),
            users: BTreeMap::new(),
        }
    }
}

impl KubeConfig {
    /// The context named by `current-context`, if it exists.
    pub fn current_context(&self) -> Option<(&str, &ContextSpec)> {
        self.contexts
            .get_key_value(&self.current_context)
            .map(|(name, ctx)| (name.as_str(), ctx))
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterSpec> {
        self.clusters.get(name)
    }
}

impl From<direct::KubeConfig> for KubeConfig {
    fn from(kc: direct::KubeConfig) -> Self {
        Self {
            current_context: kc.current_context,
            preferences: kc.preferences,
            contexts: kc
                .contexts
                .into_iter()
                .map(|ctx| (ctx.name, ctx.context))
                .collect(),
            clusters: kc
                .clusters
                .into_iter()
                .map(|cls| (cls.name, cls.cluster))
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|usr| (usr.name, usr.user))
                .collect(),
        }
    }
}

impl From<KubeConfig> for direct::KubeConfig {
    fn from(kc: KubeConfig) -> Self {
        Self {
            kind: Kind::Config,
            api_version: direct::ApiVersion::V1,
            preferences: kc.preferences,
            current_context: kc.current_context,
            clusters: kc
                .clusters
                .into_iter()
                .map(|(name, cluster)| Cluster { name, cluster })
                .collect(),
            contexts: kc
                .contexts
                .into_iter()
                .map(|(name, context)| Context { name, context })
                .collect(),
            users: kc
                .users
                .into_iter()
                .map(|(name, user)| User { name, user })
                .collect(),
        }
    }
}

pub fn read_config(path: impl AsRef<Path>) -> Result<KubeConfig, Error> {
    direct::KubeConfig::read_from(path).map(KubeConfig::from)
}

pub fn write_config(kc: KubeConfig, path: impl AsRef<Path>) -> Result<(), Error> {
    direct::KubeConfig::from(kc).write_to(path)
}
