use std::{ffi::OsString, path::PathBuf};

use clap::{Parser, ValueEnum};

/// Where the short-lived token is minted before falling back to a
/// ServiceAccount's secret.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenIssuerKind {
    /// Run `kubectl create token`
    #[default]
    Kubectl,
    /// POST a TokenRequest to the ServiceAccount's `token` subresource
    Api,
}

/// Generate a kubeconfig that authenticates as a single ServiceAccount.
///
/// Flags may be spelled Go style (`-sa pod-viewer`) or GNU style (`--sa pod-viewer`).
#[derive(Parser, Debug)]
#[command(name = "sa-kubeconfig", version)]
pub struct Args {
    /// Name of the ServiceAccount (required)
    #[arg(long = "sa", value_name = "NAME", allow_hyphen_values = true)]
    pub service_account: Option<String>,

    /// Namespace of the ServiceAccount
    #[arg(long, default_value = "default", allow_hyphen_values = true)]
    pub namespace: String,

    /// Output path for the kubeconfig file
    #[arg(long, default_value = "sa-kubeconfig", allow_hyphen_values = true)]
    pub output: PathBuf,

    /// Context name to use in kubeconfig (defaults to <sa-name>-context)
    #[arg(long, allow_hyphen_values = true)]
    pub context: Option<String>,

    /// Cluster name to use in kubeconfig (defaults from current context)
    #[arg(long, allow_hyphen_values = true)]
    pub cluster: Option<String>,

    /// API server URL (defaults from current context)
    #[arg(long = "api-server", value_name = "URL", allow_hyphen_values = true)]
    pub api_server: Option<String>,

    /// Path to the kubeconfig file [default: ~/.kube/config]
    #[arg(long, allow_hyphen_values = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Token expiry in hours (0 lets the API server pick the lifetime)
    #[arg(long, value_name = "HOURS", default_value_t = 8760)]
    pub expiry: u32,

    /// How to mint the token before falling back to the ServiceAccount's secret
    #[arg(long = "token-issuer", value_enum, default_value_t)]
    pub token_issuer: TokenIssuerKind,

    /// kubectl binary used by the kubectl token issuer
    #[arg(long, value_name = "PATH", default_value = "kubectl")]
    pub kubectl: PathBuf,
}

impl Args {
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Long flags that never take a value.
const SWITCHES: &[&str] = &["help", "version"];

/// Rewrite single-dash long flags (`-sa`, `-api-server=x`) into the
/// double-dash form clap understands. Single letter flags, flag values and
/// anything after a bare `--` pass through untouched.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut rest_is_positional = false;
    let mut next_is_value = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || rest_is_positional {
                return arg;
            }
            if std::mem::take(&mut next_is_value) {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                rest_is_positional = true;
                return arg;
            }
            let Some(flag) = text.strip_prefix('-') else {
                return arg;
            };
            let (flag, doubled) = match flag.strip_prefix('-') {
                Some(flag) => (flag, true),
                None => (flag, false),
            };
            let (name, inline_value) = match flag.split_once('=') {
                Some((name, _)) => (name, true),
                None => (flag, false),
            };
            if name.len() < 2 || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
                return arg;
            }

            next_is_value = !inline_value && !SWITCHES.contains(&name);
            if doubled {
                arg
            } else {
                OsString::from(format!("-{text}"))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(normalize_args(argv(args))).unwrap()
    }

    #[test]
    fn single_dash_long_flags_are_doubled() {
        let normalized = normalize_args(argv(&[
            "sa-kubeconfig",
            "-sa",
            "pod-viewer",
            "-api-server=https://10.0.0.1:6443",
            "--namespace",
            "apps",
            "-h",
        ]));

        assert_eq!(
            normalized,
            argv(&[
                "sa-kubeconfig",
                "--sa",
                "pod-viewer",
                "--api-server=https://10.0.0.1:6443",
                "--namespace",
                "apps",
                "-h",
            ])
        );
    }

    #[test]
    fn values_and_positionals_are_untouched() {
        let normalized = normalize_args(argv(&["prog", "-output", "-", "--", "-sa"]));
        assert_eq!(normalized, argv(&["prog", "--output", "-", "--", "-sa"]));
    }

    #[test]
    fn defaults() {
        let args = parse(&["sa-kubeconfig", "-sa", "pod-viewer"]);

        assert_eq!(args.service_account.as_deref(), Some("pod-viewer"));
        assert_eq!(args.namespace, "default");
        assert_eq!(args.output, PathBuf::from("sa-kubeconfig"));
        assert_eq!(args.context, None);
        assert_eq!(args.cluster, None);
        assert_eq!(args.api_server, None);
        assert_eq!(args.kubeconfig, None);
        assert_eq!(args.expiry, 8760);
        assert_eq!(args.token_issuer, TokenIssuerKind::Kubectl);
        assert_eq!(args.kubectl, PathBuf::from("kubectl"));
    }

    #[test]
    fn every_flag() {
        let args = parse(&[
            "sa-kubeconfig",
            "-sa=pod-viewer",
            "-namespace",
            "sa-namespace",
            "-output",
            "./out",
            "-context",
            "viewer",
            "-cluster",
            "prod",
            "-api-server",
            "https://10.0.0.1:6443",
            "-kubeconfig",
            "/etc/admin.conf",
            "-expiry",
            "24",
            "-token-issuer",
            "api",
        ]);

        assert_eq!(args.namespace, "sa-namespace");
        assert_eq!(args.output, PathBuf::from("./out"));
        assert_eq!(args.context.as_deref(), Some("viewer"));
        assert_eq!(args.cluster.as_deref(), Some("prod"));
        assert_eq!(args.api_server.as_deref(), Some("https://10.0.0.1:6443"));
        assert_eq!(args.kubeconfig, Some(PathBuf::from("/etc/admin.conf")));
        assert_eq!(args.expiry, 24);
        assert_eq!(args.token_issuer, TokenIssuerKind::Api);
    }

    #[test]
    fn zero_expiry_is_accepted() {
        let args = parse(&["sa-kubeconfig", "-sa", "x", "-expiry", "0"]);
        assert_eq!(args.expiry, 0);
    }

    #[test]
    fn negative_expiry_is_rejected() {
        let res = Args::try_parse_from(normalize_args(argv(&[
            "sa-kubeconfig",
            "-sa",
            "x",
            "-expiry",
            "-1",
        ])));
        assert!(res.is_err());
    }

    #[test]
    fn dash_prefixed_values_are_kept() {
        let normalized = normalize_args(argv(&[
            "prog",
            "-context",
            "-ro",
            "--cluster",
            "-prod",
            "-sa=-x",
            "-help",
            "-namespace",
            "apps",
        ]));
        assert_eq!(
            normalized,
            argv(&[
                "prog",
                "--context",
                "-ro",
                "--cluster",
                "-prod",
                "--sa=-x",
                "--help",
                "--namespace",
                "apps",
            ])
        );

        let args = parse(&["sa-kubeconfig", "-sa", "pod-viewer", "-context", "-ro"]);
        assert_eq!(args.context.as_deref(), Some("-ro"));
    }

    #[test]
    fn sa_is_optional_at_parse_time() {
        let args = parse(&["sa-kubeconfig"]);
        assert_eq!(args.service_account, None);
    }
}
