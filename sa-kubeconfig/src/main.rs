use anyhow::Context as _;
use sa_kubeconfig::{Args, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::try_from(Args::parse_normalized())?;

    sa_kubeconfig::generate(&config)
        .await
        .context("Error generating kubeconfig")?;

    println!("Kubeconfig file created at: {}", config.output.display());
    println!("Use with: export KUBECONFIG={}", config.output.display());

    Ok(())
}
