use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use texcache_core::cache::FsObjectStore;
use texcache_core::{HttpFetcher, PackageProxy, ProxyConfig};
use texcached::{app, AppState};

#[derive(Parser, Debug)]
#[command(name = "texcached")]
#[command(about = "LaTeX package resolution and caching proxy", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "TEXCACHE_LISTEN", default_value = "127.0.0.1:8787")]
    listen: SocketAddr,

    /// Root directory of the object store
    #[arg(long, env = "TEXCACHE_STORE_DIR", default_value = "texcache-store")]
    store_dir: PathBuf,

    /// Hostname that serves stored binary objects at the root
    #[arg(long, env = "TEXCACHE_BINARY_HOST")]
    binary_host: Option<String>,

    /// Hostname that serves processed packages at the root
    #[arg(long, env = "TEXCACHE_PACKAGE_HOST")]
    package_host: Option<String>,

    /// Override the processed-cache epoch
    #[arg(long, env = "TEXCACHE_CACHE_VERSION")]
    cache_version: Option<String>,

    /// Byte budget of the in-process edge cache
    #[arg(long, env = "TEXCACHE_EDGE_MAX_BYTES")]
    edge_max_bytes: Option<usize>,

    #[arg(long, env = "TEXCACHE_MIRROR_BASE")]
    mirror_base: Option<String>,

    #[arg(long, env = "TEXCACHE_REGISTRY_BASE")]
    registry_base: Option<String>,

    #[arg(long, env = "TEXCACHE_TEXLIVE_BASE")]
    texlive_base: Option<String>,
}

impl Args {
    fn config(&self) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        if let Some(version) = &self.cache_version {
            config.cache_version = version.clone();
        }
        if let Some(base) = &self.mirror_base {
            config.mirror_base = base.clone();
        }
        if let Some(base) = &self.registry_base {
            config.registry_base = base.clone();
        }
        if let Some(base) = &self.texlive_base {
            config.texlive_base = base.clone();
        }
        if let Some(max_bytes) = self.edge_max_bytes {
            config.edge_max_bytes = max_bytes;
        }
        config.binary_host = self.binary_host.clone();
        config.package_host = self.package_host.clone();
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Arc::new(args.config());
    if let Some(drift) = config.rules_drift() {
        log::warn!("{}", drift);
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
    let store = Arc::new(FsObjectStore::new(&args.store_dir));
    let state = AppState::new(PackageProxy::new(config.clone(), fetcher, store));
    let tasks = state.tasks.clone();

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    log::info!(
        "texcached listening on {} (cache version {}, store {:?})",
        args.listen,
        config.cache_version,
        args.store_dir
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let drained = tasks.drain().await;
    log::info!("Shut down after draining {} background task(s)", drained);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}
