use anyhow::Context;
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use texcache_core::cache::{FsObjectStore, MemoryObjectStore};
use texcache_core::{HttpFetcher, ObjectStore, PackageProxy, ProxyConfig};
use texcache_package::{ArchiveDecoder, DependencyScanner, ExtractedFileSet, MacroDependencyScanner};

#[derive(Parser)]
#[command(name = "texcache")]
#[command(about = "texcache package proxy tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a package through the full pipeline and print the JSON payload
    Resolve {
        /// Package name as a document would load it
        name: String,

        /// Object store directory; an in-memory store is used when omitted
        #[arg(long, value_name = "DIR")]
        store_dir: Option<PathBuf>,
    },
    /// Decode a local ZIP archive and summarize the installable files
    Decode {
        /// Path to the archive
        #[arg(value_name = "ZIP")]
        path: PathBuf,

        /// Package the archive belongs to
        #[arg(long)]
        name: String,
    },
    /// List the packages a TeX file loads
    Scan {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Package to leave out of the result
        #[arg(long, default_value = "")]
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { name, store_dir } => resolve(&name, store_dir)?,
        Commands::Decode { path, name } => {
            let bytes = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
            eprintln!("sha256 {}", hex::encode(Sha256::digest(&bytes)));
            match ArchiveDecoder::new().decode(&bytes, &name)? {
                Some(files) => print_summary(&files),
                None => println!("{}: no installable files", name),
            }
        }
        Commands::Scan { path, name } => {
            let content = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
            let text = String::from_utf8_lossy(&content);
            for dep in MacroDependencyScanner.scan(&text, &name) {
                println!("{}", dep);
            }
        }
    }
    Ok(())
}

fn resolve(name: &str, store_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = Arc::new(ProxyConfig::from_env());
    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent)?);
    let store: Arc<dyn ObjectStore> = match store_dir {
        Some(dir) => Arc::new(FsObjectStore::new(dir)),
        None => Arc::new(MemoryObjectStore::new()),
    };
    let proxy = PackageProxy::new(config, fetcher, store);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(proxy.processed(name))?;
    eprintln!(
        "{} via {}",
        result.cache.as_str(),
        result.stage.map(|s| s.as_str()).unwrap_or("cache")
    );
    println!("{}", String::from_utf8_lossy(&result.payload));
    Ok(())
}

fn print_summary(files: &ExtractedFileSet) {
    println!("{} ({} files)", files.name, files.total_files);
    for (path, file) in &files.files {
        println!("  {:<8} {}", format!("{:?}", file.encoding).to_lowercase(), path);
    }
    if !files.dependencies.is_empty() {
        let deps: Vec<&str> = files.dependencies.iter().map(String::as_str).collect();
        println!("depends on: {}", deps.join(", "));
    }
}
