//! Hotel supply platform proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────────┐
//!                   │                        hsp-proxy                          │
//!                   │                                                          │
//!  Client           │  ┌──────────────┐   ┌─────────┐   ┌───────────────┐      │
//!  /rate_breakdown ─┼─▶│ http server  │──▶│ logging │──▶│ instrumenting │      │
//!                   │  │  (business)  │   └─────────┘   └───────┬───────┘      │
//!                   │  └──────────────┘                         ▼              │
//!                   │                                  ┌─────────────────┐     │
//!                   │                                  │  proxy facade   │     │
//!                   │                                  │ retry → balance │     │
//!                   │                                  │ → breaker → qps │     │
//!                   │                                  └────────┬────────┘     │
//!                   │                                           │ GET + JSON   │
//!                   │                                           ▼              │
//!  Upstream         │  ┌──────────────┐   ┌─────────┐   ┌───────────────┐      │
//!  /ean/rate_      ─┼─▶│ http server  │──▶│ logging │──▶│ local service │      │
//!  breakdown        │  │  (upstream)  │   └─────────┘   └───────────────┘      │
//!                   │  └──────────────┘                                        │
//!                   └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use hsp_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use hsp_proxy::lifecycle::startup;
use hsp_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "hsp-proxy")]
#[command(about = "Hotel supply platform service with a resilient upstream proxy", long_about = None)]
struct Cli {
    /// TOML configuration file, watched for instance list changes
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Business endpoint address
    #[arg(long = "http-addr")]
    http_addr: Option<String>,

    /// Upstream-facing endpoint address
    #[arg(long = "ean-addr")]
    ean_addr: Option<String>,

    /// Comma-separated upstream instances; empty disables proxying
    #[arg(long)]
    proxy: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<(ProxyConfig, Option<PathBuf>), ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(addr) = self.http_addr {
            config.listener.bind_address = addr;
        }
        if let Some(addr) = self.ean_addr {
            config.listener.upstream_bind_address = addr;
        }
        if let Some(instances) = self.proxy {
            config.upstream.instances = instances;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok((config, self.config))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (config, config_path) = Cli::parse().into_config()?;

    logging::init(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        http_addr = %config.listener.bind_address,
        ean_addr = %config.listener.upstream_bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "hsp-proxy starting"
    );

    startup::run(config, config_path).await
}
