//! In-Home Streaming client entry point.
//!
//! Wires together the configuration file, the UDP transport, the Tokio
//! retry timer, and the [`StreamingClient`], then waits for the host's
//! verdict.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config() / provision()   -- persisted device identity
//!  └─ UdpTransport::bind()          -- one socket for requests and responses
//!  └─ spawn_receive_loop()          -- responses -> StreamingClient
//!  └─ request_authorization()       -- TokioTimer sends a request every second
//!  └─ wait for an outcome or Ctrl-C
//! ```
//!
//! # Usage
//!
//! ```bash
//! ihs-client authorize --host 192.168.1.20 --universe public --pin 1234
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use ihs_client::application::authorization::StreamingClient;
use ihs_client::application::callbacks::CallbackSet;
use ihs_client::infrastructure::network::{spawn_receive_loop, UdpTransport};
use ihs_client::infrastructure::storage::config::{
    config_file_path, load_config, save_config, ClientConfig,
};
use ihs_client::infrastructure::timer::TokioTimer;
use ihs_core::crypto::TicketCipher;
use ihs_core::domain::{HostInfo, Universe};
use ihs_core::protocol::AuthorizationResult;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// In-Home Streaming client.
#[derive(Debug, Parser)]
#[command(
    name = "ihs-client",
    about = "Authorize this device with an In-Home Streaming host",
    version
)]
struct Cli {
    /// Path to the TOML config file (defaults to the platform config dir).
    #[arg(long, global = true, env = "IHS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pair this device with a host using the PIN the host displays.
    Authorize {
        /// Host address as `ip` or `ip:port`.
        #[arg(long, env = "IHS_HOST")]
        host: String,

        /// Universe the host belongs to: public, beta, internal, dev, or a number.
        #[arg(long, default_value = "public", env = "IHS_UNIVERSE")]
        universe: Universe,

        /// PIN shown on the host.
        #[arg(long, env = "IHS_PIN", hide_env_values = true)]
        pin: String,
    },
}

/// Parses `ip` or `ip:port`, filling in `default_port` for a bare IP.
fn parse_host_address(text: &str, default_port: u16) -> anyhow::Result<SocketAddr> {
    if let Ok(addr) = text.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let ip: IpAddr = text
        .parse()
        .with_context(|| format!("invalid host address: '{text}'"))?;
    Ok(SocketAddr::new(ip, default_port))
}

/// Terminal result delivered by the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Authorized(u64),
    Refused(AuthorizationResult),
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = match cli.config {
        Some(path) => path,
        None => config_file_path()?,
    };
    let mut config = load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    if config.device.provision() {
        save_config(&config, &config_path)?;
        info!("provisioned new device identity in {}", config_path.display());
    }

    match cli.command {
        Command::Authorize {
            host,
            universe,
            pin,
        } => {
            let pin = Zeroizing::new(pin);
            let address = parse_host_address(&host, config.network.host_port)?;
            authorize(&config, HostInfo::new(address, universe), &pin).await
        }
    }
}

async fn authorize(config: &ClientConfig, host: HostInfo, pin: &str) -> anyhow::Result<()> {
    let identity = config.device.to_identity()?;

    // ── Network ───────────────────────────────────────────────────────────────
    let bind_addr: SocketAddr = config
        .network
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address: '{}'", config.network.bind_address))?;
    let transport = UdpTransport::bind(bind_addr, identity.device_id())?;
    let socket = transport.try_clone_socket()?;

    let client = Arc::new(StreamingClient::new(
        identity,
        TicketCipher::oaep(),
        Arc::new(transport),
        Arc::new(TokioTimer::current()?),
        config.network.retry_interval(),
    ));

    // ── Observer ──────────────────────────────────────────────────────────────
    let (tx, mut rx) = mpsc::unbounded_channel();
    let failure_tx = tx.clone();
    client.set_observer(Some(Arc::new(
        CallbackSet::new()
            .on_progress(|client| {
                info!(
                    "waiting for the host to accept the PIN for '{}'",
                    client.identity().device_name()
                );
            })
            .on_success(move |_, account| {
                let _ = tx.send(Outcome::Authorized(account));
            })
            .on_failure(move |_, result| {
                let _ = failure_tx.send(Outcome::Refused(result));
            }),
    )));

    let running = Arc::new(AtomicBool::new(true));
    let receiver = spawn_receive_loop(socket, Arc::clone(&client), Arc::clone(&running))?;

    // ── Attempt ───────────────────────────────────────────────────────────────
    client.try_request_authorization(host, pin)?;
    info!("authorizing with {} ({} universe)", host.address, host.universe);

    let outcome = tokio::select! {
        outcome = rx.recv() => outcome,
        _ = tokio::signal::ctrl_c() => {
            match client.active_host() {
                Some(active) => warn!("interrupted; canceling authorization with {}", active.address),
                None => warn!("interrupted"),
            }
            client.cancel_authorization();
            None
        }
    };

    running.store(false, Ordering::Relaxed);
    tokio::task::spawn_blocking(move || receiver.join())
        .await?
        .map_err(|_| anyhow::anyhow!("receive thread panicked"))?;

    match outcome {
        Some(Outcome::Authorized(account)) => {
            info!("device authorized for account {account}");
            Ok(())
        }
        Some(Outcome::Refused(result)) => bail!("authorization failed: {result}"),
        None => bail!("authorization canceled"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_parses_required_arguments() {
        // Arrange / Act
        let cli = Cli::parse_from([
            "ihs-client",
            "authorize",
            "--host",
            "10.0.0.2",
            "--universe",
            "beta",
            "--pin",
            "4321",
        ]);

        // Assert
        let Command::Authorize {
            host,
            universe,
            pin,
        } = cli.command;
        assert_eq!(host, "10.0.0.2");
        assert_eq!(universe, Universe::Beta);
        assert_eq!(pin, "4321");
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_universe_defaults_to_public() {
        let cli = Cli::parse_from(["ihs-client", "authorize", "--host", "h", "--pin", "1"]);
        let Command::Authorize { universe, .. } = cli.command;
        assert_eq!(universe, Universe::Public);
    }

    #[test]
    fn test_missing_pin_is_rejected() {
        let result = Cli::try_parse_from(["ihs-client", "authorize", "--host", "10.0.0.2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bare_ip_gets_default_port() {
        let addr = parse_host_address("192.168.1.20", 27036).unwrap();
        assert_eq!(addr, "192.168.1.20:27036".parse().unwrap());
    }

    #[test]
    fn test_explicit_port_is_kept() {
        let addr = parse_host_address("192.168.1.20:40000", 27036).unwrap();
        assert_eq!(addr.port(), 40000);
    }

    #[test]
    fn test_hostname_is_rejected() {
        assert!(parse_host_address("steam-deck.local", 27036).is_err());
    }
}
