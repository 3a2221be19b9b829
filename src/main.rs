//! relayhook - option 82 audit and lease override hook
//!
//! The library is meant to be embedded in a DHCP server. This binary offers
//! a passive `watch` mode that audits live traffic, plus helpers to inspect
//! relay payloads and the effective configuration.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use relayhook::capture::{PacketCapture, PnetCapture};
use relayhook::config::DEFAULT_CONFIG_PATH;
use relayhook::domain::PacketView;
use relayhook::parser::{DhcpParser, Option82Parser};
use relayhook::pipeline::{hooks, Callouts};
use relayhook::policy::OverridePolicy;
use relayhook::utils::{hex_string, parse_hex};
use relayhook::Config;

#[derive(Parser)]
#[command(name = "relayhook")]
#[command(author, version, about = "DHCP option 82 audit and lease override hook", long_about = None)]
struct Cli {
    /// Path to the key=value config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit DHCP traffic seen on an interface (receive/send stages only)
    Watch {
        /// Interface to capture on (defaults to the first active one)
        #[arg(short, long)]
        interface: Option<String>,
    },
    /// Decode an option 82 payload given as hex and show the override decision
    Inspect {
        /// Payload bytes without the option code/length header, e.g. 01084f4c545f54455354
        hex: String,
    },
    /// Print the effective configuration
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.tracing_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Watch { interface } => watch(&config, interface.as_deref()),
        Commands::Inspect { hex } => inspect(&config, &hex),
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

fn watch(config: &Config, interface: Option<&str>) -> Result<()> {
    let mut capture = PnetCapture::open(interface)?;

    let mut registry: Vec<Arc<dyn Callouts>> = Vec::new();
    let engine = hooks::load(config, &mut registry).context("Failed to load relay hook")?;
    let callouts = registry
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("relay hook registered no callouts"))?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    info!(
        "Watching DHCP traffic on {}, auditing to {:?}",
        capture.interface_name(),
        config.audit_path
    );

    let parser = DhcpParser::new();
    for datagram in capture.dhcp_datagrams(running)? {
        let packet = match parser.parse(&datagram) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Skipping undecodable DHCP datagram: {}", e);
                continue;
            }
        };

        if packet.is_request() {
            callouts.on_receive(Some(&packet));
        } else if packet.is_reply() {
            callouts.on_send(Some(&packet));
        } else {
            debug!("Skipping datagram with op {} (xid {:#010x})", packet.op, packet.transaction_id());
        }
    }

    engine.unload();
    Ok(())
}

fn inspect(config: &Config, hex: &str) -> Result<()> {
    let payload = parse_hex(hex).ok_or_else(|| anyhow!("invalid hex payload: {}", hex))?;

    let policy = OverridePolicy::new(config.rules.clone());
    let parser = Option82Parser::new(policy.markers(), config.match_mode);
    let option = parser.parse(&payload);

    println!("Length:      {}", option.len());
    println!("Match mode:  {}", parser.mode());
    println!("Well-formed: {}", option.well_formed);
    for sub in &option.sub_options {
        let value = match sub.value_text() {
            Some(text) => text.to_string(),
            None => hex_string(&sub.value),
        };
        println!("  {:<20} {}", sub.code.to_string(), value);
    }
    match (&option.matched_marker, policy.evaluate(&option)) {
        (Some(marker), Some(addr)) => println!("MATCH: {} -> override to {}", marker, addr),
        _ => println!("No match; lease address would be kept"),
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("audit_path  = {}", config.audit_path.display());
    println!("match_mode  = {}", config.match_mode);
    println!("log_level   = {}", config.log_level);
    for (i, rule) in config.rules.iter().enumerate() {
        println!(
            "rule[{}]     = {} -> {}",
            i, rule.match_token, rule.replacement_address
        );
    }
}
