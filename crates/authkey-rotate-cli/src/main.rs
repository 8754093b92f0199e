//! authkey-rotate CLI — `rotate-auth-key` command.
//!
//! Hands an account over to a new keypair: the account keeps its address,
//! the new key becomes its authentication key, and the rotated identity is
//! printed. Settings come from flags or the environment.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use authkey_rotate::gateway::{ChainGateway, GasSettings, RestGateway};
use authkey_rotate::{AccountAddress, Identity, IdentitySnapshot, RotationConfig, RotationWorkflow};

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Rotate an account's authentication key to a new keypair, keeping its address.
#[derive(Parser, Debug)]
#[command(
    name = "rotate-auth-key",
    about = "authkey-rotate CLI",
    version,
    long_about = "rotate-auth-key — authentication-key rotation hand-off\n\nTransfers control of an account from its current keypair to a new one\nwhile the account address stays the same."
)]
struct Cli {
    /// Print snapshots as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Include private keys in printed snapshots
    #[arg(long, global = true)]
    reveal_secrets: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rotate the current account's key to the new keypair
    Rotate(RotateArgs),
    /// Show the public components of a private key
    Show {
        /// Hex private key
        #[arg(long, env = "FOR_ACCOUNT_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
        /// Account address (defaults to the key's natural address)
        #[arg(long)]
        address: Option<String>,
    },
    /// Look up the original address now controlled by a key
    Lookup {
        /// Natural address of the controlling key
        controller: String,
        /// Fullnode REST endpoint
        #[arg(long, env = "NODE_URL")]
        node_url: String,
    },
}

#[derive(Args, Debug)]
struct RotateArgs {
    /// Fullnode REST endpoint
    #[arg(long, env = "NODE_URL")]
    node_url: String,

    /// Address being rotated (defaults to the current key's natural address)
    #[arg(long, env = "FOR_ACCOUNT_ADDRESS")]
    for_account_address: Option<String>,

    /// Hex private key currently controlling the account
    #[arg(long, env = "FOR_ACCOUNT_PRIVATE_KEY", hide_env_values = true)]
    for_account_private_key: String,

    /// Natural address of the new keypair (informational)
    #[arg(long, env = "TO_ACCOUNT_ADDRESS")]
    to_account_address: Option<String>,

    /// Hex private key taking over
    #[arg(long, env = "TO_ACCOUNT_PRIVATE_KEY", hide_env_values = true)]
    to_account_private_key: String,

    /// Seconds to wait for the rotation to become final
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Milliseconds between status polls
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Maximum gas units for the rotation transaction
    #[arg(long, default_value_t = 2000)]
    max_gas: u64,

    /// Gas unit price
    #[arg(long, default_value_t = 100)]
    gas_unit_price: u64,

    /// Chain id (asked from the node when omitted)
    #[arg(long)]
    chain_id: Option<u8>,
}

impl RotateArgs {
    fn into_config(self) -> RotationConfig {
        let mut config = RotationConfig::new(
            self.node_url,
            self.for_account_private_key,
            self.to_account_private_key,
        )
        .finality_timeout(Duration::from_secs(self.timeout_secs))
        .poll_interval(Duration::from_millis(self.poll_interval_ms));
        config.current_address = self.for_account_address;
        config.successor_address = self.to_account_address;
        config.gas = GasSettings {
            max_gas_amount: self.max_gas,
            gas_unit_price: self.gas_unit_price,
            ..GasSettings::default()
        };
        config.chain_id = self.chain_id;
        config
    }
}

// ── Output helpers ────────────────────────────────────────────────────────────

struct Output {
    json: bool,
    reveal_secrets: bool,
}

impl Output {
    fn snapshot(&self, label: &str, identity: &Identity) -> Result<()> {
        let snapshot = identity.export_snapshot();
        let snapshot: IdentitySnapshot = if self.reveal_secrets {
            snapshot
        } else {
            snapshot.redacted()
        };

        println!("{label}:");
        if self.json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        } else {
            println!("  address:       {}", snapshot.address);
            println!("  publicKeyHex:  {}", snapshot.public_key_hex);
            println!("  privateKeyHex: {}", snapshot.private_key_hex);
        }
        Ok(())
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let out = Output {
        json: cli.json,
        reveal_secrets: cli.reveal_secrets,
    };

    let result = match cli.command {
        Commands::Rotate(args) => cmd_rotate(args.into_config(), &out).await,
        Commands::Show {
            private_key,
            address,
        } => cmd_show(&private_key, address.as_deref(), &out),
        Commands::Lookup {
            controller,
            node_url,
        } => cmd_lookup(&controller, &node_url).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `rotate-auth-key rotate`
async fn cmd_rotate(config: RotationConfig, out: &Output) -> Result<()> {
    let current = config
        .current_identity()
        .context("invalid current account key")?;
    let successor = config
        .successor_identity()
        .context("invalid new account key")?;

    println!("=== Initial accounts ===");
    out.snapshot("Current", &current)?;
    out.snapshot("New", &successor)?;

    let mut workflow = RotationWorkflow::connect(&config).context("cannot start rotation")?;
    log::debug!("{workflow:?}");

    let rotated = workflow.run().await.with_context(|| {
        format!(
            "rotation of {} ended in state {}",
            workflow.from_address(),
            workflow.state()
        )
    })?;

    println!("=== Rotated account: {} ===", rotated.address());
    out.snapshot("Rotated", &rotated)?;
    println!("done");
    Ok(())
}

/// `rotate-auth-key show`
fn cmd_show(private_key: &str, address: Option<&str>, out: &Output) -> Result<()> {
    let identity = Identity::from_hex(private_key, address).context("invalid key")?;
    out.snapshot("Identity", &identity)?;
    println!("  authKey:       {}", identity.authentication_key());
    println!("  naturalAddr:   {}", identity.natural_address());
    Ok(())
}

/// `rotate-auth-key lookup <controller>`
async fn cmd_lookup(controller: &str, node_url: &str) -> Result<()> {
    let controller = AccountAddress::from_hex(controller).context("invalid controller address")?;
    let gateway = RestGateway::new(node_url)?;
    let original = gateway
        .resolve_original_address(&controller)
        .await
        .with_context(|| format!("lookup for {controller} failed"))?;
    println!("{original}");
    Ok(())
}
