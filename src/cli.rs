use crate::{
    addresses::{
        AddressTable,
        DEFAULT_ADDRESSES_FILE,
    },
    client::AppConfig,
    logging::DEFAULT_LOG_DIR,
    network::NetworkDescriptor,
    subscriber::RearmPolicy,
    wallets,
};
use alloy::signers::local::PrivateKeySigner;
use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::{
    path::PathBuf,
    time::Duration,
};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "raffle-entrance",
    about = "Terminal client for entering a deployed raffle and watching for winners",
    version,
    group(ArgGroup::new("network").args(["local", "sepolia"])),
    group(ArgGroup::new("signer").args(["keystore", "private_key_env"]))
)]
pub struct Args {
    /// Connect to a local Hardhat node (default)
    #[arg(long)]
    pub local: bool,

    /// Connect to Sepolia
    #[arg(long)]
    pub sepolia: bool,

    /// Override the RPC URL for the selected network
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Contract address table keyed by chain id
    #[arg(long, default_value = DEFAULT_ADDRESSES_FILE)]
    pub addresses: PathBuf,

    /// Keystore name (in --keystore-dir) or path used to sign entries
    #[arg(long)]
    pub keystore: Option<String>,

    /// Override the keystore directory (defaults to ~/.foundry/keystores)
    #[arg(long)]
    pub keystore_dir: Option<String>,

    /// Environment variable holding a hex private key
    #[arg(long)]
    pub private_key_env: Option<String>,

    /// Stop listening for winners after the first one is shown
    #[arg(long)]
    pub one_shot_winner: bool,

    /// Chain id and event polling interval
    #[arg(long, default_value_t = 4000)]
    pub poll_interval_ms: u64,

    /// Directory for the rolling log file
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

impl Args {
    pub fn network(&self) -> NetworkDescriptor {
        if self.sepolia {
            NetworkDescriptor::Sepolia
        } else {
            NetworkDescriptor::Hardhat
        }
    }

    pub fn rpc_url(&self) -> Result<Url> {
        let raw = self
            .rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network().default_rpc_url());
        Url::parse(raw).wrap_err_with(|| format!("Invalid RPC URL {raw}"))
    }

    pub fn policy(&self) -> RearmPolicy {
        if self.one_shot_winner {
            RearmPolicy::OneShot
        } else {
            RearmPolicy::Rearm
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Load the signer, if one was requested. Keystores prompt for a password.
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>> {
        if let Some(var) = &self.private_key_env {
            return wallets::signer_from_env(var).map(Some);
        }
        let Some(name) = &self.keystore else {
            return Ok(None);
        };
        let dir = wallets::resolve_keystore_dir(self.keystore_dir.as_deref())?;
        let descriptor =
            wallets::find_keystore(&dir, name).wrap_err("locating requested keystore")?;
        wallets::unlock_keystore(&descriptor)
            .wrap_err("unlocking keystore")
            .map(Some)
    }

    pub fn into_config(self) -> Result<AppConfig> {
        Ok(AppConfig {
            rpc_url: self.rpc_url()?,
            addresses: AddressTable::load_or_empty(&self.addresses)?,
            signer: self.signer()?,
            policy: self.policy(),
            poll_interval: self.poll_interval(),
        })
    }
}
