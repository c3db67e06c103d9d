use alloy::primitives::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    collections::BTreeMap,
    fs,
    path::Path,
    str::FromStr,
};

pub const DEFAULT_ADDRESSES_FILE: &str = "constants/contractAddresses.json";

/// Deployed raffle addresses keyed by chain id, in the hardhat-deploy
/// `contractAddresses.json` shape: `{ "31337": ["0x…"] }`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AddressTable {
    entries: BTreeMap<u64, Vec<Address>>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, network_id: u64, addresses: Vec<Address>) -> Self {
        self.insert(network_id, addresses);
        self
    }

    pub fn insert(&mut self, network_id: u64, addresses: Vec<Address>) {
        self.entries.insert(network_id, addresses);
    }

    pub fn addresses(&self, network_id: u64) -> &[Address] {
        self.entries
            .get(&network_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Most recent deployment for the network; deploy scripts append to the
    /// front of the list.
    pub fn first_address(&self, network_id: u64) -> Option<Address> {
        self.addresses(network_id).first().copied()
    }

    pub fn network_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_slice(data)
            .wrap_err("Failed to parse contract address table JSON")?;
        let mut table = Self::new();
        for (key, values) in raw {
            let network_id = key
                .trim()
                .parse::<u64>()
                .map_err(|e| eyre!("Invalid network id {key:?} in address table: {e}"))?;
            let addresses = values
                .iter()
                .map(|value| {
                    Address::from_str(value.trim()).map_err(|e| {
                        eyre!("Invalid address {value:?} for network {network_id}: {e}")
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            table.insert(network_id, addresses);
        }
        Ok(table)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).wrap_err_with(|| {
            format!("Failed to read contract address table: {}", path.display())
        })?;
        Self::from_json(&data)
            .wrap_err_with(|| format!("Invalid contract address table {}", path.display()))
    }

    /// Missing files yield an empty table so the client still starts and
    /// renders the fallback view.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "contract address table not found; no network will resolve"
            );
            return Ok(Self::new());
        }
        Self::load(path)
    }
}
