use crate::{
    addresses::AddressTable,
    contract::RaffleError,
};
use alloy::primitives::Address;
use std::fmt;

pub const HARDHAT_CHAIN_ID: u64 = 31337;
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NetworkDescriptor {
    /// Local development chain.
    Hardhat,
    Sepolia,
}

impl NetworkDescriptor {
    /// Every id other than the local dev chain is treated as Sepolia.
    pub fn for_network_id(network_id: Option<u64>) -> Self {
        match network_id {
            Some(HARDHAT_CHAIN_ID) => NetworkDescriptor::Hardhat,
            _ => NetworkDescriptor::Sepolia,
        }
    }

    pub fn currency_symbol(self) -> &'static str {
        "ETH"
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            NetworkDescriptor::Hardhat => DEFAULT_LOCAL_RPC_URL,
            NetworkDescriptor::Sepolia => DEFAULT_SEPOLIA_RPC_URL,
        }
    }

    pub fn is_dev_chain(self) -> bool {
        matches!(self, NetworkDescriptor::Hardhat)
    }
}

impl fmt::Display for NetworkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkDescriptor::Hardhat => "Hardhat",
            NetworkDescriptor::Sepolia => "Sepolia",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NetworkContext {
    pub network_id: Option<u64>,
    pub descriptor: NetworkDescriptor,
    pub contract_address: Option<Address>,
}

impl NetworkContext {
    /// Context before the RPC endpoint has reported a chain id.
    pub fn unresolved() -> Self {
        Self {
            network_id: None,
            descriptor: NetworkDescriptor::for_network_id(None),
            contract_address: None,
        }
    }

    pub fn has_contract(&self) -> bool {
        self.contract_address.is_some()
    }

    pub fn require_contract(&self) -> Result<Address, RaffleError> {
        self.contract_address.ok_or(RaffleError::Unresolved {
            network_id: self.network_id,
        })
    }
}

/// Look up the raffle for `network_id`. An unknown or missing id resolves to
/// no address; callers render the fallback view and skip all contract calls.
pub fn resolve(network_id: Option<u64>, table: &AddressTable) -> NetworkContext {
    let contract_address = network_id.and_then(|id| table.first_address(id));
    NetworkContext {
        network_id,
        descriptor: NetworkDescriptor::for_network_id(network_id),
        contract_address,
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::address;
    use proptest::prelude::*;

    const RAFFLE: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const OLDER_RAFFLE: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");

    #[test]
    fn resolve__local_chain_uses_first_address_and_dev_descriptor() {
        // given
        let table =
            AddressTable::new().with_entry(HARDHAT_CHAIN_ID, vec![RAFFLE, OLDER_RAFFLE]);

        // when
        let context = resolve(Some(31337), &table);

        // then
        assert_eq!(context.contract_address, Some(RAFFLE));
        assert_eq!(context.descriptor, NetworkDescriptor::Hardhat);
        assert!(context.descriptor.is_dev_chain());
    }

    #[test]
    fn resolve__missing_network_id_has_no_address() {
        let table = AddressTable::new().with_entry(HARDHAT_CHAIN_ID, vec![RAFFLE]);

        let context = resolve(None, &table);

        assert_eq!(context, NetworkContext::unresolved());
        assert!(!context.has_contract());
    }

    #[test]
    fn resolve__unknown_network_falls_back_to_sepolia_descriptor() {
        let table = AddressTable::new().with_entry(HARDHAT_CHAIN_ID, vec![RAFFLE]);

        let context = resolve(Some(1), &table);

        assert_eq!(context.contract_address, None);
        assert_eq!(context.descriptor, NetworkDescriptor::Sepolia);
        assert_eq!(
            context.require_contract(),
            Err(RaffleError::Unresolved {
                network_id: Some(1)
            })
        );
    }

    proptest! {
        #[test]
        fn resolve__ids_absent_from_table_never_resolve(id in any::<u64>()) {
            prop_assume!(id != HARDHAT_CHAIN_ID);
            let table = AddressTable::new().with_entry(HARDHAT_CHAIN_ID, vec![RAFFLE]);

            let context = resolve(Some(id), &table);

            prop_assert_eq!(context.contract_address, None);
        }

        #[test]
        fn resolve__ids_in_table_resolve_to_first_entry(id in any::<u64>(), first in any::<[u8; 20]>()) {
            let first = Address::from(first);
            let table = AddressTable::new().with_entry(id, vec![first, OLDER_RAFFLE]);

            let context = resolve(Some(id), &table);

            prop_assert_eq!(context.contract_address, Some(first));
            prop_assert_eq!(context.network_id, Some(id));
        }
    }
}
