use async_trait::async_trait;
use solana_sdk::{
    address_lookup_table::state::AddressLookupTable, message::AddressLookupTableAccount,
    pubkey::Pubkey,
};

use super::{Rpc, RpcError};

/// A decoded address lookup table together with the metadata needed to
/// decide whether it can still be used or closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTableState {
    pub account: AddressLookupTableAccount,
    pub authority: Option<Pubkey>,
    pub deactivation_slot: u64,
}

impl LookupTableState {
    pub fn deserialize(address: Pubkey, data: &[u8]) -> Result<Self, RpcError> {
        let table =
            AddressLookupTable::deserialize(data).map_err(|e| RpcError::InvalidLookupTable {
                address,
                reason: e.to_string(),
            })?;
        Ok(Self {
            account: AddressLookupTableAccount {
                key: address,
                addresses: table.addresses.to_vec(),
            },
            authority: table.meta.authority,
            deactivation_slot: table.meta.deactivation_slot,
        })
    }

    pub fn is_active(&self) -> bool {
        self.deactivation_slot == u64::MAX
    }

    pub fn contains(&self, address: &Pubkey) -> bool {
        self.account.addresses.contains(address)
    }
}

#[async_trait]
pub trait LookupTableExt: Rpc {
    /// `None` if the account does not exist.
    async fn get_lookup_table(&self, address: Pubkey) -> Result<Option<LookupTableState>, RpcError> {
        match self.get_account(address).await? {
            Some(account) => LookupTableState::deserialize(address, &account.data).map(Some),
            None => Ok(None),
        }
    }
}

impl<T: Rpc + ?Sized> LookupTableExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_table_data(
        deactivation_slot: u64,
        authority: Option<Pubkey>,
        addresses: &[Pubkey],
    ) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&deactivation_slot.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.push(0);
        match authority {
            Some(authority) => {
                data.push(1);
                data.extend_from_slice(authority.as_ref());
            }
            None => data.extend_from_slice(&[0u8; 33]),
        }
        data.extend_from_slice(&[0u8; 2]);
        for address in addresses {
            data.extend_from_slice(address.as_ref());
        }
        data
    }

    #[test]
    fn decodes_active_table() {
        let address = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let entries = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let data = lookup_table_data(u64::MAX, Some(authority), &entries);

        let state = LookupTableState::deserialize(address, &data).unwrap();
        assert!(state.is_active());
        assert_eq!(state.account.key, address);
        assert_eq!(state.account.addresses, entries);
        assert_eq!(state.authority, Some(authority));
        assert!(state.contains(&entries[1]));
    }

    #[test]
    fn deactivated_table_is_not_active() {
        let data = lookup_table_data(1_000, None, &[Pubkey::new_unique()]);
        let state = LookupTableState::deserialize(Pubkey::new_unique(), &data).unwrap();
        assert!(!state.is_active());
        assert_eq!(state.authority, None);
    }

    #[test]
    fn rejects_garbage() {
        let address = Pubkey::new_unique();
        let err = LookupTableState::deserialize(address, &[0u8; 10]).unwrap_err();
        assert!(matches!(err, RpcError::InvalidLookupTable { address: a, .. } if a == address));
    }
}
